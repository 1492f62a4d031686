// API handlers - thin HTTP orchestration layer
// Handlers only deal with HTTP concerns:
// 1. Extract parameters from request
// 2. Call the farming service
// 3. Transform the domain result to an HTTP response

pub mod admin;
pub mod leaderboard;
pub mod live;
pub mod tasks;
pub mod users;

use std::sync::Arc;

use crate::domain::FarmingService;

/// Router state shared by every handler
pub type AppState = Arc<FarmingService>;

pub use admin::{admin_export_handler, admin_stats_handler};
pub use leaderboard::leaderboard_handler;
pub use live::live_updates_handler;
pub use tasks::list_tasks_handler;
pub use users::{
    apply_referral_handler, claim_handler, complete_task_handler, connect_wallet_handler,
    user_me_handler, user_tasks_handler,
};
