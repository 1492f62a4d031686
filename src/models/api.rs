use serde::{Deserialize, Serialize};

use super::{EvolutionPool, TaskWithCompletion, User};

/// Dashboard view of a single user - field order matches the client contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub user: User,
    pub evol_name: String,
    pub evol_level: i32,
    pub global_rank: i64,
    pub next_evol_target: i64,
    pub progress_percentage: i64,
    pub can_claim: bool,
    pub time_until_next_claim: i64,
    pub daily_earnings: i64,
    pub total_claims: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub user: User,
    pub evol_name: String,
    pub rank: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub total_users: i64,
    pub total_distributed: i64,
    pub pool_usage_percentage: i64,
    pub evol_pools: Vec<EvolutionPool>,
}

/// Response of a task completion: refreshed task list plus the user's stats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteTaskResponse {
    pub tasks: Vec<TaskWithCompletion>,
    pub user_stats: UserStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralPayload {
    #[serde(default)]
    pub referral_code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WalletPayload {
    #[serde(default)]
    pub wallet: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskQueryParams {
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardQueryParams {
    pub evol_level: Option<i32>,
    pub limit: Option<usize>,
}
