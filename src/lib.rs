pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod models;
pub mod notify;

// Re-export commonly used types
pub use models::{
    AdminStats, LeaderboardEntry, Task, TaskCategory, TaskWithCompletion, User, UserStats,
};

pub use db::{EntityStore, MemoryStore, PgStore, SeedData, StoreError};

pub use domain::{classify, DomainError, Evolution, FarmingService, RewardLedger};

pub use config::{AppConfig, RewardConfig};

pub use notify::{FarmingEvent, Notifier};
