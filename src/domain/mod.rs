// Domain layer - reward accounting and ranking with no HTTP concerns
// Pure calculations live in their own modules; `service` wires them to a store

pub mod eligibility;
pub mod evolution;
pub mod export;
pub mod ledger;
pub mod locks;
pub mod ranking;
pub mod service;
pub mod stats;

use crate::db::StoreError;

// Domain error type - no HTTP concerns
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Claim not available for another {time_until_next_claim}ms")]
    InvalidState { time_until_next_claim: i64 },

    #[error("Task already completed: {0}")]
    AlreadyCompleted(String),

    #[error("Referral already applied: {0}")]
    AlreadyApplied(String),

    #[error("Cannot use own referral code: {0}")]
    SelfReferral(String),

    #[error("Invalid referral code: {0}")]
    InvalidCode(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<StoreError> for DomainError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(msg) => DomainError::NotFound(msg),
            _ => DomainError::Storage(e.to_string()),
        }
    }
}

pub use eligibility::ClaimEligibility;
pub use evolution::{classify, Evolution};
pub use ledger::RewardLedger;
pub use service::FarmingService;
