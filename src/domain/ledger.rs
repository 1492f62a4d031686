use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::config::RewardConfig;
use crate::db::{EntityStore, StoreError};
use crate::domain::eligibility::{self, ClaimEligibility};
use crate::domain::evolution::classify;
use crate::domain::locks::UserLocks;
use crate::domain::DomainError;
use crate::models::{ClaimWrite, User, REFERRAL_CODE_PREFIX};
use crate::notify::{FarmingEvent, Notifier};

/// Applies every point-earning event
///
/// Each operation holds the affected users' locks for its whole read-check-write sequence and
/// hands the store a single atomic write.
pub struct RewardLedger {
    store: Arc<dyn EntityStore>,
    locks: UserLocks,
    notifier: Notifier,
    config: RewardConfig,
}

/// Referrer id encoded in a referral code
pub fn parse_referral_code(code: &str) -> Option<i64> {
    let code = code.trim();
    code.strip_prefix(REFERRAL_CODE_PREFIX)
        .unwrap_or(code)
        .parse::<i64>()
        .ok()
}

impl RewardLedger {
    pub fn new(store: Arc<dyn EntityStore>, notifier: Notifier, config: RewardConfig) -> Self {
        Self {
            store,
            locks: UserLocks::new(),
            notifier,
            config,
        }
    }

    async fn require_user(&self, user_id: i64) -> Result<User, DomainError> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("User {} not found", user_id)))
    }

    pub fn eligibility(&self, user: &User, now: DateTime<Utc>) -> ClaimEligibility {
        eligibility::check(user.last_claim, now, self.config.claim_cooldown)
    }

    pub async fn claim(&self, user_id: i64) -> Result<User, DomainError> {
        self.claim_at(user_id, Utc::now()).await
    }

    /// Timed claim: credits the configured amount and grows the pool of the pre-claim tier
    #[tracing::instrument(skip(self))]
    pub async fn claim_at(&self, user_id: i64, now: DateTime<Utc>) -> Result<User, DomainError> {
        // Unknown ids never reach the lock table
        self.require_user(user_id).await?;
        let _guard = self.locks.lock(user_id).await;

        let user = self.require_user(user_id).await?;
        let eligibility = self.eligibility(&user, now);
        if !eligibility.can_claim {
            return Err(DomainError::InvalidState {
                time_until_next_claim: eligibility.time_until_next_claim,
            });
        }

        let write = ClaimWrite {
            user_id,
            amount: self.config.claim_amount,
            claimed_at: now,
            pool_level: classify(user.points).level,
            cooldown_cutoff: eligibility::cooldown_cutoff(now, self.config.claim_cooldown),
        };

        let updated = match self.store.record_claim(write).await {
            Ok(updated) => updated,
            Err(StoreError::Conflict(_)) => {
                // Another instance claimed between our read and the write
                let current = self.require_user(user_id).await?;
                let eligibility = self.eligibility(&current, now);
                warn!(user_id, "Claim refused by store cooldown check");
                return Err(DomainError::InvalidState {
                    time_until_next_claim: eligibility.time_until_next_claim,
                });
            }
            Err(e) => return Err(e.into()),
        };

        info!(
            user_id,
            amount = self.config.claim_amount,
            points = updated.points,
            "Claim recorded"
        );
        self.notifier.publish(FarmingEvent::UserClaimed {
            user_id,
            amount: self.config.claim_amount,
            new_points: updated.points,
        });

        Ok(updated)
    }

    pub async fn complete_task(&self, user_id: i64, task_id: i64) -> Result<User, DomainError> {
        self.complete_task_at(user_id, task_id, Utc::now()).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn complete_task_at(
        &self,
        user_id: i64,
        task_id: i64,
        now: DateTime<Utc>,
    ) -> Result<User, DomainError> {
        self.require_user(user_id).await?;
        let _guard = self.locks.lock(user_id).await;

        self.require_user(user_id).await?;
        let task = self
            .store
            .get_task(task_id)
            .await?
            .filter(|task| task.is_active)
            .ok_or_else(|| DomainError::NotFound(format!("Task {} not found", task_id)))?;

        let updated = self
            .store
            .record_task_completion(user_id, task.id, task.reward, now)
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => DomainError::AlreadyCompleted(format!(
                    "User {} already completed task {}",
                    user_id, task_id
                )),
                other => other.into(),
            })?;

        info!(user_id, task_id, reward = task.reward, points = updated.points, "Task completed");
        self.notifier.publish(FarmingEvent::TaskCompleted {
            user_id,
            task_id,
            new_points: updated.points,
        });

        Ok(updated)
    }

    /// Credit both sides of a referral, at most once per referee
    #[tracing::instrument(skip(self))]
    pub async fn apply_referral(&self, user_id: i64, code: &str) -> Result<(), DomainError> {
        if code.trim().is_empty() {
            return Err(DomainError::Validation("Referral code is required".to_string()));
        }

        let user = self.require_user(user_id).await?;
        if user.ref_applied {
            return Err(DomainError::AlreadyApplied(format!("User {}", user_id)));
        }

        let referrer = match parse_referral_code(code) {
            Some(referrer_id) => self.store.get_user(referrer_id).await?,
            None => None,
        }
        .ok_or_else(|| DomainError::InvalidCode(code.trim().to_string()))?;

        if referrer.id == user.id {
            return Err(DomainError::SelfReferral(code.trim().to_string()));
        }

        let _guard = self.locks.lock_pair(user.id, referrer.id).await;

        self.store
            .record_referral(user.id, referrer.id, self.config.referral_reward)
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => DomainError::AlreadyApplied(format!("User {}", user_id)),
                other => other.into(),
            })?;

        info!(
            user_id,
            referrer_id = referrer.id,
            reward = self.config.referral_reward,
            "Referral applied"
        );
        Ok(())
    }
}
