use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use crate::db::errors::Result;
use crate::db::seed::SeedData;
use crate::models::{
    Claim, ClaimWrite, EvolutionPool, NewTask, NewUser, Task, TaskCategory, TaskWithCompletion,
    User,
};

/// Storage seam for every farming entity
///
/// Reads return owned snapshots. The three `record_*` writes are the only way points change and
/// each one is applied all-or-nothing: a failed write leaves every entity untouched.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn get_user(&self, id: i64) -> Result<Option<User>>;

    async fn get_user_by_telegram_id(&self, telegram_id: &str) -> Result<Option<User>>;

    /// Returns the existing user when the telegram id is already known
    async fn get_or_create_user(&self, new_user: NewUser) -> Result<User>;

    /// All users in ascending id order
    async fn get_all_users(&self) -> Result<Vec<User>>;

    async fn set_wallet(&self, user_id: i64, wallet: String) -> Result<User>;

    async fn get_task(&self, id: i64) -> Result<Option<Task>>;

    /// Active tasks, optionally restricted to one category
    async fn list_tasks(&self, category: Option<TaskCategory>) -> Result<Vec<Task>>;

    async fn create_task(&self, new_task: NewTask) -> Result<Task>;

    /// Active tasks joined with the user's completion state
    async fn get_user_tasks(&self, user_id: i64) -> Result<Vec<TaskWithCompletion>>;

    async fn get_user_claims(&self, user_id: i64) -> Result<Vec<Claim>>;

    /// Pools ordered by level
    async fn get_evolution_pools(&self) -> Result<Vec<EvolutionPool>>;

    /// Append the claim, credit the user, stamp `last_claim` and grow the tier pool.
    /// Fails with `Conflict` if the user claimed after `cooldown_cutoff`.
    async fn record_claim(&self, claim: ClaimWrite) -> Result<User>;

    /// Mark the pair completed and credit the reward.
    /// Fails with `Conflict` if the pair is already completed.
    async fn record_task_completion(
        &self,
        user_id: i64,
        task_id: i64,
        reward: i64,
        completed_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<User>;

    /// Credit both sides of a referral.
    /// Fails with `Conflict` if the referee already applied one.
    async fn record_referral(&self, referee_id: i64, referrer_id: i64, reward: i64) -> Result<()>;

    /// Install pools and the task catalog; a no-op for parts that already exist
    async fn seed(&self, seed: &SeedData) -> Result<()>;
}
