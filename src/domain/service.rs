use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::{RewardConfig, DEFAULT_LEADERBOARD_LIMIT};
use crate::db::EntityStore;
use crate::domain::evolution::is_valid_level;
use crate::domain::ledger::RewardLedger;
use crate::domain::{export, ranking, stats, DomainError};
use crate::models::{
    AdminStats, CompleteTaskResponse, LeaderboardEntry, NewUser, Task, TaskCategory,
    TaskWithCompletion, User, UserStats,
};
use crate::notify::Notifier;

/// Prefix every connectable wallet address carries
pub const WALLET_PREFIX: &str = "gxr1";

/// Entry point for every dashboard operation
///
/// Reads are recomputed from the store on each call; writes go through the `RewardLedger`.
pub struct FarmingService {
    store: Arc<dyn EntityStore>,
    ledger: RewardLedger,
    notifier: Notifier,
}

impl FarmingService {
    pub fn new(store: Arc<dyn EntityStore>, notifier: Notifier, config: RewardConfig) -> Self {
        let ledger = RewardLedger::new(store.clone(), notifier.clone(), config);
        Self {
            store,
            ledger,
            notifier,
        }
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    async fn require_user(&self, user_id: i64) -> Result<User, DomainError> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("User {} not found", user_id)))
    }

    async fn stats_for(&self, user: User, now: DateTime<Utc>) -> Result<UserStats, DomainError> {
        let all_users = self.store.get_all_users().await?;
        let claims = self.store.get_user_claims(user.id).await?;
        let eligibility = self.ledger.eligibility(&user, now);
        Ok(stats::user_stats(user, &all_users, &claims, eligibility, now))
    }

    /// Stats for a telegram user, creating the user on first contact
    #[tracing::instrument(skip(self))]
    pub async fn get_or_create_user_stats(
        &self,
        telegram_id: &str,
    ) -> Result<UserStats, DomainError> {
        if telegram_id.trim().is_empty() {
            return Err(DomainError::Validation("Telegram id is required".to_string()));
        }

        let user = match self.store.get_user_by_telegram_id(telegram_id).await? {
            Some(user) => user,
            None => {
                let user = self
                    .store
                    .get_or_create_user(NewUser::from_telegram_id(telegram_id))
                    .await?;
                info!(user_id = user.id, telegram_id, "Created user on first contact");
                user
            }
        };

        self.stats_for(user, Utc::now()).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn user_stats(&self, user_id: i64) -> Result<UserStats, DomainError> {
        let user = self.require_user(user_id).await?;
        self.stats_for(user, Utc::now()).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn claim(&self, user_id: i64) -> Result<UserStats, DomainError> {
        let now = Utc::now();
        let user = self.ledger.claim_at(user_id, now).await?;
        self.stats_for(user, now).await
    }

    /// Active tasks, optionally filtered by a category name or alias
    #[tracing::instrument(skip(self))]
    pub async fn list_tasks(&self, category: Option<&str>) -> Result<Vec<Task>, DomainError> {
        let category = match category.map(str::trim).filter(|c| !c.is_empty()) {
            Some(raw) => Some(raw.parse::<TaskCategory>().map_err(DomainError::Validation)?),
            None => None,
        };

        Ok(self.store.list_tasks(category).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_user_tasks(
        &self,
        user_id: i64,
    ) -> Result<Vec<TaskWithCompletion>, DomainError> {
        self.require_user(user_id).await?;
        Ok(self.store.get_user_tasks(user_id).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn complete_task(
        &self,
        user_id: i64,
        task_id: i64,
    ) -> Result<CompleteTaskResponse, DomainError> {
        let now = Utc::now();
        let user = self.ledger.complete_task_at(user_id, task_id, now).await?;
        let tasks = self.store.get_user_tasks(user_id).await?;
        let user_stats = self.stats_for(user, now).await?;

        Ok(CompleteTaskResponse { tasks, user_stats })
    }

    #[tracing::instrument(skip(self))]
    pub async fn apply_referral(
        &self,
        user_id: i64,
        code: Option<&str>,
    ) -> Result<(), DomainError> {
        self.ledger.apply_referral(user_id, code.unwrap_or_default()).await
    }

    /// Attach a `gxr1` wallet address to the user, replacing any previous one
    #[tracing::instrument(skip(self))]
    pub async fn connect_wallet(
        &self,
        user_id: i64,
        wallet: Option<&str>,
    ) -> Result<User, DomainError> {
        let wallet = wallet.map(str::trim).unwrap_or_default();
        match wallet.strip_prefix(WALLET_PREFIX) {
            Some(rest) if !rest.is_empty() => {}
            _ => {
                return Err(DomainError::Validation(format!(
                    "Wallet address must start with {}",
                    WALLET_PREFIX
                )))
            }
        }

        let user = self.store.set_wallet(user_id, wallet.to_string()).await?;
        info!(user_id, "Wallet connected");
        Ok(user)
    }

    #[tracing::instrument(skip(self))]
    pub async fn leaderboard(
        &self,
        tier_filter: Option<i32>,
        limit: Option<usize>,
    ) -> Result<Vec<LeaderboardEntry>, DomainError> {
        if let Some(level) = tier_filter {
            if !is_valid_level(level) {
                return Err(DomainError::Validation(format!("Invalid evolution level: {}", level)));
            }
        }

        let users = self.store.get_all_users().await?;
        Ok(ranking::leaderboard(
            users,
            tier_filter,
            limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT),
        ))
    }

    #[tracing::instrument(skip(self))]
    pub async fn admin_stats(&self) -> Result<AdminStats, DomainError> {
        let users = self.store.get_all_users().await?;
        let pools = self.store.get_evolution_pools().await?;
        Ok(stats::admin_stats(&users, pools))
    }

    #[tracing::instrument(skip(self))]
    pub async fn export_users_csv(&self) -> Result<String, DomainError> {
        let users = self.store.get_all_users().await?;
        Ok(export::users_csv(&users))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, MockEntityStore, SeedData, StoreError};

    async fn setup() -> FarmingService {
        let store = Arc::new(MemoryStore::new());
        store.seed(&SeedData::default()).await.unwrap();
        FarmingService::new(store, Notifier::new(), RewardConfig::default())
    }

    #[tokio::test]
    async fn test_first_contact_scenario() {
        let service = setup().await;

        let stats = service.get_or_create_user_stats("999").await.unwrap();
        assert_eq!(stats.user.points, 0);
        assert_eq!(stats.user.username.as_deref(), Some("User999"));
        assert_eq!(stats.evol_level, 1);
        assert!(stats.can_claim);
        assert_eq!(stats.global_rank, 1);

        let stats = service.claim(stats.user.id).await.unwrap();
        assert_eq!(stats.user.points, 250);
        assert!(!stats.can_claim);
        assert!(stats.time_until_next_claim > 21_590_000);
        assert!(stats.time_until_next_claim <= 21_600_000);
        assert_eq!(stats.daily_earnings, 250);
        assert_eq!(stats.total_claims, 1);

        let task = service
            .list_tasks(None)
            .await
            .unwrap()
            .into_iter()
            .find(|t| t.reward == 100)
            .unwrap();
        let response = service.complete_task(stats.user.id, task.id).await.unwrap();
        assert_eq!(response.user_stats.user.points, 350);
        assert!(response.tasks.iter().any(|t| t.task.id == task.id && t.completed));
    }

    #[tokio::test]
    async fn test_get_or_create_is_stable() {
        let service = setup().await;
        let first = service.get_or_create_user_stats("42").await.unwrap();
        let second = service.get_or_create_user_stats("42").await.unwrap();
        assert_eq!(first.user.id, second.user.id);

        let empty = service.get_or_create_user_stats("  ").await;
        assert!(matches!(empty, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn test_telegram_id_is_used_verbatim() {
        let service = setup().await;
        let plain = service.get_or_create_user_stats("999").await.unwrap();
        let padded = service.get_or_create_user_stats(" 999").await.unwrap();

        assert_ne!(plain.user.id, padded.user.id);
        assert_eq!(padded.user.telegram_id, " 999");
    }

    #[tokio::test]
    async fn test_list_tasks_category_validation() {
        let service = setup().await;

        let collab = service.list_tasks(Some("collab")).await.unwrap();
        assert!(!collab.is_empty());
        assert!(collab.iter().all(|t| t.category == TaskCategory::Collaborator));

        assert_eq!(service.list_tasks(Some("")).await.unwrap().len(), 10);
        assert!(matches!(
            service.list_tasks(Some("bogus")).await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_connect_wallet() {
        let service = setup().await;
        let stats = service.get_or_create_user_stats("1").await.unwrap();

        let user = service
            .connect_wallet(stats.user.id, Some("gxr1qqqq"))
            .await
            .unwrap();
        assert_eq!(user.wallet.as_deref(), Some("gxr1qqqq"));

        for bad in [None, Some(""), Some("gxr1"), Some("0xabc")] {
            assert!(matches!(
                service.connect_wallet(stats.user.id, bad).await,
                Err(DomainError::Validation(_))
            ));
        }
        assert!(matches!(
            service.connect_wallet(404, Some("gxr1abc")).await,
            Err(DomainError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_leaderboard_validation_and_order() {
        let service = setup().await;
        let a = service.get_or_create_user_stats("a").await.unwrap().user;
        let b = service.get_or_create_user_stats("b").await.unwrap().user;
        service.claim(b.id).await.unwrap();

        let board = service.leaderboard(None, None).await.unwrap();
        assert_eq!(board[0].user.id, b.id);
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[1].user.id, a.id);

        let rookies = service.leaderboard(Some(1), None).await.unwrap();
        assert_eq!(rookies.len(), 1);
        assert_eq!(rookies[0].rank, 1);

        assert!(matches!(
            service.leaderboard(Some(8), None).await,
            Err(DomainError::Validation(_))
        ));
        assert!(service.leaderboard(None, Some(0)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_admin_stats_and_export() {
        let service = setup().await;
        let user = service.get_or_create_user_stats("77").await.unwrap().user;
        service.claim(user.id).await.unwrap();

        let stats = service.admin_stats().await.unwrap();
        assert_eq!(stats.total_users, 1);
        assert_eq!(stats.total_distributed, 250);
        assert_eq!(stats.evol_pools.len(), 7);

        let csv = service.export_users_csv().await.unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with(&format!("{},77,User77,250,,0,", user.id)));
    }

    #[tokio::test]
    async fn test_user_stats_unknown_user() {
        let service = setup().await;
        assert!(matches!(service.user_stats(404).await, Err(DomainError::NotFound(_))));
        assert!(matches!(service.list_user_tasks(404).await, Err(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_admin_stats_storage_failure() {
        let mut store = MockEntityStore::new();
        store
            .expect_get_all_users()
            .returning(|| Err(StoreError::ConnectionError("database unavailable".to_string())));
        let service =
            FarmingService::new(Arc::new(store), Notifier::new(), RewardConfig::default());

        assert!(matches!(service.admin_stats().await, Err(DomainError::Storage(_))));
    }
}
