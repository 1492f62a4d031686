use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, info};

use crate::db::connection::with_retry;
use crate::db::errors::{Result, StoreError};
use crate::db::seed::SeedData;
use crate::db::store::EntityStore;
use crate::models::rows::{TaskCompletionRow, TaskRow};
use crate::models::{
    Claim, ClaimWrite, EvolutionPool, NewTask, NewUser, Task, TaskCategory, TaskWithCompletion,
    User,
};

const WRITE_RETRIES: u8 = 3;

const USER_COLUMNS: &str = r#"
    id, telegram_id, username, email, points, last_claim, wallet,
    COALESCE(referral_code, 'REF' || id) AS referral_code,
    referred_by, total_referrals, ref_applied, is_admin, created_at
"#;

/// Durable store backed by Postgres
///
/// Every ledger write runs in its own transaction and is retried on serialization failures
/// and deadlocks.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the embedded schema migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    async fn fetch_user(tx: &mut Transaction<'_, Postgres>, id: i64) -> Result<User> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("user {}", id)))
    }

    async fn record_claim_once(&self, claim: &ClaimWrite) -> Result<User> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE users
            SET points = points + $2, last_claim = $3
            WHERE id = $1 AND (last_claim IS NULL OR last_claim <= $4)
            "#,
        )
        .bind(claim.user_id)
        .bind(claim.amount)
        .bind(claim.claimed_at)
        .bind(claim.cooldown_cutoff)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            // Distinguish a missing user from a cooldown race
            Self::fetch_user(&mut tx, claim.user_id).await?;
            return Err(StoreError::Conflict(format!(
                "user {} claimed inside the cooldown window",
                claim.user_id
            )));
        }

        sqlx::query("INSERT INTO claims (user_id, amount, claimed_at) VALUES ($1, $2, $3)")
            .bind(claim.user_id)
            .bind(claim.amount)
            .bind(claim.claimed_at)
            .execute(&mut *tx)
            .await?;

        let pool_rows = sqlx::query(
            "UPDATE evol_pools SET used_pool = used_pool + $2 WHERE evol_level = $1",
        )
        .bind(claim.pool_level)
        .bind(claim.amount)
        .execute(&mut *tx)
        .await?;

        if pool_rows.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("evolution pool {}", claim.pool_level)));
        }

        let user = Self::fetch_user(&mut tx, claim.user_id).await?;
        tx.commit().await?;
        Ok(user)
    }

    async fn record_task_completion_once(
        &self,
        user_id: i64,
        task_id: i64,
        reward: i64,
        completed_at: DateTime<Utc>,
    ) -> Result<User> {
        let mut tx = self.pool.begin().await?;

        // Missing users surface as NotFound rather than a foreign key violation
        Self::fetch_user(&mut tx, user_id).await?;

        let inserted: Option<i64> = sqlx::query_scalar(
            r#"
            INSERT INTO user_tasks (user_id, task_id, completed, completed_at)
            VALUES ($1, $2, TRUE, $3)
            ON CONFLICT (user_id, task_id) DO UPDATE
                SET completed = TRUE, completed_at = EXCLUDED.completed_at
                WHERE user_tasks.completed = FALSE
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(task_id)
        .bind(completed_at)
        .fetch_optional(&mut *tx)
        .await?;

        if inserted.is_none() {
            return Err(StoreError::Conflict(format!(
                "task {} already completed by user {}",
                task_id, user_id
            )));
        }

        sqlx::query("UPDATE users SET points = points + $2 WHERE id = $1")
            .bind(user_id)
            .bind(reward)
            .execute(&mut *tx)
            .await?;

        let user = Self::fetch_user(&mut tx, user_id).await?;
        tx.commit().await?;
        Ok(user)
    }

    async fn record_referral_once(
        &self,
        referee_id: i64,
        referrer_id: i64,
        reward: i64,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // Row locks in ascending id order, matching the in-process lock order
        let mut ids = [referee_id, referrer_id];
        ids.sort_unstable();
        let locked: Vec<i64> =
            sqlx::query_scalar("SELECT id FROM users WHERE id = ANY($1) ORDER BY id FOR UPDATE")
                .bind(&ids[..])
                .fetch_all(&mut *tx)
                .await?;
        for id in ids {
            if !locked.contains(&id) {
                return Err(StoreError::NotFound(format!("user {}", id)));
            }
        }

        let referrer = Self::fetch_user(&mut tx, referrer_id).await?;

        let updated = sqlx::query(
            r#"
            UPDATE users
            SET points = points + $2, ref_applied = TRUE, referred_by = $3
            WHERE id = $1 AND ref_applied = FALSE
            "#,
        )
        .bind(referee_id)
        .bind(reward)
        .bind(&referrer.telegram_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "user {} already applied a referral",
                referee_id
            )));
        }

        sqlx::query(
            "UPDATE users SET points = points + $2, total_referrals = total_referrals + 1 WHERE id = $1",
        )
        .bind(referrer_id)
        .bind(reward)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

fn into_tasks(rows: Vec<TaskRow>) -> Result<Vec<Task>> {
    rows.into_iter()
        .map(|row| Task::try_from(row).map_err(StoreError::InvalidData))
        .collect()
}

#[async_trait]
impl EntityStore for PgStore {
    #[tracing::instrument(skip(self))]
    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    #[tracing::instrument(skip(self))]
    async fn get_user_by_telegram_id(&self, telegram_id: &str) -> Result<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE telegram_id = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(telegram_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    #[tracing::instrument(skip(self, new_user), fields(telegram_id = %new_user.telegram_id))]
    async fn get_or_create_user(&self, new_user: NewUser) -> Result<User> {
        let mut tx = self.pool.begin().await?;

        let inserted: Option<i64> = sqlx::query_scalar(
            r#"
            INSERT INTO users (telegram_id, username, email, is_admin)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (telegram_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(&new_user.telegram_id)
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(new_user.is_admin)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(id) = inserted {
            sqlx::query("UPDATE users SET referral_code = 'REF' || id WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            debug!(user_id = id, "Created user");
        }

        let query = format!("SELECT {} FROM users WHERE telegram_id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&query)
            .bind(&new_user.telegram_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(user)
    }

    async fn get_all_users(&self) -> Result<Vec<User>> {
        let query = format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&query)
            .fetch_all(&self.pool)
            .await?)
    }

    #[tracing::instrument(skip(self))]
    async fn set_wallet(&self, user_id: i64, wallet: String) -> Result<User> {
        let query = format!(
            "UPDATE users SET wallet = $2 WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&query)
            .bind(user_id)
            .bind(wallet)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("user {}", user_id)))
    }

    async fn get_task(&self, id: i64) -> Result<Option<Task>> {
        let row = sqlx::query_as::<_, TaskRow>(
            "SELECT id, name, category, reward, description, link, is_active FROM tasks WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| Task::try_from(r).map_err(StoreError::InvalidData))
            .transpose()
    }

    async fn list_tasks(&self, category: Option<TaskCategory>) -> Result<Vec<Task>> {
        let rows = sqlx::query_as::<_, TaskRow>(
            r#"
            SELECT id, name, category, reward, description, link, is_active
            FROM tasks
            WHERE is_active = TRUE AND ($1::TEXT IS NULL OR category = $1)
            ORDER BY id
            "#,
        )
        .bind(category.map(|c| c.as_str()))
        .fetch_all(&self.pool)
        .await?;

        into_tasks(rows)
    }

    async fn create_task(&self, new_task: NewTask) -> Result<Task> {
        let row = sqlx::query_as::<_, TaskRow>(
            r#"
            INSERT INTO tasks (name, category, reward, description, link, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, category, reward, description, link, is_active
            "#,
        )
        .bind(&new_task.name)
        .bind(new_task.category.as_str())
        .bind(new_task.reward)
        .bind(&new_task.description)
        .bind(&new_task.link)
        .bind(new_task.is_active)
        .fetch_one(&self.pool)
        .await?;

        Task::try_from(row).map_err(StoreError::InvalidData)
    }

    async fn get_user_tasks(&self, user_id: i64) -> Result<Vec<TaskWithCompletion>> {
        let rows = sqlx::query_as::<_, TaskCompletionRow>(
            r#"
            SELECT
                t.id, t.name, t.category, t.reward, t.description, t.link, t.is_active,
                ut.completed, ut.completed_at
            FROM tasks t
            LEFT JOIN user_tasks ut ON ut.task_id = t.id AND ut.user_id = $1
            WHERE t.is_active = TRUE
            ORDER BY t.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| TaskWithCompletion::try_from(row).map_err(StoreError::InvalidData))
            .collect()
    }

    async fn get_user_claims(&self, user_id: i64) -> Result<Vec<Claim>> {
        Ok(sqlx::query_as::<_, Claim>(
            "SELECT id, user_id, amount, claimed_at FROM claims WHERE user_id = $1 ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn get_evolution_pools(&self) -> Result<Vec<EvolutionPool>> {
        Ok(sqlx::query_as::<_, EvolutionPool>(
            "SELECT id, evol_level, total_pool, used_pool, reset_at FROM evol_pools ORDER BY evol_level",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    #[tracing::instrument(skip(self, claim), fields(user_id = claim.user_id, pool_level = claim.pool_level))]
    async fn record_claim(&self, claim: ClaimWrite) -> Result<User> {
        let claim = &claim;
        with_retry(WRITE_RETRIES, move || self.record_claim_once(claim)).await
    }

    #[tracing::instrument(skip(self))]
    async fn record_task_completion(
        &self,
        user_id: i64,
        task_id: i64,
        reward: i64,
        completed_at: DateTime<Utc>,
    ) -> Result<User> {
        with_retry(WRITE_RETRIES, move || {
            self.record_task_completion_once(user_id, task_id, reward, completed_at)
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn record_referral(&self, referee_id: i64, referrer_id: i64, reward: i64) -> Result<()> {
        with_retry(WRITE_RETRIES, move || {
            self.record_referral_once(referee_id, referrer_id, reward)
        })
        .await
    }

    async fn seed(&self, seed: &SeedData) -> Result<()> {
        seed.validate()?;
        let mut tx = self.pool.begin().await?;

        for pool in &seed.pools {
            sqlx::query(
                r#"
                INSERT INTO evol_pools (evol_level, total_pool, used_pool)
                VALUES ($1, $2, 0)
                ON CONFLICT (evol_level) DO NOTHING
                "#,
            )
            .bind(pool.evol_level)
            .bind(pool.total_pool)
            .execute(&mut *tx)
            .await?;
        }

        let existing_tasks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks")
            .fetch_one(&mut *tx)
            .await?;

        if existing_tasks == 0 {
            for task in &seed.tasks {
                sqlx::query(
                    r#"
                    INSERT INTO tasks (name, category, reward, description, link, is_active)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    "#,
                )
                .bind(&task.name)
                .bind(task.category.as_str())
                .bind(task.reward)
                .bind(&task.description)
                .bind(&task.link)
                .bind(task.is_active)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        info!(
            pools = seed.pools.len(),
            tasks_installed = existing_tasks == 0,
            "Postgres store seeded"
        );
        Ok(())
    }
}
