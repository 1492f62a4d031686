use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::debug;

use crate::db::errors::{Result, StoreError};
use crate::db::seed::SeedData;
use crate::db::store::EntityStore;
use crate::models::{
    Claim, ClaimWrite, EvolutionPool, NewTask, NewUser, Task, TaskCategory, TaskWithCompletion,
    User, UserTask,
};

#[derive(Debug)]
struct MemoryState {
    users: BTreeMap<i64, User>,
    tasks: BTreeMap<i64, Task>,
    user_tasks: HashMap<(i64, i64), UserTask>,
    claims: Vec<Claim>,
    pools: BTreeMap<i32, EvolutionPool>,
    next_user_id: i64,
    next_task_id: i64,
    next_user_task_id: i64,
    next_claim_id: i64,
    next_pool_id: i64,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self {
            users: BTreeMap::new(),
            tasks: BTreeMap::new(),
            user_tasks: HashMap::new(),
            claims: Vec::new(),
            pools: BTreeMap::new(),
            next_user_id: 1,
            next_task_id: 1,
            next_user_task_id: 1,
            next_claim_id: 1,
            next_pool_id: 1,
        }
    }
}

impl MemoryState {
    fn user_mut(&mut self, id: i64) -> Result<&mut User> {
        self.users
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", id)))
    }

    fn insert_task(&mut self, new_task: NewTask) -> Task {
        let task = Task {
            id: self.next_task_id,
            name: new_task.name,
            category: new_task.category,
            reward: new_task.reward,
            description: new_task.description,
            link: new_task.link,
            is_active: new_task.is_active,
        };
        self.next_task_id += 1;
        self.tasks.insert(task.id, task.clone());
        task
    }
}

/// Process-local store
///
/// A single `RwLock` guards every map, so each write is applied as a whole and readers only ever
/// see complete records.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_telegram_id(&self, telegram_id: &str) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|u| u.telegram_id == telegram_id)
            .cloned())
    }

    async fn get_or_create_user(&self, new_user: NewUser) -> Result<User> {
        let mut state = self.state.write().await;

        if let Some(existing) = state
            .users
            .values()
            .find(|u| u.telegram_id == new_user.telegram_id)
        {
            return Ok(existing.clone());
        }

        let id = state.next_user_id;
        state.next_user_id += 1;

        let user = User {
            id,
            telegram_id: new_user.telegram_id,
            username: new_user.username,
            email: new_user.email,
            points: 0,
            last_claim: None,
            wallet: None,
            referral_code: User::referral_code_for(id),
            referred_by: None,
            total_referrals: 0,
            ref_applied: false,
            is_admin: new_user.is_admin,
            created_at: Utc::now(),
        };
        state.users.insert(id, user.clone());

        debug!(user_id = id, "Created user");
        Ok(user)
    }

    async fn get_all_users(&self) -> Result<Vec<User>> {
        Ok(self.state.read().await.users.values().cloned().collect())
    }

    async fn set_wallet(&self, user_id: i64, wallet: String) -> Result<User> {
        let mut state = self.state.write().await;
        let user = state.user_mut(user_id)?;
        user.wallet = Some(wallet);
        Ok(user.clone())
    }

    async fn get_task(&self, id: i64) -> Result<Option<Task>> {
        Ok(self.state.read().await.tasks.get(&id).cloned())
    }

    async fn list_tasks(&self, category: Option<TaskCategory>) -> Result<Vec<Task>> {
        let state = self.state.read().await;
        Ok(state
            .tasks
            .values()
            .filter(|t| t.is_active)
            .filter(|t| category.map_or(true, |c| t.category == c))
            .cloned()
            .collect())
    }

    async fn create_task(&self, new_task: NewTask) -> Result<Task> {
        Ok(self.state.write().await.insert_task(new_task))
    }

    async fn get_user_tasks(&self, user_id: i64) -> Result<Vec<TaskWithCompletion>> {
        let state = self.state.read().await;
        Ok(state
            .tasks
            .values()
            .filter(|t| t.is_active)
            .map(|task| {
                let record = state.user_tasks.get(&(user_id, task.id));
                TaskWithCompletion {
                    task: task.clone(),
                    completed: record.map_or(false, |r| r.completed),
                    completed_at: record.and_then(|r| r.completed_at),
                }
            })
            .collect())
    }

    async fn get_user_claims(&self, user_id: i64) -> Result<Vec<Claim>> {
        let state = self.state.read().await;
        Ok(state
            .claims
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_evolution_pools(&self) -> Result<Vec<EvolutionPool>> {
        Ok(self.state.read().await.pools.values().cloned().collect())
    }

    async fn record_claim(&self, claim: ClaimWrite) -> Result<User> {
        let mut state = self.state.write().await;

        // Validate everything before the first mutation
        let user = state
            .users
            .get(&claim.user_id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", claim.user_id)))?;
        if user.last_claim.is_some_and(|last| last > claim.cooldown_cutoff) {
            return Err(StoreError::Conflict(format!(
                "user {} claimed inside the cooldown window",
                claim.user_id
            )));
        }
        if !state.pools.contains_key(&claim.pool_level) {
            return Err(StoreError::NotFound(format!("evolution pool {}", claim.pool_level)));
        }

        let claim_id = state.next_claim_id;
        state.next_claim_id += 1;
        state.claims.push(Claim {
            id: claim_id,
            user_id: claim.user_id,
            amount: claim.amount,
            claimed_at: claim.claimed_at,
        });

        if let Some(pool) = state.pools.get_mut(&claim.pool_level) {
            pool.used_pool += claim.amount;
        }

        let user = state.user_mut(claim.user_id)?;
        user.points += claim.amount;
        user.last_claim = Some(claim.claimed_at);
        Ok(user.clone())
    }

    async fn record_task_completion(
        &self,
        user_id: i64,
        task_id: i64,
        reward: i64,
        completed_at: DateTime<Utc>,
    ) -> Result<User> {
        let mut state = self.state.write().await;

        if !state.users.contains_key(&user_id) {
            return Err(StoreError::NotFound(format!("user {}", user_id)));
        }
        if !state.tasks.contains_key(&task_id) {
            return Err(StoreError::NotFound(format!("task {}", task_id)));
        }
        if state
            .user_tasks
            .get(&(user_id, task_id))
            .is_some_and(|r| r.completed)
        {
            return Err(StoreError::Conflict(format!(
                "task {} already completed by user {}",
                task_id, user_id
            )));
        }

        let record_id = state.next_user_task_id;
        state.next_user_task_id += 1;
        state.user_tasks.insert(
            (user_id, task_id),
            UserTask {
                id: record_id,
                user_id,
                task_id,
                completed: true,
                completed_at: Some(completed_at),
            },
        );

        let user = state.user_mut(user_id)?;
        user.points += reward;
        Ok(user.clone())
    }

    async fn record_referral(&self, referee_id: i64, referrer_id: i64, reward: i64) -> Result<()> {
        let mut state = self.state.write().await;

        let referee = state
            .users
            .get(&referee_id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", referee_id)))?;
        if referee.ref_applied {
            return Err(StoreError::Conflict(format!(
                "user {} already applied a referral",
                referee_id
            )));
        }
        let referrer_telegram_id = state
            .users
            .get(&referrer_id)
            .map(|u| u.telegram_id.clone())
            .ok_or_else(|| StoreError::NotFound(format!("user {}", referrer_id)))?;

        let referee = state.user_mut(referee_id)?;
        referee.points += reward;
        referee.ref_applied = true;
        referee.referred_by = Some(referrer_telegram_id);

        let referrer = state.user_mut(referrer_id)?;
        referrer.points += reward;
        referrer.total_referrals += 1;
        Ok(())
    }

    async fn seed(&self, seed: &SeedData) -> Result<()> {
        seed.validate()?;
        let mut state = self.state.write().await;

        for pool in &seed.pools {
            if state.pools.contains_key(&pool.evol_level) {
                continue;
            }
            let id = state.next_pool_id;
            state.next_pool_id += 1;
            state.pools.insert(
                pool.evol_level,
                EvolutionPool {
                    id,
                    evol_level: pool.evol_level,
                    total_pool: pool.total_pool,
                    used_pool: 0,
                    reset_at: None,
                },
            );
        }

        // The catalog is only installed into an empty store
        if state.tasks.is_empty() {
            for task in &seed.tasks {
                state.insert_task(task.clone());
            }
        }

        debug!(
            pools = state.pools.len(),
            tasks = state.tasks.len(),
            "Memory store seeded"
        );
        Ok(())
    }
}
