use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockTable = Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>;

/// In-process keyed async mutex, one lock per user id
///
/// An entry lives while some guard holds or awaits it and is dropped with the last guard.
#[derive(Debug, Default)]
pub struct UserLocks {
    locks: Arc<LockTable>,
}

/// Held lock(s) for one ledger operation; released on drop
#[derive(Debug)]
pub struct UserGuard {
    guards: Vec<OwnedMutexGuard<()>>,
    user_ids: Vec<i64>,
    table: Arc<LockTable>,
}

fn lock_table(table: &LockTable) -> MutexGuard<'_, HashMap<i64, Arc<AsyncMutex<()>>>> {
    match table.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl Drop for UserGuard {
    fn drop(&mut self) {
        self.guards.clear();
        let mut locks = lock_table(&self.table);
        for user_id in &self.user_ids {
            // Only the table itself still references an idle entry
            if locks.get(user_id).is_some_and(|entry| Arc::strong_count(entry) == 1) {
                locks.remove(user_id);
            }
        }
    }
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, user_id: i64) -> Arc<AsyncMutex<()>> {
        lock_table(&self.locks).entry(user_id).or_default().clone()
    }

    fn guard(&self, guards: Vec<OwnedMutexGuard<()>>, user_ids: Vec<i64>) -> UserGuard {
        UserGuard {
            guards,
            user_ids,
            table: self.locks.clone(),
        }
    }

    pub async fn lock(&self, user_id: i64) -> UserGuard {
        let guard = self.entry(user_id).lock_owned().await;
        self.guard(vec![guard], vec![user_id])
    }

    /// Lock two users in ascending id order
    pub async fn lock_pair(&self, a: i64, b: i64) -> UserGuard {
        if a == b {
            return self.lock(a).await;
        }
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        let first_guard = self.entry(first).lock_owned().await;
        let second_guard = self.entry(second).lock_owned().await;
        self.guard(vec![first_guard, second_guard], vec![first, second])
    }

    /// Number of user ids currently tracked
    pub fn tracked(&self) -> usize {
        lock_table(&self.locks).len()
    }
}
