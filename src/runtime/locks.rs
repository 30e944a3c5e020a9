//! Per-user exchange serialization

use crate::store::UserId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async mutex per user. Holding the guard keeps other exchanges of the
/// same user waiting; different users never contend.
#[derive(Debug, Default)]
pub struct UserLocks {
    locks: Mutex<HashMap<UserId, Arc<AsyncMutex<()>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for and take the user's lock
    pub async fn acquire(&self, user_id: UserId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Entries nobody holds or waits on are only referenced by the map
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(user_id).or_default())
        };
        lock.lock_owned().await
    }

    /// Users with a held or awaited lock
    #[cfg(test)]
    pub fn active(&self) -> usize {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.len()
    }
}
