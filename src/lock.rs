//! Opt-in per-identity serialization
//!
//! The reference dispatch behavior holds no lock across the read-user →
//! dispatch → write-user sequence, so two concurrent updates from the same
//! user race and the later write clobbers the earlier one. Engines created
//! with `with_user_locks()` acquire a keyed mutex around the whole sequence
//! instead, serializing updates per identity while leaving different users
//! fully concurrent.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::storage::UserKey;

#[derive(Default)]
pub struct UserLocks {
    inner: DashMap<UserKey, Arc<Mutex<()>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lock for `key`, waiting behind any in-flight update for the
    /// same identity. The map entry lives for the process lifetime; the
    /// per-user footprint is one Arc'd mutex.
    pub async fn acquire(&self, key: &UserKey) -> OwnedMutexGuard<()> {
        let lock = self
            .inner
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }
}
