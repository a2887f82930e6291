//! In-memory store
//!
//! DashMap-backed implementation of the persistence contract, for tests and
//! local development. Same observable behavior as the SQLite store, including
//! identity uniqueness on insert.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use super::records::{BotInstance, BotTemplate, BotUser, UserKey, UserPatch};
use super::store::{InstanceStore, StoreError, StoreResult, TemplateStore, UserStore};

#[derive(Default)]
pub struct MemoryStore {
    template: Mutex<Option<BotTemplate>>,
    instances: DashMap<i64, BotInstance>,
    users: DashMap<i64, BotUser>,
    next_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_template(&self, template: BotTemplate) {
        *self.template.lock().unwrap_or_else(|e| e.into_inner()) = Some(template);
    }

    pub fn add_instance(&self, instance: BotInstance) {
        self.instances.insert(instance.id, instance);
    }

    /// Direct record access for assertions and fixtures.
    pub fn get_user(&self, id: i64) -> Option<BotUser> {
        self.users.get(&id).map(|u| u.clone())
    }

    /// Synchronous identity lookup for assertions and fixtures.
    pub fn find_by_key_sync(&self, key: &UserKey) -> Option<BotUser> {
        self.users
            .iter()
            .find(|entry| Self::key_of(entry.value()) == *key)
            .map(|entry| entry.value().clone())
    }

    pub fn put_user(&self, user: BotUser) {
        self.users.insert(user.id, user);
    }

    fn key_of(user: &BotUser) -> UserKey {
        UserKey {
            instance_id: user.instance_id,
            chat_id: user.chat_id,
            user_id: user.user_id,
        }
    }

}

#[async_trait]
impl TemplateStore for MemoryStore {
    async fn find_singleton(&self) -> StoreResult<Option<BotTemplate>> {
        Ok(self.template.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }
}

#[async_trait]
impl InstanceStore for MemoryStore {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<BotInstance>> {
        Ok(self.instances.get(&id).map(|i| i.clone()))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_key(&self, key: &UserKey) -> StoreResult<Option<BotUser>> {
        Ok(self.find_by_key_sync(key))
    }

    async fn insert(&self, user: BotUser) -> StoreResult<BotUser> {
        let key = Self::key_of(&user);
        if self.find_by_key(&key).await?.is_some() {
            return Err(StoreError::Conflict);
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let user = BotUser { id, ..user };
        self.users.insert(id, user.clone());
        Ok(user)
    }

    async fn update(&self, id: i64, patch: UserPatch) -> StoreResult<()> {
        if let Some(mut user) = self.users.get_mut(&id) {
            user.state = patch.state;
            user.store = patch.store;
            user.update_dt = patch.update_dt;
        }
        Ok(())
    }
}
