use async_trait::async_trait;
use thiserror::Error;

use super::records::{BotInstance, BotTemplate, BotUser, UserKey, UserPatch};

/// Persistence-layer error types
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database errors
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Database connection pool errors
    #[error("database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// JSON (de)serialization of store/data columns
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed timestamp column
    #[error("timestamp parse error: {0}")]
    Timestamp(#[from] chrono::ParseError),

    /// Insert with an identity triple that already exists
    #[error("user identity already exists")]
    Conflict,
}

/// Type alias for Result with StoreError
pub type StoreResult<T> = Result<T, StoreError>;

/// Lookup for the shared singleton template record.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn find_singleton(&self) -> StoreResult<Option<BotTemplate>>;
}

/// Point lookup of bot instances by id.
#[async_trait]
pub trait InstanceStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<BotInstance>>;
}

/// The canonical user persistence contract consumed by the engine:
/// point lookup by identity, insert, partial update.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user by its (scope, chat, user) identity triple.
    async fn find_by_key(&self, key: &UserKey) -> StoreResult<Option<BotUser>>;

    /// Insert a new record, returning it with the assigned `id`.
    async fn insert(&self, user: BotUser) -> StoreResult<BotUser>;

    /// Apply a partial update to the record with the given `id`.
    async fn update(&self, id: i64, patch: UserPatch) -> StoreResult<()>;
}
