//! Persistence contract and reference backends

pub mod memory;
pub mod records;
pub mod sqlite;
pub mod store;

// Re-exports for convenience
pub use memory::MemoryStore;
pub use records::{BotInstance, BotTemplate, BotUser, StoreBag, UserKey, UserPatch};
pub use sqlite::{create_pool, DbConnection, DbPool, SqliteStore};
pub use store::{InstanceStore, StoreError, StoreResult, TemplateStore, UserStore};
