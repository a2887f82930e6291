//! Trellis — stateful Telegram bot engine
//!
//! Binds every inbound update to the sending user's persisted conversation
//! state, routes it through a tree of state-named handlers, and persists the
//! resulting state back.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging
//! - `tree`: the routing state machine (nodes + routers)
//! - `context`: per-update dispatch context
//! - `engine` / `single`: multi-tenant and single-tenant session orchestrators
//! - `webhook`: axum webhook update sources
//! - `storage`: persistence contract, SQLite and in-memory backends
//! - `lock`: opt-in per-identity update serialization

pub mod context;
pub mod core;
pub mod engine;
pub mod lock;
mod session;
pub mod single;
pub mod storage;
pub mod tree;
pub mod webhook;

// Re-export commonly used types for convenience
pub use crate::core::{config, EngineError, EngineResult};
pub use context::Context;
pub use engine::BotEngine;
pub use single::SingleBotEngine;
pub use storage::{
    BotInstance, BotTemplate, BotUser, MemoryStore, SqliteStore, StoreBag, UserKey, UserPatch,
};
pub use tree::{EngineTree, HandlerResult, RouterVerdict, ERROR_NODE, START_NODE};
