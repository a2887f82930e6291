use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Scratch bag handlers use for conversation-scoped data.
///
/// Persisted alongside `state` after every successfully dispatched update.
pub type StoreBag = Map<String, Value>;

/// Shared singleton configuration common to all bot instances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotTemplate {
    /// Open configuration payload
    pub data: Value,
    pub update_dt: DateTime<Utc>,
    pub create_dt: DateTime<Utc>,
}

/// One tenant's bot configuration in multi-tenant mode.
///
/// Re-loaded on every update — the token may be rotated between events, so
/// this record must never be cached by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotInstance {
    pub id: i64,
    /// Telegram bot API token
    pub token: String,
    /// Open configuration payload
    pub data: Value,
    pub update_dt: DateTime<Utc>,
    pub create_dt: DateTime<Utc>,
}

/// A persisted bot user: identity, profile, and conversation state.
///
/// Created lazily on the first update from a new (scope, chat, user) triple;
/// mutated by the engine after every dispatched update; never deleted by the
/// core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotUser {
    pub id: i64,
    /// Owning instance in multi-tenant mode, `None` for single-tenant bots
    pub instance_id: Option<i64>,
    /// Telegram chat ID
    pub chat_id: i64,
    /// Telegram user ID
    pub user_id: u64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    /// Current conversation node name; empty string means "no prior state"
    pub state: String,
    /// Handler-scoped scratch data
    pub store: StoreBag,
    /// Blocked users have their updates dropped without dispatch
    pub blocked: bool,
    pub update_dt: DateTime<Utc>,
    pub create_dt: DateTime<Utc>,
}

impl BotUser {
    /// Build a fresh record for a first-seen identity from the update's
    /// profile fields. `id` is assigned by the store on insert.
    pub fn new(key: &UserKey, from: &teloxide::types::User) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            instance_id: key.instance_id,
            chat_id: key.chat_id,
            user_id: key.user_id,
            first_name: from.first_name.clone(),
            last_name: from.last_name.clone(),
            username: from.username.clone(),
            state: String::new(),
            store: StoreBag::new(),
            blocked: false,
            update_dt: now,
            create_dt: now,
        }
    }
}

/// Identity triple a user record is keyed by.
///
/// Unique per instance scope; `instance_id` is `None` for single-tenant bots.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserKey {
    pub instance_id: Option<i64>,
    pub chat_id: i64,
    pub user_id: u64,
}

/// Partial update written back after a dispatched update.
#[derive(Debug, Clone)]
pub struct UserPatch {
    pub state: String,
    pub store: StoreBag,
    pub update_dt: DateTime<Utc>,
}
