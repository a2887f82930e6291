use thiserror::Error;

use crate::storage::StoreError;

/// Centralized error types for the engine
///
/// Everything the core can fail with is converted to this enum for consistent
/// handling at the update-source boundary. Uses `thiserror` for conversion and
/// display formatting.
///
/// Application errors raised inside nodes and routers are carried opaquely in
/// the `Handler` variant — the core never interprets them.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The shared template record is missing at engine construction
    #[error("bot template not found")]
    TemplateNotFound,

    /// The per-event instance record is missing
    #[error("bot instance {0} not found")]
    InstanceNotFound(i64),

    /// A write-once Context field was assigned a second time
    #[error("context field `{0}` is already set")]
    AlreadySet(&'static str),

    /// No node registered for the current state and no `handle_error` fallback
    #[error("no node registered for state `{state}` and no `handle_error` node to fall back to")]
    DispatchUnresolved { state: String },

    /// Persistence errors
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Telegram API errors
    #[error("telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// Opaque application error raised by a node or router
    #[error("handler error: {0}")]
    Handler(#[from] anyhow::Error),
}

/// Type alias for Result with EngineError
pub type EngineResult<T> = Result<T, EngineError>;
