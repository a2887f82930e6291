//! Core utilities, configuration, and error types

pub mod config;
pub mod error;
pub mod logging;

// Re-exports for convenience
pub use error::{EngineError, EngineResult};
pub use logging::init_logger;
