//! Logging initialization
//!
//! The engine logs through the `log` facade everywhere; binaries pick the
//! backend. `init_logger` wires up `pretty_env_logger` for console output,
//! honouring `RUST_LOG`.

/// Initialize the console logger
///
/// Safe to call once per process; a second call is a no-op with a warning
/// instead of a panic so tests and embedders can both invoke it.
pub fn init_logger() {
    if let Err(e) = pretty_env_logger::try_init() {
        log::warn!("Logger already initialized: {}", e);
    }
}
