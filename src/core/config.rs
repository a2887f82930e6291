use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Configuration constants for the engine

/// SQLite database path
/// Read once at startup from TRELLIS_DB environment variable or defaults to "trellis.sqlite"
pub static DATABASE_PATH: Lazy<String> =
    Lazy::new(|| env::var("TRELLIS_DB").unwrap_or_else(|_| "trellis.sqlite".to_string()));

/// Port for the webhook server
/// Read from WEBHOOK_PORT environment variable, defaults to 8080
pub static WEBHOOK_PORT: Lazy<u16> = Lazy::new(|| {
    env::var("WEBHOOK_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8080)
});

/// Polling configuration (development mode only)
pub mod polling {
    use super::Duration;

    /// Sleep between empty poll batches (in milliseconds)
    pub const IDLE_INTERVAL_MS: u64 = 200;

    /// Long-poll read timeout passed to getUpdates (in seconds)
    pub const READ_TIMEOUT_SECS: u32 = 999;

    /// Idle sleep duration
    pub fn idle_interval() -> Duration {
        Duration::from_millis(IDLE_INTERVAL_MS)
    }
}
