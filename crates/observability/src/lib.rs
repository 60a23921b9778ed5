//! Process-wide tracing setup for the ledger engine.

/// Initialize process-wide logging with the defaults from [`tracing::LogConfig`].
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(&tracing::LogConfig::from_env());
}

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use self::tracing::{LogConfig, LogFormat};
