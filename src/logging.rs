//! Logging configuration for scopeq.
//!
//! Logs go to stderr so query output on stdout stays clean. The level comes
//! from RUST_LOG, defaulting to `info`.

use tracing_subscriber::EnvFilter;

/// Initializes stderr logging for the CLI.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
