//! Shared error-message shape and logging setup.

use tracing_subscriber::{EnvFilter, fmt};

/// Prefix user-facing error messages so they read the same everywhere.
pub fn error_message(msg: impl AsRef<str>) -> String {
    format!("datalog-profiler: {}", msg.as_ref())
}

/// Install the stderr log subscriber. `RUST_LOG` overrides the default level.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
