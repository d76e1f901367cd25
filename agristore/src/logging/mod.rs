//! Structured logging for agristore
//!
//! This module sets up tracing-based logging with configurable levels and outputs.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging system
///
/// This sets up tracing with:
/// - Environment-based filtering via RUST_LOG env var
/// - Default level of INFO in release builds, DEBUG in debug builds
/// - Console output with target, file and line information
///
/// Statements rendered by the query executor are logged at TRACE, so
/// `RUST_LOG=agristore=trace` shows every SQL string sent to SQLite.
///
/// # Example
/// ```ignore
/// use agristore::logging;
/// logging::init();
/// tracing::info!("store opened");
/// ```
pub fn init() {
    let default_level = if cfg!(debug_assertions) {
        "agristore=debug,info"
    } else {
        "agristore=info,warn"
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .init();
}

/// Initialize logging for tests
///
/// Uses try_init() so repeated calls from different tests are harmless.
#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::new("agristore=trace"))
        .with(fmt::layer().with_test_writer())
        .try_init();
}

/// Macro for creating a span around a store operation
///
/// Entered by the bulk update and delete helpers so the statement they log
/// carries the table it touched.
#[macro_export]
macro_rules! operation_span {
    ($name:expr) => {
        tracing::info_span!($name)
    };
    ($name:expr, $($field:tt)*) => {
        tracing::info_span!($name, $($field)*)
    };
}

pub use tracing::{debug, error, info, trace, warn};
