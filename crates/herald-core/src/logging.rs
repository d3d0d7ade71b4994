//! Tracing subscriber initialization.
//!
//! The embedding process calls [`init_logging`] once at startup; `RUST_LOG`
//! overrides the default filter when set.

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `default_filter` is used when `RUST_LOG` is not set (e.g. `"info"` or
/// `"herald_notify=debug,info"`). Safe to call more than once; later calls
/// are no-ops.
pub fn init_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
