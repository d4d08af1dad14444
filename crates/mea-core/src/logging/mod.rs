//! Structured logging with `tracing`.
//!
//! Every crate emits `tracing` events with structured fields (`state`,
//! `request_id`, `status`, ...). The binary installs a compact stderr
//! subscriber through [`init_subscriber`]; tests use [`capture_logs`] to
//! assert on emitted events without a global subscriber.

pub mod test_utils;

pub use test_utils::{CapturedEvent, CapturedLogs, capture_logs};

/// Initialize the global tracing subscriber with stderr output.
///
/// `RUST_LOG` takes precedence over `level` when set. Subsequent calls are
/// no-ops.
pub fn init_subscriber(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    // already-installed subscriber wins
    let _ = subscriber.try_init();
}
