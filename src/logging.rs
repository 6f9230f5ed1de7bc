//! Diagnostic progress output
//!
//! Worker progress, lock events, retries and per-phase summaries go through
//! `tracing` to stderr. The CSV reports on stdout and in `--balances` files are
//! separate and unaffected by the filter.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber
///
/// Reads `RUST_LOG`. Defaults to `info`, or `warn` when `quiet` is set.
/// Output: stderr, compact format, with thread names so each line shows which
/// worker produced it.
///
/// ```bash
/// RUST_LOG=bank_lock_sim=trace cargo run -- --phase deadlock
/// ```
pub fn init(quiet: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_thread_names(true)
                .compact(),
        )
        .init();
}
