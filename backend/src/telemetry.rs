//! Tracing subscriber setup for binaries.

use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

/// Install the global `fmt` subscriber, filtered by `RUST_LOG`.
///
/// A subscriber that is already installed is left in place and the failure
/// is logged through it.
pub fn init_tracing(json: bool) {
    let builder = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr);
    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = result {
        warn!(error = %e, "tracing init failed");
    }
}
