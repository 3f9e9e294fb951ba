//! Tracing setup for the engine binaries.

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// Honors `RUST_LOG` when set; otherwise the `prism` crates log at debug
/// and everything else at info. Calling this a second time is a no-op.
///
/// # Example
/// ```
/// prism_core::init_logging();
/// tracing::info!("Engine initialized");
/// ```
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,prism=debug"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .try_init();
}
