//! Telemetry setup for docforge
//!
//! Structured logging via `tracing`; filtering comes from `RUST_LOG`.

use std::sync::OnceLock;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize the tracing subscriber.
///
/// Safe to call more than once; only the first call installs the
/// subscriber (later calls in tests are no-ops).
pub fn init_telemetry() {
    INITIALIZED.get_or_init(|| {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_thread_ids(false)
                    .with_line_number(true),
            )
            .with(tracing_subscriber::EnvFilter::from_default_env())
            .init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_telemetry();
        init_telemetry();
    }
}
