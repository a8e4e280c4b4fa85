//! Tracing subscriber setup.

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Failure installing the global subscriber.
#[derive(Debug, Error)]
#[error("failed to initialise tracing: {0}")]
pub struct TelemetryError(String);

/// Installs a formatting subscriber filtered by `RUST_LOG`.
///
/// `fallback` is used as the filter directive when `RUST_LOG` is unset or
/// invalid.
///
/// # Errors
///
/// Returns [`TelemetryError`] when a global subscriber is already installed.
pub fn init_tracing(fallback: &str) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|err| TelemetryError(err.to_string()))
}
