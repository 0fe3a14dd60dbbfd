//! Tracing subscriber initialization.
//!
//! Configured from the `[observability]` section. `RUST_LOG` takes precedence
//! over the configured filter.

use crate::config::ObservabilityConfig;
use crate::error::{AppError, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// Must be called once, before any tracing macros are used. Supported formats
/// are `"json"` (one JSON object per line) and `"pretty"`.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    match config.log_format.as_str() {
        "json" => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|e| {
                AppError::Configuration(format!("failed to initialize JSON tracing: {}", e))
            }),
        "pretty" => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|e| {
                AppError::Configuration(format!("failed to initialize tracing: {}", e))
            }),
        other => Err(AppError::Configuration(format!(
            "unknown log format '{}', expected 'json' or 'pretty'",
            other
        ))),
    }
}
