//! Logging setup
//!
//! `RUST_LOG`, when set, wins over the configured filter.

use crate::config::LoggingConfig;
use crate::utils::error::{CacheError, Result};
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| CacheError::Config(format!("Invalid log filter: {}", e)))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false);

    let installed = if config.json {
        builder.json().with_current_span(false).try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| CacheError::internal(format!("Logging already initialized: {}", e)))
}
