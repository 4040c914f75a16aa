//! Configuration management for the cache manager
//!
//! This module handles loading, validation, and merging of the cache,
//! Remote Tier and logging configuration.

pub mod models;
pub mod validation;

pub use models::*;
pub use validation::Validate;

use crate::utils::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// Prefix shared by every environment variable the loader reads
pub const ENV_PREFIX: &str = "TIERED_CACHE_";

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Cache behaviour
    #[serde(default)]
    pub cache: CacheConfig,
    /// Remote Tier connection
    #[serde(default)]
    pub redis: RedisConfig,
    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {:?}", path);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CacheError::Config(format!("Failed to read config file: {}", e)))?;

        let config = Self::from_yaml(&content)?;

        debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Parse and validate configuration from a YAML document
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| CacheError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables
    ///
    /// Unset variables keep their defaults. The policy table and the
    /// invalidation rules can only be configured from a file.
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        let mut config = Self::default();

        if let Some(url) = env_var::<String>("REDIS_URL")? {
            config.redis.url = url;
        }
        if let Some(enabled) = env_var("REDIS_ENABLED")? {
            config.redis.enabled = enabled;
        }
        if let Some(timeout) = env_var("REDIS_CONNECTION_TIMEOUT")? {
            config.redis.connection_timeout = timeout;
        }
        if let Some(prefix) = env_var::<String>("KEY_PREFIX")? {
            config.cache.key_prefix = prefix;
        }
        if let Some(ttl) = env_var("DEFAULT_TTL")? {
            config.cache.default_ttl = ttl;
        }
        if let Some(enabled) = env_var("COMPRESSION_ENABLED")? {
            config.cache.compression.enabled = enabled;
        }
        if let Some(threshold) = env_var("COMPRESSION_THRESHOLD")? {
            config.cache.compression.threshold_bytes = threshold;
        }
        if let Some(max_entries) = env_var("LOCAL_MAX_ENTRIES")? {
            config.cache.local.max_entries = max_entries;
        }
        if let Some(enabled) = env_var("INVALIDATION_ENABLED")? {
            config.cache.invalidation.enabled = enabled;
        }
        if let Some(timeout) = env_var("OPERATION_TIMEOUT_MS")? {
            config.cache.operation_timeout_ms = timeout;
        }
        if let Some(level) = env_var::<String>("LOG_LEVEL")? {
            config.logging.level = level;
        }
        if let Some(json) = env_var("LOG_JSON")? {
            config.logging.json = json;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        debug!("Validating configuration");

        self.cache
            .validate()
            .map_err(|e| CacheError::Config(format!("Cache config error: {}", e)))?;

        self.redis
            .validate()
            .map_err(|e| CacheError::Config(format!("Redis config error: {}", e)))?;

        self.logging
            .validate()
            .map_err(|e| CacheError::Config(format!("Logging config error: {}", e)))?;

        debug!("Configuration validation completed");
        Ok(())
    }

    /// Merge with another configuration (other takes precedence)
    pub fn merge(mut self, other: Self) -> Self {
        self.cache = self.cache.merge(other.cache);
        self.redis = self.redis.merge(other.redis);
        self.logging = self.logging.merge(other.logging);
        self
    }

    /// Convert to YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| CacheError::Config(format!("Failed to serialize config to YAML: {}", e)))
    }
}

/// Read and parse `TIERED_CACHE_<name>`
fn env_var<T: FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    let key = format!("{}{}", ENV_PREFIX, name);
    match std::env::var(&key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| CacheError::Config(format!("Invalid value for {}: {}", key, e))),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(CacheError::Config(format!("Failed to read {}: {}", key, e))),
    }
}
