//! Error types for the cache manager

use thiserror::Error;

/// Result type alias for the cache manager
pub type Result<T> = std::result::Result<T, CacheError>;

/// Main error type for the cache manager
#[derive(Error, Debug)]
pub enum CacheError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Redis errors
    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Remote tier could not be reached
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    /// Remote tier round-trip exceeded its deadline
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored bytes are not a valid cache envelope
    #[error("Decode error for key '{key}': {message}")]
    Decode { key: String, message: String },

    /// Compression or decompression failures
    #[error("Compression error: {0}")]
    Compression(String),

    /// Invalid glob or regular expression
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors returned by a caller-supplied loader
    #[error("Loader error: {0}")]
    Loader(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}
