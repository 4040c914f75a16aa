//! Helper functions for creating and classifying errors

use super::types::CacheError;

impl CacheError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    pub fn unavailable<S: Into<String>>(message: S) -> Self {
        Self::Unavailable(message.into())
    }

    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::Timeout(message.into())
    }

    pub fn decode<K: Into<String>, S: Into<String>>(key: K, message: S) -> Self {
        Self::Decode {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn compression<S: Into<String>>(message: S) -> Self {
        Self::Compression(message.into())
    }

    pub fn loader<S: Into<String>>(message: S) -> Self {
        Self::Loader(message.into())
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Whether the error came from Remote Tier infrastructure (unreachable,
    /// timed out, connection dropped) rather than from the data itself.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unavailable(_) | Self::Timeout(_) | Self::Io(_) => true,
            #[cfg(feature = "redis")]
            Self::Redis(e) => {
                e.is_io_error()
                    || e.is_timeout()
                    || e.is_connection_dropped()
                    || e.is_connection_refusal()
                    || e.is_unrecoverable_error()
            }
            _ => false,
        }
    }

    /// Stable label used for logging and metrics
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Validation(_) => "validation",
            #[cfg(feature = "redis")]
            Self::Redis(_) => "redis",
            Self::Unavailable(_) => "unavailable",
            Self::Timeout(_) => "timeout",
            Self::Serialization(_) => "serialization",
            Self::Decode { .. } => "decode",
            Self::Compression(_) => "compression",
            Self::Pattern(_) => "pattern",
            Self::Yaml(_) => "yaml",
            Self::Io(_) => "io",
            Self::Loader(_) => "loader",
            Self::Internal(_) => "internal",
        }
    }
}
