//! Remote Tier storage backends
//!
//! The Remote Tier is the shared source of truth for cached data. It is
//! reached through the [`RemoteStore`] trait so the cache manager does not
//! care whether it talks to Redis or to the in-process [`MemoryStore`] used
//! for single-instance deployments and tests.

/// In-process Remote Tier
pub mod memory;
/// Redis Remote Tier
#[cfg(feature = "redis")]
pub mod redis;

pub use memory::MemoryStore;
#[cfg(feature = "redis")]
pub use redis::RedisPool;

use crate::config::RedisConfig;
use crate::core::pattern::KeyPattern;
use crate::utils::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Lifetime of a stored entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Expiry {
    /// Entry stays until deleted
    Never,
    /// Entry expires after the given duration
    After(Duration),
}

impl Expiry {
    /// Interpret a TTL in seconds; zero or negative means no expiry
    pub fn from_secs(secs: i64) -> Self {
        if secs <= 0 {
            Self::Never
        } else {
            Self::After(Duration::from_secs(secs as u64))
        }
    }

    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Self::Never => None,
            Self::After(ttl) => Some(*ttl),
        }
    }

    /// The shorter of the two lifetimes
    pub fn min(self, other: Self) -> Self {
        match (self, other) {
            (Self::Never, other) => other,
            (this, Self::Never) => this,
            (Self::After(a), Self::After(b)) => Self::After(a.min(b)),
        }
    }
}

/// A value read from the Remote Tier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Encoded payload
    pub data: Bytes,
    /// Remaining lifetime at read time
    pub ttl: Expiry,
}

/// Shared, network-accessible key/value store with pub/sub
///
/// Keys passed here are already namespaced by the cache manager.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Read a value and its remaining lifetime
    async fn get(&self, key: &str) -> Result<Option<RemoteEntry>>;

    /// Read many values in one round-trip; output is positional
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<RemoteEntry>>>;

    /// Write a value, replacing any previous one
    async fn set(&self, key: &str, value: Bytes, expiry: Expiry) -> Result<()>;

    /// Atomically write a value only if the key is absent
    async fn set_nx(&self, key: &str, value: Bytes, ttl: Duration) -> Result<bool>;

    /// Remove a key, returning whether it existed
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Remove many keys, returning how many existed
    async fn delete_many(&self, keys: &[String]) -> Result<usize>;

    /// Atomically remove a key only if it still holds `expected`
    async fn delete_if_equals(&self, key: &str, expected: Bytes) -> Result<bool>;

    async fn exists(&self, key: &str) -> Result<bool>;

    /// Enumerate live keys matching a pattern
    async fn scan(&self, pattern: &KeyPattern) -> Result<Vec<String>>;

    async fn publish(&self, channel: &str, payload: Bytes) -> Result<()>;

    /// Subscribe to a channel; the stream ends when the subscription is lost
    async fn subscribe(&self, channel: &str) -> Result<BoxStream<'static, Bytes>>;

    /// Round-trip health probe
    async fn ping(&self) -> Result<()>;

    /// Short backend name for logs and metrics
    fn backend(&self) -> &'static str;
}

/// Build the Remote Tier described by the configuration
///
/// Redis is used when enabled; otherwise an in-process store stands in,
/// which only shares state within this process.
pub async fn connect(config: &RedisConfig) -> Result<Arc<dyn RemoteStore>> {
    if config.enabled {
        #[cfg(feature = "redis")]
        {
            let pool = RedisPool::new(config).await?;
            return Ok(Arc::new(pool));
        }

        #[cfg(not(feature = "redis"))]
        tracing::warn!("Redis enabled in configuration but the `redis` feature is not compiled in");
    }

    info!("Using in-process Remote Tier (single-instance mode)");
    Ok(Arc::new(MemoryStore::new()))
}
