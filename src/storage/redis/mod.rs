//! Redis Remote Tier
//!
//! ## Module Structure
//!
//! - `pool` - Client, multiplexed connection and health checks
//! - `cache` - Single-key reads and writes (value plus remaining TTL)
//! - `batch` - Multi-key reads and deletes
//! - `atomic` - `SET NX PX` and compare-and-delete for stampede locks
//! - `scan` - Cursor-based key enumeration
//! - `pubsub` - Invalidation channel publish/subscribe
//! - `tests` - Module tests

mod atomic;
mod batch;
mod cache;
mod pool;
mod pubsub;
mod scan;

pub use pool::RedisPool;

use super::{Expiry, RemoteEntry, RemoteStore};
use crate::core::pattern::KeyPattern;
use crate::utils::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::time::Duration;

#[async_trait]
impl RemoteStore for RedisPool {
    async fn get(&self, key: &str) -> Result<Option<RemoteEntry>> {
        self.get_entry(key).await
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<RemoteEntry>>> {
        self.get_entries(keys).await
    }

    async fn set(&self, key: &str, value: Bytes, expiry: Expiry) -> Result<()> {
        self.set_entry(key, &value, expiry).await
    }

    async fn set_nx(&self, key: &str, value: Bytes, ttl: Duration) -> Result<bool> {
        self.set_if_absent(key, &value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.delete_key(key).await
    }

    async fn delete_many(&self, keys: &[String]) -> Result<usize> {
        self.delete_keys(keys).await
    }

    async fn delete_if_equals(&self, key: &str, expected: Bytes) -> Result<bool> {
        self.compare_and_delete(key, &expected).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.key_exists(key).await
    }

    async fn scan(&self, pattern: &KeyPattern) -> Result<Vec<String>> {
        self.scan_match(pattern).await
    }

    async fn publish(&self, channel: &str, payload: Bytes) -> Result<()> {
        self.publish_message(channel, &payload).await
    }

    async fn subscribe(&self, channel: &str) -> Result<BoxStream<'static, Bytes>> {
        self.subscribe_channel(channel).await
    }

    async fn ping(&self) -> Result<()> {
        self.health_check().await
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
