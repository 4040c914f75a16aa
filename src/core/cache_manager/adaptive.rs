//! Adaptive TTL
//!
//! Keys read often get a longer TTL, keys left alone get a shorter one.
//! The access stats live next to the key in the Remote Tier and only steer
//! the TTL; losing them costs efficiency, never correctness.

use super::manager::TieredCache;
use super::types::{AccessStats, AdaptiveOptions, SetOptions};
use crate::config::AdaptiveTtlConfig;
use crate::storage::Expiry;
use crate::utils::error::Result;
use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// TTL for a key given its access history
///
/// More than `hot_threshold` accesses doubles `base`, up to `max_ttl`.
/// Otherwise a key untouched for over `cold_after` gets half of `base`,
/// down to `min_ttl`. Fresh stats (`last_access == 0`) count as cold.
pub fn adaptive_ttl(
    config: &AdaptiveTtlConfig,
    base: Duration,
    stats: &AccessStats,
    now_ms: i64,
) -> Duration {
    let max_ttl = Duration::from_secs(config.max_ttl);
    let min_ttl = Duration::from_secs(config.min_ttl);

    if stats.count > config.hot_threshold {
        return base.saturating_mul(2).min(max_ttl);
    }

    let idle_ms = now_ms.saturating_sub(stats.last_access);
    if idle_ms > (config.cold_after as i64).saturating_mul(1000) {
        return (base / 2).max(min_ttl);
    }

    base
}

impl TieredCache {
    /// Read-through `get` whose TTL follows the key's access pattern
    pub async fn get_with_adaptive_ttl<T, F, Fut>(
        &self,
        key: &str,
        loader: F,
        options: AdaptiveOptions,
    ) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Option<T>>> + Send,
    {
        let inner = &self.inner;
        let stats_key = inner.stats_key(key);
        let now_ms = chrono::Utc::now().timestamp_millis();

        let stats = self.read_stats(&stats_key).await;
        let base = options.base_ttl.unwrap_or_else(|| {
            self.policy_for(key)
                .ttl
                .as_duration()
                .unwrap_or(Duration::from_secs(inner.config.adaptive.max_ttl))
        });
        let ttl = adaptive_ttl(&inner.config.adaptive, base, &stats, now_ms);
        debug!(key = %key, count = stats.count, ttl_secs = ttl.as_secs(), "adaptive ttl");

        let value = match self.read::<T>(key).await {
            Ok(Some(value)) => Some(value),
            Ok(None) => {
                inner.metrics.record_loader_call();
                let loaded = loader().await?;
                if let Some(value) = &loaded {
                    let secs = ttl.as_secs().max(1) as i64;
                    self.store_loaded(key, value, SetOptions::ttl(secs)).await?;
                }
                loaded
            }
            Err(e) if e.is_transient() => {
                warn!(key = %key, "Remote Tier unavailable, loading directly: {}", e);
                inner.metrics.record_loader_call();
                return loader().await;
            }
            Err(e) => return Err(e),
        };

        let updated = AccessStats {
            count: stats.count.saturating_add(1),
            last_access: now_ms,
        };
        self.write_stats(&stats_key, &updated, ttl.saturating_mul(2)).await;

        Ok(value)
    }

    async fn read_stats(&self, stats_key: &str) -> AccessStats {
        let inner = &self.inner;
        match inner.remote("get", inner.store.get(stats_key)).await {
            Ok(Some(entry)) => serde_json::from_slice(&entry.data).unwrap_or_else(|e| {
                warn!(key = %stats_key, "Discarding unreadable access stats: {}", e);
                AccessStats::default()
            }),
            Ok(None) => AccessStats::default(),
            Err(e) => {
                debug!(key = %stats_key, "Access stats unavailable: {}", e);
                AccessStats::default()
            }
        }
    }

    async fn write_stats(&self, stats_key: &str, stats: &AccessStats, ttl: Duration) {
        let inner = &self.inner;
        let payload = match serde_json::to_vec(stats) {
            Ok(payload) => Bytes::from(payload),
            Err(e) => {
                warn!(key = %stats_key, "Failed to encode access stats: {}", e);
                return;
            }
        };

        if let Err(e) = inner
            .remote("set", inner.store.set(stats_key, payload, Expiry::After(ttl)))
            .await
        {
            debug!(key = %stats_key, "Failed to store access stats: {}", e);
        }
    }
}
