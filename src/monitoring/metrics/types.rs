//! Metric counters and snapshots

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters updated on the hot path
#[derive(Debug, Default)]
pub struct AtomicCacheStats {
    /// Reads answered by the Local Tier
    pub local_hits: AtomicU64,
    /// Reads answered by the Remote Tier
    pub remote_hits: AtomicU64,
    /// Reads answered by neither tier
    pub misses: AtomicU64,
    pub sets: AtomicU64,
    pub deletes: AtomicU64,
    /// Pattern sweeps run on this instance, local or on behalf of a peer
    pub invalidations: AtomicU64,
    /// Remote Tier failures, counted before any fallback
    pub errors: AtomicU64,
    pub decode_errors: AtomicU64,
    pub lock_acquired: AtomicU64,
    /// Waiters that gave up on a held lock and called the loader themselves
    pub lock_fallbacks: AtomicU64,
    pub loader_calls: AtomicU64,
    pub write_backs: AtomicU64,
    pub write_back_failures: AtomicU64,
    /// Total bytes saved by compression
    pub compression_saved: AtomicU64,
    /// Local Tier capacity evictions
    pub evictions: AtomicU64,
    pub local_expired: AtomicU64,
}

impl AtomicCacheStats {
    #[inline]
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Reset all stats to zero
    pub fn reset(&self) {
        for counter in [
            &self.local_hits,
            &self.remote_hits,
            &self.misses,
            &self.sets,
            &self.deletes,
            &self.invalidations,
            &self.errors,
            &self.decode_errors,
            &self.lock_acquired,
            &self.lock_fallbacks,
            &self.loader_calls,
            &self.write_backs,
            &self.write_back_failures,
            &self.compression_saved,
            &self.evictions,
            &self.local_expired,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Point-in-time view of the cache manager's metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheMetrics {
    /// Local plus remote hits
    pub hits: u64,
    pub local_hits: u64,
    pub remote_hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    pub invalidations: u64,
    pub errors: u64,
    pub decode_errors: u64,
    pub lock_acquired: u64,
    pub lock_fallbacks: u64,
    pub loader_calls: u64,
    pub write_backs: u64,
    pub write_back_failures: u64,
    pub evictions: u64,
    pub compression_saved: u64,
    /// hits / (hits + misses)
    pub hit_rate: f64,
    pub local_cache_size: usize,
    pub remote_connected: bool,
    pub avg_latency_ms: f64,
    pub p95_latency_ms: f64,
}
