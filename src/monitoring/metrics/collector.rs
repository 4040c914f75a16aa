//! Metrics collector implementation

use super::bounded::{BoundedPush, MAX_LATENCY_SAMPLES};
use super::helpers::{calculate_average, calculate_percentile, ratio};
use super::types::{AtomicCacheStats, CacheMetrics};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Aggregates cache counters and operation latencies
#[derive(Debug)]
pub struct MetricsCollector {
    pub(super) stats: AtomicCacheStats,
    pub(super) latencies_ms: Mutex<VecDeque<f64>>,
    pub(super) remote_connected: AtomicBool,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            stats: AtomicCacheStats::default(),
            latencies_ms: Mutex::new(VecDeque::with_capacity(MAX_LATENCY_SAMPLES)),
            remote_connected: AtomicBool::new(true),
        }
    }

    /// Raw counters
    #[inline]
    pub fn stats(&self) -> &AtomicCacheStats {
        &self.stats
    }

    pub fn record_local_hit(&self) {
        AtomicCacheStats::incr(&self.stats.local_hits);
    }

    pub fn record_remote_hit(&self) {
        AtomicCacheStats::incr(&self.stats.remote_hits);
    }

    pub fn record_miss(&self) {
        AtomicCacheStats::incr(&self.stats.misses);
    }

    pub fn record_set(&self, compression_saved: usize) {
        AtomicCacheStats::incr(&self.stats.sets);
        if compression_saved > 0 {
            self.stats
                .compression_saved
                .fetch_add(compression_saved as u64, Ordering::Relaxed);
        }
    }

    pub fn record_delete(&self) {
        AtomicCacheStats::incr(&self.stats.deletes);
    }

    pub fn record_invalidation(&self) {
        AtomicCacheStats::incr(&self.stats.invalidations);
    }

    pub fn record_error(&self) {
        AtomicCacheStats::incr(&self.stats.errors);
    }

    pub fn record_decode_error(&self) {
        AtomicCacheStats::incr(&self.stats.decode_errors);
    }

    pub fn record_lock_acquired(&self) {
        AtomicCacheStats::incr(&self.stats.lock_acquired);
    }

    pub fn record_lock_fallback(&self) {
        AtomicCacheStats::incr(&self.stats.lock_fallbacks);
    }

    pub fn record_loader_call(&self) {
        AtomicCacheStats::incr(&self.stats.loader_calls);
    }

    pub fn record_write_back(&self, success: bool) {
        if success {
            AtomicCacheStats::incr(&self.stats.write_backs);
        } else {
            AtomicCacheStats::incr(&self.stats.write_back_failures);
        }
    }

    pub fn record_eviction(&self) {
        AtomicCacheStats::incr(&self.stats.evictions);
    }

    pub fn record_local_expired(&self, count: usize) {
        self.stats
            .local_expired
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Latency of one public operation
    pub fn record_latency(&self, elapsed: Duration) {
        self.latencies_ms
            .lock()
            .push_bounded(elapsed.as_secs_f64() * 1000.0, MAX_LATENCY_SAMPLES);
    }

    pub fn set_remote_connected(&self, connected: bool) {
        self.remote_connected.store(connected, Ordering::Release);
    }

    #[inline]
    pub fn remote_connected(&self) -> bool {
        self.remote_connected.load(Ordering::Acquire)
    }

    /// Snapshot of every counter; `local_cache_size` comes from the caller
    pub fn snapshot(&self, local_cache_size: usize) -> CacheMetrics {
        let load = |counter: &std::sync::atomic::AtomicU64| counter.load(Ordering::Relaxed);
        let stats = &self.stats;

        let local_hits = load(&stats.local_hits);
        let remote_hits = load(&stats.remote_hits);
        let hits = local_hits + remote_hits;
        let misses = load(&stats.misses);

        let (avg_latency_ms, p95_latency_ms) = {
            let samples = self.latencies_ms.lock();
            let mut sorted: Vec<f64> = samples.iter().copied().collect();
            sorted.sort_by(|a, b| a.total_cmp(b));
            (
                calculate_average(&samples),
                calculate_percentile(&sorted, 0.95),
            )
        };

        CacheMetrics {
            hits,
            local_hits,
            remote_hits,
            misses,
            sets: load(&stats.sets),
            deletes: load(&stats.deletes),
            invalidations: load(&stats.invalidations),
            errors: load(&stats.errors),
            decode_errors: load(&stats.decode_errors),
            lock_acquired: load(&stats.lock_acquired),
            lock_fallbacks: load(&stats.lock_fallbacks),
            loader_calls: load(&stats.loader_calls),
            write_backs: load(&stats.write_backs),
            write_back_failures: load(&stats.write_back_failures),
            evictions: load(&stats.evictions),
            compression_saved: load(&stats.compression_saved),
            hit_rate: ratio(hits, misses),
            local_cache_size,
            remote_connected: self.remote_connected(),
            avg_latency_ms,
            p95_latency_ms,
        }
    }

    /// Zero the counters and drop latency samples
    pub fn reset(&self) {
        self.stats.reset();
        self.latencies_ms.lock().clear();
    }
}
