//! Background maintenance tasks
//!
//! Each task holds only the components it needs, never the cache handle
//! itself, so dropping the cache can abort them.

use super::metrics::MetricsCollector;
use crate::core::local_tier::LocalTier;
use crate::storage::RemoteStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Periodically drop expired Local Tier entries
pub(crate) fn spawn_local_sweeper(
    local: Arc<LocalTier>,
    metrics: Arc<MetricsCollector>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            let removed = local.sweep_expired();
            if removed > 0 {
                metrics.record_local_expired(removed);
                debug!(removed, remaining = local.len(), "swept expired local entries");
            }
        }
    })
}

/// Periodically probe the Remote Tier and log a metrics snapshot
pub(crate) fn spawn_metrics_reporter(
    metrics: Arc<MetricsCollector>,
    local: Arc<LocalTier>,
    store: Arc<dyn RemoteStore>,
    every: Duration,
    probe_timeout: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval.tick().await;
        loop {
            interval.tick().await;

            let connected = match tokio::time::timeout(probe_timeout, store.ping()).await {
                Ok(Ok(())) => true,
                Ok(Err(e)) => {
                    warn!(backend = store.backend(), "Remote Tier health check failed: {}", e);
                    false
                }
                Err(_) => {
                    warn!(backend = store.backend(), "Remote Tier health check timed out");
                    false
                }
            };
            metrics.set_remote_connected(connected);

            let snapshot = metrics.snapshot(local.len());
            info!(
                hits = snapshot.hits,
                misses = snapshot.misses,
                hit_rate = format!("{:.3}", snapshot.hit_rate),
                sets = snapshot.sets,
                deletes = snapshot.deletes,
                invalidations = snapshot.invalidations,
                errors = snapshot.errors,
                local_cache_size = snapshot.local_cache_size,
                compression_saved = snapshot.compression_saved,
                p95_latency_ms = format!("{:.2}", snapshot.p95_latency_ms),
                remote_connected = snapshot.remote_connected,
                "cache metrics"
            );
        }
    })
}
