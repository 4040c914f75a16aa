//! Prometheus gauges mirroring [`CacheMetrics`]

use super::metrics::CacheMetrics;
use crate::utils::error::{CacheError, Result};
use prometheus::{Encoder, Gauge, IntGauge, Opts, Registry, TextEncoder};

const NAMESPACE: &str = "tiered_cache";

/// Registry of cache gauges, refreshed from snapshots
#[derive(Clone)]
pub struct PrometheusExporter {
    registry: Registry,
    hits: IntGauge,
    misses: IntGauge,
    sets: IntGauge,
    deletes: IntGauge,
    invalidations: IntGauge,
    errors: IntGauge,
    compression_saved: IntGauge,
    local_cache_size: IntGauge,
    remote_connected: IntGauge,
    hit_rate: Gauge,
    p95_latency_ms: Gauge,
}

fn int_gauge(registry: &Registry, name: &str, help: &str) -> Result<IntGauge> {
    let gauge = IntGauge::with_opts(Opts::new(name, help).namespace(NAMESPACE))
        .map_err(|e| CacheError::internal(format!("Failed to create gauge {}: {}", name, e)))?;
    registry
        .register(Box::new(gauge.clone()))
        .map_err(|e| CacheError::internal(format!("Failed to register gauge {}: {}", name, e)))?;
    Ok(gauge)
}

fn float_gauge(registry: &Registry, name: &str, help: &str) -> Result<Gauge> {
    let gauge = Gauge::with_opts(Opts::new(name, help).namespace(NAMESPACE))
        .map_err(|e| CacheError::internal(format!("Failed to create gauge {}: {}", name, e)))?;
    registry
        .register(Box::new(gauge.clone()))
        .map_err(|e| CacheError::internal(format!("Failed to register gauge {}: {}", name, e)))?;
    Ok(gauge)
}

impl PrometheusExporter {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        Ok(Self {
            hits: int_gauge(&registry, "hits", "Reads answered by either tier")?,
            misses: int_gauge(&registry, "misses", "Reads answered by neither tier")?,
            sets: int_gauge(&registry, "sets", "Successful writes")?,
            deletes: int_gauge(&registry, "deletes", "Deletes")?,
            invalidations: int_gauge(&registry, "invalidations", "Pattern sweeps")?,
            errors: int_gauge(&registry, "errors", "Remote Tier failures")?,
            compression_saved: int_gauge(
                &registry,
                "compression_saved_bytes",
                "Bytes saved by compression",
            )?,
            local_cache_size: int_gauge(&registry, "local_cache_size", "Local Tier entries")?,
            remote_connected: int_gauge(
                &registry,
                "remote_connected",
                "1 when the last Remote Tier probe succeeded",
            )?,
            hit_rate: float_gauge(&registry, "hit_rate", "hits / (hits + misses)")?,
            p95_latency_ms: float_gauge(
                &registry,
                "p95_latency_ms",
                "95th percentile operation latency",
            )?,
            registry,
        })
    }

    pub fn update(&self, metrics: &CacheMetrics) {
        let clamp = |value: u64| i64::try_from(value).unwrap_or(i64::MAX);
        self.hits.set(clamp(metrics.hits));
        self.misses.set(clamp(metrics.misses));
        self.sets.set(clamp(metrics.sets));
        self.deletes.set(clamp(metrics.deletes));
        self.invalidations.set(clamp(metrics.invalidations));
        self.errors.set(clamp(metrics.errors));
        self.compression_saved.set(clamp(metrics.compression_saved));
        self.local_cache_size
            .set(clamp(metrics.local_cache_size as u64));
        self.remote_connected
            .set(i64::from(metrics.remote_connected));
        self.hit_rate.set(metrics.hit_rate);
        self.p95_latency_ms.set(metrics.p95_latency_ms);
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Text exposition format
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| CacheError::internal(format!("Failed to encode metrics: {}", e)))?;
        String::from_utf8(buffer)
            .map_err(|e| CacheError::internal(format!("Metrics are not UTF-8: {}", e)))
    }
}
