//! Metrics and background maintenance for the cache manager

pub(crate) mod background;
pub mod metrics;
#[cfg(feature = "metrics")]
pub mod prometheus;

pub use metrics::{CacheMetrics, MetricsCollector};
#[cfg(feature = "metrics")]
pub use self::prometheus::PrometheusExporter;
