//! Metrics collection
//!
//! Counters are plain atomics so recording never blocks a cache operation;
//! only the latency window sits behind a short-lived lock.

mod bounded;
mod collector;
mod helpers;
mod types;


pub use collector::MetricsCollector;
pub use types::{AtomicCacheStats, CacheMetrics};
