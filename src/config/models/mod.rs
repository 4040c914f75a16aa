//! Configuration data models
//!
//! This module defines all configuration structures used by the cache manager.

pub mod cache;
pub mod logging;
pub mod storage;

pub use cache::*;
pub use logging::*;
pub use storage::*;

/// Default key namespace for every Remote Tier key
pub fn default_key_prefix() -> String {
    "cache:".to_string()
}

/// Default TTL in seconds
pub fn default_cache_ttl() -> i64 {
    3600 // 1 hour
}

pub fn default_true() -> bool {
    true
}

pub fn default_compression_threshold() -> usize {
    1024
}

pub fn default_compression_level() -> u32 {
    6
}

pub fn default_local_max_entries() -> usize {
    1000
}

/// Upper bound for a Local Tier mirror's lifetime, in seconds
pub fn default_local_ttl_cap() -> u64 {
    60
}

pub fn default_local_max_value_bytes() -> usize {
    64 * 1024
}

pub fn default_sweep_interval() -> u64 {
    60
}

pub fn default_invalidation_channel() -> String {
    "cache:invalidate".to_string()
}

pub fn default_hot_threshold() -> u64 {
    10
}

pub fn default_cold_after() -> u64 {
    3600
}

pub fn default_min_adaptive_ttl() -> u64 {
    300 // 5 minutes
}

pub fn default_max_adaptive_ttl() -> u64 {
    7200 // 2 hours
}

pub fn default_lock_ttl() -> u64 {
    10
}

pub fn default_lock_max_wait_ms() -> u64 {
    5000
}

pub fn default_lock_poll_interval_ms() -> u64 {
    100
}

pub fn default_write_back_delay_ms() -> u64 {
    5000
}

pub fn default_operation_timeout_ms() -> u64 {
    2000
}

pub fn default_metrics_interval() -> u64 {
    60
}

pub fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

pub fn default_connection_timeout() -> u64 {
    5
}

pub fn default_log_level() -> String {
    "info".to_string()
}
