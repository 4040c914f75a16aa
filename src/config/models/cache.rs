//! Cache configuration

use super::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Namespace prepended to every Remote Tier key
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// TTL in seconds used when no policy matches (`<= 0` means no expiry)
    #[serde(default = "default_cache_ttl")]
    pub default_ttl: i64,
    /// Payload compression
    #[serde(default)]
    pub compression: CompressionConfig,
    /// In-process Local Tier
    #[serde(default)]
    pub local: LocalTierConfig,
    /// Ordered key policy table, first matching pattern wins
    #[serde(default)]
    pub policies: Vec<KeyPolicyConfig>,
    /// Cross-instance invalidation
    #[serde(default)]
    pub invalidation: InvalidationConfig,
    /// Adaptive TTL bounds
    #[serde(default)]
    pub adaptive: AdaptiveTtlConfig,
    /// Stampede lock defaults
    #[serde(default)]
    pub lock: LockConfig,
    /// Delay before a write-back flush, in milliseconds
    #[serde(default = "default_write_back_delay_ms")]
    pub write_back_delay_ms: u64,
    /// Deadline for a single Remote Tier round-trip, in milliseconds
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,
    /// Interval between metric snapshots, in seconds
    #[serde(default = "default_metrics_interval")]
    pub metrics_interval: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            key_prefix: default_key_prefix(),
            default_ttl: default_cache_ttl(),
            compression: CompressionConfig::default(),
            local: LocalTierConfig::default(),
            policies: Vec::new(),
            invalidation: InvalidationConfig::default(),
            adaptive: AdaptiveTtlConfig::default(),
            lock: LockConfig::default(),
            write_back_delay_ms: default_write_back_delay_ms(),
            operation_timeout_ms: default_operation_timeout_ms(),
            metrics_interval: default_metrics_interval(),
        }
    }
}

impl CacheConfig {
    pub fn write_back_delay(&self) -> Duration {
        Duration::from_millis(self.write_back_delay_ms)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    pub fn metrics_interval(&self) -> Duration {
        Duration::from_secs(self.metrics_interval)
    }

    /// Merge cache configurations
    pub fn merge(mut self, other: Self) -> Self {
        if other.key_prefix != default_key_prefix() {
            self.key_prefix = other.key_prefix;
        }
        if other.default_ttl != default_cache_ttl() {
            self.default_ttl = other.default_ttl;
        }
        self.compression = self.compression.merge(other.compression);
        self.local = self.local.merge(other.local);
        if !other.policies.is_empty() {
            self.policies = other.policies;
        }
        self.invalidation = self.invalidation.merge(other.invalidation);
        self.adaptive = self.adaptive.merge(other.adaptive);
        self.lock = self.lock.merge(other.lock);
        if other.write_back_delay_ms != default_write_back_delay_ms() {
            self.write_back_delay_ms = other.write_back_delay_ms;
        }
        if other.operation_timeout_ms != default_operation_timeout_ms() {
            self.operation_timeout_ms = other.operation_timeout_ms;
        }
        if other.metrics_interval != default_metrics_interval() {
            self.metrics_interval = other.metrics_interval;
        }
        self
    }
}

/// Compression configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    /// Enable gzip for large payloads
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Serialized size above which payloads are compressed
    #[serde(default = "default_compression_threshold")]
    pub threshold_bytes: usize,
    /// gzip level (0-9)
    #[serde(default = "default_compression_level")]
    pub level: u32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold_bytes: default_compression_threshold(),
            level: default_compression_level(),
        }
    }
}

impl CompressionConfig {
    pub fn merge(mut self, other: Self) -> Self {
        if !other.enabled {
            self.enabled = other.enabled;
        }
        if other.threshold_bytes != default_compression_threshold() {
            self.threshold_bytes = other.threshold_bytes;
        }
        if other.level != default_compression_level() {
            self.level = other.level;
        }
        self
    }
}

/// Local Tier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalTierConfig {
    /// Mirror Remote Tier entries in process
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Maximum number of mirrored entries
    #[serde(default = "default_local_max_entries")]
    pub max_entries: usize,
    /// Upper bound for a mirror's lifetime, in seconds
    #[serde(default = "default_local_ttl_cap")]
    pub ttl_cap: u64,
    /// Encoded payloads larger than this are never mirrored
    #[serde(default = "default_local_max_value_bytes")]
    pub max_value_bytes: usize,
    /// Interval of the expired-entry sweep, in seconds
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval: u64,
}

impl Default for LocalTierConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: default_local_max_entries(),
            ttl_cap: default_local_ttl_cap(),
            max_value_bytes: default_local_max_value_bytes(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

impl LocalTierConfig {
    pub fn ttl_cap(&self) -> Duration {
        Duration::from_secs(self.ttl_cap)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval)
    }

    pub fn merge(mut self, other: Self) -> Self {
        if !other.enabled {
            self.enabled = other.enabled;
        }
        if other.max_entries != default_local_max_entries() {
            self.max_entries = other.max_entries;
        }
        if other.ttl_cap != default_local_ttl_cap() {
            self.ttl_cap = other.ttl_cap;
        }
        if other.max_value_bytes != default_local_max_value_bytes() {
            self.max_value_bytes = other.max_value_bytes;
        }
        if other.sweep_interval != default_sweep_interval() {
            self.sweep_interval = other.sweep_interval;
        }
        self
    }
}

/// How a write reaches the system of record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WriteStrategy {
    /// Cache write completes before `set` returns
    #[default]
    WriteThrough,
    /// Cache write completes immediately, system of record is updated later
    WriteBack,
    /// A `get` miss is filled by the loader registered for the key
    ReadThrough,
}

/// One row of the key policy table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyPolicyConfig {
    /// Glob over the key name (`*` matches any run of characters)
    pub pattern: String,
    /// TTL in seconds (`<= 0` means no expiry)
    pub ttl: i64,
    #[serde(default)]
    pub strategy: WriteStrategy,
}

/// Operation that fires an invalidation rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidationTrigger {
    Set,
    Delete,
}

fn default_rule_triggers() -> Vec<InvalidationTrigger> {
    vec![InvalidationTrigger::Set, InvalidationTrigger::Delete]
}

/// Pattern-based invalidation rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidationRuleConfig {
    /// Glob matched against the key being written or deleted
    pub trigger: String,
    /// Operations that fire the rule
    #[serde(default = "default_rule_triggers")]
    pub on: Vec<InvalidationTrigger>,
    /// Globs swept on every instance when the rule fires
    pub invalidates: Vec<String>,
}

/// Invalidation bus configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Pub/sub channel shared by every instance
    #[serde(default = "default_invalidation_channel")]
    pub channel: String,
    #[serde(default)]
    pub rules: Vec<InvalidationRuleConfig>,
}

impl Default for InvalidationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            channel: default_invalidation_channel(),
            rules: Vec::new(),
        }
    }
}

impl InvalidationConfig {
    pub fn merge(mut self, other: Self) -> Self {
        if !other.enabled {
            self.enabled = other.enabled;
        }
        if other.channel != default_invalidation_channel() {
            self.channel = other.channel;
        }
        if !other.rules.is_empty() {
            self.rules = other.rules;
        }
        self
    }
}

/// Adaptive TTL configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptiveTtlConfig {
    /// Access count above which a key is considered hot
    #[serde(default = "default_hot_threshold")]
    pub hot_threshold: u64,
    /// Seconds since last access after which a key is considered cold
    #[serde(default = "default_cold_after")]
    pub cold_after: u64,
    /// Floor for shrunk TTLs, in seconds
    #[serde(default = "default_min_adaptive_ttl")]
    pub min_ttl: u64,
    /// Ceiling for stretched TTLs, in seconds
    #[serde(default = "default_max_adaptive_ttl")]
    pub max_ttl: u64,
}

impl Default for AdaptiveTtlConfig {
    fn default() -> Self {
        Self {
            hot_threshold: default_hot_threshold(),
            cold_after: default_cold_after(),
            min_ttl: default_min_adaptive_ttl(),
            max_ttl: default_max_adaptive_ttl(),
        }
    }
}

impl AdaptiveTtlConfig {
    pub fn merge(mut self, other: Self) -> Self {
        if other.hot_threshold != default_hot_threshold() {
            self.hot_threshold = other.hot_threshold;
        }
        if other.cold_after != default_cold_after() {
            self.cold_after = other.cold_after;
        }
        if other.min_ttl != default_min_adaptive_ttl() {
            self.min_ttl = other.min_ttl;
        }
        if other.max_ttl != default_max_adaptive_ttl() {
            self.max_ttl = other.max_ttl;
        }
        self
    }
}

/// Stampede lock configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockConfig {
    /// Lifetime of a lock key, in seconds
    #[serde(default = "default_lock_ttl")]
    pub ttl: u64,
    /// How long a waiter polls before computing the value itself
    #[serde(default = "default_lock_max_wait_ms")]
    pub max_wait_ms: u64,
    #[serde(default = "default_lock_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            ttl: default_lock_ttl(),
            max_wait_ms: default_lock_max_wait_ms(),
            poll_interval_ms: default_lock_poll_interval_ms(),
        }
    }
}

impl LockConfig {
    pub fn merge(mut self, other: Self) -> Self {
        if other.ttl != default_lock_ttl() {
            self.ttl = other.ttl;
        }
        if other.max_wait_ms != default_lock_max_wait_ms() {
            self.max_wait_ms = other.max_wait_ms;
        }
        if other.poll_interval_ms != default_lock_poll_interval_ms() {
            self.poll_interval_ms = other.poll_interval_ms;
        }
        self
    }
}
