//! Configuration validation integration tests
//!
//! These tests verify that configuration loads from YAML, validates
//! correctly and fails appropriately for invalid configurations.

#[cfg(test)]
mod tests {
    use crate::common::fixtures;
    use std::sync::Arc;
    use tiered_cache::config::{InvalidationTrigger, Validate, WriteStrategy};
    use tiered_cache::{CacheConfig, CacheError, Config, MemoryStore, TieredCache};

    const EXAMPLE: &str = include_str!("../../config/cache.example.yaml");

    // ==================== Loading ====================

    /// The shipped example configuration is valid
    #[test]
    fn test_example_config_parses() {
        let config = Config::from_yaml(EXAMPLE).unwrap();

        assert_eq!(config.cache.key_prefix, "wedding-app:");
        assert_eq!(config.cache.policies.len(), 4);
        assert_eq!(config.cache.policies[1].strategy, WriteStrategy::WriteBack);
        assert_eq!(config.cache.policies[3].ttl, 0);
        assert_eq!(
            config.cache.invalidation.rules[1].on,
            vec![InvalidationTrigger::Delete]
        );
        assert_eq!(config.cache.lock.poll_interval_ms, 100);
    }

    /// Omitted sections fall back to defaults
    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_yaml("redis:\n  enabled: false\n").unwrap();
        let defaults = CacheConfig::default();

        assert!(!config.redis.enabled);
        assert_eq!(config.cache.key_prefix, defaults.key_prefix);
        assert_eq!(config.cache.default_ttl, defaults.default_ttl);
        assert!(config.cache.invalidation.enabled);
    }

    // ==================== Validation ====================

    #[test]
    fn test_default_cache_config_is_valid() {
        assert!(fixtures::config().validate().is_ok());
    }

    #[test]
    fn test_compression_level_out_of_range() {
        let mut config = fixtures::config();
        config.compression.level = 12;

        let result = config.validate();
        assert!(result.unwrap_err().contains("Compression level"));
    }

    #[test]
    fn test_empty_policy_pattern() {
        let mut config = fixtures::config();
        config.policies = vec![fixtures::policy("", 60, WriteStrategy::WriteThrough)];

        assert!(config.validate().unwrap_err().contains("policy pattern"));
    }

    #[test]
    fn test_rule_without_targets() {
        let mut config = fixtures::config();
        config.invalidation.rules = vec![fixtures::rule("wedding:*", &[InvalidationTrigger::Set], &[])];

        assert!(config.validate().unwrap_err().contains("at least one pattern"));
    }

    #[test]
    fn test_zero_operation_timeout() {
        let mut config = fixtures::config();
        config.operation_timeout_ms = 0;

        assert!(config.validate().unwrap_err().contains("timeout"));
    }

    #[test]
    fn test_bad_redis_url_is_rejected() {
        let result = Config::from_yaml("redis:\n  url: \"http://localhost:6379\"\n");
        assert!(matches!(result, Err(CacheError::Config(msg)) if msg.contains("Redis")));
    }

    #[test]
    fn test_bad_log_filter_is_rejected() {
        let result = Config::from_yaml("logging:\n  level: \"tiered_cache=loudest\"\n");
        assert!(matches!(result, Err(CacheError::Config(msg)) if msg.contains("Logging")));
    }

    /// A cache instance refuses an invalid configuration
    #[tokio::test]
    async fn test_cache_rejects_invalid_config() {
        let mut config = fixtures::config();
        config.local.max_entries = 0;

        let result = TieredCache::new(config, Arc::new(MemoryStore::new())).await;
        assert!(matches!(result, Err(CacheError::Config(_))));
    }
}
