//! Cache configuration validators
//!
//! Every glob in the policy table and in the invalidation rules is compiled
//! here so that a bad pattern fails at load time instead of on first use.

use super::trait_def::Validate;
use crate::config::models::*;
use crate::core::pattern::KeyPattern;
use tracing::{debug, warn};

impl Validate for CacheConfig {
    fn validate(&self) -> Result<(), String> {
        debug!("Validating cache configuration");

        if self.key_prefix.contains(char::is_whitespace) {
            return Err("Cache key prefix must not contain whitespace".to_string());
        }

        if self.operation_timeout_ms == 0 {
            return Err("Operation timeout must be greater than 0".to_string());
        }

        if self.metrics_interval == 0 {
            return Err("Metrics interval must be greater than 0".to_string());
        }

        self.compression.validate()?;
        self.local.validate()?;
        self.adaptive.validate()?;
        self.lock.validate()?;
        self.invalidation.validate()?;

        for policy in &self.policies {
            policy.validate()?;
        }

        Ok(())
    }
}

impl Validate for CompressionConfig {
    fn validate(&self) -> Result<(), String> {
        if self.level > 9 {
            return Err(format!(
                "Compression level must be between 0 and 9, got {}",
                self.level
            ));
        }

        if self.enabled && self.threshold_bytes == 0 {
            return Err("Compression threshold must be greater than 0".to_string());
        }

        Ok(())
    }
}

impl Validate for LocalTierConfig {
    fn validate(&self) -> Result<(), String> {
        if !self.enabled {
            return Ok(());
        }

        if self.max_entries == 0 {
            return Err("Local tier max entries must be greater than 0".to_string());
        }

        if self.ttl_cap == 0 {
            return Err("Local tier TTL cap must be greater than 0".to_string());
        }

        if self.sweep_interval == 0 {
            return Err("Local tier sweep interval must be greater than 0".to_string());
        }

        Ok(())
    }
}

impl Validate for KeyPolicyConfig {
    fn validate(&self) -> Result<(), String> {
        KeyPattern::compile(&self.pattern)
            .map(|_| ())
            .map_err(|e| format!("Invalid policy pattern '{}': {}", self.pattern, e))
    }
}

impl Validate for InvalidationConfig {
    fn validate(&self) -> Result<(), String> {
        if self.enabled && self.channel.is_empty() {
            return Err("Invalidation channel cannot be empty".to_string());
        }

        for rule in &self.rules {
            KeyPattern::compile(&rule.trigger)
                .map_err(|e| format!("Invalid rule trigger '{}': {}", rule.trigger, e))?;

            if rule.on.is_empty() {
                return Err(format!(
                    "Invalidation rule '{}' must fire on at least one operation",
                    rule.trigger
                ));
            }

            if rule.invalidates.is_empty() {
                return Err(format!(
                    "Invalidation rule '{}' must name at least one pattern to invalidate",
                    rule.trigger
                ));
            }

            for target in &rule.invalidates {
                let compiled = KeyPattern::compile(target)
                    .map_err(|e| format!("Invalid rule target '{}': {}", target, e))?;

                if rule.on.contains(&InvalidationTrigger::Set) && compiled.is_match(&rule.trigger)
                {
                    warn!(
                        trigger = %rule.trigger,
                        target = %target,
                        "invalidation rule fires on set and sweeps its own trigger; written keys will be removed"
                    );
                }
            }
        }

        Ok(())
    }
}

impl Validate for AdaptiveTtlConfig {
    fn validate(&self) -> Result<(), String> {
        if self.min_ttl == 0 {
            return Err("Adaptive min TTL must be greater than 0".to_string());
        }

        if self.min_ttl > self.max_ttl {
            return Err(format!(
                "Adaptive min TTL ({}) must not exceed max TTL ({})",
                self.min_ttl, self.max_ttl
            ));
        }

        Ok(())
    }
}

impl Validate for LockConfig {
    fn validate(&self) -> Result<(), String> {
        if self.ttl == 0 {
            return Err("Lock TTL must be greater than 0".to_string());
        }

        if self.poll_interval_ms == 0 {
            return Err("Lock poll interval must be greater than 0".to_string());
        }

        if self.max_wait_ms < self.poll_interval_ms {
            return Err("Lock max wait must be at least one poll interval".to_string());
        }

        Ok(())
    }
}
