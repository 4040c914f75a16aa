//! Test fixtures and data factories
//!
//! Provides factory methods for creating configurations and values with
//! sensible defaults.

use serde::{Deserialize, Serialize};
use tiered_cache::CacheConfig;
use tiered_cache::config::{InvalidationRuleConfig, InvalidationTrigger, KeyPolicyConfig, WriteStrategy};

/// Cached domain value used across tests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wedding {
    pub id: u32,
    pub status: String,
    pub guests: Vec<String>,
}

impl Wedding {
    pub fn draft(id: u32) -> Self {
        Self {
            id,
            status: "draft".to_string(),
            guests: Vec::new(),
        }
    }

    /// Large enough to cross the compression threshold
    pub fn crowded(id: u32, guests: usize) -> Self {
        Self {
            id,
            status: "confirmed".to_string(),
            guests: (0..guests).map(|n| format!("guest-{:04}", n)).collect(),
        }
    }
}

/// Default configuration with a test-only prefix
pub fn config() -> CacheConfig {
    CacheConfig {
        key_prefix: "test:".to_string(),
        ..Default::default()
    }
}

pub fn policy(pattern: &str, ttl: i64, strategy: WriteStrategy) -> KeyPolicyConfig {
    KeyPolicyConfig {
        pattern: pattern.to_string(),
        ttl,
        strategy,
    }
}

pub fn rule(trigger: &str, on: &[InvalidationTrigger], invalidates: &[&str]) -> InvalidationRuleConfig {
    InvalidationRuleConfig {
        trigger: trigger.to_string(),
        on: on.to_vec(),
        invalidates: invalidates.iter().map(|s| s.to_string()).collect(),
    }
}
