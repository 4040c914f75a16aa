//! Key policy registry
//!
//! Maps key globs to a default TTL and a write strategy. Lookup walks the
//! table in declaration order and the first matching pattern wins, so a
//! broad pattern declared early shadows every narrower pattern after it.
//! Shadowed rows are reported once, when the registry is built.

use super::pattern::KeyPattern;
use crate::config::{KeyPolicyConfig, WriteStrategy};
use crate::storage::Expiry;
use crate::utils::error::Result;
use tracing::warn;

/// Policy that applies to one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPolicy {
    pub ttl: Expiry,
    pub strategy: WriteStrategy,
    /// Glob of the matching row, `None` for the global default
    pub pattern: Option<String>,
}

#[derive(Debug, Clone)]
struct CompiledPolicy {
    pattern: KeyPattern,
    ttl: Expiry,
    strategy: WriteStrategy,
}

/// Ordered, compiled policy table
#[derive(Debug, Clone)]
pub struct KeyPolicyRegistry {
    policies: Vec<CompiledPolicy>,
    default_ttl: Expiry,
}

impl KeyPolicyRegistry {
    pub fn new(policies: &[KeyPolicyConfig], default_ttl_secs: i64) -> Result<Self> {
        let mut compiled: Vec<CompiledPolicy> = Vec::with_capacity(policies.len());

        for policy in policies {
            let pattern = KeyPattern::compile(&policy.pattern)?;

            if let Some(earlier) = compiled
                .iter()
                .find(|earlier| earlier.pattern.is_match(&policy.pattern))
            {
                warn!(
                    pattern = %policy.pattern,
                    shadowed_by = %earlier.pattern,
                    "key policy is unreachable: an earlier pattern matches every key it would match"
                );
            }

            compiled.push(CompiledPolicy {
                pattern,
                ttl: Expiry::from_secs(policy.ttl),
                strategy: policy.strategy,
            });
        }

        Ok(Self {
            policies: compiled,
            default_ttl: Expiry::from_secs(default_ttl_secs),
        })
    }

    /// Policy for `key`; first declared match wins
    pub fn resolve(&self, key: &str) -> ResolvedPolicy {
        self.policies
            .iter()
            .find(|policy| policy.pattern.is_match(key))
            .map(|policy| ResolvedPolicy {
                ttl: policy.ttl,
                strategy: policy.strategy,
                pattern: Some(policy.pattern.as_str().to_string()),
            })
            .unwrap_or(ResolvedPolicy {
                ttl: self.default_ttl,
                strategy: WriteStrategy::WriteThrough,
                pattern: None,
            })
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}
