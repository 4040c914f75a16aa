//! Cache manager option and bookkeeping types

use crate::core::write_back::WriteBackFn;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Options for [`TieredCache::set`](super::TieredCache::set)
#[derive(Clone, Default)]
pub struct SetOptions {
    /// TTL in seconds overriding the key policy (`<= 0` means no expiry)
    pub ttl: Option<i64>,
    /// Called later with the stored value when the key's policy is write-back
    pub write_back: Option<WriteBackFn>,
}

impl SetOptions {
    pub fn ttl(secs: i64) -> Self {
        Self {
            ttl: Some(secs),
            write_back: None,
        }
    }

    pub fn with_write_back(mut self, write_back: WriteBackFn) -> Self {
        self.write_back = Some(write_back);
        self
    }
}

impl fmt::Debug for SetOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetOptions")
            .field("ttl", &self.ttl)
            .field("write_back", &self.write_back.is_some())
            .finish()
    }
}

/// Options for [`TieredCache::get_with_lock`](super::TieredCache::get_with_lock)
///
/// Unset fields fall back to the configured lock defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct LockOptions {
    /// Lifetime of the lock key
    pub lock_ttl: Option<Duration>,
    /// How long a waiter polls before calling the loader itself
    pub max_wait: Option<Duration>,
    pub poll_interval: Option<Duration>,
}

/// Options for [`TieredCache::get_with_adaptive_ttl`](super::TieredCache::get_with_adaptive_ttl)
#[derive(Debug, Clone, Copy, Default)]
pub struct AdaptiveOptions {
    /// TTL before adjustment; defaults to the key policy TTL
    pub base_ttl: Option<Duration>,
}

/// Access bookkeeping kept beside a key in the Remote Tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessStats {
    pub count: u64,
    /// Unix time in milliseconds, zero when never accessed
    pub last_access: i64,
}
