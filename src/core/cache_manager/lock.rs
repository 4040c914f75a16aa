//! Stampede protection
//!
//! The first caller to miss a key takes a short-lived lock key in the
//! Remote Tier and runs the loader; everyone else polls for the value.
//!
//! The lock is advisory. It carries a random token so a holder only ever
//! releases its own lock, but there is no fencing: after a partition or a
//! lock expiring mid-load, two callers can compute the same value. Waiters
//! that give up, and callers that hit any cache error, run the loader
//! themselves. Duplicate work is possible; an outage is not.

use super::manager::TieredCache;
use super::types::{LockOptions, SetOptions};
use crate::utils::error::Result;
use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
struct ResolvedLock {
    ttl: Duration,
    max_wait: Duration,
    poll_interval: Duration,
}

enum Waited<T> {
    Value(T),
    GiveUp,
}

impl TieredCache {
    /// `get` that lets only one caller across all instances run `loader`
    /// for a missing key
    pub async fn get_with_lock<T, F, Fut>(
        &self,
        key: &str,
        loader: F,
        options: LockOptions,
    ) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Option<T>>> + Send,
    {
        match self.read::<T>(key).await {
            Ok(Some(value)) => return Ok(Some(value)),
            Ok(None) => {}
            Err(e) => {
                warn!(key = %key, "Cache read failed, loading without lock: {}", e);
                return self.load_directly(loader).await;
            }
        }

        let options = self.resolve_lock(options);
        let inner = &self.inner;
        let lock_key = inner.lock_key(key);
        let token = Bytes::from(Uuid::new_v4().to_string());

        let acquired = match inner
            .remote("set_nx", inner.store.set_nx(&lock_key, token.clone(), options.ttl))
            .await
        {
            Ok(acquired) => acquired,
            Err(e) => {
                warn!(key = %key, "Lock unavailable, loading without lock: {}", e);
                return self.load_directly(loader).await;
            }
        };

        if acquired {
            inner.metrics.record_lock_acquired();
            debug!(key = %key, "lock acquired");
            return self.load_holding_lock(key, &lock_key, token, loader).await;
        }

        debug!(key = %key, "lock held elsewhere, waiting");
        match self.wait_for_holder::<T>(key, &lock_key, options).await {
            Waited::Value(value) => Ok(Some(value)),
            Waited::GiveUp => {
                inner.metrics.record_lock_fallback();
                debug!(key = %key, "gave up waiting for lock holder");
                inner.metrics.record_loader_call();
                let loaded = loader().await?;
                if let Some(value) = &loaded {
                    if let Err(e) = self.set(key, value, SetOptions::default()).await {
                        warn!(key = %key, "Failed to cache value computed after waiting: {}", e);
                    }
                }
                Ok(loaded)
            }
        }
    }

    fn resolve_lock(&self, options: LockOptions) -> ResolvedLock {
        let defaults = &self.inner.config.lock;
        ResolvedLock {
            ttl: options
                .lock_ttl
                .unwrap_or(Duration::from_secs(defaults.ttl)),
            max_wait: options
                .max_wait
                .unwrap_or(Duration::from_millis(defaults.max_wait_ms)),
            poll_interval: options
                .poll_interval
                .unwrap_or(Duration::from_millis(defaults.poll_interval_ms)),
        }
    }

    async fn load_directly<T, F, Fut>(&self, loader: F) -> Result<Option<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        self.inner.metrics.record_loader_call();
        loader().await
    }

    /// Run the loader, cache its value, and release the lock on every path
    async fn load_holding_lock<T, F, Fut>(
        &self,
        key: &str,
        lock_key: &str,
        token: Bytes,
        loader: F,
    ) -> Result<Option<T>>
    where
        T: Serialize + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Option<T>>> + Send,
    {
        self.inner.metrics.record_loader_call();
        let outcome = loader().await;

        if let Ok(Some(value)) = &outcome {
            if let Err(e) = self.set(key, value, SetOptions::default()).await {
                warn!(key = %key, "Failed to cache value computed under lock: {}", e);
            }
        }

        self.release(lock_key, token).await;
        outcome
    }

    async fn release(&self, lock_key: &str, token: Bytes) {
        let inner = &self.inner;
        match inner
            .remote("delete_if_equals", inner.store.delete_if_equals(lock_key, token))
            .await
        {
            Ok(true) => debug!(lock = %lock_key, "lock released"),
            Ok(false) => warn!(lock = %lock_key, "lock expired before release"),
            // The lock TTL reclaims it.
            Err(e) => warn!(lock = %lock_key, "Failed to release lock: {}", e),
        }
    }

    /// Poll for the holder's value until it appears, the lock vanishes, or
    /// `max_wait` runs out
    async fn wait_for_holder<T: DeserializeOwned>(
        &self,
        key: &str,
        lock_key: &str,
        options: ResolvedLock,
    ) -> Waited<T> {
        let inner = &self.inner;
        let deadline = Instant::now() + options.max_wait;

        while Instant::now() < deadline {
            tokio::time::sleep(options.poll_interval).await;

            match self.read::<T>(key).await {
                Ok(Some(value)) => return Waited::Value(value),
                Ok(None) => {}
                Err(e) => {
                    debug!(key = %key, "read failed while waiting: {}", e);
                    return Waited::GiveUp;
                }
            }

            match inner.remote("exists", inner.store.exists(lock_key)).await {
                Ok(true) => {}
                Ok(false) => {
                    // The holder may have written just before releasing.
                    return match self.read::<T>(key).await {
                        Ok(Some(value)) => Waited::Value(value),
                        _ => Waited::GiveUp,
                    };
                }
                Err(_) => return Waited::GiveUp,
            }
        }

        Waited::GiveUp
    }
}
