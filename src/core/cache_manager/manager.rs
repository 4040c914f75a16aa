//! Cache manager implementation
//!
//! Reads go Local Tier, then Remote Tier. Writes go to the Remote Tier
//! first and are mirrored locally afterwards, never for longer than the
//! Remote copy still has to live.

use super::read_through::RegisteredLoader;
use super::types::SetOptions;
use crate::config::{CacheConfig, InvalidationTrigger, Validate, WriteStrategy};
use crate::core::codec::Codec;
use crate::core::invalidation::{
    self, InvalidationEvent, InvalidationKind, InvalidationRules, InvalidationSink,
};
use crate::core::local_tier::{Admission, LocalTier};
use crate::core::pattern::KeyPattern;
use crate::core::policy::{KeyPolicyRegistry, ResolvedPolicy};
use crate::core::write_back::WriteBackScheduler;
use crate::monitoring::background::{spawn_local_sweeper, spawn_metrics_reporter};
use crate::monitoring::{CacheMetrics, MetricsCollector};
use crate::storage::{Expiry, RemoteStore};
use crate::utils::error::{CacheError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Handle to one cache-manager instance
///
/// Cloning is cheap and every clone shares the same tiers. Background tasks
/// stop when the last clone is dropped or on [`shutdown`](Self::shutdown).
#[derive(Clone)]
pub struct TieredCache {
    pub(super) inner: Arc<Inner>,
}

pub(super) struct Inner {
    pub(super) id: Uuid,
    pub(super) config: CacheConfig,
    pub(super) store: Arc<dyn RemoteStore>,
    pub(super) local: Arc<LocalTier>,
    pub(super) metrics: Arc<MetricsCollector>,
    codec: Codec,
    policies: KeyPolicyRegistry,
    rules: InvalidationRules,
    write_back: WriteBackScheduler,
    pub(super) loaders: RwLock<Vec<RegisteredLoader>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl TieredCache {
    /// Build an instance over `store` and start its background tasks
    ///
    /// The invalidation subscription is in place before this returns.
    pub async fn new(config: CacheConfig, store: Arc<dyn RemoteStore>) -> Result<Self> {
        config
            .validate()
            .map_err(|e| CacheError::Config(format!("Cache config error: {}", e)))?;

        let metrics = Arc::new(MetricsCollector::new());
        let inner = Arc::new(Inner {
            id: Uuid::new_v4(),
            codec: Codec::new(&config.compression),
            policies: KeyPolicyRegistry::new(&config.policies, config.default_ttl)?,
            rules: InvalidationRules::new(&config.invalidation.rules)?,
            write_back: WriteBackScheduler::new(config.write_back_delay(), metrics.clone()),
            local: Arc::new(LocalTier::new(
                config.local.max_entries,
                config.local.max_value_bytes,
            )),
            store,
            metrics,
            loaders: RwLock::new(Vec::new()),
            tasks: Mutex::new(Vec::new()),
            config,
        });

        let mut tasks = Vec::new();
        if inner.config.local.enabled {
            tasks.push(spawn_local_sweeper(
                inner.local.clone(),
                inner.metrics.clone(),
                inner.config.local.sweep_interval(),
            ));
        }
        tasks.push(spawn_metrics_reporter(
            inner.metrics.clone(),
            inner.local.clone(),
            inner.store.clone(),
            inner.config.metrics_interval(),
            inner.config.operation_timeout(),
        ));

        if inner.config.invalidation.enabled {
            let channel = inner.config.invalidation.channel.clone();
            let initial = match inner
                .remote("subscribe", inner.store.subscribe(&channel))
                .await
            {
                Ok(stream) => Some(stream),
                Err(e) => {
                    warn!(channel = %channel, "Invalidation subscription failed, retrying in background: {}", e);
                    None
                }
            };
            let sink: Arc<dyn InvalidationSink> = inner.clone();
            tasks.push(invalidation::spawn_listener(
                inner.store.clone(),
                channel,
                initial,
                Arc::downgrade(&sink),
            ));
        }
        inner.tasks.lock().extend(tasks);

        info!(
            instance = %inner.id,
            backend = inner.store.backend(),
            prefix = %inner.config.key_prefix,
            policies = inner.policies.len(),
            invalidation_rules = inner.rules.len(),
            "Tiered cache ready"
        );
        Ok(Self { inner })
    }

    /// Read a value, Local Tier first
    ///
    /// A miss on a key whose policy is read-through is filled by the loader
    /// registered for it with [`register_loader`](Self::register_loader).
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let loader = match self.inner.policies.resolve(key).strategy {
            WriteStrategy::ReadThrough => self.loader_for(key),
            _ => None,
        };
        let Some(loader) = loader else {
            return self.read(key).await;
        };

        match self.read::<T>(key).await {
            Ok(Some(value)) => Ok(Some(value)),
            Ok(None) => self.read_through(key, loader, true).await,
            Err(e) if e.is_transient() => {
                warn!(key = %key, "Remote Tier unavailable, loading directly: {}", e);
                self.read_through(key, loader, false).await
            }
            Err(e) => Err(e),
        }
    }

    /// `get` without read-through
    pub(super) async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let started = Instant::now();
        let result = self.lookup(key).await;
        self.inner.metrics.record_latency(started.elapsed());
        result
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let inner = &self.inner;

        if let Some(data) = inner.local.get(key) {
            let value = inner.decode(key, &data)?;
            inner.metrics.record_local_hit();
            debug!(key = %key, "local hit");
            return Ok(Some(value));
        }

        let issued = Instant::now();
        let generation = inner.local.generation();
        let remote_key = inner.remote_key(key);
        match inner.remote("get", inner.store.get(&remote_key)).await? {
            Some(entry) => {
                let value = inner.decode(key, &entry.data)?;
                inner.mirror(key, entry.data, entry.ttl, issued, generation);
                inner.metrics.record_remote_hit();
                debug!(key = %key, "remote hit");
                Ok(Some(value))
            }
            None => {
                inner.metrics.record_miss();
                debug!(key = %key, "miss");
                Ok(None)
            }
        }
    }

    /// Read-through `get`: on a miss the loader's value is stored and returned
    ///
    /// An unreachable Remote Tier also sends the caller to the loader.
    pub async fn get_or_load<T, F, Fut>(&self, key: &str, loader: F) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Option<T>>> + Send,
    {
        match self.read::<T>(key).await {
            Ok(Some(value)) => return Ok(Some(value)),
            Ok(None) => {}
            Err(e) if e.is_transient() => {
                warn!(key = %key, "Remote Tier unavailable, loading directly: {}", e);
                self.inner.metrics.record_loader_call();
                return loader().await;
            }
            Err(e) => return Err(e),
        }

        self.inner.metrics.record_loader_call();
        let loaded = loader().await?;
        if let Some(value) = &loaded {
            self.store_loaded(key, value, SetOptions::default()).await?;
        }
        Ok(loaded)
    }

    /// Cache a freshly loaded value; an unreachable Remote Tier is not fatal
    pub(super) async fn store_loaded<T>(&self, key: &str, value: &T, options: SetOptions) -> Result<()>
    where
        T: Serialize + Sync,
    {
        match self.set(key, value, options).await {
            Err(e) if e.is_transient() => {
                warn!(key = %key, "Failed to cache loaded value: {}", e);
                Ok(())
            }
            other => other,
        }
    }

    /// Write a value to the Remote Tier and mirror it locally
    pub async fn set<T>(&self, key: &str, value: &T, options: SetOptions) -> Result<()>
    where
        T: Serialize + ?Sized + Sync,
    {
        let started = Instant::now();
        let inner = &self.inner;

        let policy = inner.policies.resolve(key);
        let expiry = options.ttl.map(Expiry::from_secs).unwrap_or(policy.ttl);
        let encoded = inner.codec.encode(value)?;

        let issued = Instant::now();
        let generation = inner.local.generation();
        let remote_key = inner.remote_key(key);
        inner
            .remote("set", inner.store.set(&remote_key, encoded.bytes.clone(), expiry))
            .await?;
        inner.metrics.record_set(encoded.saved);
        inner.mirror(key, encoded.bytes, expiry, issued, generation);
        debug!(key = %key, ttl = ?expiry, compressed_saved = encoded.saved, "set");

        match (policy.strategy, options.write_back) {
            (WriteStrategy::WriteBack, Some(write_back)) => {
                inner
                    .write_back
                    .schedule(key, serde_json::to_value(value)?, write_back);
            }
            (_, Some(_)) => {
                debug!(key = %key, strategy = ?policy.strategy, "write-back function ignored for this key's policy");
            }
            _ => {}
        }

        inner.after_write(key, InvalidationTrigger::Set).await;
        inner.metrics.record_latency(started.elapsed());
        Ok(())
    }

    /// Read many keys; the result is positional and absent keys are `Ok(None)`
    ///
    /// The outer error means the Remote Tier batch read failed. An entry that
    /// fails to decode yields a [`CacheError::Decode`] in its own slot and
    /// leaves the other keys unaffected.
    pub async fn mget<T: DeserializeOwned>(
        &self,
        keys: &[&str],
    ) -> Result<Vec<Result<Option<T>>>> {
        let started = Instant::now();
        let inner = &self.inner;
        let mut results: Vec<Result<Option<T>>> = keys.iter().map(|_| Ok(None)).collect();
        let mut pending = Vec::new();

        for (index, key) in keys.iter().enumerate() {
            match inner.local.get(key) {
                Some(data) => {
                    results[index] = inner.decode(key, &data).map(Some);
                    if results[index].is_ok() {
                        inner.metrics.record_local_hit();
                    }
                }
                None => pending.push(index),
            }
        }

        if !pending.is_empty() {
            let remote_keys: Vec<String> = pending
                .iter()
                .map(|&index| inner.remote_key(keys[index]))
                .collect();
            let issued = Instant::now();
            let generation = inner.local.generation();
            let entries = inner.remote("mget", inner.store.mget(&remote_keys)).await?;

            for (&index, entry) in pending.iter().zip(entries) {
                let key = keys[index];
                let Some(entry) = entry else {
                    inner.metrics.record_miss();
                    continue;
                };
                results[index] = match inner.decode(key, &entry.data) {
                    Ok(value) => {
                        inner.mirror(key, entry.data, entry.ttl, issued, generation);
                        inner.metrics.record_remote_hit();
                        Ok(Some(value))
                    }
                    Err(e) => {
                        warn!(key = %key, "Undecodable entry in batch read: {}", e);
                        Err(e)
                    }
                };
            }
        }

        inner.metrics.record_latency(started.elapsed());
        Ok(results)
    }

    /// Remove a key from both tiers; returns whether the Remote Tier held it
    pub async fn del(&self, key: &str) -> Result<bool> {
        let inner = &self.inner;
        inner.local.remove(key);

        let remote_key = inner.remote_key(key);
        let existed = inner.remote("delete", inner.store.delete(&remote_key)).await?;
        // Discards mirrors from calls that overlapped the Remote delete.
        inner.local.remove(key);
        inner.metrics.record_delete();
        debug!(key = %key, existed, "deleted");

        inner.after_write(key, InvalidationTrigger::Delete).await;
        Ok(existed)
    }

    /// Remove every key matching `pattern` from both tiers on every instance
    ///
    /// Returns how many Remote Tier keys this call removed.
    pub async fn invalidate_pattern(&self, pattern: &str) -> Result<usize> {
        let removed = self.inner.sweep(pattern).await?;
        self.inner
            .publish(InvalidationKind::Pattern, pattern)
            .await;
        Ok(removed)
    }

    pub fn metrics(&self) -> CacheMetrics {
        self.inner.metrics.snapshot(self.inner.local.len())
    }

    /// Flush every pending write-back now
    pub async fn flush_write_backs(&self) -> usize {
        self.inner.write_back.flush_all().await
    }

    pub fn pending_write_backs(&self) -> usize {
        self.inner.write_back.pending()
    }

    /// Drop expired Local Tier entries now
    pub fn sweep_local(&self) -> usize {
        let removed = self.inner.local.sweep_expired();
        self.inner.metrics.record_local_expired(removed);
        removed
    }

    /// Policy that applies to `key`
    pub fn policy_for(&self, key: &str) -> ResolvedPolicy {
        self.inner.policies.resolve(key)
    }

    /// Flush write-backs and stop background tasks
    pub async fn shutdown(&self) {
        let flushed = self.inner.write_back.flush_all().await;
        let tasks: Vec<JoinHandle<()>> = self.inner.tasks.lock().drain(..).collect();
        for task in &tasks {
            task.abort();
        }
        info!(
            instance = %self.inner.id,
            flushed,
            stopped_tasks = tasks.len(),
            "Tiered cache shut down"
        );
    }

    /// Unique id stamped on this instance's invalidation events
    pub fn instance_id(&self) -> Uuid {
        self.inner.id
    }

    pub fn local(&self) -> &LocalTier {
        &self.inner.local
    }

    pub fn store(&self) -> &Arc<dyn RemoteStore> {
        &self.inner.store
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Namespaced Remote Tier key for `key`
    pub fn remote_key(&self, key: &str) -> String {
        self.inner.remote_key(key)
    }

    #[cfg(feature = "metrics")]
    pub fn render_prometheus(
        &self,
        exporter: &crate::monitoring::PrometheusExporter,
    ) -> Result<String> {
        exporter.update(&self.metrics());
        exporter.render()
    }
}

impl fmt::Debug for TieredCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TieredCache")
            .field("instance", &self.inner.id)
            .field("backend", &self.inner.store.backend())
            .field("key_prefix", &self.inner.config.key_prefix)
            .field("local_entries", &self.inner.local.len())
            .finish()
    }
}

impl Inner {
    pub(super) fn remote_key(&self, key: &str) -> String {
        format!("{}{}", self.config.key_prefix, key)
    }

    pub(super) fn lock_key(&self, key: &str) -> String {
        format!("{}lock:{}", self.config.key_prefix, key)
    }

    pub(super) fn stats_key(&self, key: &str) -> String {
        format!("{}stats:{}", self.config.key_prefix, key)
    }

    /// Run one Remote Tier call under the operation deadline
    ///
    /// Every failure is counted before it is returned.
    pub(super) async fn remote<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let deadline = self.config.operation_timeout();
        match tokio::time::timeout(deadline, call).await {
            Ok(Ok(value)) => {
                self.metrics.set_remote_connected(true);
                Ok(value)
            }
            Ok(Err(e)) => {
                self.metrics.record_error();
                if e.is_transient() {
                    self.metrics.set_remote_connected(false);
                }
                debug!(operation, "Remote Tier call failed: {}", e);
                Err(e)
            }
            Err(_) => {
                self.metrics.record_error();
                self.metrics.set_remote_connected(false);
                Err(CacheError::timeout(format!(
                    "Remote Tier {} exceeded {}ms",
                    operation,
                    deadline.as_millis()
                )))
            }
        }
    }

    pub(super) fn decode<T: DeserializeOwned>(&self, key: &str, data: &[u8]) -> Result<T> {
        self.codec.decode(key, data).inspect_err(|_| {
            self.metrics.record_decode_error();
        })
    }

    /// Mirror into the Local Tier, bounded by the Remote lifetime left
    ///
    /// `issued` is when the Remote call that produced `remote_ttl` started and
    /// `generation` the Local Tier generation read just before it.
    pub(super) fn mirror(
        &self,
        key: &str,
        data: Bytes,
        remote_ttl: Expiry,
        issued: Instant,
        generation: u64,
    ) {
        if !self.config.local.enabled {
            return;
        }

        let cap = Expiry::After(self.config.local.ttl_cap());
        let Some(ttl) = cap.min(remote_ttl).as_duration() else {
            return;
        };
        let ttl = ttl.saturating_sub(issued.elapsed());

        match self.local.insert_if_unchanged(key, data, ttl, generation) {
            Admission::Stored => {}
            Admission::StoredWithEviction => self.metrics.record_eviction(),
            Admission::Rejected => debug!(key = %key, "not mirrored locally"),
            Admission::Superseded => debug!(key = %key, "mirror dropped, removed while in flight"),
        }
    }

    /// Purge matching keys locally, then delete them from the Remote Tier
    pub(super) async fn sweep(&self, glob: &str) -> Result<usize> {
        let local_pattern = KeyPattern::compile(glob)?;
        let purged = self.local.purge_matching(&local_pattern);

        let remote_pattern = KeyPattern::prefixed(&self.config.key_prefix, glob)?;
        let keys = self.remote("scan", self.store.scan(&remote_pattern)).await?;
        let removed = if keys.is_empty() {
            0
        } else {
            self.remote("delete_many", self.store.delete_many(&keys))
                .await?
        };
        self.local.purge_matching(&local_pattern);

        self.metrics.record_invalidation();
        info!(pattern = %glob, removed, purged, "Invalidated pattern");
        Ok(removed)
    }

    /// Best-effort broadcast; failures are logged
    async fn publish(&self, kind: InvalidationKind, pattern: &str) {
        if !self.config.invalidation.enabled {
            return;
        }

        let payload = match InvalidationEvent::new(kind, pattern, self.id).to_bytes() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(pattern = %pattern, "Failed to encode invalidation: {}", e);
                return;
            }
        };

        let channel = &self.config.invalidation.channel;
        if let Err(e) = self
            .remote("publish", self.store.publish(channel, payload))
            .await
        {
            warn!(pattern = %pattern, "Failed to publish invalidation: {}", e);
        }
    }

    /// Notify peers about `key` and fire matching invalidation rules
    async fn after_write(&self, key: &str, operation: InvalidationTrigger) {
        self.publish(InvalidationKind::Key, key).await;

        for target in self.rules.targets(key, operation) {
            if let Err(e) = self.sweep(&target).await {
                warn!(key = %key, target = %target, "Invalidation rule sweep failed: {}", e);
            }
            self.publish(InvalidationKind::Pattern, &target).await;
        }
    }
}

#[async_trait]
impl InvalidationSink for Inner {
    fn origin_id(&self) -> Uuid {
        self.id
    }

    async fn apply(&self, event: InvalidationEvent) {
        match event.kind {
            InvalidationKind::Key => {
                if self.local.remove(&event.pattern) {
                    debug!(key = %event.pattern, origin = %event.origin_id, "dropped local copy");
                }
            }
            InvalidationKind::Pattern => {
                if let Err(e) = self.sweep(&event.pattern).await {
                    warn!(pattern = %event.pattern, "Peer invalidation sweep failed: {}", e);
                }
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        for task in self.tasks.get_mut().drain(..) {
            task.abort();
        }
    }
}
