//! In-process Remote Tier
//!
//! An expiring map plus broadcast channels. Several cache-manager instances
//! sharing one `Arc<MemoryStore>` behave like processes sharing one Redis:
//! same keys, same atomic primitives, same pub/sub fan-out. Deadlines use the
//! tokio clock so paused-time tests see entries expire.
//!
//! Expired entries are dropped when read, and writes purge the whole map
//! whenever it has doubled since the last purge or `PURGE_INTERVAL` has
//! passed, so keys nobody reads again do not pile up.

use super::{Expiry, RemoteEntry, RemoteStore};
use crate::core::pattern::KeyPattern;
use crate::utils::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;

const CHANNEL_CAPACITY: usize = 1024;
const MIN_PURGE_LEN: usize = 1024;
const PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct StoredValue {
    data: Bytes,
    deadline: Option<Instant>,
}

impl StoredValue {
    fn is_live(&self, now: Instant) -> bool {
        self.deadline.is_none_or(|deadline| deadline > now)
    }

    fn remaining(&self, now: Instant) -> Expiry {
        match self.deadline {
            None => Expiry::Never,
            Some(deadline) => Expiry::After(deadline.saturating_duration_since(now)),
        }
    }
}

#[derive(Debug)]
struct Entries {
    map: HashMap<String, StoredValue>,
    purge_at_len: usize,
    next_purge: Instant,
}

impl Default for Entries {
    fn default() -> Self {
        Self {
            map: HashMap::new(),
            purge_at_len: MIN_PURGE_LEN,
            next_purge: Instant::now() + PURGE_INTERVAL,
        }
    }
}

impl Entries {
    fn insert(&mut self, key: &str, value: StoredValue, now: Instant) {
        self.map.insert(key.to_string(), value);
        if self.map.len() >= self.purge_at_len || now >= self.next_purge {
            self.purge(now);
        }
    }

    fn purge(&mut self, now: Instant) {
        let before = self.map.len();
        self.map.retain(|_, value| value.is_live(now));
        self.purge_at_len = (self.map.len() * 2).max(MIN_PURGE_LEN);
        self.next_purge = now + PURGE_INTERVAL;
        debug!(
            removed = before - self.map.len(),
            live = self.map.len(),
            "purged expired entries"
        );
    }
}

/// In-process Remote Tier
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<Entries>,
    channels: Mutex<HashMap<String, broadcast::Sender<Bytes>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .map
            .values()
            .filter(|value| value.is_live(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self, key: &str, now: Instant) -> Option<RemoteEntry> {
        let mut entries = self.entries.lock();
        match entries.map.get(key) {
            Some(value) if value.is_live(now) => Some(RemoteEntry {
                data: value.data.clone(),
                ttl: value.remaining(now),
            }),
            Some(_) => {
                entries.map.remove(key);
                None
            }
            None => None,
        }
    }

    fn sender(&self, channel: &str) -> broadcast::Sender<Bytes> {
        self.channels
            .lock()
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }
}

fn deadline_for(expiry: Expiry, now: Instant) -> Option<Instant> {
    expiry.as_duration().map(|ttl| now + ttl)
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<RemoteEntry>> {
        Ok(self.read(key, Instant::now()))
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<RemoteEntry>>> {
        let now = Instant::now();
        Ok(keys.iter().map(|key| self.read(key, now)).collect())
    }

    async fn set(&self, key: &str, value: Bytes, expiry: Expiry) -> Result<()> {
        let now = Instant::now();
        self.entries.lock().insert(
            key,
            StoredValue {
                data: value,
                deadline: deadline_for(expiry, now),
            },
            now,
        );
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: Bytes, ttl: Duration) -> Result<bool> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        if entries.map.get(key).is_some_and(|existing| existing.is_live(now)) {
            return Ok(false);
        }
        entries.insert(
            key,
            StoredValue {
                data: value,
                deadline: Some(now + ttl),
            },
            now,
        );
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let now = Instant::now();
        Ok(self
            .entries
            .lock()
            .map
            .remove(key)
            .is_some_and(|value| value.is_live(now)))
    }

    async fn delete_many(&self, keys: &[String]) -> Result<usize> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        Ok(keys
            .iter()
            .filter_map(|key| entries.map.remove(key))
            .filter(|value| value.is_live(now))
            .count())
    }

    async fn delete_if_equals(&self, key: &str, expected: Bytes) -> Result<bool> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        match entries.map.get(key) {
            Some(value) if value.is_live(now) && value.data == expected => {
                entries.map.remove(key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.read(key, Instant::now()).is_some())
    }

    async fn scan(&self, pattern: &KeyPattern) -> Result<Vec<String>> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        entries.purge(now);
        Ok(entries
            .map
            .keys()
            .filter(|key| pattern.is_match(key))
            .cloned()
            .collect())
    }

    async fn publish(&self, channel: &str, payload: Bytes) -> Result<()> {
        // No receivers is not an error, same as PUBLISH to an empty channel.
        let receivers = self.sender(channel).send(payload).unwrap_or(0);
        debug!(channel = %channel, receivers, "published message");
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<BoxStream<'static, Bytes>> {
        let receiver = self.sender(channel).subscribe();
        Ok(BroadcastStream::new(receiver)
            .filter_map(|message| async move { message.ok() })
            .boxed())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
