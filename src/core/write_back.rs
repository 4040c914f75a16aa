//! Deferred write-back to the system of record
//!
//! The first write to a key arms a timer; writes to the same key before it
//! fires only replace the pending value. When the timer fires the latest
//! value is handed to the caller's write-back function. Timers run on the
//! tokio clock.

use crate::monitoring::MetricsCollector;
use crate::utils::error::Result;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::BoxFuture;
use serde_json::Value;
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, warn};

/// Persists one value to the system of record
pub type WriteBackFn = Arc<dyn Fn(String, Value) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Wrap an async closure as a [`WriteBackFn`]
pub fn write_back_fn<F, Fut>(f: F) -> WriteBackFn
where
    F: Fn(String, Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(
        move |key: String, value: Value| -> BoxFuture<'static, Result<()>> {
            Box::pin(f(key, value))
        },
    )
}

struct PendingWrite {
    value: Value,
    func: WriteBackFn,
}

type PendingMap = DashMap<String, PendingWrite>;

/// Coalescing, delayed write-back queue
pub struct WriteBackScheduler {
    pending: Arc<PendingMap>,
    delay: Duration,
    metrics: Arc<MetricsCollector>,
}

impl std::fmt::Debug for WriteBackScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteBackScheduler")
            .field("pending", &self.pending.len())
            .field("delay", &self.delay)
            .finish()
    }
}

impl WriteBackScheduler {
    pub fn new(delay: Duration, metrics: Arc<MetricsCollector>) -> Self {
        Self {
            pending: Arc::new(DashMap::new()),
            delay,
            metrics,
        }
    }

    /// Queue `value` for `key`, replacing any value still waiting
    pub fn schedule(&self, key: &str, value: Value, func: WriteBackFn) {
        let armed = match self.pending.entry(key.to_string()) {
            Entry::Occupied(mut slot) => {
                let slot = slot.get_mut();
                slot.value = value;
                slot.func = func;
                false
            }
            Entry::Vacant(slot) => {
                slot.insert(PendingWrite { value, func });
                true
            }
        };

        if !armed {
            debug!(key = %key, "coalesced pending write-back");
            return;
        }

        let pending = Arc::downgrade(&self.pending);
        let metrics = self.metrics.clone();
        let delay = self.delay;
        let key = key.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(pending) = Weak::upgrade(&pending) {
                flush_key(&pending, &key, &metrics).await;
            }
        });
    }

    /// Flush every pending write now
    pub async fn flush_all(&self) -> usize {
        let keys: Vec<String> = self.pending.iter().map(|entry| entry.key().clone()).collect();
        let mut flushed = 0;
        for key in keys {
            if flush_key(&self.pending, &key, &self.metrics).await {
                flushed += 1;
            }
        }
        flushed
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

/// Returns whether a write was attempted
async fn flush_key(pending: &PendingMap, key: &str, metrics: &MetricsCollector) -> bool {
    let Some((key, write)) = pending.remove(key) else {
        // Already flushed by `flush_all`
        return false;
    };

    match (write.func)(key.clone(), write.value).await {
        Ok(()) => {
            debug!(key = %key, "write-back flushed");
            metrics.record_write_back(true);
        }
        Err(e) => {
            warn!(key = %key, "write-back failed: {}", e);
            metrics.record_write_back(false);
        }
    }
    true
}
