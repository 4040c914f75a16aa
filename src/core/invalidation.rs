//! Invalidation bus
//!
//! Every instance publishes to and subscribes on one shared channel. Two
//! kinds of event travel on it:
//!
//! - `Key` events name a single key just written or deleted; peers drop
//!   their Local Tier copy of it.
//! - `Pattern` events name a glob; peers run a full `invalidate_pattern`
//!   sweep for it.
//!
//! Events carry the publishing instance's id so an instance can skip its
//! own messages. Delivery is best effort: a lost event leaves a peer stale
//! until the entry's own TTL runs out.

use super::pattern::KeyPattern;
use crate::config::{InvalidationRuleConfig, InvalidationTrigger};
use crate::storage::RemoteStore;
use crate::utils::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(300);

/// Scope of an invalidation event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidationKind {
    /// Drop one key from peer Local Tiers
    Key,
    /// Sweep every key matching a glob
    #[default]
    Pattern,
}

/// Message broadcast on the invalidation channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidationEvent {
    /// Key or glob over user-facing key names
    pub pattern: String,
    pub origin_id: Uuid,
    /// Unix time in milliseconds
    pub timestamp: i64,
    #[serde(default)]
    pub kind: InvalidationKind,
}

impl InvalidationEvent {
    pub fn new(kind: InvalidationKind, pattern: impl Into<String>, origin_id: Uuid) -> Self {
        Self {
            pattern: pattern.into(),
            origin_id,
            timestamp: chrono::Utc::now().timestamp_millis(),
            kind,
        }
    }

    pub fn to_bytes(&self) -> Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }

    pub fn from_bytes(payload: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(payload)?)
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    trigger: KeyPattern,
    on: Vec<InvalidationTrigger>,
    invalidates: Vec<String>,
}

/// Rules deciding which globs a write or delete invalidates
#[derive(Debug, Clone, Default)]
pub struct InvalidationRules {
    rules: Vec<CompiledRule>,
}

impl InvalidationRules {
    pub fn new(configs: &[InvalidationRuleConfig]) -> Result<Self> {
        let rules = configs
            .iter()
            .map(|rule| {
                for target in &rule.invalidates {
                    KeyPattern::compile(target)?;
                }
                Ok(CompiledRule {
                    trigger: KeyPattern::compile(&rule.trigger)?,
                    on: rule.on.clone(),
                    invalidates: rule.invalidates.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Globs to sweep after `operation` touched `key`, in rule order, deduplicated
    pub fn targets(&self, key: &str, operation: InvalidationTrigger) -> Vec<String> {
        let mut targets: Vec<String> = Vec::new();
        for rule in &self.rules {
            if rule.on.contains(&operation) && rule.trigger.is_match(key) {
                for target in &rule.invalidates {
                    if !targets.contains(target) {
                        targets.push(target.clone());
                    }
                }
            }
        }
        targets
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Receiver side of the bus
#[async_trait]
pub(crate) trait InvalidationSink: Send + Sync {
    fn origin_id(&self) -> Uuid;

    async fn apply(&self, event: InvalidationEvent);
}

/// Consume the channel until the sink is dropped
///
/// `initial` is a subscription made before the cache handle was returned,
/// so no event published after construction is missed. A missing or lost
/// subscription is re-established with exponential backoff.
pub(crate) fn spawn_listener(
    store: Arc<dyn RemoteStore>,
    channel: String,
    initial: Option<BoxStream<'static, Bytes>>,
    sink: Weak<dyn InvalidationSink>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut backoff = INITIAL_BACKOFF;
        let mut stream = initial;

        loop {
            let current = match stream.take() {
                Some(current) => current,
                None => match store.subscribe(&channel).await {
                    Ok(resubscribed) => {
                        info!(channel = %channel, "re-subscribed to invalidation channel");
                        backoff = INITIAL_BACKOFF;
                        resubscribed
                    }
                    Err(e) => {
                        error!(
                            error = %e,
                            backoff_secs = backoff.as_secs(),
                            "Invalidation listener error, reconnecting..."
                        );
                        tokio::time::sleep(backoff).await;
                        backoff = (backoff * 2).min(MAX_BACKOFF);
                        continue;
                    }
                },
            };

            if !consume(current, &sink).await {
                debug!("cache dropped, invalidation listener exiting");
                return;
            }

            warn!(channel = %channel, "invalidation subscription closed");
            tokio::time::sleep(backoff).await;
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }
    })
}

/// Returns false once the sink is gone
async fn consume(mut stream: BoxStream<'static, Bytes>, sink: &Weak<dyn InvalidationSink>) -> bool {
    while let Some(payload) = stream.next().await {
        let Some(sink) = sink.upgrade() else {
            return false;
        };

        match InvalidationEvent::from_bytes(&payload) {
            Ok(event) if event.origin_id == sink.origin_id() => {}
            Ok(event) => {
                debug!(pattern = %event.pattern, kind = ?event.kind, "received invalidation");
                sink.apply(event).await;
            }
            Err(e) => warn!("failed to parse invalidation message: {}", e),
        }
    }
    sink.strong_count() > 0
}
