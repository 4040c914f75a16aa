//! Loaders for read-through keys
//!
//! A loader is registered against a glob. Plain `get` calls on keys whose
//! policy strategy is `read-through` invoke the first matching loader on a
//! miss and cache what it returns.

use super::manager::TieredCache;
use super::types::SetOptions;
use crate::core::pattern::KeyPattern;
use crate::utils::error::{CacheError, Result};
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info};

/// Produces the value for a missing key, or `None` if it has none
pub type LoaderFn = Arc<dyn Fn(String) -> BoxFuture<'static, Result<Option<Value>>> + Send + Sync>;

/// Wrap an async closure as a [`LoaderFn`]
pub fn loader_fn<F, Fut>(f: F) -> LoaderFn
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<Value>>> + Send + 'static,
{
    Arc::new(
        move |key: String| -> BoxFuture<'static, Result<Option<Value>>> { Box::pin(f(key)) },
    )
}

pub(super) struct RegisteredLoader {
    pattern: KeyPattern,
    func: LoaderFn,
}

impl TieredCache {
    /// Register `loader` for keys matching `pattern`
    ///
    /// Only keys whose policy is `read-through` consult it. Loaders are
    /// tried in registration order.
    pub fn register_loader(&self, pattern: &str, loader: LoaderFn) -> Result<()> {
        let pattern = KeyPattern::compile(pattern)?;
        info!(pattern = %pattern.as_str(), "Registered read-through loader");
        self.inner.loaders.write().push(RegisteredLoader {
            pattern,
            func: loader,
        });
        Ok(())
    }

    pub(super) fn loader_for(&self, key: &str) -> Option<LoaderFn> {
        self.inner
            .loaders
            .read()
            .iter()
            .find(|loader| loader.pattern.is_match(key))
            .map(|loader| loader.func.clone())
    }

    /// Run `loader` for a missed key; `cache` is false when the Remote Tier is down
    pub(super) async fn read_through<T: DeserializeOwned>(
        &self,
        key: &str,
        loader: LoaderFn,
        cache: bool,
    ) -> Result<Option<T>> {
        self.inner.metrics.record_loader_call();
        let Some(value) = loader(key.to_string()).await? else {
            debug!(key = %key, "loader has no value");
            return Ok(None);
        };

        if cache {
            self.store_loaded(key, &value, SetOptions::default()).await?;
        }

        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| CacheError::decode(key, e.to_string()))
    }
}
