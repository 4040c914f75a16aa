//! Redis Pub/Sub operations

use super::pool::RedisPool;
use crate::utils::error::{CacheError, Result};
use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use redis::AsyncCommands;
use tracing::debug;

impl RedisPool {
    pub(crate) async fn publish_message(&self, channel: &str, message: &[u8]) -> Result<()> {
        let mut conn = self.connection();
        let receivers: i64 = conn
            .publish(channel, message)
            .await
            .map_err(CacheError::Redis)?;
        debug!(channel = %channel, receivers, "published message");
        Ok(())
    }

    /// Subscribe on a dedicated connection
    ///
    /// The stream ends when that connection drops.
    pub(crate) async fn subscribe_channel(&self, channel: &str) -> Result<BoxStream<'static, Bytes>> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(CacheError::Redis)?;
        pubsub.subscribe(channel).await.map_err(CacheError::Redis)?;
        debug!(channel = %channel, "subscribed");

        Ok(pubsub
            .into_on_message()
            .map(|msg| Bytes::copy_from_slice(msg.get_payload_bytes()))
            .boxed())
    }
}
