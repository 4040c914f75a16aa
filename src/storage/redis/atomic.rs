//! Atomic primitives used by the stampede lock

use super::pool::RedisPool;
use crate::utils::error::{CacheError, Result};
use std::time::Duration;

impl RedisPool {
    /// `SET key value NX PX ttl`; true when this call created the key
    pub(crate) async fn set_if_absent(&self, key: &str, value: &[u8], ttl: Duration) -> Result<bool> {
        let mut conn = self.connection();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl.as_millis().max(1) as u64)
            .query_async(&mut conn)
            .await
            .map_err(CacheError::Redis)?;
        Ok(reply.is_some())
    }

    /// Delete `key` only while it still holds `expected`
    pub(crate) async fn compare_and_delete(&self, key: &str, expected: &[u8]) -> Result<bool> {
        let mut conn = self.connection();
        let removed: i64 = self
            .release_script
            .key(key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await
            .map_err(CacheError::Redis)?;
        Ok(removed > 0)
    }
}
