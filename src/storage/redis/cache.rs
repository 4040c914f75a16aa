//! Single-key Remote Tier operations
//!
//! Reads fetch the value together with its remaining lifetime so the caller
//! can bound how long a Local Tier mirror may live.

use super::pool::RedisPool;
use crate::storage::{Expiry, RemoteEntry};
use crate::utils::error::{CacheError, Result};
use bytes::Bytes;
use redis::AsyncCommands;
use std::time::Duration;

/// Build an entry from a `GET` reply and a `PTTL` reply
///
/// `PTTL` answers `-1` for keys without expiry and `-2` for missing keys.
pub(crate) fn entry_from_replies(data: Option<Vec<u8>>, pttl_ms: i64) -> Option<RemoteEntry> {
    let data = data?;
    let ttl = match pttl_ms {
        -1 => Expiry::Never,
        ms if ms > 0 => Expiry::After(Duration::from_millis(ms as u64)),
        // Expired between GET and PTTL
        _ => return None,
    };
    Some(RemoteEntry {
        data: Bytes::from(data),
        ttl,
    })
}

impl RedisPool {
    pub(crate) async fn get_entry(&self, key: &str) -> Result<Option<RemoteEntry>> {
        let mut conn = self.connection();
        let (data, pttl): (Option<Vec<u8>>, i64) = redis::pipe()
            .atomic()
            .cmd("GET")
            .arg(key)
            .cmd("PTTL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(CacheError::Redis)?;
        Ok(entry_from_replies(data, pttl))
    }

    pub(crate) async fn set_entry(&self, key: &str, value: &[u8], expiry: Expiry) -> Result<()> {
        let mut conn = self.connection();
        match expiry {
            Expiry::Never => {
                let _: () = conn.set(key, value).await.map_err(CacheError::Redis)?;
            }
            Expiry::After(ttl) => {
                let millis = ttl.as_millis().max(1) as u64;
                let _: () = conn
                    .pset_ex(key, value, millis)
                    .await
                    .map_err(CacheError::Redis)?;
            }
        }
        Ok(())
    }

    pub(crate) async fn delete_key(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection();
        let removed: usize = conn.del(key).await.map_err(CacheError::Redis)?;
        Ok(removed > 0)
    }

    pub(crate) async fn key_exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection();
        let exists: bool = conn.exists(key).await.map_err(CacheError::Redis)?;
        Ok(exists)
    }
}
