//! Batch Remote Tier operations

use super::cache::entry_from_replies;
use super::pool::RedisPool;
use crate::storage::RemoteEntry;
use crate::utils::error::{CacheError, Result};
use redis::{AsyncCommands, Value, from_redis_value};

impl RedisPool {
    /// `GET` plus `PTTL` for every key in a single pipeline
    pub(crate) async fn get_entries(&self, keys: &[String]) -> Result<Vec<Option<RemoteEntry>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        for key in keys {
            pipe.cmd("GET").arg(key).cmd("PTTL").arg(key);
        }

        let mut conn = self.connection();
        let replies: Vec<Value> = pipe.query_async(&mut conn).await.map_err(CacheError::Redis)?;
        decode_pairs(&replies, keys.len())
    }

    pub(crate) async fn delete_keys(&self, keys: &[String]) -> Result<usize> {
        if keys.is_empty() {
            return Ok(0);
        }

        let mut conn = self.connection();
        let removed: usize = conn.del(keys).await.map_err(CacheError::Redis)?;
        Ok(removed)
    }
}

/// Decode flat `[GET, PTTL, GET, PTTL, ...]` replies into positional entries
pub(crate) fn decode_pairs(replies: &[Value], expected: usize) -> Result<Vec<Option<RemoteEntry>>> {
    if replies.len() != expected * 2 {
        return Err(CacheError::internal(format!(
            "Pipeline returned {} replies for {} keys",
            replies.len(),
            expected
        )));
    }

    replies
        .chunks_exact(2)
        .map(|pair| {
            let data: Option<Vec<u8>> = from_redis_value(&pair[0]).map_err(CacheError::Redis)?;
            let pttl: i64 = from_redis_value(&pair[1]).map_err(CacheError::Redis)?;
            Ok(entry_from_replies(data, pttl))
        })
        .collect()
}
