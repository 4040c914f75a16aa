//! Cursor-based key enumeration
//!
//! `SCAN` never blocks the server the way `KEYS` does, at the cost of
//! possibly reporting a key more than once.

use super::pool::RedisPool;
use crate::core::pattern::KeyPattern;
use crate::utils::error::{CacheError, Result};
use std::collections::BTreeSet;
use tracing::debug;

const SCAN_BATCH: usize = 500;

impl RedisPool {
    pub(crate) async fn scan_match(&self, pattern: &KeyPattern) -> Result<Vec<String>> {
        let mut conn = self.connection();
        let mut keys = BTreeSet::new();
        let mut cursor: u64 = 0;

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern.store_match())
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(CacheError::Redis)?;

            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        debug!(pattern = %pattern, matched = keys.len(), "scanned Remote Tier keys");
        Ok(keys.into_iter().collect())
    }
}
