//! Write-back integration tests
//!
//! Keys under a write-back policy are cached immediately and persisted to
//! the system of record after a delay, with repeated writes coalesced.

#[cfg(test)]
mod tests {
    use crate::common::{TestCluster, fixtures};
    use parking_lot::Mutex;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::time::Duration;
    use tiered_cache::config::WriteStrategy;
    use tiered_cache::{CacheConfig, CacheError, SetOptions, WriteBackFn, write_back_fn};

    type Database = Arc<Mutex<Vec<(String, Value)>>>;

    fn database() -> (Database, WriteBackFn) {
        let rows: Database = Arc::new(Mutex::new(Vec::new()));
        let sink = rows.clone();
        let func = write_back_fn(move |key, value| {
            let sink = sink.clone();
            async move {
                sink.lock().push((key, value));
                Ok(())
            }
        });
        (rows, func)
    }

    fn config() -> CacheConfig {
        let mut config = fixtures::config();
        config.write_back_delay_ms = 2000;
        config.policies = vec![
            fixtures::policy("guest-list:*", 600, WriteStrategy::WriteBack),
            fixtures::policy("wedding:*", 600, WriteStrategy::WriteThrough),
        ];
        config
    }

    /// The value is readable at once and persisted after the delay
    #[tokio::test(start_paused = true)]
    async fn test_write_back_is_delayed() {
        let cluster = TestCluster::new(2, config()).await;
        let (rows, func) = database();

        cluster
            .node(0)
            .set(
                "guest-list:42",
                &json!(["ana", "bo"]),
                SetOptions::default().with_write_back(func),
            )
            .await
            .unwrap();

        let read: Option<Value> = cluster.node(1).get("guest-list:42").await.unwrap();
        assert_eq!(read, Some(json!(["ana", "bo"])));
        assert!(rows.lock().is_empty());

        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert_eq!(rows.lock().len(), 1);
        assert_eq!(cluster.node(0).pending_write_backs(), 0);
    }

    /// Bursts of writes persist only the last value
    #[tokio::test(start_paused = true)]
    async fn test_bursts_are_coalesced() {
        let cluster = TestCluster::new(1, config()).await;
        let cache = cluster.node(0);
        let (rows, func) = database();

        for count in 1..=5 {
            cache
                .set(
                    "guest-list:42",
                    &json!({"count": count}),
                    SetOptions::default().with_write_back(func.clone()),
                )
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(
            rows.lock().as_slice(),
            &[("guest-list:42".to_string(), json!({"count": 5}))]
        );
        assert_eq!(cache.metrics().write_backs, 1);
    }

    /// Write-through keys never reach the write-back queue
    #[tokio::test]
    async fn test_write_through_ignores_write_back_fn() {
        let cluster = TestCluster::new(1, config()).await;
        let (rows, func) = database();

        cluster
            .node(0)
            .set("wedding:1", &"draft", SetOptions::default().with_write_back(func))
            .await
            .unwrap();

        assert_eq!(cluster.node(0).pending_write_backs(), 0);
        assert_eq!(cluster.node(0).flush_write_backs().await, 0);
        assert!(rows.lock().is_empty());
    }

    /// Failed persistence is counted, not raised to the writer
    #[tokio::test(start_paused = true)]
    async fn test_failures_are_counted() {
        let cluster = TestCluster::new(1, config()).await;
        let failing = write_back_fn(|_, _| async { Err(CacheError::loader("db offline")) });

        cluster
            .node(0)
            .set("guest-list:1", &1, SetOptions::default().with_write_back(failing))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;

        let metrics = cluster.node(0).metrics();
        assert_eq!(metrics.write_back_failures, 1);
        assert_eq!(metrics.write_backs, 0);
    }

    /// Shutdown persists everything still pending
    #[tokio::test]
    async fn test_shutdown_flushes() {
        let cluster = TestCluster::new(1, config()).await;
        let (rows, func) = database();

        for id in 0..3 {
            cluster
                .node(0)
                .set(
                    &format!("guest-list:{}", id),
                    &id,
                    SetOptions::default().with_write_back(func.clone()),
                )
                .await
                .unwrap();
        }
        cluster.node(0).shutdown().await;

        assert_eq!(rows.lock().len(), 3);
    }
}
