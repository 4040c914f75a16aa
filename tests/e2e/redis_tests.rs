//! E2E tests against Redis
//!
//! These tests need a running Redis server.
//! Run with: cargo test --all-features -- --ignored

#[cfg(all(test, feature = "redis"))]
mod tests {
    use crate::common::{Wedding, eventually};
    use crate::skip_without_env;
    use std::sync::Arc;
    use std::time::Duration;
    use tiered_cache::{
        CacheConfig, LockOptions, RedisConfig, RedisPool, RemoteStore, Result, SetOptions,
        TieredCache,
    };
    use uuid::Uuid;

    /// Two instances on a fresh key prefix and channel
    async fn instances() -> (TieredCache, TieredCache, Arc<dyn RemoteStore>) {
        let redis = RedisConfig {
            url: std::env::var("REDIS_URL").unwrap_or_default(),
            ..Default::default()
        };
        let store: Arc<dyn RemoteStore> = Arc::new(RedisPool::new(&redis).await.unwrap());

        let run = Uuid::new_v4().simple().to_string();
        let mut config = CacheConfig {
            key_prefix: format!("e2e-{}:", &run[..8]),
            ..Default::default()
        };
        config.invalidation.channel = format!("e2e-{}:invalidate", &run[..8]);

        let a = TieredCache::new(config.clone(), store.clone()).await.unwrap();
        let b = TieredCache::new(config, store.clone()).await.unwrap();
        (a, b, store)
    }

    #[tokio::test]
    #[ignore]
    async fn test_round_trip_and_expiry() {
        skip_without_env!("REDIS_URL");
        let (a, b, _store) = instances().await;

        let wedding = Wedding::crowded(42, 300);
        a.set("wedding:42", &wedding, SetOptions::ttl(1)).await.unwrap();
        assert_eq!(b.get::<Wedding>("wedding:42").await.unwrap(), Some(wedding));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(a.get::<Wedding>("wedding:42").await.unwrap(), None);
        assert_eq!(b.get::<Wedding>("wedding:42").await.unwrap(), None);
    }

    #[tokio::test]
    #[ignore]
    async fn test_mget_and_pattern_invalidation() {
        skip_without_env!("REDIS_URL");
        let (a, b, _store) = instances().await;

        a.set("user:1", &1, SetOptions::default()).await.unwrap();
        a.set("user:2", &2, SetOptions::default()).await.unwrap();
        a.set("order:1", &3, SetOptions::default()).await.unwrap();

        let values: Vec<Option<i32>> = b
            .mget(&["user:1", "missing", "order:1"])
            .await
            .unwrap()
            .into_iter()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(values, vec![Some(1), None, Some(3)]);

        assert_eq!(a.invalidate_pattern("user:*").await.unwrap(), 2);
        let peer = &b;
        assert!(eventually(|| async move { peer.local().get("user:1").is_none() }).await);
        assert_eq!(b.get::<i32>("order:1").await.unwrap(), Some(3));
    }

    #[tokio::test]
    #[ignore]
    async fn test_delete_reaches_peer() {
        skip_without_env!("REDIS_URL");
        let (a, b, _store) = instances().await;

        a.set("wedding:1", &"draft", SetOptions::default()).await.unwrap();
        let _: Option<String> = b.get("wedding:1").await.unwrap();
        assert!(b.local().get("wedding:1").is_some());

        a.del("wedding:1").await.unwrap();
        let peer = &b;
        assert!(eventually(|| async move { peer.local().get("wedding:1").is_none() }).await);
    }

    #[tokio::test]
    #[ignore]
    async fn test_lock_is_released() {
        skip_without_env!("REDIS_URL");
        let (a, _b, store) = instances().await;

        let value = a
            .get_with_lock("report:1", || async { Ok(Some(7)) }, LockOptions::default())
            .await
            .unwrap();
        assert_eq!(value, Some(7));

        let lock_key = format!("{}lock:report:1", a.config().key_prefix);
        assert!(!store.exists(&lock_key).await.unwrap());
    }
}
