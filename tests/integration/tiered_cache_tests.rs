//! Tiered read/write integration tests
//!
//! Covers the read path across both tiers, TTL expiry on the tokio clock,
//! batch reads and the rule that a Local Tier entry never outlives its
//! Remote Tier counterpart.

#[cfg(test)]
mod tests {
    use crate::common::{TestCluster, Wedding, fixtures};
    use serde_json::{Value, json};
    use std::time::Duration;
    use tiered_cache::config::WriteStrategy;
    use tiered_cache::{Expiry, RemoteStore, Result, SetOptions};

    // ==================== Basic reads and writes ====================

    /// A value is readable right after it is written
    #[tokio::test]
    async fn test_hit_after_set() {
        let cluster = TestCluster::new(1, fixtures::config()).await;
        let cache = cluster.node(0);

        for id in 0..20 {
            let wedding = Wedding::draft(id);
            let key = format!("wedding:{}", id);
            cache.set(&key, &wedding, SetOptions::default()).await.unwrap();
            let read: Option<Wedding> = cache.get(&key).await.unwrap();
            assert_eq!(read, Some(wedding));
        }
    }

    /// The documented wedding scenario: gone after its five second TTL
    #[tokio::test(start_paused = true)]
    async fn test_wedding_expires_from_both_tiers() {
        let cluster = TestCluster::new(1, fixtures::config()).await;
        let cache = cluster.node(0);

        cache
            .set("wedding:42", &json!({"status": "draft"}), SetOptions::ttl(5))
            .await
            .unwrap();
        let read: Option<Value> = cache.get("wedding:42").await.unwrap();
        assert_eq!(read, Some(json!({"status": "draft"})));

        tokio::time::sleep(Duration::from_secs(6)).await;

        let read: Option<Value> = cache.get("wedding:42").await.unwrap();
        assert_eq!(read, None);
        assert!(cache.local().get("wedding:42").is_none());
        assert!(cluster.store.get("test:wedding:42").await.unwrap().is_none());
    }

    /// Peers read through the Remote Tier and mirror what they read
    #[tokio::test]
    async fn test_peer_reads_through_remote() {
        let cluster = TestCluster::new(2, fixtures::config()).await;
        let (a, b) = (cluster.node(0), cluster.node(1));

        a.set("user:1", &"ada", SetOptions::default()).await.unwrap();
        let read: Option<String> = b.get("user:1").await.unwrap();

        assert_eq!(read.as_deref(), Some("ada"));
        assert!(b.local().get("user:1").is_some());
        assert_eq!(b.metrics().remote_hits, 1);
    }

    /// Large values are compressed on the wire and read back intact
    #[tokio::test]
    async fn test_large_values_round_trip_compressed() {
        let cluster = TestCluster::new(2, fixtures::config()).await;
        let wedding = Wedding::crowded(7, 400);

        cluster
            .node(0)
            .set("wedding:7", &wedding, SetOptions::default())
            .await
            .unwrap();

        let stored = cluster.store.get("test:wedding:7").await.unwrap().unwrap();
        assert_eq!(stored.data[0], 0x01);
        assert!(cluster.node(0).metrics().compression_saved > 0);

        let read: Option<Wedding> = cluster.node(1).get("wedding:7").await.unwrap();
        assert_eq!(read, Some(wedding));
    }

    /// Key policies pick the TTL; zero means the key never expires
    #[tokio::test]
    async fn test_policy_ttls_first_match_wins() {
        let mut config = fixtures::config();
        config.policies = vec![
            fixtures::policy("session:*", 1800, WriteStrategy::WriteThrough),
            fixtures::policy("session:admin:*", 60, WriteStrategy::WriteThrough),
            fixtures::policy("config:*", 0, WriteStrategy::WriteThrough),
        ];
        let cluster = TestCluster::new(1, config).await;
        let cache = cluster.node(0);

        cache.set("session:admin:1", &1, SetOptions::default()).await.unwrap();
        cache.set("config:flags", &2, SetOptions::default()).await.unwrap();

        let session = cluster.store.get("test:session:admin:1").await.unwrap().unwrap();
        assert!(matches!(session.ttl, Expiry::After(ttl) if ttl > Duration::from_secs(60)));
        assert_eq!(cache.policy_for("session:admin:1").pattern.as_deref(), Some("session:*"));

        let flags = cluster.store.get("test:config:flags").await.unwrap().unwrap();
        assert_eq!(flags.ttl, Expiry::Never);
    }

    // ==================== Batch reads ====================

    /// Results keep input order and missing keys map to None
    #[tokio::test]
    async fn test_mget_ordering() {
        let cluster = TestCluster::new(2, fixtures::config()).await;
        let (a, b) = (cluster.node(0), cluster.node(1));

        a.set("a", &"first", SetOptions::default()).await.unwrap();
        a.set("b", &"second", SetOptions::default()).await.unwrap();
        // Warm only "b" on the reader so the batch mixes both tiers.
        let _: Option<String> = b.get("b").await.unwrap();

        let values: Vec<Option<String>> = b
            .mget(&["a", "missing", "b"])
            .await
            .unwrap()
            .into_iter()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(
            values,
            vec![Some("first".to_string()), None, Some("second".to_string())]
        );
    }

    /// An empty batch does not touch the Remote Tier
    #[tokio::test]
    async fn test_mget_empty() {
        let cluster = TestCluster::new(1, fixtures::config()).await;
        let values = cluster.node(0).mget::<String>(&[]).await.unwrap();
        assert!(values.is_empty());
    }

    // ==================== Local Tier bounds ====================

    /// Local mirrors never outlive a short Remote TTL
    #[tokio::test(start_paused = true)]
    async fn test_local_mirror_expires_with_remote() {
        let cluster = TestCluster::new(1, fixtures::config()).await;
        let cache = cluster.node(0);

        cache.set("otp:1", &"123456", SetOptions::ttl(2)).await.unwrap();
        assert!(cache.local().remaining("otp:1").unwrap() <= Duration::from_secs(2));

        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert!(cache.local().get("otp:1").is_none());
    }

    /// Full Local Tier evicts instead of growing
    #[tokio::test]
    async fn test_local_tier_is_bounded() {
        let mut config = fixtures::config();
        config.local.max_entries = 3;
        let cluster = TestCluster::new(1, config).await;
        let cache = cluster.node(0);

        for id in 0..10 {
            cache
                .set(&format!("k:{}", id), &id, SetOptions::default())
                .await
                .unwrap();
        }

        assert_eq!(cache.local().len(), 3);
        assert_eq!(cache.metrics().evictions, 7);
        for id in 0..10 {
            let read: Option<i32> = cache.get(&format!("k:{}", id)).await.unwrap();
            assert_eq!(read, Some(id));
        }
    }

    /// Every live Local Tier entry exists in the Remote Tier with the same
    /// bytes and at least as much lifetime left, under a random workload
    #[tokio::test(start_paused = true)]
    async fn test_local_entries_are_a_subset_of_remote() {
        let cluster = TestCluster::new(3, fixtures::config()).await;
        let mut seed: u64 = 0x2545_F491_4F6C_DD1D;
        let mut next = move |bound: u64| {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            seed % bound
        };

        for step in 0..400 {
            let node = cluster.node(next(3) as usize);
            let key = format!("item:{}", next(8));

            match next(4) {
                0 => {
                    node.set(&key, &step, SetOptions::ttl(1 + next(5) as i64))
                        .await
                        .unwrap();
                }
                1 => {
                    node.del(&key).await.unwrap();
                }
                _ => {
                    let _: Option<u64> = node.get(&key).await.unwrap();
                }
            }

            // Let peers drain the invalidation bus, then let time pass.
            tokio::time::sleep(Duration::from_millis(1 + next(400))).await;

            for (index, node) in cluster.nodes().iter().enumerate() {
                for (key, remaining) in node.local().snapshot() {
                    let remote = cluster
                        .store
                        .get(&node.remote_key(&key))
                        .await
                        .unwrap()
                        .unwrap_or_else(|| {
                            panic!("step {}: node {} holds {} locally only", step, index, key)
                        });
                    assert_eq!(
                        node.local().get(&key),
                        Some(remote.data.clone()),
                        "step {}: node {} holds a stale {}",
                        step,
                        index,
                        key
                    );
                    if let Expiry::After(remote_left) = remote.ttl {
                        assert!(
                            remaining <= remote_left,
                            "step {}: local {} outlives remote",
                            step,
                            key
                        );
                    }
                }
            }
        }
    }
}
