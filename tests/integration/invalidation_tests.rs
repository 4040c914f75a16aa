//! Cross-instance invalidation integration tests

#[cfg(test)]
mod tests {
    use crate::common::{TestCluster, eventually, fixtures};
    use bytes::Bytes;
    use futures::StreamExt;
    use tiered_cache::config::InvalidationTrigger::{Delete, Set};
    use tiered_cache::{InvalidationEvent, InvalidationKind, RemoteStore, SetOptions};

    /// Seed `key` through `writer` and make every other node mirror it
    async fn seed(cluster: &TestCluster, writer: usize, key: &str, value: &str) {
        cluster
            .node(writer)
            .set(key, &value, SetOptions::default())
            .await
            .unwrap();
        for node in cluster.nodes() {
            let read: Option<String> = node.get(key).await.unwrap();
            assert_eq!(read.as_deref(), Some(value));
        }
    }

    // ==================== Pattern invalidation ====================

    /// Matching keys are gone, others are untouched
    #[tokio::test]
    async fn test_invalidate_pattern() {
        let cluster = TestCluster::new(1, fixtures::config()).await;
        let cache = cluster.node(0);

        cache.set("user:1", &"a", SetOptions::default()).await.unwrap();
        cache.set("user:2", &"b", SetOptions::default()).await.unwrap();
        cache.set("order:1", &"c", SetOptions::default()).await.unwrap();

        assert_eq!(cache.invalidate_pattern("user:*").await.unwrap(), 2);

        assert_eq!(cache.get::<String>("user:1").await.unwrap(), None);
        assert_eq!(cache.get::<String>("user:2").await.unwrap(), None);
        assert_eq!(
            cache.get::<String>("order:1").await.unwrap().as_deref(),
            Some("c")
        );
    }

    /// Peers purge their Local Tier copies of swept keys
    #[tokio::test]
    async fn test_invalidate_pattern_reaches_peers() {
        let cluster = TestCluster::new(2, fixtures::config()).await;
        seed(&cluster, 0, "user:1", "a").await;
        seed(&cluster, 0, "order:1", "c").await;

        cluster.node(0).invalidate_pattern("user:*").await.unwrap();

        let peer = cluster.node(1);
        assert!(eventually(|| async move { peer.local().get("user:1").is_none() }).await);
        assert!(peer.local().get("order:1").is_some());
        assert_eq!(peer.get::<String>("user:1").await.unwrap(), None);
    }

    // ==================== Key events ====================

    /// A delete on one node purges the peer's Local Tier copy
    #[tokio::test]
    async fn test_delete_purges_peer_local_copy() {
        let cluster = TestCluster::new(2, fixtures::config()).await;
        seed(&cluster, 0, "wedding:42", "draft").await;

        assert!(cluster.node(0).del("wedding:42").await.unwrap());

        let peer = cluster.node(1);
        assert!(eventually(|| async move { peer.local().get("wedding:42").is_none() }).await);
        assert_eq!(peer.get::<String>("wedding:42").await.unwrap(), None);
    }

    /// An overwrite on one node stops peers serving the old value
    #[tokio::test]
    async fn test_overwrite_purges_peer_local_copy() {
        let cluster = TestCluster::new(3, fixtures::config()).await;
        seed(&cluster, 0, "wedding:42", "draft").await;

        cluster
            .node(1)
            .set("wedding:42", &"confirmed", SetOptions::default())
            .await
            .unwrap();

        for index in [0, 2] {
            let peer = cluster.node(index);
            assert!(eventually(|| async move { peer.local().get("wedding:42").is_none() }).await);
            let read: Option<String> = peer.get("wedding:42").await.unwrap();
            assert_eq!(read.as_deref(), Some("confirmed"));
        }
    }

    /// Events are JSON with the sender's id
    #[tokio::test]
    async fn test_events_on_the_wire() {
        let cluster = TestCluster::new(1, fixtures::config()).await;
        let cache = cluster.node(0);
        let mut bus = cluster.store.subscribe("cache:invalidate").await.unwrap();

        cache.del("user:9").await.unwrap();
        cache.invalidate_pattern("user:*").await.unwrap();

        let key_event = InvalidationEvent::from_bytes(&bus.next().await.unwrap()).unwrap();
        assert_eq!(key_event.kind, InvalidationKind::Key);
        assert_eq!(key_event.pattern, "user:9");
        assert_eq!(key_event.origin_id, cache.instance_id());

        let pattern_event = InvalidationEvent::from_bytes(&bus.next().await.unwrap()).unwrap();
        assert_eq!(pattern_event.kind, InvalidationKind::Pattern);
        assert_eq!(pattern_event.pattern, "user:*");
    }

    /// Malformed messages on the bus are ignored
    #[tokio::test]
    async fn test_garbage_on_the_bus_is_ignored() {
        let cluster = TestCluster::new(2, fixtures::config()).await;
        seed(&cluster, 0, "user:1", "a").await;

        cluster
            .store
            .publish("cache:invalidate", Bytes::from_static(b"{not json"))
            .await
            .unwrap();
        cluster.node(0).del("user:1").await.unwrap();

        let peer = cluster.node(1);
        assert!(eventually(|| async move { peer.local().get("user:1").is_none() }).await);
    }

    // ==================== Rules ====================

    /// Writing a wedding sweeps its dashboard entries everywhere
    #[tokio::test]
    async fn test_rule_sweeps_dependent_keys() {
        let mut config = fixtures::config();
        config.invalidation.rules = vec![fixtures::rule(
            "wedding:*",
            &[Set, Delete],
            &["dashboard:wedding:*"],
        )];
        let cluster = TestCluster::new(2, config).await;
        seed(&cluster, 0, "dashboard:wedding:42", "summary").await;
        seed(&cluster, 0, "dashboard:guest:7", "other").await;

        cluster
            .node(0)
            .set("wedding:42", &"confirmed", SetOptions::default())
            .await
            .unwrap();

        assert!(cluster.node(0).local().get("dashboard:wedding:42").is_none());
        assert!(
            cluster
                .store
                .get("test:dashboard:wedding:42")
                .await
                .unwrap()
                .is_none()
        );

        let peer = cluster.node(1);
        assert!(eventually(|| async move { peer.local().get("dashboard:wedding:42").is_none() }).await);
        assert!(peer.local().get("dashboard:guest:7").is_some());
    }

    /// Rules only fire for the operations they name
    #[tokio::test]
    async fn test_rule_respects_operation() {
        let mut config = fixtures::config();
        config.invalidation.rules = vec![fixtures::rule("guest:*", &[Delete], &["guest-list:*"])];
        let cluster = TestCluster::new(1, config).await;
        let cache = cluster.node(0);

        cache.set("guest-list:1", &"ana", SetOptions::default()).await.unwrap();
        cache.set("guest:1", &"ana", SetOptions::default()).await.unwrap();
        assert!(cache.get::<String>("guest-list:1").await.unwrap().is_some());

        cache.del("guest:1").await.unwrap();
        assert!(cache.get::<String>("guest-list:1").await.unwrap().is_none());
    }

    /// With the bus disabled nothing is published, but local rules still run
    #[tokio::test]
    async fn test_disabled_bus_keeps_local_rules() {
        let mut config = fixtures::config();
        config.invalidation.enabled = false;
        config.invalidation.rules = vec![fixtures::rule("wedding:*", &[Set], &["dashboard:*"])];
        let cluster = TestCluster::new(1, config).await;
        let cache = cluster.node(0);
        let mut bus = cluster.store.subscribe("cache:invalidate").await.unwrap();

        cache.set("dashboard:1", &1, SetOptions::default()).await.unwrap();
        cache.set("wedding:1", &1, SetOptions::default()).await.unwrap();

        assert!(cache.get::<i32>("dashboard:1").await.unwrap().is_none());
        let nothing = tokio::time::timeout(std::time::Duration::from_millis(50), bus.next()).await;
        assert!(nothing.is_err());
    }
}
