//! Stampede protection integration tests
//!
//! Concurrent callers across instances share one loader run in the common
//! case. Callers that give up waiting compute the value themselves.

#[cfg(test)]
mod tests {
    use crate::common::{TestCluster, fixtures};
    use futures::future::join_all;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tiered_cache::{CacheError, LockOptions, RemoteStore};

    /// Concurrent misses across two instances run the loader once
    #[tokio::test(start_paused = true)]
    async fn test_concurrent_misses_share_one_load() {
        let cluster = TestCluster::new(2, fixtures::config()).await;
        let calls = Arc::new(AtomicUsize::new(0));

        let callers = (0..16).map(|n| {
            let node = cluster.node(n % 2).clone();
            let calls = calls.clone();
            async move {
                node.get_with_lock(
                    "report:annual",
                    move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(500)).await;
                        Ok(Some("expensive".to_string()))
                    },
                    LockOptions::default(),
                )
                .await
            }
        });

        let results = join_all(callers).await;
        for result in results {
            assert_eq!(result.unwrap().as_deref(), Some("expensive"));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let acquired: u64 = cluster.nodes().iter().map(|n| n.metrics().lock_acquired).sum();
        let fallbacks: u64 = cluster.nodes().iter().map(|n| n.metrics().lock_fallbacks).sum();
        assert_eq!(acquired, 1);
        assert_eq!(fallbacks, 0);
        assert!(!cluster.store.exists("test:lock:report:annual").await.unwrap());
    }

    /// A loader that fails still leaves the lock free for the next caller
    #[tokio::test]
    async fn test_lock_released_after_loader_failure() {
        let cluster = TestCluster::new(2, fixtures::config()).await;

        let failed: Result<Option<String>, CacheError> = cluster
            .node(0)
            .get_with_lock(
                "report:annual",
                || async { Err(CacheError::loader("warehouse offline")) },
                LockOptions::default(),
            )
            .await;
        assert!(failed.is_err());
        assert!(!cluster.store.exists("test:lock:report:annual").await.unwrap());

        let retried = cluster
            .node(1)
            .get_with_lock(
                "report:annual",
                || async { Ok(Some("recovered".to_string())) },
                LockOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(retried.as_deref(), Some("recovered"));
        assert_eq!(cluster.node(1).metrics().lock_acquired, 1);
        assert_eq!(cluster.node(1).metrics().lock_fallbacks, 0);
    }

    /// A holder that never finishes does not block waiters past max_wait
    #[tokio::test(start_paused = true)]
    async fn test_waiters_fall_back_when_holder_stalls() {
        let cluster = TestCluster::new(2, fixtures::config()).await;
        let calls = Arc::new(AtomicUsize::new(0));

        let stalled_calls = calls.clone();
        let stalled = cluster.node(0).clone();
        let holder = tokio::spawn(async move {
            stalled
                .get_with_lock(
                    "report:annual",
                    move || async move {
                        stalled_calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_secs(3600)).await;
                        Ok(Some("late".to_string()))
                    },
                    LockOptions {
                        lock_ttl: Some(Duration::from_secs(7200)),
                        ..Default::default()
                    },
                )
                .await
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        let waiter_calls = calls.clone();
        let value = cluster
            .node(1)
            .get_with_lock(
                "report:annual",
                move || async move {
                    waiter_calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Some("computed by waiter".to_string()))
                },
                LockOptions {
                    max_wait: Some(Duration::from_secs(1)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(value.as_deref(), Some("computed by waiter"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cluster.node(1).metrics().lock_fallbacks, 1);
        holder.abort();
    }

    /// An expired lock is taken over by the next caller
    #[tokio::test(start_paused = true)]
    async fn test_expired_lock_is_reacquired() {
        let cluster = TestCluster::new(1, fixtures::config()).await;
        cluster
            .store
            .set_nx(
                "test:lock:report:annual",
                bytes::Bytes::from_static(b"crashed-holder"),
                Duration::from_secs(1),
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(2)).await;

        let value = cluster
            .node(0)
            .get_with_lock(
                "report:annual",
                || async { Ok(Some(1u32)) },
                LockOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(value, Some(1));
        assert_eq!(cluster.node(0).metrics().lock_acquired, 1);
    }

    /// A loader with nothing to cache leaves the key absent
    #[tokio::test]
    async fn test_loader_returning_none() {
        let cluster = TestCluster::new(1, fixtures::config()).await;
        let value: Option<String> = cluster
            .node(0)
            .get_with_lock("report:none", || async { Ok(None) }, LockOptions::default())
            .await
            .unwrap();

        assert_eq!(value, None);
        assert!(!cluster.store.exists("test:report:none").await.unwrap());
        assert!(!cluster.store.exists("test:lock:report:none").await.unwrap());
    }
}
