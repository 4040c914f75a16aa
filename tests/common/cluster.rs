//! Several cache instances over one in-process Remote Tier

use std::sync::Arc;
use tiered_cache::{CacheConfig, MemoryStore, TieredCache};

/// Cache instances that behave like separate processes sharing one Redis
pub struct TestCluster {
    pub store: Arc<MemoryStore>,
    nodes: Vec<TieredCache>,
}

impl TestCluster {
    pub async fn new(size: usize, config: CacheConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let mut nodes = Vec::with_capacity(size);
        for _ in 0..size {
            let node = TieredCache::new(config.clone(), store.clone())
                .await
                .expect("cache instance should start");
            nodes.push(node);
        }
        Self { store, nodes }
    }

    pub fn node(&self, index: usize) -> &TieredCache {
        &self.nodes[index]
    }

    pub fn nodes(&self) -> &[TieredCache] {
        &self.nodes
    }
}
