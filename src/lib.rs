//! # Tiered Cache
//!
//! A multi-tier distributed cache manager. Each process keeps a small,
//! short-lived Local Tier in front of a shared Remote Tier (Redis), and
//! instances keep each other's Local Tiers honest over a pub/sub
//! invalidation channel.
//!
//! ## Features
//!
//! - **Two tiers**: in-process mirror bounded by the Remote Tier's own TTL
//! - **Key policies**: per-pattern TTL and write strategy, first match wins
//! - **Stampede protection**: one loader per missing key across all instances
//! - **Adaptive TTL**: hot keys live longer, cold keys shorter
//! - **Invalidation rules**: writes to one key family sweep dependent families
//! - **Compression**: large payloads are gzipped when that saves space
//! - **Write-back**: coalesced, delayed persistence to the system of record
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tiered_cache::{Config, SetOptions, TieredCache, storage};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_file("config/cache.yaml").await?;
//!     let store = storage::connect(&config.redis).await?;
//!     let cache = TieredCache::new(config.cache, store).await?;
//!
//!     cache.set("wedding:42", &"draft", SetOptions::ttl(300)).await?;
//!     let status: Option<String> = cache.get("wedding:42").await?;
//!     assert_eq!(status.as_deref(), Some("draft"));
//!
//!     cache.shutdown().await;
//!     Ok(())
//! }
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod config;
pub mod core;
pub mod monitoring;
pub mod storage;
pub mod utils;

// Re-export main types
pub use config::{CacheConfig, Config, RedisConfig};
pub use utils::error::{CacheError, Result};

pub use core::cache_manager::{
    AccessStats, AdaptiveOptions, LoaderFn, LockOptions, SetOptions, TieredCache, adaptive_ttl,
    loader_fn,
};
pub use core::invalidation::{InvalidationEvent, InvalidationKind};
pub use core::pattern::KeyPattern;
pub use core::write_back::{WriteBackFn, write_back_fn};

pub use monitoring::{CacheMetrics, MetricsCollector};
#[cfg(feature = "metrics")]
pub use monitoring::PrometheusExporter;

pub use storage::{Expiry, MemoryStore, RemoteEntry, RemoteStore};
#[cfg(feature = "redis")]
pub use storage::RedisPool;

// Version information
/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Name of the crate
pub const NAME: &str = env!("CARGO_PKG_NAME");
/// Description of the crate
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Build information
#[derive(Debug, Clone)]
pub struct BuildInfo {
    pub version: &'static str,
    /// Unix seconds
    pub build_time: &'static str,
    /// Git commit hash
    pub git_hash: &'static str,
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self {
            version: VERSION,
            build_time: option_env!("BUILD_TIME").unwrap_or("unknown"),
            git_hash: option_env!("GIT_HASH").unwrap_or("unknown"),
        }
    }
}

/// Build information
pub fn build_info() -> BuildInfo {
    BuildInfo::default()
}
