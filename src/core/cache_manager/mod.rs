//! Multi-tier cache manager
//!
//! [`TieredCache`] fronts the shared Remote Tier with a per-process Local
//! Tier, resolves TTLs from the key policy table, guards recomputation of
//! missing keys with a Remote Tier lock, and keeps peer instances in step
//! through the invalidation bus.

mod adaptive;
mod lock;
mod manager;
mod read_through;
pub mod types;


pub use adaptive::adaptive_ttl;
pub use manager::TieredCache;
pub use read_through::{LoaderFn, loader_fn};
pub use types::{AccessStats, AdaptiveOptions, LockOptions, SetOptions};
