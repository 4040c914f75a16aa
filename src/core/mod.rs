//! Core caching logic
//!
//! Everything here is storage agnostic; the Remote Tier is reached only
//! through [`crate::storage::RemoteStore`].

pub mod cache_manager;
pub mod codec;
pub mod invalidation;
pub mod local_tier;
pub mod pattern;
pub mod policy;
pub mod write_back;
