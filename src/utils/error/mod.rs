//! Error handling for the cache manager
//!
//! This module defines the error type shared by every tier, the codec and
//! the background tasks.

mod helpers;
mod types;

pub use types::{CacheError, Result};
