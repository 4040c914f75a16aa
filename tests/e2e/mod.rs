//! End-to-end tests for tiered-cache
//!
//! These tests run against a real Redis server.
//! Run with: cargo test --all-features -- --ignored
//!
//! Required environment variables:
//! - REDIS_URL: for example `redis://localhost:6379`

pub mod redis_tests;
