//! Integration tests for tiered-cache
//!
//! These tests drive the public API against the in-process Remote Tier,
//! with several cache instances sharing one store where peers matter.

pub mod config_validation_tests;
pub mod invalidation_tests;
pub mod stampede_tests;
pub mod tiered_cache_tests;
pub mod write_back_tests;
