//! Configuration validation
//!
//! The validation is organized into several submodules:
//! - `trait_def`: Core Validate trait definition
//! - `cache_validators`: Cache, policy, invalidation and lock validators
//! - `storage_validators`: Remote Tier connection and logging validators
//! - `tests`: Test suite for all validators

mod cache_validators;
mod storage_validators;
mod trait_def;

pub use trait_def::Validate;
