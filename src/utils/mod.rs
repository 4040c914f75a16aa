//! Shared utilities: the error type and logging setup

pub mod error;
pub mod logging;
