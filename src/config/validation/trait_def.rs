//! Validation trait definition

/// Validation trait for configuration sections
///
/// Implementations return a human readable reason; `Config::validate`
/// wraps it into a `CacheError::Config` naming the section.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}
