//! Glob patterns over cache keys
//!
//! A glob is a key name where `*` matches any run of characters (including
//! none); every other character is literal. Each glob is compiled once into
//! an anchored regular expression for in-process matching and into an
//! escaped `SCAN MATCH` pattern for enumerating Remote Tier keys.

use crate::utils::error::{CacheError, Result};
use regex::Regex;
use std::fmt;

/// A compiled key glob
#[derive(Clone)]
pub struct KeyPattern {
    glob: String,
    regex: Regex,
    store_match: String,
}

impl KeyPattern {
    /// Compile a glob over user-facing key names
    pub fn compile(glob: &str) -> Result<Self> {
        Self::prefixed("", glob)
    }

    /// Compile a glob that matches `prefix` followed by `glob`
    ///
    /// The prefix is always literal, even if it contains `*`.
    pub fn prefixed(prefix: &str, glob: &str) -> Result<Self> {
        if glob.is_empty() {
            return Err(CacheError::validation("key pattern cannot be empty"));
        }

        let mut regex = String::with_capacity(prefix.len() + glob.len() + 8);
        let mut store_match = String::with_capacity(prefix.len() + glob.len());
        regex.push('^');
        regex.push_str(&regex::escape(prefix));
        push_store_literal(&mut store_match, prefix);

        let mut parts = glob.split('*').peekable();
        while let Some(literal) = parts.next() {
            regex.push_str(&regex::escape(literal));
            push_store_literal(&mut store_match, literal);
            if parts.peek().is_some() {
                regex.push_str(".*");
                store_match.push('*');
            }
        }
        regex.push('$');

        Ok(Self {
            glob: glob.to_string(),
            regex: Regex::new(&regex)?,
            store_match,
        })
    }

    /// Whether `key` matches the whole pattern
    pub fn is_match(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }

    /// The glob as written
    pub fn as_str(&self) -> &str {
        &self.glob
    }

    /// Pattern in Redis `SCAN MATCH` syntax
    pub fn store_match(&self) -> &str {
        &self.store_match
    }
}

/// Redis glob treats `*?[]\` specially; everything we emit from a literal is escaped
fn push_store_literal(out: &mut String, literal: &str) {
    for ch in literal.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
}

impl fmt::Debug for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPattern")
            .field("glob", &self.glob)
            .field("regex", &self.regex.as_str())
            .finish()
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.glob)
    }
}
