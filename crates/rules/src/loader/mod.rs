//! Filesystem rule loader.
//!
//! Scans the rules directory for YAML files and deserializes every supported
//! kind via two-pass deserialization (RuleEnvelope -> RuleDocument), then
//! resolves the active configuration into a [`RuleSet`].

mod core;
mod error;

#[cfg(test)]
mod tests;

pub use self::core::{RuleLoader, RuleSet};
pub use self::error::{LoadResult, LoadStatus, Result, RuleError};
