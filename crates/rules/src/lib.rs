//! YAML configuration kinds for the alert triage engine.
//!
//! This crate provides:
//! - `AnalysisConfig`: weight tables, outcome labels, chronic threshold and
//!   classification boundary policy, compiled into lookup tables
//! - `VerdictConfig`: thresholds for the period-over-period verdict
//! - A filesystem loader with two-pass `kind` dispatch and built-in defaults

pub mod analysis_config;
pub mod loader;
pub mod schema;
pub mod verdict_config;

pub use analysis_config::{AnalysisConfigRule, AnalysisConfigSpec, CompiledAnalysisConfig, OutcomeKind};
pub use loader::{LoadResult, LoadStatus, RuleError, RuleLoader, RuleSet};
pub use verdict_config::{CompiledVerdictConfig, VerdictConfigRule, VerdictConfigSpec};
