//! VerdictConfig rule kind — business thresholds for the period-over-period
//! verdict rules.

use serde::{Deserialize, Serialize};

use crate::loader::RuleError;
use crate::schema::CommonMetadata;

// ── YAML-level types ────────────────────────────────────────────────

/// Top-level VerdictConfig rule document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct VerdictConfigRule {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: CommonMetadata,
    pub spec: VerdictConfigSpec,
}

/// Specification section of a VerdictConfig rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct VerdictConfigSpec {
    /// `regression_rate` (percent) above this → Regression.
    #[serde(default = "default_regression_rate_threshold")]
    pub regression_rate_threshold: f64,
    /// `new / resolved` above this → High effectiveness / low stability.
    #[serde(default = "default_churn_ratio")]
    pub churn_ratio: f64,
    /// `improvement_rate` (percent) at or above this counts as "all resolved".
    #[serde(default = "default_full_resolution_rate")]
    pub full_resolution_rate: f64,
}

fn default_regression_rate_threshold() -> f64 {
    50.0
}

fn default_churn_ratio() -> f64 {
    0.75
}

fn default_full_resolution_rate() -> f64 {
    100.0
}

impl Default for VerdictConfigSpec {
    fn default() -> Self {
        Self {
            regression_rate_threshold: default_regression_rate_threshold(),
            churn_ratio: default_churn_ratio(),
            full_resolution_rate: default_full_resolution_rate(),
        }
    }
}

// ── Compiled type ───────────────────────────────────────────────────

/// Pre-compiled verdict config (spec is already typed).
pub type CompiledVerdictConfig = VerdictConfigSpec;

impl VerdictConfigRule {
    /// Validate and compile the YAML config.
    pub fn compile(&self) -> Result<CompiledVerdictConfig, RuleError> {
        self.spec.validate()?;
        Ok(self.spec.clone())
    }
}

impl VerdictConfigSpec {
    pub fn validate(&self) -> Result<(), RuleError> {
        let fields = [
            ("regression_rate_threshold", self.regression_rate_threshold),
            ("churn_ratio", self.churn_ratio),
            ("full_resolution_rate", self.full_resolution_rate),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(RuleError::Validation(format!(
                    "{} must be a finite non-negative number, got {}",
                    name, value
                )));
            }
        }
        if self.full_resolution_rate > 100.0 {
            return Err(RuleError::Validation(format!(
                "full_resolution_rate is a percentage, got {}",
                self.full_resolution_rate
            )));
        }
        Ok(())
    }
}
