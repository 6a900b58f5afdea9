//! Multi-kind rule document container and accessors.

use super::{CommonMetadata, RuleKind};
use crate::analysis_config::AnalysisConfigRule;
use crate::verdict_config::VerdictConfigRule;

/// A fully deserialized rule of any supported kind.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleDocument {
    /// Analysis config -- weight tables, outcome labels, classification policy.
    AnalysisConfig(AnalysisConfigRule),
    /// Verdict config -- thresholds for the trend verdict rules.
    VerdictConfig(VerdictConfigRule),
}

impl RuleDocument {
    /// Get the rule's metadata regardless of kind.
    pub fn metadata(&self) -> &CommonMetadata {
        match self {
            RuleDocument::AnalysisConfig(rule) => &rule.metadata,
            RuleDocument::VerdictConfig(rule) => &rule.metadata,
        }
    }

    /// Get the rule kind.
    pub fn kind(&self) -> RuleKind {
        match self {
            RuleDocument::AnalysisConfig(_) => RuleKind::AnalysisConfig,
            RuleDocument::VerdictConfig(_) => RuleKind::VerdictConfig,
        }
    }

    pub fn as_analysis_config(&self) -> Option<&AnalysisConfigRule> {
        match self {
            RuleDocument::AnalysisConfig(rule) => Some(rule),
            _ => None,
        }
    }

    pub fn as_verdict_config(&self) -> Option<&VerdictConfigRule> {
        match self {
            RuleDocument::VerdictConfig(rule) => Some(rule),
            _ => None,
        }
    }
}
