//! Rule kind enum for two-pass deserialization dispatch.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported rule kinds for two-pass deserialization dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleKind {
    AnalysisConfig,
    VerdictConfig,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::AnalysisConfig => write!(f, "AnalysisConfig"),
            RuleKind::VerdictConfig => write!(f, "VerdictConfig"),
        }
    }
}

impl FromStr for RuleKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "AnalysisConfig" => Ok(RuleKind::AnalysisConfig),
            "VerdictConfig" => Ok(RuleKind::VerdictConfig),
            other => Err(format!("unknown rule kind: '{}'", other)),
        }
    }
}
