//! Qualitative verdict over the KPIs of a trend comparison.
//!
//! Rules are evaluated in order and the first match wins; several rules can
//! hold at once, so the order is part of the contract.

use serde::{Deserialize, Serialize};
use triage_rules::CompiledVerdictConfig;

use super::trend::TrendKpis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictKind {
    ExcellenceMaintained,
    FirstRegression,
    ExcellenceAchieved,
    Regression,
    HighEffectivenessLowStability,
    PositiveEvolution,
    StagnationByInertia,
    NeutralStability,
}

/// Display palette of a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictClass {
    Success,
    Info,
    Warning,
    Danger,
}

impl VerdictKind {
    pub fn label(&self) -> &'static str {
        match self {
            VerdictKind::ExcellenceMaintained => "Excellence maintained",
            VerdictKind::FirstRegression => "First regression",
            VerdictKind::ExcellenceAchieved => "Excellence achieved",
            VerdictKind::Regression => "Regression",
            VerdictKind::HighEffectivenessLowStability => "High effectiveness / low stability",
            VerdictKind::PositiveEvolution => "Positive evolution",
            VerdictKind::StagnationByInertia => "Stagnation by inertia",
            VerdictKind::NeutralStability => "Neutral stability",
        }
    }

    pub fn class(&self) -> VerdictClass {
        match self {
            VerdictKind::ExcellenceMaintained
            | VerdictKind::ExcellenceAchieved
            | VerdictKind::PositiveEvolution => VerdictClass::Success,
            VerdictKind::FirstRegression
            | VerdictKind::HighEffectivenessLowStability
            | VerdictKind::StagnationByInertia => VerdictClass::Warning,
            VerdictKind::Regression => VerdictClass::Danger,
            VerdictKind::NeutralStability => VerdictClass::Info,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub kind: VerdictKind,
    pub class: VerdictClass,
    pub label: String,
    pub detail: String,
}

impl Verdict {
    fn new(kind: VerdictKind, detail: &str) -> Self {
        Self {
            kind,
            class: kind.class(),
            label: kind.label().to_string(),
            detail: detail.to_string(),
        }
    }
}

pub fn classify_verdict(kpis: &TrendKpis, config: &CompiledVerdictConfig) -> Verdict {
    let TrendKpis {
        total_p1,
        total_p2,
        resolved,
        new,
        ..
    } = *kpis;

    if total_p1 == 0 && total_p2 == 0 {
        return Verdict::new(
            VerdictKind::ExcellenceMaintained,
            "No case required action in either period.",
        );
    }
    if total_p1 == 0 {
        return Verdict::new(
            VerdictKind::FirstRegression,
            "The operation was stable and new problems have appeared.",
        );
    }
    if total_p2 == 0 {
        return Verdict::new(
            VerdictKind::ExcellenceAchieved,
            "Every case from the previous period was resolved and no new problem appeared.",
        );
    }
    if kpis.regression_rate > config.regression_rate_threshold {
        return Verdict::new(
            VerdictKind::Regression,
            "New problems make up most of the current cases.",
        );
    }
    if resolved > 0 && new as f64 / resolved as f64 > config.churn_ratio {
        let detail = if kpis.improvement_rate >= config.full_resolution_rate {
            "All cases from the previous period were resolved."
        } else {
            "High effectiveness resolving cases from the previous period."
        };
        return Verdict::new(VerdictKind::HighEffectivenessLowStability, detail);
    }
    if resolved > new && total_p2 < total_p1 {
        return Verdict::new(
            VerdictKind::PositiveEvolution,
            "The number of cases dropped and new problems were kept under control.",
        );
    }
    if resolved == 0 && new == 0 {
        return Verdict::new(
            VerdictKind::StagnationByInertia,
            "Nothing changed because the previous problems were not resolved.",
        );
    }
    Verdict::new(
        VerdictKind::NeutralStability,
        "Resolved and new problems balanced each other out.",
    )
}
