use triage_core::{ActionCategory, AlertRecord};
use triage_rules::CompiledAnalysisConfig;

/// Static severity and priority scores of a case.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Criticality {
    pub severity: f64,
    pub priority: f64,
}

impl Criticality {
    pub fn total(&self) -> f64 {
        self.severity + self.priority
    }
}

/// Volume multiplier: `1 + ln(alert_count)`. Callers never pass zero.
pub fn volume_factor(alert_count: usize) -> f64 {
    1.0 + (alert_count.max(1) as f64).ln()
}

/// Computes criticality and the final weighted score of a case.
pub struct Scorer<'a> {
    config: &'a CompiledAnalysisConfig,
}

impl<'a> Scorer<'a> {
    pub fn new(config: &'a CompiledAnalysisConfig) -> Self {
        Self { config }
    }

    /// Criticality of the single most critical record. Ties go to the
    /// earliest record.
    pub fn criticality(&self, records: &[&AlertRecord]) -> Criticality {
        records
            .iter()
            .map(|r| Criticality {
                severity: self.config.severity_weight(&r.severity),
                priority: self.config.priority_weight(&r.priority_group),
            })
            .fold(None, |best: Option<Criticality>, c| match best {
                Some(b) if b.total() >= c.total() => Some(b),
                _ => Some(c),
            })
            .unwrap_or(Criticality {
                severity: 0.0,
                priority: 0.0,
            })
    }

    pub fn inefficiency_factor(&self, governing_label: Option<&str>) -> f64 {
        self.config.inefficiency_weight(governing_label)
    }

    /// `criticality * action weight * volume factor * inefficiency factor`.
    pub fn weighted_score(
        &self,
        criticality: f64,
        action: ActionCategory,
        alert_count: usize,
        inefficiency_factor: f64,
    ) -> f64 {
        criticality * self.config.action_weight(action) * volume_factor(alert_count) * inefficiency_factor
    }
}
