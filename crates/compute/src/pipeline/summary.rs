use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info};
use triage_core::{ActionCategory, AlertRecord, CaseSummary};
use triage_rules::CompiledAnalysisConfig;

use crate::algorithms::chronology::{build_chronology, ChronologyClassifier};
use crate::algorithms::grouper::{group_cases, CaseGroup};
use crate::algorithms::scoring::Scorer;

/// Turns validated records into one [`CaseSummary`] per case.
pub struct SummaryBuilder<'a> {
    classifier: ChronologyClassifier<'a>,
    scorer: Scorer<'a>,
}

impl<'a> SummaryBuilder<'a> {
    pub fn new(config: &'a CompiledAnalysisConfig) -> Self {
        Self {
            classifier: ChronologyClassifier::new(config),
            scorer: Scorer::new(config),
        }
    }

    /// Build all summaries, highest weighted score first. Equal scores are
    /// ordered by case key.
    pub fn build(&self, records: &[AlertRecord]) -> Vec<CaseSummary> {
        let start = Instant::now();
        let groups = group_cases(records);

        // Cases are independent; each one is summarised on its own.
        let mut summaries: Vec<CaseSummary> =
            groups.par_iter().map(|g| self.summarize(g)).collect();

        summaries.sort_by(|a, b| {
            b.weighted_score
                .total_cmp(&a.weighted_score)
                .then_with(|| a.key.cmp(&b.key))
        });

        let mut distribution: BTreeMap<ActionCategory, usize> = BTreeMap::new();
        for s in &summaries {
            *distribution.entry(s.action).or_insert(0) += 1;
        }
        for (category, count) in &distribution {
            debug!(category = %category, count, "category distribution");
        }
        info!(
            records = records.len(),
            cases = summaries.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "built case summaries"
        );
        summaries
    }

    /// Summary of a single non-empty case.
    pub fn summarize(&self, group: &CaseGroup<'_>) -> CaseSummary {
        let alert_count = group.alert_count();
        let status_chronology = build_chronology(&group.records);
        let action = self.classifier.classify(&status_chronology, alert_count);

        let criticality = self.scorer.criticality(&group.records);
        let inefficiency_factor = self
            .scorer
            .inefficiency_factor(self.classifier.governing_label(&status_chronology));
        let weighted_score = self.scorer.weighted_score(
            criticality.total(),
            action,
            alert_count,
            inefficiency_factor,
        );

        // Records are time-ordered, so the ends are the event bounds.
        let first_event = group.records.first().map(|r| r.created_on).unwrap_or_default();
        let last_event = group.records.last().map(|r| r.created_on).unwrap_or_default();

        let alert_numbers: BTreeSet<&str> = group.records.iter().map(|r| r.number.as_str()).collect();
        let remediation_statuses: BTreeSet<&str> =
            group.records.iter().map(|r| r.remediation.label()).collect();

        CaseSummary {
            key: group.key.clone(),
            alert_count,
            status_chronology,
            first_event,
            last_event,
            alert_numbers: alert_numbers.into_iter().map(str::to_string).collect(),
            remediation_statuses: remediation_statuses.into_iter().map(str::to_string).collect(),
            severity_score: criticality.severity,
            priority_score: criticality.priority,
            criticality_score: criticality.total(),
            action,
            inefficiency_factor,
            weighted_score,
        }
    }
}
