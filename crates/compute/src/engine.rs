use std::time::Instant;

use tracing::info;
use triage_core::{AlertRecord, CaseSummary, SummaryDocument};
use triage_rules::RuleSet;

use crate::pipeline::report::{ReportKpis, ReportPartitions};
use crate::pipeline::summary::SummaryBuilder;
use crate::pipeline::trend::{ComparisonOutcome, TrendDiff};

/// Result of analysing one batch of alerts.
#[derive(Debug, Clone)]
pub struct AnalysisOutput {
    pub document: SummaryDocument,
    pub kpis: ReportKpis,
}

/// Runs every stage against one immutable rule set.
///
/// Holds no state between calls; the same input always yields the same
/// cases, categories and scores.
pub struct AnalysisEngine {
    rules: RuleSet,
}

impl AnalysisEngine {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    /// Engine on the built-in defaults.
    pub fn builtin() -> Self {
        Self::new(RuleSet::builtin())
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Group, classify and score validated records.
    pub fn summarize(&self, records: &[AlertRecord]) -> Vec<CaseSummary> {
        SummaryBuilder::new(&self.rules.analysis).build(records)
    }

    /// Full single-run analysis: summaries wrapped in a document, plus KPIs.
    pub fn analyze(
        &self,
        records: &[AlertRecord],
        invalid_rows: usize,
        source_file: Option<String>,
    ) -> AnalysisOutput {
        let start = Instant::now();
        let cases = self.summarize(records);
        let kpis = ReportKpis::compute(&cases, invalid_rows, &self.rules.analysis);
        let document = SummaryDocument::new(cases, invalid_rows, source_file);

        info!(
            run_id = %document.header.run_id,
            cases = kpis.total_cases,
            actionable = kpis.actionable_cases,
            chronic = kpis.chronic_cases,
            success_rate = kpis.automation_success_rate,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "analysis complete"
        );
        AnalysisOutput { document, kpis }
    }

    pub fn partitions<'a>(&self, cases: &'a [CaseSummary]) -> ReportPartitions<'a> {
        ReportPartitions::split(cases, &self.rules.analysis)
    }

    fn trend(&self) -> TrendDiff<'_> {
        TrendDiff::new(&self.rules.analysis, &self.rules.verdict)
    }

    /// Compare a previous run with the current one.
    pub fn compare(&self, previous: &SummaryDocument, current: &SummaryDocument) -> ComparisonOutcome {
        self.trend().compare(previous, current)
    }

    /// Compare two runs in whichever order their periods dictate.
    pub fn compare_direct(&self, a: &SummaryDocument, b: &SummaryDocument) -> ComparisonOutcome {
        self.trend().compare_direct(a, b)
    }
}
