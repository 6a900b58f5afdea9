use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use triage_core::{ActionCategory, CaseSummary};
use triage_rules::CompiledAnalysisConfig;

/// Entries kept in each top-N ranking.
const TOP_N: usize = 5;

/// The three report views of one analysis run.
#[derive(Debug, Clone, Default)]
pub struct ReportPartitions<'a> {
    /// Actionable categories, highest weighted score first.
    pub actionable: Vec<&'a CaseSummary>,
    /// Working automation, most recent `last_event` first.
    pub remediated: Vec<&'a CaseSummary>,
    /// Chronic cases, most alerts first.
    pub recurring: Vec<&'a CaseSummary>,
}

impl<'a> ReportPartitions<'a> {
    pub fn split(cases: &'a [CaseSummary], config: &CompiledAnalysisConfig) -> Self {
        let mut parts = ReportPartitions::default();
        for case in cases {
            if config.is_actionable(case.action) {
                parts.actionable.push(case);
            }
            if case.action.is_remediated() {
                parts.remediated.push(case);
            }
            if case.action.is_chronic() {
                parts.recurring.push(case);
            }
        }
        // Stable sorts: ties keep the summary order.
        parts
            .actionable
            .sort_by(|a, b| b.weighted_score.total_cmp(&a.weighted_score));
        parts.remediated.sort_by(|a, b| b.last_event.cmp(&a.last_event));
        parts.recurring.sort_by(|a, b| b.alert_count.cmp(&a.alert_count));
        parts
    }
}

/// A named count in a ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedCount {
    pub name: String,
    pub count: usize,
}

/// Headline figures of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportKpis {
    pub total_cases: usize,
    pub actionable_cases: usize,
    pub actionable_alerts: usize,
    pub partial_success_cases: usize,
    pub partial_success_alerts: usize,
    pub chronic_cases: usize,
    pub chronic_alerts: usize,
    pub remediated_cases: usize,
    pub remediated_alerts: usize,
    pub invalid_rows: usize,
    /// Remediated cases as a percentage of all cases.
    pub automation_success_rate: f64,
    /// Assignment groups by actionable case count.
    pub top_groups: Vec<RankedCount>,
    /// Metrics by actionable case count.
    pub top_metrics: Vec<RankedCount>,
    /// Short descriptions by actionable alert count.
    pub top_problems: Vec<RankedCount>,
}

impl ReportKpis {
    pub fn compute(cases: &[CaseSummary], invalid_rows: usize, config: &CompiledAnalysisConfig) -> Self {
        let parts = ReportPartitions::split(cases, config);
        let partial: Vec<&CaseSummary> = cases
            .iter()
            .filter(|c| c.action == ActionCategory::SucessoParcial)
            .collect();

        let total_cases = cases.len();
        let automation_success_rate = if total_cases == 0 {
            0.0
        } else {
            parts.remediated.len() as f64 / total_cases as f64 * 100.0
        };

        Self {
            total_cases,
            actionable_cases: parts.actionable.len(),
            actionable_alerts: alert_sum(&parts.actionable),
            partial_success_cases: partial.len(),
            partial_success_alerts: alert_sum(&partial),
            chronic_cases: parts.recurring.len(),
            chronic_alerts: alert_sum(&parts.recurring),
            remediated_cases: parts.remediated.len(),
            remediated_alerts: alert_sum(&parts.remediated),
            invalid_rows,
            automation_success_rate,
            top_groups: rank(parts.actionable.iter().map(|c| (c.key.assignment_group.as_str(), 1))),
            top_metrics: rank(parts.actionable.iter().map(|c| (c.key.metric_name.as_str(), 1))),
            top_problems: rank(
                parts
                    .actionable
                    .iter()
                    .map(|c| (c.key.short_description.as_str(), c.alert_count)),
            ),
        }
    }
}

fn alert_sum(set: &[&CaseSummary]) -> usize {
    set.iter().map(|c| c.alert_count).sum()
}

/// Sum per name, keep the `TOP_N` largest. Ties are ordered by name.
fn rank<'a>(items: impl Iterator<Item = (&'a str, usize)>) -> Vec<RankedCount> {
    let mut totals: HashMap<&str, usize> = HashMap::new();
    for (name, n) in items {
        *totals.entry(name).or_insert(0) += n;
    }
    let mut ranked: Vec<RankedCount> = totals
        .into_iter()
        .map(|(name, count)| RankedCount {
            name: name.to_string(),
            count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    ranked.truncate(TOP_N);
    ranked
}
