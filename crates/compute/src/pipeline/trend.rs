//! Period-over-period reconciliation of actionable cases.
//!
//! Both periods are reduced to their actionable cases and outer-joined on the
//! case key. A key only in the previous period is *resolved*, only in the
//! current period *new*, in both *persistent*.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use triage_core::{CaseKey, CaseSummary, PeriodRange, SummaryDocument};
use triage_rules::{CompiledAnalysisConfig, CompiledVerdictConfig};

use super::verdict::{classify_verdict, Verdict};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseTrend {
    Resolved,
    New,
    Persistent,
}

/// One row of the outer join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinedCase {
    #[serde(flatten)]
    pub key: CaseKey,
    pub trend: CaseTrend,
    pub alert_count_p1: Option<usize>,
    pub alert_count_p2: Option<usize>,
}

impl JoinedCase {
    /// Signed alert change for persistent cases.
    pub fn change(&self) -> Option<i64> {
        match (self.alert_count_p1, self.alert_count_p2) {
            (Some(p1), Some(p2)) => Some(p2 as i64 - p1 as i64),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendKpis {
    pub total_p1: usize,
    pub total_p2: usize,
    pub resolved: usize,
    pub new: usize,
    pub persistent: usize,
    pub alerts_total_p1: usize,
    pub alerts_total_p2: usize,
    pub alerts_resolved: usize,
    pub alerts_new: usize,
    /// Current-period alerts of persistent cases.
    pub alerts_persistent: usize,
    /// Previous-period alerts of persistent cases.
    pub alerts_persistent_p1: usize,
    /// `resolved / total_p1 * 100`; 100 when there was no previous backlog.
    pub improvement_rate: f64,
    /// `new / total_p2 * 100`; 0 when there is no current backlog.
    pub regression_rate: f64,
}

impl TrendKpis {
    /// KPIs from case counts alone, with both rates derived. Alert sums are
    /// left at zero.
    pub fn from_counts(
        total_p1: usize,
        total_p2: usize,
        resolved: usize,
        new: usize,
        persistent: usize,
    ) -> Self {
        let improvement_rate = if total_p1 == 0 {
            100.0
        } else {
            resolved as f64 / total_p1 as f64 * 100.0
        };
        let regression_rate = if total_p2 == 0 {
            0.0
        } else {
            new as f64 / total_p2 as f64 * 100.0
        };
        Self {
            total_p1,
            total_p2,
            resolved,
            new,
            persistent,
            alerts_total_p1: 0,
            alerts_total_p2: 0,
            alerts_resolved: 0,
            alerts_new: 0,
            alerts_persistent: 0,
            alerts_persistent_p1: 0,
            improvement_rate,
            regression_rate,
        }
    }
}

/// Persistent cases of one assignment group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupChange {
    pub assignment_group: String,
    pub num_cases: usize,
    pub alerts_p1: usize,
    pub alerts_p2: usize,
    pub change: i64,
}

/// Cases of one problem description within a join side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemBreakdown {
    pub short_description: String,
    pub num_cases: usize,
    pub alerts_p1: usize,
    pub alerts_p2: usize,
}

/// Actionable alert volume of one group across both periods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupTrend {
    pub assignment_group: String,
    pub alerts_p1: usize,
    pub alerts_p2: usize,
    /// Actionable cases in the current period.
    pub num_cases: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    pub previous_period: Option<PeriodRange>,
    pub current_period: Option<PeriodRange>,
    pub kpis: TrendKpis,
    pub verdict: Verdict,
    /// Group to look at first: most new cases, else top persistent group.
    pub focus_group: Option<String>,
    pub cases: Vec<JoinedCase>,
    pub persistent_by_group: Vec<GroupChange>,
    pub new_problems: Vec<ProblemBreakdown>,
    pub resolved_problems: Vec<ProblemBreakdown>,
    pub persistent_problems: Vec<ProblemBreakdown>,
    pub group_trends: Vec<GroupTrend>,
}

impl TrendReport {
    pub fn cases_with(&self, trend: CaseTrend) -> impl Iterator<Item = &JoinedCase> {
        self.cases.iter().filter(move |c| c.trend == trend)
    }
}

/// Result of asking for a comparison: either a report or the reason it was
/// not produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ComparisonOutcome {
    Compared(Box<TrendReport>),
    Skipped { reason: String },
}

impl ComparisonOutcome {
    pub fn report(&self) -> Option<&TrendReport> {
        match self {
            ComparisonOutcome::Compared(report) => Some(report.as_ref()),
            ComparisonOutcome::Skipped { .. } => None,
        }
    }
}

/// The current period must start on a later day than the previous one.
pub fn check_periods(previous: Option<PeriodRange>, current: Option<PeriodRange>) -> Result<(), String> {
    let (Some(previous), Some(current)) = (previous, current) else {
        return Err("a period is missing from one of the summaries".to_string());
    };
    if current.start.date() <= previous.start.date() {
        return Err(format!(
            "current period ({}) does not start after previous period ({})",
            current.label(),
            previous.label()
        ));
    }
    Ok(())
}

/// Compares two case summary sets.
pub struct TrendDiff<'a> {
    analysis: &'a CompiledAnalysisConfig,
    verdict: &'a CompiledVerdictConfig,
}

impl<'a> TrendDiff<'a> {
    pub fn new(analysis: &'a CompiledAnalysisConfig, verdict: &'a CompiledVerdictConfig) -> Self {
        Self { analysis, verdict }
    }

    /// Compare a previous and a current run, skipping when the current run
    /// does not start after the previous one.
    pub fn compare(&self, previous: &SummaryDocument, current: &SummaryDocument) -> ComparisonOutcome {
        let (p1, p2) = (previous.period(), current.period());
        if let Err(reason) = check_periods(p1, p2) {
            warn!(reason = %reason, "trend comparison skipped");
            return ComparisonOutcome::Skipped { reason };
        }
        let mut report = self.diff(&previous.records, &current.records);
        report.previous_period = p1;
        report.current_period = p2;
        ComparisonOutcome::Compared(Box::new(report))
    }

    /// Compare two runs given in any order; the earlier-starting one is
    /// treated as the previous period.
    pub fn compare_direct(&self, a: &SummaryDocument, b: &SummaryDocument) -> ComparisonOutcome {
        let swap = match (a.period(), b.period()) {
            (Some(pa), Some(pb)) => pa.start > pb.start,
            _ => false,
        };
        if swap {
            debug!("direct comparison: swapping inputs into chronological order");
            self.compare(b, a)
        } else {
            self.compare(a, b)
        }
    }

    /// Join two sets without any period check.
    pub fn diff(&self, previous: &[CaseSummary], current: &[CaseSummary]) -> TrendReport {
        let p1 = self.actionable_counts(previous, "previous");
        let p2 = self.actionable_counts(current, "current");

        let keys: BTreeSet<&CaseKey> = p1.keys().chain(p2.keys()).copied().collect();
        let cases: Vec<JoinedCase> = keys
            .into_iter()
            .map(|key| {
                let (a1, a2) = (p1.get(key).copied(), p2.get(key).copied());
                let trend = match (a1, a2) {
                    (Some(_), Some(_)) => CaseTrend::Persistent,
                    (Some(_), None) => CaseTrend::Resolved,
                    _ => CaseTrend::New,
                };
                JoinedCase {
                    key: key.clone(),
                    trend,
                    alert_count_p1: a1,
                    alert_count_p2: a2,
                }
            })
            .collect();

        let kpis = compute_kpis(&cases, p1.len(), p2.len());
        let verdict = classify_verdict(&kpis, self.verdict);
        let persistent_by_group = persistent_by_group(&cases);
        let focus_group = focus_group(&cases, &persistent_by_group);

        info!(
            total_p1 = kpis.total_p1,
            total_p2 = kpis.total_p2,
            resolved = kpis.resolved,
            new = kpis.new,
            persistent = kpis.persistent,
            verdict = verdict.label.as_str(),
            "trend comparison complete"
        );

        TrendReport {
            previous_period: PeriodRange::from_cases(previous),
            current_period: PeriodRange::from_cases(current),
            kpis,
            verdict,
            focus_group,
            new_problems: problem_breakdown(&cases, CaseTrend::New),
            resolved_problems: problem_breakdown(&cases, CaseTrend::Resolved),
            persistent_problems: problem_breakdown(&cases, CaseTrend::Persistent),
            group_trends: group_trends(&cases),
            persistent_by_group,
            cases,
        }
    }

    /// Alert count per actionable case key. Repeated keys are merged.
    fn actionable_counts<'c>(&self, cases: &'c [CaseSummary], side: &str) -> BTreeMap<&'c CaseKey, usize> {
        let mut counts: BTreeMap<&CaseKey, usize> = BTreeMap::new();
        for case in cases.iter().filter(|c| self.analysis.is_actionable(c.action)) {
            let slot = counts.entry(&case.key).or_insert(0);
            if *slot > 0 {
                warn!(side, case = %case.key, "case appears twice in one period; merging");
            }
            *slot += case.alert_count;
        }
        counts
    }
}

fn compute_kpis(cases: &[JoinedCase], total_p1: usize, total_p2: usize) -> TrendKpis {
    fn p1(c: &JoinedCase) -> Option<usize> {
        c.alert_count_p1
    }
    fn p2(c: &JoinedCase) -> Option<usize> {
        c.alert_count_p2
    }
    let count = |t: CaseTrend| cases.iter().filter(|c| c.trend == t).count();
    let sum = |t: CaseTrend, side: fn(&JoinedCase) -> Option<usize>| -> usize {
        cases.iter().filter(|c| c.trend == t).filter_map(side).sum()
    };

    let mut kpis = TrendKpis::from_counts(
        total_p1,
        total_p2,
        count(CaseTrend::Resolved),
        count(CaseTrend::New),
        count(CaseTrend::Persistent),
    );
    kpis.alerts_total_p1 = cases.iter().filter_map(p1).sum();
    kpis.alerts_total_p2 = cases.iter().filter_map(p2).sum();
    kpis.alerts_resolved = sum(CaseTrend::Resolved, p1);
    kpis.alerts_new = sum(CaseTrend::New, p2);
    kpis.alerts_persistent = sum(CaseTrend::Persistent, p2);
    kpis.alerts_persistent_p1 = sum(CaseTrend::Persistent, p1);
    kpis
}

/// Persistent cases per group: most cases first, then largest absolute
/// change, then name.
fn persistent_by_group(cases: &[JoinedCase]) -> Vec<GroupChange> {
    let mut groups: BTreeMap<&str, GroupChange> = BTreeMap::new();
    for case in cases.iter().filter(|c| c.trend == CaseTrend::Persistent) {
        let entry = groups
            .entry(case.key.assignment_group.as_str())
            .or_insert_with(|| GroupChange {
                assignment_group: case.key.assignment_group.clone(),
                num_cases: 0,
                alerts_p1: 0,
                alerts_p2: 0,
                change: 0,
            });
        entry.num_cases += 1;
        entry.alerts_p1 += case.alert_count_p1.unwrap_or(0);
        entry.alerts_p2 += case.alert_count_p2.unwrap_or(0);
        entry.change += case.change().unwrap_or(0);
    }
    let mut rows: Vec<GroupChange> = groups.into_values().collect();
    rows.sort_by(|a, b| {
        b.num_cases
            .cmp(&a.num_cases)
            .then_with(|| b.change.abs().cmp(&a.change.abs()))
            .then_with(|| a.assignment_group.cmp(&b.assignment_group))
    });
    rows
}

/// Per-description totals for one side of the join, most cases first.
fn problem_breakdown(cases: &[JoinedCase], trend: CaseTrend) -> Vec<ProblemBreakdown> {
    let mut problems: BTreeMap<&str, ProblemBreakdown> = BTreeMap::new();
    for case in cases.iter().filter(|c| c.trend == trend) {
        let entry = problems
            .entry(case.key.short_description.as_str())
            .or_insert_with(|| ProblemBreakdown {
                short_description: case.key.short_description.clone(),
                num_cases: 0,
                alerts_p1: 0,
                alerts_p2: 0,
            });
        entry.num_cases += 1;
        entry.alerts_p1 += case.alert_count_p1.unwrap_or(0);
        entry.alerts_p2 += case.alert_count_p2.unwrap_or(0);
    }
    let mut rows: Vec<ProblemBreakdown> = problems.into_values().collect();
    rows.sort_by(|a, b| {
        b.num_cases
            .cmp(&a.num_cases)
            .then_with(|| (b.alerts_p1 + b.alerts_p2).cmp(&(a.alerts_p1 + a.alerts_p2)))
            .then_with(|| a.short_description.cmp(&b.short_description))
    });
    rows
}

/// Outer join of actionable alert volume by group, ordered by name.
fn group_trends(cases: &[JoinedCase]) -> Vec<GroupTrend> {
    let mut groups: BTreeMap<&str, GroupTrend> = BTreeMap::new();
    for case in cases {
        let entry = groups
            .entry(case.key.assignment_group.as_str())
            .or_insert_with(|| GroupTrend {
                assignment_group: case.key.assignment_group.clone(),
                alerts_p1: 0,
                alerts_p2: 0,
                num_cases: 0,
            });
        entry.alerts_p1 += case.alert_count_p1.unwrap_or(0);
        if let Some(p2) = case.alert_count_p2 {
            entry.alerts_p2 += p2;
            entry.num_cases += 1;
        }
    }
    groups.into_values().collect()
}

fn focus_group(cases: &[JoinedCase], persistent: &[GroupChange]) -> Option<String> {
    let mut new_by_group: BTreeMap<&str, usize> = BTreeMap::new();
    for case in cases.iter().filter(|c| c.trend == CaseTrend::New) {
        *new_by_group.entry(case.key.assignment_group.as_str()).or_insert(0) += 1;
    }
    // BTreeMap iterates by name, so the first maximum is the alphabetical tie-break.
    let mut best: Option<(&str, usize)> = None;
    for (group, n) in new_by_group {
        if best.map_or(true, |(_, top)| n > top) {
            best = Some((group, n));
        }
    }
    best.map(|(group, _)| group.to_string())
        .or_else(|| persistent.first().map(|g| g.assignment_group.clone()))
}
