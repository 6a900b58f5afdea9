pub mod algorithms;
pub mod engine;
pub mod pipeline;

pub use algorithms::chronology::{build_chronology, ChronologyClassifier};
pub use algorithms::grouper::{group_cases, CaseGroup};
pub use algorithms::scoring::{volume_factor, Criticality, Scorer};
pub use engine::{AnalysisEngine, AnalysisOutput};
pub use pipeline::report::{RankedCount, ReportKpis, ReportPartitions};
pub use pipeline::summary::SummaryBuilder;
pub use pipeline::trend::{
    check_periods, CaseTrend, ComparisonOutcome, GroupChange, GroupTrend, JoinedCase,
    ProblemBreakdown, TrendDiff, TrendKpis, TrendReport,
};
pub use pipeline::verdict::{classify_verdict, Verdict, VerdictClass, VerdictKind};
