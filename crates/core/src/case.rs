use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::alert::CaseKey;

// ── Action category ───────────────────────────────────────────

/// Remediation-automation behaviour of a case, derived from its chronology.
///
/// The set is closed; every case gets exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionCategory {
    SempreOk,
    Estabilizada,
    Intermitente,
    FalhaPersistente,
    SucessoParcial,
    StatusAusente,
    Inconsistente,
    InstabilidadeCronica,
}

impl ActionCategory {
    pub const ALL: [ActionCategory; 8] = [
        ActionCategory::SempreOk,
        ActionCategory::Estabilizada,
        ActionCategory::Intermitente,
        ActionCategory::FalhaPersistente,
        ActionCategory::SucessoParcial,
        ActionCategory::StatusAusente,
        ActionCategory::Inconsistente,
        ActionCategory::InstabilidadeCronica,
    ];

    /// Categories whose automation is considered working.
    pub const REMEDIATED: [ActionCategory; 2] =
        [ActionCategory::SempreOk, ActionCategory::Estabilizada];

    pub fn code(&self) -> &'static str {
        match self {
            ActionCategory::SempreOk => "SEMPRE_OK",
            ActionCategory::Estabilizada => "ESTABILIZADA",
            ActionCategory::Intermitente => "INTERMITENTE",
            ActionCategory::FalhaPersistente => "FALHA_PERSISTENTE",
            ActionCategory::SucessoParcial => "SUCESSO_PARCIAL",
            ActionCategory::StatusAusente => "STATUS_AUSENTE",
            ActionCategory::Inconsistente => "INCONSISTENTE",
            ActionCategory::InstabilidadeCronica => "INSTABILIDADE_CRONICA",
        }
    }

    /// Suggested follow-up shown next to the case in reports.
    pub fn suggested_action(&self) -> &'static str {
        match self {
            ActionCategory::SempreOk => "Automatic remediation working",
            ActionCategory::Estabilizada => "Remediation stabilized (after a failure)",
            ActionCategory::Intermitente => "Investigate intermittent remediation",
            ActionCategory::FalhaPersistente => "Build a remediation (no success recorded)",
            ActionCategory::SucessoParcial => "Review partially successful remediation",
            ActionCategory::StatusAusente => "Check remediation data collection (status missing)",
            ActionCategory::Inconsistente => "Analyse root cause (inconsistent remediation)",
            ActionCategory::InstabilidadeCronica => "Review root cause (recurring remediation)",
        }
    }

    pub fn is_remediated(&self) -> bool {
        Self::REMEDIATED.contains(self)
    }

    pub fn is_chronic(&self) -> bool {
        *self == ActionCategory::InstabilidadeCronica
    }
}

impl fmt::Display for ActionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for ActionCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ActionCategory::ALL
            .into_iter()
            .find(|c| c.code() == s)
            .ok_or_else(|| format!("unknown action category: '{}'", s))
    }
}

// ── Case summary ──────────────────────────────────────────────

/// One record per case: the artifact that is exported and later diffed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseSummary {
    #[serde(flatten)]
    pub key: CaseKey,
    pub alert_count: usize,
    /// Outcome labels ordered by occurrence; always `alert_count` long.
    pub status_chronology: Vec<String>,
    pub first_event: NaiveDateTime,
    pub last_event: NaiveDateTime,
    #[serde(default)]
    pub alert_numbers: Vec<String>,
    #[serde(default)]
    pub remediation_statuses: Vec<String>,
    pub severity_score: f64,
    pub priority_score: f64,
    #[serde(rename = "score_criticidade_final")]
    pub criticality_score: f64,
    #[serde(rename = "acao_sugerida")]
    pub action: ActionCategory,
    #[serde(rename = "fator_ineficiencia_task")]
    pub inefficiency_factor: f64,
    #[serde(rename = "score_ponderado_final")]
    pub weighted_score: f64,
}

// ── Period range ──────────────────────────────────────────────

/// Time span covered by an analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl PeriodRange {
    /// Span of a set of timestamps, `None` when empty.
    pub fn from_timestamps<I: IntoIterator<Item = NaiveDateTime>>(iter: I) -> Option<Self> {
        iter.into_iter().fold(None, |acc, ts| match acc {
            None => Some(PeriodRange { start: ts, end: ts }),
            Some(r) => Some(PeriodRange {
                start: r.start.min(ts),
                end: r.end.max(ts),
            }),
        })
    }

    pub fn from_cases(cases: &[CaseSummary]) -> Option<Self> {
        Self::from_timestamps(cases.iter().flat_map(|c| [c.first_event, c.last_event]))
    }

    /// `DD/MM/YYYY a DD/MM/YYYY`, the label stored alongside reports.
    pub fn label(&self) -> String {
        format!(
            "{} a {}",
            self.start.format("%d/%m/%Y"),
            self.end.format("%d/%m/%Y")
        )
    }
}

// ── Summary document ──────────────────────────────────────────

/// Metadata written ahead of the case records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryHeader {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub source_file: Option<String>,
    #[serde(default)]
    pub period: Option<PeriodRange>,
    pub invalid_rows: usize,
    pub total_cases: usize,
}

/// Persisted output of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryDocument {
    pub header: SummaryHeader,
    pub records: Vec<CaseSummary>,
}

impl SummaryDocument {
    pub fn new(records: Vec<CaseSummary>, invalid_rows: usize, source_file: Option<String>) -> Self {
        let header = SummaryHeader {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            source_file,
            period: PeriodRange::from_cases(&records),
            invalid_rows,
            total_cases: records.len(),
        };
        Self { header, records }
    }

    /// Period from the header, or recomputed from the records for documents
    /// that predate the header.
    pub fn period(&self) -> Option<PeriodRange> {
        self.header
            .period
            .or_else(|| PeriodRange::from_cases(&self.records))
    }
}
