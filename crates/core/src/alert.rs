use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

// ── Column names ──────────────────────────────────────────────

pub const COL_ASSIGNMENT_GROUP: &str = "assignment_group";
pub const COL_SHORT_DESCRIPTION: &str = "short_description";
pub const COL_NODE: &str = "node";
pub const COL_CMDB_CI: &str = "cmdb_ci";
pub const COL_SOURCE: &str = "source";
pub const COL_METRIC_NAME: &str = "metric_name";
pub const COL_CMDB_CI_CLASS: &str = "cmdb_ci.sys_class_name";
pub const COL_CREATED_ON: &str = "sys_created_on";
pub const COL_SEVERITY: &str = "severity";
pub const COL_PRIORITY_GROUP: &str = "sn_priority_group";
pub const COL_REMEDIATION_PRESENT: &str = "remediation_tasks_present";
pub const COL_TASKS_STATUS: &str = "tasks_status";
pub const COL_NUMBER: &str = "number";

/// Columns whose values form the case identity, in key order.
pub const GROUP_COLUMNS: [&str; 7] = [
    COL_ASSIGNMENT_GROUP,
    COL_SHORT_DESCRIPTION,
    COL_NODE,
    COL_CMDB_CI,
    COL_SOURCE,
    COL_METRIC_NAME,
    COL_CMDB_CI_CLASS,
];

/// Every column an input batch must carry in its header.
pub const REQUIRED_COLUMNS: [&str; 13] = [
    COL_ASSIGNMENT_GROUP,
    COL_SHORT_DESCRIPTION,
    COL_NODE,
    COL_CMDB_CI,
    COL_SOURCE,
    COL_METRIC_NAME,
    COL_CMDB_CI_CLASS,
    COL_CREATED_ON,
    COL_SEVERITY,
    COL_PRIORITY_GROUP,
    COL_REMEDIATION_PRESENT,
    COL_TASKS_STATUS,
    COL_NUMBER,
];

/// Chronology sentinel for an occurrence with no usable outcome.
pub const NO_STATUS: &str = "NO_STATUS";

/// Chronology label for an occurrence whose remediation task was never created.
pub const NO_TASK_FOUND: &str = "No Task Found";

// ── Remediation presence ──────────────────────────────────────

/// Value of the `remediation_tasks_present` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RemediationPresence {
    #[serde(rename = "REM_OK")]
    Succeeded,
    #[serde(rename = "REM_NOT_OK")]
    Failed,
    #[serde(rename = "NO_STATUS")]
    NoStatus,
}

impl RemediationPresence {
    pub fn label(&self) -> &'static str {
        match self {
            RemediationPresence::Succeeded => "REM_OK",
            RemediationPresence::Failed => "REM_NOT_OK",
            RemediationPresence::NoStatus => NO_STATUS,
        }
    }

    /// Parse a raw cell. Empty means no status; unknown text is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "REM_OK" => Some(RemediationPresence::Succeeded),
            "REM_NOT_OK" => Some(RemediationPresence::Failed),
            "" | NO_STATUS => Some(RemediationPresence::NoStatus),
            _ => None,
        }
    }
}

impl fmt::Display for RemediationPresence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Case identity ─────────────────────────────────────────────

/// The seven descriptive fields that identify a recurring problem.
///
/// Equality is exact and case-sensitive. Ordering follows field order and is
/// only used to make output deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CaseKey {
    pub assignment_group: String,
    pub short_description: String,
    pub node: String,
    pub cmdb_ci: String,
    pub source: String,
    pub metric_name: String,
    #[serde(rename = "cmdb_ci.sys_class_name")]
    pub cmdb_ci_class: String,
}

impl CaseKey {
    /// Field values in [`GROUP_COLUMNS`] order.
    pub fn fields(&self) -> [&str; 7] {
        [
            &self.assignment_group,
            &self.short_description,
            &self.node,
            &self.cmdb_ci,
            &self.source,
            &self.metric_name,
            &self.cmdb_ci_class,
        ]
    }
}

impl fmt::Display for CaseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fields().join(" | "))
    }
}

// ── Alert record ──────────────────────────────────────────────

/// One validated input row. Immutable once built by the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub key: CaseKey,
    pub created_on: NaiveDateTime,
    pub severity: String,
    pub priority_group: String,
    pub remediation: RemediationPresence,
    /// Trimmed `tasks_status`; `None` when the cell was empty.
    pub task_status: Option<String>,
    pub number: String,
}

impl AlertRecord {
    /// The label this occurrence contributes to its case chronology.
    ///
    /// Absent outcomes are never dropped: a failed presence becomes
    /// [`NO_TASK_FOUND`], anything else becomes [`NO_STATUS`].
    pub fn chronology_label(&self) -> &str {
        match (&self.task_status, self.remediation) {
            (Some(label), _) => label,
            (None, RemediationPresence::Failed) => NO_TASK_FOUND,
            (None, _) => NO_STATUS,
        }
    }
}
