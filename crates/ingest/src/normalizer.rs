use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::{info, warn};
use triage_core::{
    AlertRecord, CaseKey, RemediationPresence, TriageError, COL_CREATED_ON, COL_NUMBER,
    COL_PRIORITY_GROUP, COL_REMEDIATION_PRESENT, COL_SEVERITY, COL_TASKS_STATUS, GROUP_COLUMNS,
    REQUIRED_COLUMNS,
};
use triage_rules::CompiledAnalysisConfig;

use crate::csv_import::{RawRow, RawTable};
use crate::timestamp::parse_timestamp;

/// Why a row was kept out of the analysis. The first failing check wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidReason {
    MissingGroupingFields,
    MissingTicketNumber,
    UnparseableTimestamp,
    UnexpectedPresenceFormat,
    UnrecognisedStatusWithRemOk,
}

impl InvalidReason {
    pub fn message(&self) -> &'static str {
        match self {
            InvalidReason::MissingGroupingFields => "malformed row: grouping fields missing",
            InvalidReason::MissingTicketNumber => "ticket number missing",
            InvalidReason::UnparseableTimestamp => "unparseable timestamp",
            InvalidReason::UnexpectedPresenceFormat => {
                "unexpected remediation_tasks_present format"
            }
            InvalidReason::UnrecognisedStatusWithRemOk => {
                "inconsistent: remediation reported OK but task status is unrecognised"
            }
        }
    }
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// A rejected row with the raw cells it carried.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidRow {
    pub line: u64,
    pub reason: InvalidReason,
    pub fields: Vec<String>,
}

/// Output of one normalisation pass.
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    pub records: Vec<AlertRecord>,
    pub invalid: Vec<InvalidRow>,
}

impl NormalizedBatch {
    /// A batch with no valid record cannot be analysed.
    pub fn ensure_usable(&self) -> Result<(), TriageError> {
        if self.records.is_empty() {
            return Err(TriageError::AllRowsInvalid(self.invalid.len()));
        }
        Ok(())
    }

    /// Rejections per reason, for logging and reporting.
    pub fn reason_counts(&self) -> BTreeMap<InvalidReason, usize> {
        let mut counts = BTreeMap::new();
        for row in &self.invalid {
            *counts.entry(row.reason).or_insert(0) += 1;
        }
        counts
    }
}

/// Validates raw rows into [`AlertRecord`]s.
///
/// Uses the outcome table of the analysis config to detect `REM_OK` rows
/// whose task status nobody recognises.
pub struct RowNormalizer<'a> {
    config: &'a CompiledAnalysisConfig,
}

impl<'a> RowNormalizer<'a> {
    pub fn new(config: &'a CompiledAnalysisConfig) -> Self {
        Self { config }
    }

    /// Normalise a whole table.
    ///
    /// Fails when the header lacks a required column, when there are no data
    /// rows, or when every row is rejected.
    pub fn normalize(&self, table: &RawTable) -> Result<NormalizedBatch, TriageError> {
        let batch = self.partition(table)?;
        batch.ensure_usable()?;
        Ok(batch)
    }

    /// Split a table into records and rejected rows.
    ///
    /// Only a missing column or an empty table fails here; a batch where
    /// every row was rejected is still returned so its rejections can be
    /// logged before [`NormalizedBatch::ensure_usable`] refuses it.
    pub fn partition(&self, table: &RawTable) -> Result<NormalizedBatch, TriageError> {
        let missing = table.missing_columns(&REQUIRED_COLUMNS);
        if !missing.is_empty() {
            return Err(TriageError::MissingColumns(missing));
        }
        if table.rows.is_empty() {
            return Err(TriageError::EmptyInput);
        }

        let mut batch = NormalizedBatch::default();
        for row in &table.rows {
            match self.normalize_row(table, row) {
                Ok(record) => batch.records.push(record),
                Err(reason) => batch.invalid.push(InvalidRow {
                    line: row.line,
                    reason,
                    fields: row.values.clone(),
                }),
            }
        }

        for (reason, count) in batch.reason_counts() {
            warn!(reason = %reason, count, "rows rejected");
        }
        info!(
            valid = batch.records.len(),
            invalid = batch.invalid.len(),
            "normalised alert rows"
        );

        Ok(batch)
    }

    fn normalize_row(&self, table: &RawTable, row: &RawRow) -> Result<AlertRecord, InvalidReason> {
        let group: Vec<&str> = GROUP_COLUMNS.iter().map(|c| table.cell(row, c)).collect();
        if group.iter().any(|v| v.is_empty()) {
            return Err(InvalidReason::MissingGroupingFields);
        }

        let number = table.cell(row, COL_NUMBER);
        if number.is_empty() {
            return Err(InvalidReason::MissingTicketNumber);
        }

        let created_on = parse_timestamp(table.cell(row, COL_CREATED_ON))
            .ok_or(InvalidReason::UnparseableTimestamp)?;

        let remediation = RemediationPresence::parse(table.cell(row, COL_REMEDIATION_PRESENT))
            .ok_or(InvalidReason::UnexpectedPresenceFormat)?;

        let task_status = Some(table.cell(row, COL_TASKS_STATUS))
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        if remediation == RemediationPresence::Succeeded {
            if let Some(label) = &task_status {
                if !self.config.is_known_label(label) {
                    return Err(InvalidReason::UnrecognisedStatusWithRemOk);
                }
            }
        }

        Ok(AlertRecord {
            key: CaseKey {
                assignment_group: group[0].to_string(),
                short_description: group[1].to_string(),
                node: group[2].to_string(),
                cmdb_ci: group[3].to_string(),
                source: group[4].to_string(),
                metric_name: group[5].to_string(),
                cmdb_ci_class: group[6].to_string(),
            },
            created_on,
            severity: table.cell(row, COL_SEVERITY).to_string(),
            priority_group: table.cell(row, COL_PRIORITY_GROUP).to_string(),
            remediation,
            task_status,
            number: number.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Vec<String> {
        REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect()
    }

    /// Row in REQUIRED_COLUMNS order with a few overridable cells.
    fn row(ts: &str, presence: &str, status: &str, number: &str) -> Vec<String> {
        vec![
            "SQUAD_A", "Disk full", "srv1", "ci1", "zabbix", "disk", "cmdb_ci_linux_server", ts,
            "Alto", "Urgente", presence, status, number,
        ]
        .into_iter()
        .map(str::to_string)
        .collect()
    }

    fn normalize(rows: Vec<Vec<String>>) -> Result<NormalizedBatch, TriageError> {
        let config = CompiledAnalysisConfig::default();
        RowNormalizer::new(&config).normalize(&RawTable::new(header(), rows))
    }

    #[test]
    fn valid_row_becomes_record() {
        let batch = normalize(vec![row(
            "2024-05-01 10:00:00",
            "REM_OK",
            "Closed Complete",
            "ALR1",
        )])
        .unwrap();
        assert!(batch.invalid.is_empty());
        let rec = &batch.records[0];
        assert_eq!(rec.key.assignment_group, "SQUAD_A");
        assert_eq!(rec.key.cmdb_ci_class, "cmdb_ci_linux_server");
        assert_eq!(rec.remediation, RemediationPresence::Succeeded);
        assert_eq!(rec.task_status.as_deref(), Some("Closed Complete"));
        assert_eq!(rec.number, "ALR1");
    }

    #[test]
    fn empty_presence_and_status_are_no_status() {
        let batch = normalize(vec![row("2024-05-01 10:00:00", "", "", "ALR1")]).unwrap();
        let rec = &batch.records[0];
        assert_eq!(rec.remediation, RemediationPresence::NoStatus);
        assert_eq!(rec.task_status, None);
    }

    #[test]
    fn each_reason_is_detected() {
        let mut no_group = row("2024-05-01 10:00:00", "REM_OK", "Closed", "ALR1");
        no_group[2] = String::new();
        let rows = vec![
            no_group,
            row("2024-05-01 10:00:00", "REM_OK", "Closed", ""),
            row("someday", "REM_OK", "Closed", "ALR3"),
            row("2024-05-01 10:00:00", "MAYBE", "Closed", "ALR4"),
            row("2024-05-01 10:00:00", "REM_OK", "Mystery", "ALR5"),
            row("2024-05-01 10:00:00", "REM_NOT_OK", "Mystery", "ALR6"),
        ];
        let batch = normalize(rows).unwrap();
        let reasons: Vec<_> = batch.invalid.iter().map(|r| r.reason).collect();
        assert_eq!(
            reasons,
            vec![
                InvalidReason::MissingGroupingFields,
                InvalidReason::MissingTicketNumber,
                InvalidReason::UnparseableTimestamp,
                InvalidReason::UnexpectedPresenceFormat,
                InvalidReason::UnrecognisedStatusWithRemOk,
            ]
        );
        // An unknown label without REM_OK is kept; the classifier treats it as a failure.
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].number, "ALR6");
        assert_eq!(batch.invalid[0].line, 2);
        assert_eq!(batch.reason_counts()[&InvalidReason::MissingTicketNumber], 1);
    }

    #[test]
    fn first_failing_check_wins() {
        let batch = normalize(vec![
            row("garbage", "MAYBE", "", ""),
            row("2024-05-01 10:00:00", "", "", "ALR2"),
        ])
        .unwrap();
        assert_eq!(batch.invalid[0].reason, InvalidReason::MissingTicketNumber);
    }

    #[test]
    fn missing_columns_is_terminal() {
        let config = CompiledAnalysisConfig::default();
        let mut headers = header();
        headers.retain(|h| h != COL_NUMBER && h != COL_SEVERITY);
        let err = RowNormalizer::new(&config)
            .normalize(&RawTable::new(headers, vec![]))
            .unwrap_err();
        match err {
            TriageError::MissingColumns(cols) => {
                assert_eq!(cols, vec![COL_SEVERITY.to_string(), COL_NUMBER.to_string()])
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn fully_invalid_partition_keeps_rejections() {
        let config = CompiledAnalysisConfig::default();
        let table = RawTable::new(header(), vec![row("not-a-date", "", "", "A")]);
        let batch = RowNormalizer::new(&config).partition(&table).unwrap();
        assert!(batch.records.is_empty());
        assert_eq!(batch.invalid.len(), 1);
        assert_eq!(batch.invalid[0].reason, InvalidReason::UnparseableTimestamp);
        assert_eq!(batch.invalid[0].line, 2);
        assert!(matches!(batch.ensure_usable(), Err(TriageError::AllRowsInvalid(1))));
    }

    #[test]
    fn empty_and_fully_invalid_inputs_fail() {
        assert!(matches!(normalize(vec![]), Err(TriageError::EmptyInput)));
        assert!(matches!(
            normalize(vec![row("x", "", "", "A"), row("y", "", "", "B")]),
            Err(TriageError::AllRowsInvalid(2))
        ));
    }
}
