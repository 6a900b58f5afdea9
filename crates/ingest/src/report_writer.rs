use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use triage_core::{CaseSummary, TriageError, GROUP_COLUMNS};

use crate::normalizer::InvalidRow;

pub const ACTIONABLE_FILE: &str = "act.csv";
pub const REMEDIATED_FILE: &str = "remediated.csv";
pub const RECURRING_FILE: &str = "recurring.csv";
pub const INVALID_ROWS_FILE: &str = "invalid_rows.csv";

/// Separator used when a list column is flattened into one cell.
const LIST_SEPARATOR: &str = " -> ";

const SUMMARY_COLUMNS: [&str; 12] = [
    "alert_count",
    "status_chronology",
    "first_event",
    "last_event",
    "alert_numbers",
    "remediation_statuses",
    "severity_score",
    "priority_score",
    "score_criticidade_final",
    "acao_sugerida",
    "fator_ineficiencia_task",
    "score_ponderado_final",
];

/// Empty follow-up columns appended to the actionable file.
const TRACKING_COLUMNS: [&str; 3] = ["treatment_status", "owner", "expected_resolution_date"];
const TRACKING_DEFAULT_STATUS: &str = "Pending";

/// Writes case partitions and the invalid-row log as delimited text.
///
/// Files start with a UTF-8 byte-order mark so spreadsheet tools pick the
/// right encoding.
pub struct ReportWriter {
    out_dir: PathBuf,
    delimiter: u8,
}

impl ReportWriter {
    pub fn new(out_dir: impl Into<PathBuf>, delimiter: u8) -> Self {
        Self {
            out_dir: out_dir.into(),
            delimiter,
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Write one partition in the given order. An empty partition produces
    /// no file and removes one left by an earlier run; the return value is
    /// the written path.
    pub fn write_cases(
        &self,
        file_name: &str,
        cases: &[&CaseSummary],
        with_tracking: bool,
    ) -> Result<Option<PathBuf>, TriageError> {
        if cases.is_empty() {
            self.remove_stale(file_name)?;
            return Ok(None);
        }
        let mut header: Vec<&str> = GROUP_COLUMNS.to_vec();
        header.extend(SUMMARY_COLUMNS);
        if with_tracking {
            header.extend(TRACKING_COLUMNS);
        }

        let mut rows = Vec::with_capacity(cases.len());
        for case in cases {
            let mut row: Vec<String> = case.key.fields().iter().map(|f| f.to_string()).collect();
            row.extend([
                case.alert_count.to_string(),
                case.status_chronology.join(LIST_SEPARATOR),
                case.first_event.to_string(),
                case.last_event.to_string(),
                case.alert_numbers.join(", "),
                case.remediation_statuses.join(", "),
                case.severity_score.to_string(),
                case.priority_score.to_string(),
                case.criticality_score.to_string(),
                case.action.code().to_string(),
                case.inefficiency_factor.to_string(),
                format!("{:.4}", case.weighted_score),
            ]);
            if with_tracking {
                row.extend([TRACKING_DEFAULT_STATUS.to_string(), String::new(), String::new()]);
            }
            rows.push(row);
        }

        let path = self.out_dir.join(file_name);
        self.write_table(&path, &header, &rows)?;
        info!(path = %path.display(), cases = cases.len(), "wrote case report");
        Ok(Some(path))
    }

    /// Write rejected rows with their original header plus line and reason.
    pub fn write_invalid_rows(
        &self,
        source_headers: &[String],
        rows: &[InvalidRow],
    ) -> Result<Option<PathBuf>, TriageError> {
        if rows.is_empty() {
            self.remove_stale(INVALID_ROWS_FILE)?;
            return Ok(None);
        }
        let mut header: Vec<&str> = vec!["line"];
        header.extend(source_headers.iter().map(String::as_str));
        header.push("invalidated");

        let table: Vec<Vec<String>> = rows
            .iter()
            .map(|r| {
                let mut row = vec![r.line.to_string()];
                row.extend(r.fields.iter().cloned());
                row.resize(source_headers.len() + 1, String::new());
                row.push(r.reason.message().to_string());
                row
            })
            .collect();

        let path = self.out_dir.join(INVALID_ROWS_FILE);
        self.write_table(&path, &header, &table)?;
        info!(path = %path.display(), rows = rows.len(), "wrote invalid-row log");
        Ok(Some(path))
    }

    /// Delete a report this run does not produce. Returns whether a file
    /// was removed.
    pub fn remove_stale(&self, file_name: &str) -> Result<bool, TriageError> {
        let path = self.out_dir.join(file_name);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "removed stale report");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn write_table(&self, path: &Path, header: &[&str], rows: &[Vec<String>]) -> Result<(), TriageError> {
        fs::create_dir_all(&self.out_dir)?;
        let mut buf = "\u{feff}".as_bytes().to_vec();
        {
            let mut writer = csv::WriterBuilder::new()
                .delimiter(self.delimiter)
                .from_writer(&mut buf);
            writer
                .write_record(header)
                .map_err(|e| TriageError::Csv(e.to_string()))?;
            for row in rows {
                writer
                    .write_record(row)
                    .map_err(|e| TriageError::Csv(e.to_string()))?;
            }
            writer.flush()?;
        }
        fs::write(path, buf)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_import::CsvImporter;
    use crate::normalizer::InvalidReason;
    use chrono::NaiveDate;
    use tempfile::TempDir;
    use triage_core::{ActionCategory, CaseKey};

    fn case(action: ActionCategory) -> CaseSummary {
        let at = NaiveDate::from_ymd_opt(2024, 6, 2)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        CaseSummary {
            key: CaseKey {
                assignment_group: "SQUAD_B".into(),
                short_description: "Service down; restart".into(),
                node: "app2".into(),
                cmdb_ci: "ci9".into(),
                source: "dynatrace".into(),
                metric_name: "availability".into(),
                cmdb_ci_class: "cmdb_ci_app_server".into(),
            },
            alert_count: 2,
            status_chronology: vec!["Closed Complete".into(), "Closed Incomplete".into()],
            first_event: at,
            last_event: at,
            alert_numbers: vec!["ALR7".into(), "ALR8".into()],
            remediation_statuses: vec!["REM_NOT_OK".into(), "REM_OK".into()],
            severity_score: 5.0,
            priority_score: 8.0,
            criticality_score: 13.0,
            action,
            inefficiency_factor: 1.5,
            weighted_score: 40.0,
        }
    }

    #[test]
    fn actionable_file_gets_tracking_columns() {
        let dir = TempDir::new().unwrap();
        let writer = ReportWriter::new(dir.path(), b';');
        let c = case(ActionCategory::Intermitente);
        let path = writer.write_cases(ACTIONABLE_FILE, &[&c], true).unwrap().unwrap();

        let table = CsvImporter::default().import(&path).unwrap();
        let row = &table.rows[0];
        assert_eq!(table.cell(row, "short_description"), "Service down; restart");
        assert_eq!(table.cell(row, "acao_sugerida"), "INTERMITENTE");
        assert_eq!(
            table.cell(row, "status_chronology"),
            "Closed Complete -> Closed Incomplete"
        );
        assert_eq!(table.cell(row, "treatment_status"), "Pending");
        assert_eq!(table.cell(row, "owner"), "");
        assert!(table.column("expected_resolution_date").is_some());
    }

    #[test]
    fn plain_partition_has_no_tracking_and_empty_is_skipped() {
        let dir = TempDir::new().unwrap();
        let writer = ReportWriter::new(dir.path().join("out"), b';');
        let c = case(ActionCategory::SempreOk);
        let path = writer.write_cases(REMEDIATED_FILE, &[&c], false).unwrap().unwrap();
        let table = CsvImporter::default().import(&path).unwrap();
        assert!(table.column("treatment_status").is_none());

        assert!(writer.write_cases(RECURRING_FILE, &[], false).unwrap().is_none());
        assert!(!writer.out_dir().join(RECURRING_FILE).exists());
    }

    #[test]
    fn empty_partition_removes_previous_file() {
        let dir = TempDir::new().unwrap();
        let writer = ReportWriter::new(dir.path(), b';');
        let c = case(ActionCategory::InstabilidadeCronica);
        writer.write_cases(RECURRING_FILE, &[&c], false).unwrap();
        assert!(dir.path().join(RECURRING_FILE).exists());

        assert!(writer.write_cases(RECURRING_FILE, &[], false).unwrap().is_none());
        assert!(!dir.path().join(RECURRING_FILE).exists());
        assert!(!writer.remove_stale(RECURRING_FILE).unwrap());

        let rows = vec![InvalidRow {
            line: 3,
            reason: InvalidReason::UnparseableTimestamp,
            fields: vec!["x".into()],
        }];
        writer.write_invalid_rows(&["number".to_string()], &rows).unwrap();
        assert!(writer.write_invalid_rows(&["number".to_string()], &[]).unwrap().is_none());
        assert!(!dir.path().join(INVALID_ROWS_FILE).exists());
    }

    #[test]
    fn invalid_rows_log_keeps_fields_and_reason() {
        let dir = TempDir::new().unwrap();
        let writer = ReportWriter::new(dir.path(), b';');
        let headers = vec!["number".to_string(), "node".to_string()];
        let rows = vec![InvalidRow {
            line: 7,
            reason: InvalidReason::MissingTicketNumber,
            fields: vec![String::new()],
        }];
        let path = writer.write_invalid_rows(&headers, &rows).unwrap().unwrap();

        let table = CsvImporter::default().import(&path).unwrap();
        let row = &table.rows[0];
        assert_eq!(table.cell(row, "line"), "7");
        assert_eq!(table.cell(row, "node"), "");
        assert_eq!(table.cell(row, "invalidated"), "ticket number missing");
    }
}
