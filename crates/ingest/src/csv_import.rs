use std::collections::HashMap;
use std::path::Path;

use tracing::info;
use triage_core::{PeriodRange, TriageError, COL_CREATED_ON};

use crate::timestamp::parse_timestamp;

/// One data line as read from the file, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// 1-based line in the source file; the header is line 1.
    pub line: u64,
    pub values: Vec<String>,
}

/// Header plus rows of a delimited export. Cells are trimmed strings; short
/// rows are padded with empty cells.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
    index: HashMap<String, usize>,
}

impl RawTable {
    /// Build a table from in-memory rows, numbered as if they followed a
    /// header line.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(i, values)| RawRow {
                line: i as u64 + 2,
                values,
            })
            .collect();
        Self::with_rows(headers, rows)
    }

    pub fn with_rows(headers: Vec<String>, mut rows: Vec<RawRow>) -> Self {
        let index = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), i))
            .collect();
        let width = headers.len();
        for row in &mut rows {
            if row.values.len() < width {
                row.values.resize(width, String::new());
            }
        }
        Self { headers, rows, index }
    }

    /// Column position by header name.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Cell text for a row, empty when the column is absent.
    pub fn cell<'a>(&self, row: &'a RawRow, name: &str) -> &'a str {
        self.column(name)
            .and_then(|i| row.values.get(i))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Required columns missing from the header.
    pub fn missing_columns(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|c| !self.index.contains_key(**c))
            .map(|c| c.to_string())
            .collect()
    }

    /// Span of the parseable occurrence timestamps, ignoring every other
    /// validation rule.
    pub fn date_range(&self) -> Option<PeriodRange> {
        let col = self.column(COL_CREATED_ON)?;
        PeriodRange::from_timestamps(
            self.rows
                .iter()
                .filter_map(|r| r.values.get(col))
                .filter_map(|v| parse_timestamp(v)),
        )
    }
}

/// Reads delimited alert exports into a [`RawTable`].
pub struct CsvImporter {
    delimiter: u8,
}

impl Default for CsvImporter {
    fn default() -> Self {
        Self { delimiter: b';' }
    }
}

impl CsvImporter {
    pub fn new(delimiter: u8) -> Self {
        Self { delimiter }
    }

    pub fn import(&self, path: &Path) -> Result<RawTable, TriageError> {
        let content = std::fs::read_to_string(path).map_err(TriageError::Io)?;
        let table = self.parse_str(&content)?;
        info!(
            rows = table.rows.len(),
            columns = table.headers.len(),
            "Imported alert rows from {}",
            path.display()
        );
        Ok(table)
    }

    /// Parse delimited text. A UTF-8 byte-order mark is ignored and lines
    /// whose cells are all blank are dropped.
    pub fn parse_str(&self, content: &str) -> Result<RawTable, TriageError> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| TriageError::Csv(e.to_string()))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| TriageError::Csv(e.to_string()))?;
            if record.iter().all(|v| v.is_empty()) {
                continue;
            }
            let line = record
                .position()
                .map(|p| p.line())
                .unwrap_or(rows.len() as u64 + 2);
            rows.push(RawRow {
                line,
                values: record.iter().map(str::to_string).collect(),
            });
        }

        Ok(RawTable::with_rows(headers, rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_semicolon_export_with_bom() {
        let text = "\u{feff}number;sys_created_on;node\nALR1;2024-05-01 10:00:00;srv1\n";
        let table = CsvImporter::default().parse_str(text).unwrap();
        assert_eq!(table.headers, vec!["number", "sys_created_on", "node"]);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.cell(&table.rows[0], "number"), "ALR1");
        assert_eq!(table.cell(&table.rows[0], "node"), "srv1");
    }

    #[test]
    fn drops_blank_lines_and_pads_short_rows() {
        let text = "a;b;c\n1;2;3\n;;\n4\n";
        let table = CsvImporter::default().parse_str(text).unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1].values, vec!["4", "", ""]);
        assert_eq!(table.rows[0].line, 2);
        assert_eq!(table.rows[1].line, 4);
    }

    #[test]
    fn quoted_cells_may_contain_delimiter() {
        let text = "short_description;node\n\"CPU; high\";srv1\n";
        let table = CsvImporter::default().parse_str(text).unwrap();
        assert_eq!(table.cell(&table.rows[0], "short_description"), "CPU; high");
    }

    #[test]
    fn custom_delimiter() {
        let table = CsvImporter::new(b',').parse_str("a,b\n1,2\n").unwrap();
        assert_eq!(table.cell(&table.rows[0], "b"), "2");
    }

    #[test]
    fn missing_columns_and_absent_cells() {
        let table = CsvImporter::default().parse_str("a;b\n1;2\n").unwrap();
        assert_eq!(table.missing_columns(&["a", "z"]), vec!["z".to_string()]);
        assert_eq!(table.cell(&table.rows[0], "z"), "");
    }

    #[test]
    fn date_range_skips_unparseable_values() {
        let text = "sys_created_on\n03/05/2024 10:00\nnot a date\n2024-05-01 08:00:00\n";
        let table = CsvImporter::default().parse_str(text).unwrap();
        let range = table.date_range().unwrap();
        assert_eq!(range.label(), "01/05/2024 a 03/05/2024");
    }

    #[test]
    fn date_range_none_without_column_or_values() {
        let table = CsvImporter::default().parse_str("a\n1\n").unwrap();
        assert!(table.date_range().is_none());
    }
}
