use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};
use triage_core::{CaseSummary, SummaryDocument, SummaryHeader, TriageError};

/// Accepted on-disk layouts of a case summary.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredSummary {
    Document(SummaryDocument),
    /// Older runs wrote the records as a bare array.
    Legacy(Vec<CaseSummary>),
}

/// Just the header of the current layout; `records` is skipped unparsed.
#[derive(Deserialize)]
struct HeaderOnly {
    header: SummaryHeader,
}

/// Write a summary document as pretty JSON, creating parent directories.
pub fn save_summary(path: &Path, doc: &SummaryDocument) -> Result<(), TriageError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(doc)?;
    fs::write(path, json)?;
    info!(
        path = %path.display(),
        cases = doc.records.len(),
        run_id = %doc.header.run_id,
        "saved case summary"
    );
    Ok(())
}

/// Read a summary from disk in either layout.
pub fn load_summary(path: &Path) -> Result<SummaryDocument, TriageError> {
    let content = fs::read_to_string(path)?;
    let doc = parse_summary(&content)?;
    info!(path = %path.display(), cases = doc.records.len(), "loaded case summary");
    Ok(doc)
}

/// Parse summary JSON. A bare array is wrapped in a fresh header whose
/// period is recomputed from the records.
pub fn parse_summary(content: &str) -> Result<SummaryDocument, TriageError> {
    match serde_json::from_str::<StoredSummary>(content) {
        Ok(StoredSummary::Document(doc)) => Ok(doc),
        Ok(StoredSummary::Legacy(records)) => {
            debug!(cases = records.len(), "summary has no header, treating as legacy array");
            Ok(SummaryDocument::new(records, 0, None))
        }
        // Re-parse as the current layout so the error names the real problem.
        Err(_) => match serde_json::from_str::<SummaryDocument>(content) {
            Err(e) => Err(e.into()),
            Ok(_) => Err(TriageError::Serialize(
                "unrecognised case summary layout".into(),
            )),
        },
    }
}

/// Header-only view, for listing runs without building every record.
/// Legacy arrays have no header, so theirs is derived from the records.
pub fn read_header(path: &Path) -> Result<SummaryHeader, TriageError> {
    let content = fs::read_to_string(path)?;
    match serde_json::from_str::<HeaderOnly>(&content) {
        Ok(view) => Ok(view.header),
        Err(_) => Ok(parse_summary(&content)?.header),
    }
}
