use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use triage_compute::{AnalysisEngine, ComparisonOutcome, ReportKpis};
use triage_core::{Config, PeriodRange};
use triage_ingest::report_writer::{ACTIONABLE_FILE, RECURRING_FILE, REMEDIATED_FILE};
use triage_ingest::{load_summary, save_summary, CsvImporter, ReportWriter, RowNormalizer};
use triage_rules::{LoadStatus, RuleLoader, RuleSet};

pub const SUMMARY_FILE: &str = "case_summary.json";

/// What `analyze` prints on stdout.
#[derive(Debug, Serialize)]
pub struct AnalyzeOutcome {
    pub out_dir: PathBuf,
    pub summary: PathBuf,
    pub written: Vec<PathBuf>,
    pub kpis: ReportKpis,
}

/// Load the rule files and apply the process-level overrides.
pub fn load_rules(config: &Config, rules_dir: Option<&Path>) -> Result<RuleSet> {
    let dir = rules_dir.unwrap_or(&config.rules_dir).to_path_buf();
    let mut loader = RuleLoader::new(dir.clone());
    let results = loader
        .load_all()
        .with_context(|| format!("failed to scan rules in {}", dir.display()))?;
    for r in &results {
        if !matches!(r.status, LoadStatus::Loaded { .. }) {
            warn!(path = %r.path.display(), status = ?r.status, "rule file not loaded");
        }
    }
    let mut rules = loader.rule_set().context("invalid rule configuration")?;
    if let Some(threshold) = config.chronic_threshold {
        rules.analysis = rules.analysis.with_chronic_threshold(threshold);
    }
    Ok(rules)
}

/// Default output directory: one folder per export under the reports root.
fn default_out_dir(config: &Config, csv: &Path) -> PathBuf {
    let stem = csv
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "run".to_string());
    config.reports_dir.join(stem)
}

pub fn analyze(
    config: &Config,
    csv: &Path,
    out: Option<PathBuf>,
    rules_dir: Option<&Path>,
    light: bool,
) -> Result<AnalyzeOutcome> {
    let engine = AnalysisEngine::new(load_rules(config, rules_dir)?);
    let out_dir = out.unwrap_or_else(|| default_out_dir(config, csv));

    let table = CsvImporter::new(config.csv_delimiter)
        .import(csv)
        .with_context(|| format!("failed to read {}", csv.display()))?;
    let batch = RowNormalizer::new(&engine.rules().analysis)
        .partition(&table)
        .with_context(|| format!("no usable alerts in {}", csv.display()))?;

    // The rejection log is written even when nothing survived validation.
    let writer = ReportWriter::new(&out_dir, config.csv_delimiter);
    let mut written = Vec::new();
    written.extend(writer.write_invalid_rows(&table.headers, &batch.invalid)?);
    batch
        .ensure_usable()
        .with_context(|| format!("no usable alerts in {}", csv.display()))?;

    let source = csv.file_name().map(|n| n.to_string_lossy().into_owned());
    let output = engine.analyze(&batch.records, batch.invalid.len(), source);

    let summary = out_dir.join(SUMMARY_FILE);
    save_summary(&summary, &output.document)
        .with_context(|| format!("failed to write {}", summary.display()))?;

    if light {
        for name in [ACTIONABLE_FILE, REMEDIATED_FILE, RECURRING_FILE] {
            writer.remove_stale(name)?;
        }
    } else {
        let parts = engine.partitions(&output.document.records);
        written.extend(writer.write_cases(ACTIONABLE_FILE, &parts.actionable, true)?);
        written.extend(writer.write_cases(REMEDIATED_FILE, &parts.remediated, false)?);
        written.extend(writer.write_cases(RECURRING_FILE, &parts.recurring, false)?);
    }

    info!(out_dir = %out_dir.display(), files = written.len() + 1, "reports written");
    Ok(AnalyzeOutcome {
        out_dir,
        summary,
        written,
        kpis: output.kpis,
    })
}

pub fn compare(
    config: &Config,
    previous: &Path,
    current: &Path,
    direct: bool,
    rules_dir: Option<&Path>,
) -> Result<ComparisonOutcome> {
    let engine = AnalysisEngine::new(load_rules(config, rules_dir)?);
    let p1 = load_summary(previous)
        .with_context(|| format!("failed to load {}", previous.display()))?;
    let p2 = load_summary(current)
        .with_context(|| format!("failed to load {}", current.display()))?;

    let outcome = if direct {
        engine.compare_direct(&p1, &p2)
    } else {
        engine.compare(&p1, &p2)
    };
    if let ComparisonOutcome::Skipped { reason } = &outcome {
        warn!(%reason, "comparison skipped");
    }
    Ok(outcome)
}

/// `DD/MM/YYYY a DD/MM/YYYY`.
pub fn format_range(range: &PeriodRange) -> String {
    format!(
        "{} a {}",
        range.start.format("%d/%m/%Y"),
        range.end.format("%d/%m/%Y")
    )
}

pub fn date_range(config: &Config, csv: &Path) -> Result<Option<String>> {
    let table = CsvImporter::new(config.csv_delimiter)
        .import(csv)
        .with_context(|| format!("failed to read {}", csv.display()))?;
    Ok(table.date_range().as_ref().map(format_range))
}

/// Print JSON to stdout, or write it to `out` when given.
pub fn emit_json<T: Serialize>(value: &T, out: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "comparison written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

pub fn exit_for(outcome: &ComparisonOutcome) -> ExitCode {
    match outcome {
        ComparisonOutcome::Compared(_) => ExitCode::SUCCESS,
        ComparisonOutcome::Skipped { .. } => ExitCode::from(2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use triage_ingest::report_writer::INVALID_ROWS_FILE;

    fn repo_dir(rel: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../..").join(rel)
    }

    fn config(reports: &Path) -> Config {
        Config {
            profile: String::new(),
            rules_dir: repo_dir("data/rules"),
            reports_dir: reports.to_path_buf(),
            csv_delimiter: b';',
            chronic_threshold: None,
        }
    }

    #[test]
    fn analyze_writes_every_artifact() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(tmp.path());
        let csv = repo_dir("data/samples/alerts_2024_04.csv");

        let outcome = analyze(&cfg, &csv, None, None, false).unwrap();
        assert_eq!(outcome.out_dir, tmp.path().join("alerts_2024_04"));
        assert!(outcome.summary.exists());
        for name in [ACTIONABLE_FILE, REMEDIATED_FILE, RECURRING_FILE, INVALID_ROWS_FILE] {
            assert!(outcome.out_dir.join(name).exists(), "{name} missing");
        }
        assert_eq!(outcome.kpis.total_cases, 4);
        assert_eq!(outcome.kpis.invalid_rows, 2);
    }

    #[test]
    fn light_mode_skips_partitions() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(tmp.path());
        let csv = repo_dir("data/samples/alerts_2024_04.csv");

        let outcome = analyze(&cfg, &csv, Some(tmp.path().join("light")), None, true).unwrap();
        assert!(outcome.summary.exists());
        assert!(!outcome.out_dir.join(ACTIONABLE_FILE).exists());
        assert_eq!(outcome.written.len(), 1);
    }

    #[test]
    fn fully_invalid_export_still_logs_rejections() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(tmp.path());
        let csv = tmp.path().join("bad.csv");
        let header = triage_core::REQUIRED_COLUMNS.join(";");
        let row = "SQUAD_A;Disk full;srv1;ci1;zabbix;disk;server;not-a-date;Alto;Urgente;REM_OK;Closed;ALR1";
        fs::write(&csv, format!("{header}\n{row}\n")).unwrap();

        let out = tmp.path().join("bad");
        let err = analyze(&cfg, &csv, Some(out.clone()), None, false).unwrap_err();
        assert!(format!("{err:#}").contains("failed validation"));

        let log = fs::read_to_string(out.join(INVALID_ROWS_FILE)).unwrap();
        assert!(log.contains("unparseable timestamp"));
        assert!(!out.join(SUMMARY_FILE).exists());
    }

    #[test]
    fn rerun_clears_reports_the_new_run_does_not_produce() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(tmp.path());
        let out = tmp.path().join("run");
        let april = repo_dir("data/samples/alerts_2024_04.csv");

        analyze(&cfg, &april, Some(out.clone()), None, false).unwrap();
        assert!(out.join(ACTIONABLE_FILE).exists());

        analyze(&cfg, &april, Some(out.clone()), None, true).unwrap();
        for name in [ACTIONABLE_FILE, REMEDIATED_FILE, RECURRING_FILE] {
            assert!(!out.join(name).exists(), "{name} left over");
        }
        assert!(out.join(INVALID_ROWS_FILE).exists());
    }

    #[test]
    fn chronic_override_applies() {
        let tmp = TempDir::new().unwrap();
        let mut cfg = config(tmp.path());
        cfg.chronic_threshold = Some(2);
        let rules = load_rules(&cfg, None).unwrap();
        assert_eq!(rules.analysis.chronic_threshold, 2);
    }

    #[test]
    fn compare_saved_runs() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(tmp.path());
        let april = analyze(&cfg, &repo_dir("data/samples/alerts_2024_04.csv"), None, None, true).unwrap();
        let may = analyze(&cfg, &repo_dir("data/samples/alerts_2024_05.csv"), None, None, true).unwrap();

        let outcome = compare(&cfg, &april.summary, &may.summary, false, None).unwrap();
        assert!(outcome.report().is_some());

        let reversed = compare(&cfg, &may.summary, &april.summary, false, None).unwrap();
        assert!(matches!(reversed, ComparisonOutcome::Skipped { .. }));
        let direct = compare(&cfg, &may.summary, &april.summary, true, None).unwrap();
        assert!(direct.report().is_some());

        let out = tmp.path().join("cmp/trend.json");
        emit_json(&outcome, Some(&out)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(json["outcome"], "compared");
    }

    #[test]
    fn date_range_of_sample() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(tmp.path());
        let range = date_range(&cfg, &repo_dir("data/samples/alerts_2024_04.csv")).unwrap();
        let range = range.expect("sample has timestamps");
        assert!(range.contains(" a "));
        assert!(range.ends_with("/04/2024"));
    }

    #[test]
    fn date_range_without_timestamps() {
        let tmp = TempDir::new().unwrap();
        let csv = tmp.path().join("empty.csv");
        fs::write(&csv, "number;sys_created_on\nINC1;not a date\n").unwrap();
        assert_eq!(date_range(&config(tmp.path()), &csv).unwrap(), None);
    }
}
