//! Tests for the rule loader module.

use std::fs;

use tempfile::TempDir;

use super::*;
use triage_core::ActionCategory;

const ANALYSIS_YAML: &str = r#"
apiVersion: v1
kind: AnalysisConfig
metadata:
  id: analysis-test
  name: Test Analysis
  enabled: true
spec:
  chronic_threshold: 3
  severity_weights:
    "Crítico": 10.0
  priority_weights:
    "Urgente": 10.0
  action_weights:
    FALHA_PERSISTENTE: 1.5
  task_status_weights:
    default: 1.0
    labels:
      "Closed Incomplete": 1.5
  outcome_labels:
    success: ["Closed Complete"]
    partial: ["Canceled"]
    failure: ["Closed Incomplete"]
    no_status: ["NO_STATUS"]
"#;

const VERDICT_YAML: &str = r#"
apiVersion: v1
kind: VerdictConfig
metadata:
  id: verdict-test
  name: Test Verdict
spec:
  regression_rate_threshold: 40.0
  churn_ratio: 0.5
  full_resolution_rate: 100.0
"#;

fn temp_loader() -> (TempDir, RuleLoader) {
    let dir = TempDir::new().expect("create tempdir");
    let loader = RuleLoader::new(dir.path().to_path_buf());
    (dir, loader)
}

#[test]
fn load_rule_from_file() {
    let (dir, _loader) = temp_loader();
    let rule_path = dir.path().join("analysis.yml");
    fs::write(&rule_path, ANALYSIS_YAML).unwrap();

    let doc = RuleLoader::load_file(&rule_path).unwrap();
    assert_eq!(doc.metadata().id, "analysis-test");
    assert_eq!(doc.metadata().name, "Test Analysis");
    assert!(doc.as_analysis_config().is_some());
    assert!(doc.as_verdict_config().is_none());
}

#[test]
fn load_all_skips_dotfiles_and_non_yaml() {
    let (dir, mut loader) = temp_loader();

    fs::write(dir.path().join("analysis.yml"), ANALYSIS_YAML).unwrap();
    fs::write(dir.path().join(".hidden.yml"), ANALYSIS_YAML).unwrap();
    fs::write(dir.path().join("readme.txt"), "not a rule").unwrap();

    let results = loader.load_all().unwrap();

    let loaded = results
        .iter()
        .filter(|r| matches!(r.status, LoadStatus::Loaded { .. }))
        .count();
    let skipped = results
        .iter()
        .filter(|r| matches!(r.status, LoadStatus::Skipped { .. }))
        .count();
    assert_eq!(loaded, 1);
    assert_eq!(skipped, 2);
}

#[test]
fn load_all_recurses_into_subdirectories() {
    let (dir, mut loader) = temp_loader();
    let sub = dir.path().join("verdict");
    fs::create_dir_all(&sub).unwrap();
    fs::write(sub.join("verdict.yaml"), VERDICT_YAML).unwrap();

    loader.load_all().unwrap();
    assert!(loader.get("verdict-test").is_some());
}

#[test]
fn parse_failure_is_reported_per_file() {
    let (dir, mut loader) = temp_loader();
    fs::write(dir.path().join("broken.yml"), "apiVersion: v1\nkind: [unclosed").unwrap();
    fs::write(dir.path().join("analysis.yml"), ANALYSIS_YAML).unwrap();

    let results = loader.load_all().unwrap();
    assert!(results
        .iter()
        .any(|r| matches!(r.status, LoadStatus::Failed { .. })));
    assert!(loader.get("analysis-test").is_some());
}

#[test]
fn unknown_kind_is_rejected() {
    let yaml = r#"
apiVersion: v1
kind: AnomalyRule
metadata:
  id: not-ours
  name: Not ours
spec: {}
"#;
    let err = RuleLoader::parse_str(yaml).unwrap_err();
    assert!(err.to_string().contains("unknown rule kind"));
}

#[test]
fn empty_id_is_rejected() {
    let yaml = VERDICT_YAML.replace("id: verdict-test", "id: \"\"");
    assert!(matches!(
        RuleLoader::parse_str(&yaml),
        Err(RuleError::Validation(_))
    ));
}

#[test]
fn missing_directory_yields_builtin_rule_set() {
    let mut loader = RuleLoader::new("/nonexistent/triage-rules".into());
    assert!(loader.load_all().unwrap().is_empty());
    let set = loader.rule_set().unwrap();
    assert_eq!(set, RuleSet::builtin());
    assert_eq!(set.analysis_source, "builtin");
}

#[test]
fn rule_set_uses_loaded_documents() {
    let (dir, mut loader) = temp_loader();
    fs::write(dir.path().join("analysis.yml"), ANALYSIS_YAML).unwrap();
    fs::write(dir.path().join("verdict.yml"), VERDICT_YAML).unwrap();
    loader.load_all().unwrap();

    let set = loader.rule_set().unwrap();
    assert_eq!(set.analysis_source, "analysis-test");
    assert_eq!(set.verdict_source, "verdict-test");
    assert_eq!(set.analysis.chronic_threshold, 3);
    assert_eq!(set.analysis.action_weight(ActionCategory::Intermitente), 1.0);
    assert_eq!(set.verdict.churn_ratio, 0.5);
}

#[test]
fn disabled_documents_are_ignored() {
    let (dir, mut loader) = temp_loader();
    let disabled = ANALYSIS_YAML.replace("enabled: true", "enabled: false");
    fs::write(dir.path().join("analysis.yml"), disabled).unwrap();
    loader.load_all().unwrap();

    let set = loader.rule_set().unwrap();
    assert_eq!(set.analysis_source, "builtin");
    assert_eq!(set.analysis.chronic_threshold, 5);
}

#[test]
fn invalid_document_fails_resolution() {
    let (dir, mut loader) = temp_loader();
    let bad = ANALYSIS_YAML.replace("chronic_threshold: 3", "chronic_threshold: 0");
    fs::write(dir.path().join("analysis.yml"), bad).unwrap();
    loader.load_all().unwrap();

    assert!(matches!(loader.rule_set(), Err(RuleError::Validation(_))));
}

#[test]
fn bundled_rules_directory_loads() {
    let manifest = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    let mut loader = RuleLoader::new(manifest.join("../../data/rules"));
    let results = loader.load_all().unwrap();
    assert!(results
        .iter()
        .all(|r| !matches!(r.status, LoadStatus::Failed { .. })));
    let set = loader.rule_set().unwrap();
    assert_eq!(set.analysis, crate::analysis_config::CompiledAnalysisConfig::default());
}
