//! AnalysisConfig rule kind — severity/priority weight tables, action and
//! task-status multipliers, outcome label classification, chronic-recurrence
//! threshold, and the classification boundary policy.

use std::collections::{BTreeMap, HashMap, HashSet};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use triage_core::{ActionCategory, NO_STATUS, NO_TASK_FOUND};

use crate::loader::RuleError;
use crate::schema::CommonMetadata;

// ── YAML-level types ────────────────────────────────────────────────

/// Top-level AnalysisConfig rule document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfigRule {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: CommonMetadata,
    pub spec: AnalysisConfigSpec,
}

/// Specification section of an AnalysisConfig rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfigSpec {
    /// Cases with at least this many alerts are chronic regardless of outcomes.
    #[serde(default = "default_chronic_threshold")]
    pub chronic_threshold: usize,
    /// Severity label → score (0–10). Unmapped labels score 0.
    pub severity_weights: IndexMap<String, f64>,
    /// Priority-group label → score (0–10). Unmapped labels score 0.
    pub priority_weights: IndexMap<String, f64>,
    /// Action category → multiplier. Missing categories weigh 1.0.
    pub action_weights: BTreeMap<ActionCategory, f64>,
    pub task_status_weights: TaskStatusWeights,
    pub outcome_labels: OutcomeLabels,
    #[serde(default)]
    pub classification: ClassificationPolicy,
    /// Categories that still need someone to act; these feed the trend diff.
    #[serde(default = "default_actionable")]
    pub actionable_categories: Vec<ActionCategory>,
}

fn default_chronic_threshold() -> usize {
    5
}

fn default_actionable() -> Vec<ActionCategory> {
    vec![
        ActionCategory::Intermitente,
        ActionCategory::FalhaPersistente,
        ActionCategory::StatusAusente,
        ActionCategory::Inconsistente,
        ActionCategory::SucessoParcial,
    ]
}

/// Inefficiency multipliers keyed by task outcome label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TaskStatusWeights {
    /// Weight for labels not listed (and for cases without a usable label).
    #[serde(default = "default_weight")]
    pub default: f64,
    #[serde(default)]
    pub labels: IndexMap<String, f64>,
}

fn default_weight() -> f64 {
    1.0
}

/// Outcome labels grouped by kind. Labels not listed anywhere are failures.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OutcomeLabels {
    pub success: Vec<String>,
    #[serde(default)]
    pub partial: Vec<String>,
    #[serde(default)]
    pub failure: Vec<String>,
    #[serde(default)]
    pub no_status: Vec<String>,
}

/// Tunable boundaries between the outcome-based categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ClassificationPolicy {
    /// Category for a chronology with no success whose last usable outcome is
    /// partial and which contains at least one failure. One of
    /// `SUCESSO_PARCIAL`, `ESTABILIZADA`, `INCONSISTENTE`.
    #[serde(default = "default_failure_then_partial")]
    pub failure_then_partial: ActionCategory,
}

fn default_failure_then_partial() -> ActionCategory {
    ActionCategory::SucessoParcial
}

impl Default for ClassificationPolicy {
    fn default() -> Self {
        Self {
            failure_then_partial: default_failure_then_partial(),
        }
    }
}

fn owned(labels: &[&str]) -> Vec<String> {
    labels.iter().map(|s| s.to_string()).collect()
}

fn weights(pairs: &[(&str, f64)]) -> IndexMap<String, f64> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

impl Default for AnalysisConfigSpec {
    fn default() -> Self {
        Self {
            chronic_threshold: default_chronic_threshold(),
            severity_weights: weights(&[
                ("Crítico", 10.0),
                ("Alto", 8.0),
                ("Alto / Major", 8.0),
                ("Médio", 5.0),
                ("Médio / Minor", 5.0),
                ("Aviso", 3.0),
                ("Baixo / Informativo", 2.0),
                ("OK", 0.0),
                ("Limpar", 0.0),
            ]),
            priority_weights: weights(&[
                ("Urgente", 10.0),
                ("Alto(a)", 8.0),
                ("Moderado(a)", 5.0),
                ("Baixo(a)", 2.0),
            ]),
            action_weights: BTreeMap::from([
                (ActionCategory::FalhaPersistente, 1.5),
                (ActionCategory::Intermitente, 1.2),
                (ActionCategory::StatusAusente, 1.1),
                (ActionCategory::Inconsistente, 1.1),
                (ActionCategory::Estabilizada, 1.0),
                (ActionCategory::SempreOk, 1.0),
            ]),
            task_status_weights: TaskStatusWeights {
                default: default_weight(),
                labels: weights(&[("Closed Incomplete", 1.5), ("Closed Skipped", 1.2)]),
            },
            outcome_labels: OutcomeLabels {
                success: owned(&["Closed Complete", "Closed", "REM_OK"]),
                partial: owned(&["Canceled", "Closed Skipped"]),
                failure: owned(&["Closed Incomplete", NO_TASK_FOUND, "REM_NOT_OK"]),
                no_status: owned(&[NO_STATUS]),
            },
            classification: ClassificationPolicy::default(),
            actionable_categories: default_actionable(),
        }
    }
}

// ── Compiled (hot-path) types ───────────────────────────────────────

/// Kind of a single task outcome label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    Failure,
    Partial,
    NoStatus,
}

/// Immutable lookup tables built once from an [`AnalysisConfigSpec`].
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledAnalysisConfig {
    pub chronic_threshold: usize,
    pub failure_then_partial: ActionCategory,
    severity: HashMap<String, f64>,
    priority: HashMap<String, f64>,
    action: HashMap<ActionCategory, f64>,
    task_status: HashMap<String, f64>,
    task_status_default: f64,
    outcomes: HashMap<String, OutcomeKind>,
    actionable: HashSet<ActionCategory>,
}

impl AnalysisConfigRule {
    /// Validate and compile the YAML config.
    pub fn compile(&self) -> Result<CompiledAnalysisConfig, RuleError> {
        self.spec.compile()
    }
}

impl AnalysisConfigSpec {
    pub fn compile(&self) -> Result<CompiledAnalysisConfig, RuleError> {
        if self.chronic_threshold < 1 {
            return Err(RuleError::Validation(
                "chronic_threshold must be at least 1".to_string(),
            ));
        }
        check_weights("severity_weights", self.severity_weights.iter())?;
        check_weights("priority_weights", self.priority_weights.iter())?;
        check_weights("task_status_weights.labels", self.task_status_weights.labels.iter())?;
        check_weight("task_status_weights.default", self.task_status_weights.default)?;
        for (cat, w) in &self.action_weights {
            if !w.is_finite() || *w < 1.0 {
                return Err(RuleError::Validation(format!(
                    "action_weights.{} must be a finite value >= 1.0, got {}",
                    cat, w
                )));
            }
        }
        if !matches!(
            self.classification.failure_then_partial,
            ActionCategory::SucessoParcial | ActionCategory::Estabilizada | ActionCategory::Inconsistente
        ) {
            return Err(RuleError::Validation(format!(
                "classification.failure_then_partial must be SUCESSO_PARCIAL, ESTABILIZADA or INCONSISTENTE, got {}",
                self.classification.failure_then_partial
            )));
        }

        let mut outcomes = HashMap::new();
        let groups = [
            (OutcomeKind::Success, &self.outcome_labels.success),
            (OutcomeKind::Partial, &self.outcome_labels.partial),
            (OutcomeKind::Failure, &self.outcome_labels.failure),
            (OutcomeKind::NoStatus, &self.outcome_labels.no_status),
        ];
        for (kind, labels) in groups {
            for label in labels {
                if let Some(previous) = outcomes.insert(label.clone(), kind) {
                    if previous != kind {
                        return Err(RuleError::Validation(format!(
                            "outcome label '{}' is listed as both {:?} and {:?}",
                            label, previous, kind
                        )));
                    }
                }
            }
        }
        // The sentinel must always mean "no status", whatever the file says.
        outcomes.insert(NO_STATUS.to_string(), OutcomeKind::NoStatus);

        Ok(CompiledAnalysisConfig {
            chronic_threshold: self.chronic_threshold,
            failure_then_partial: self.classification.failure_then_partial,
            severity: self.severity_weights.clone().into_iter().collect(),
            priority: self.priority_weights.clone().into_iter().collect(),
            action: self.action_weights.clone().into_iter().collect(),
            task_status: self.task_status_weights.labels.clone().into_iter().collect(),
            task_status_default: self.task_status_weights.default,
            outcomes,
            actionable: self.actionable_categories.iter().copied().collect(),
        })
    }
}

fn check_weight(field: &str, w: f64) -> Result<(), RuleError> {
    if w.is_finite() && w >= 0.0 {
        Ok(())
    } else {
        Err(RuleError::Validation(format!(
            "{} must be a finite non-negative number, got {}",
            field, w
        )))
    }
}

fn check_weights<'a>(
    field: &str,
    entries: impl Iterator<Item = (&'a String, &'a f64)>,
) -> Result<(), RuleError> {
    for (label, w) in entries {
        check_weight(&format!("{}['{}']", field, label), *w)?;
    }
    Ok(())
}

impl CompiledAnalysisConfig {
    /// Score for a severity label; unmapped labels score 0.
    pub fn severity_weight(&self, label: &str) -> f64 {
        self.severity.get(label).copied().unwrap_or(0.0)
    }

    /// Score for a priority-group label; unmapped labels score 0.
    pub fn priority_weight(&self, label: &str) -> f64 {
        self.priority.get(label).copied().unwrap_or(0.0)
    }

    /// Multiplier for an action category; missing entries weigh 1.0.
    pub fn action_weight(&self, category: ActionCategory) -> f64 {
        self.action.get(&category).copied().unwrap_or(1.0)
    }

    /// Inefficiency multiplier for the label governing a case.
    pub fn inefficiency_weight(&self, label: Option<&str>) -> f64 {
        label
            .and_then(|l| self.task_status.get(l))
            .copied()
            .unwrap_or(self.task_status_default)
    }

    /// Kind of an outcome label. Unknown labels are failures.
    pub fn outcome_kind(&self, label: &str) -> OutcomeKind {
        self.outcomes
            .get(label)
            .copied()
            .unwrap_or(OutcomeKind::Failure)
    }

    /// Whether the label appears in the outcome table at all.
    pub fn is_known_label(&self, label: &str) -> bool {
        self.outcomes.contains_key(label)
    }

    pub fn is_actionable(&self, category: ActionCategory) -> bool {
        self.actionable.contains(&category)
    }

    /// Copy with a different chronic threshold (values below 1 are clamped).
    pub fn with_chronic_threshold(mut self, threshold: usize) -> Self {
        self.chronic_threshold = threshold.max(1);
        self
    }
}

impl Default for CompiledAnalysisConfig {
    fn default() -> Self {
        // The built-in spec is validated by tests; fall back to a bare table
        // rather than panicking if it ever stops compiling.
        AnalysisConfigSpec::default()
            .compile()
            .unwrap_or_else(|_| CompiledAnalysisConfig {
                chronic_threshold: default_chronic_threshold(),
                failure_then_partial: default_failure_then_partial(),
                severity: HashMap::new(),
                priority: HashMap::new(),
                action: HashMap::new(),
                task_status: HashMap::new(),
                task_status_default: default_weight(),
                outcomes: HashMap::from([(NO_STATUS.to_string(), OutcomeKind::NoStatus)]),
                actionable: default_actionable().into_iter().collect(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundled() -> AnalysisConfigRule {
        let yaml = include_str!("../../../data/rules/analysis-config.yml");
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn parse_analysis_config_yaml() {
        let rule = bundled();
        assert_eq!(rule.kind, "AnalysisConfig");
        assert_eq!(rule.spec.chronic_threshold, 5);
    }

    #[test]
    fn bundled_yaml_matches_builtin_defaults() {
        assert_eq!(bundled().spec, AnalysisConfigSpec::default());
    }

    #[test]
    fn weights_within_documented_ranges() {
        let spec = bundled().spec;
        assert!(spec.severity_weights.values().all(|w| (0.0..=10.0).contains(w)));
        assert!(spec.priority_weights.values().all(|w| (0.0..=10.0).contains(w)));
        assert!(spec.action_weights.values().all(|w| (1.0..=1.5).contains(w)));
        assert!(spec.task_status_weights.labels.values().all(|w| (1.0..=1.5).contains(w)));
    }

    #[test]
    fn lookups_fall_back_to_defaults() {
        let cfg = CompiledAnalysisConfig::default();
        assert_eq!(cfg.severity_weight("Crítico"), 10.0);
        assert_eq!(cfg.severity_weight("Catastrophic"), 0.0);
        assert_eq!(cfg.priority_weight("Urgente"), 10.0);
        assert_eq!(cfg.priority_weight(""), 0.0);
        assert_eq!(cfg.action_weight(ActionCategory::FalhaPersistente), 1.5);
        assert_eq!(cfg.action_weight(ActionCategory::InstabilidadeCronica), 1.0);
        assert_eq!(cfg.inefficiency_weight(Some("Closed Incomplete")), 1.5);
        assert_eq!(cfg.inefficiency_weight(Some("Canceled")), 1.0);
        assert_eq!(cfg.inefficiency_weight(None), 1.0);
    }

    #[test]
    fn outcome_table_defaults_unknown_to_failure() {
        let cfg = CompiledAnalysisConfig::default();
        assert_eq!(cfg.outcome_kind("Closed Complete"), OutcomeKind::Success);
        assert_eq!(cfg.outcome_kind("REM_OK"), OutcomeKind::Success);
        assert_eq!(cfg.outcome_kind("Closed Skipped"), OutcomeKind::Partial);
        assert_eq!(cfg.outcome_kind(NO_TASK_FOUND), OutcomeKind::Failure);
        assert_eq!(cfg.outcome_kind(NO_STATUS), OutcomeKind::NoStatus);
        assert_eq!(cfg.outcome_kind("Closed Whatever"), OutcomeKind::Failure);
        assert!(!cfg.is_known_label("Closed Whatever"));
    }

    #[test]
    fn default_actionable_set() {
        let cfg = CompiledAnalysisConfig::default();
        assert!(cfg.is_actionable(ActionCategory::SucessoParcial));
        assert!(cfg.is_actionable(ActionCategory::StatusAusente));
        assert!(!cfg.is_actionable(ActionCategory::SempreOk));
        assert!(!cfg.is_actionable(ActionCategory::InstabilidadeCronica));
    }

    #[test]
    fn rejects_label_listed_under_two_kinds() {
        let mut spec = AnalysisConfigSpec::default();
        spec.outcome_labels.partial.push("Closed".to_string());
        let err = spec.compile().unwrap_err();
        assert!(err.to_string().contains("'Closed'"));
    }

    #[test]
    fn rejects_action_weight_below_one() {
        let mut spec = AnalysisConfigSpec::default();
        spec.action_weights.insert(ActionCategory::Intermitente, 0.5);
        assert!(spec.compile().is_err());
    }

    #[test]
    fn rejects_out_of_policy_boundary_category() {
        let mut spec = AnalysisConfigSpec::default();
        spec.classification.failure_then_partial = ActionCategory::SempreOk;
        assert!(spec.compile().is_err());
    }

    #[test]
    fn chronic_override_is_clamped() {
        let cfg = CompiledAnalysisConfig::default().with_chronic_threshold(0);
        assert_eq!(cfg.chronic_threshold, 1);
    }

    #[test]
    fn partial_override_from_yaml() {
        let yaml = r#"
apiVersion: v1
kind: AnalysisConfig
metadata:
  id: analysis-legacy
  name: Legacy boundary policy
spec:
  severity_weights: {}
  priority_weights: {}
  action_weights:
    FALHA_PERSISTENTE: 1.5
  task_status_weights:
    default: 1.0
  outcome_labels:
    success: ["Closed Complete"]
  classification:
    failure_then_partial: ESTABILIZADA
"#;
        let rule: AnalysisConfigRule = serde_yaml::from_str(yaml).unwrap();
        let cfg = rule.compile().unwrap();
        assert_eq!(cfg.failure_then_partial, ActionCategory::Estabilizada);
        assert_eq!(cfg.chronic_threshold, 5);
        assert_eq!(cfg.outcome_kind("Canceled"), OutcomeKind::Failure);
    }

    #[test]
    fn round_trip() {
        let rule = bundled();
        let serialized = serde_yaml::to_string(&rule).unwrap();
        let rule2: AnalysisConfigRule = serde_yaml::from_str(&serialized).unwrap();
        assert_eq!(rule, rule2);
    }
}
