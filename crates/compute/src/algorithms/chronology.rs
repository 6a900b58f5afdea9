//! Outcome chronology of a case and its mapping to an [`ActionCategory`].

use triage_core::{ActionCategory, AlertRecord};
use triage_rules::{CompiledAnalysisConfig, OutcomeKind};

/// One label per record, in the order given. Records without an outcome
/// contribute a sentinel so the result is always as long as the input.
pub fn build_chronology(records: &[&AlertRecord]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.chronology_label().to_string())
        .collect()
}

/// Maps chronologies to action categories using the outcome table and
/// thresholds of an analysis config.
pub struct ChronologyClassifier<'a> {
    config: &'a CompiledAnalysisConfig,
}

impl<'a> ChronologyClassifier<'a> {
    pub fn new(config: &'a CompiledAnalysisConfig) -> Self {
        Self { config }
    }

    pub fn kinds(&self, chronology: &[String]) -> Vec<OutcomeKind> {
        chronology
            .iter()
            .map(|label| self.config.outcome_kind(label))
            .collect()
    }

    /// Category for a case. First match wins:
    ///
    /// 1. no usable outcome at all: `STATUS_AUSENTE`
    /// 2. `alert_count` at or over the chronic threshold: `INSTABILIDADE_CRONICA`
    /// 3. pattern over the usable outcomes (no-status entries skipped):
    ///    `SEMPRE_OK`, `FALHA_PERSISTENTE`, `ESTABILIZADA`, `INTERMITENTE`,
    ///    `SUCESSO_PARCIAL`, then the configured failure-then-partial policy,
    ///    else `INCONSISTENTE`.
    pub fn classify(&self, chronology: &[String], alert_count: usize) -> ActionCategory {
        let kinds = self.kinds(chronology);
        let usable: Vec<OutcomeKind> = kinds
            .into_iter()
            .filter(|k| *k != OutcomeKind::NoStatus)
            .collect();

        if usable.is_empty() {
            return ActionCategory::StatusAusente;
        }
        if alert_count >= self.config.chronic_threshold {
            return ActionCategory::InstabilidadeCronica;
        }
        self.classify_pattern(&usable)
    }

    fn classify_pattern(&self, usable: &[OutcomeKind]) -> ActionCategory {
        use OutcomeKind::*;

        let has = |kind: OutcomeKind| usable.contains(&kind);
        let last = usable[usable.len() - 1];

        if usable.iter().all(|k| *k == Success) {
            return ActionCategory::SempreOk;
        }
        if usable.iter().all(|k| *k == Failure) {
            return ActionCategory::FalhaPersistente;
        }
        if last == Success {
            let tail = usable.iter().rev().take_while(|k| **k == Success).count();
            if usable[..usable.len() - tail].contains(&Failure) {
                return ActionCategory::Estabilizada;
            }
        }
        if last == Failure && has(Success) {
            return ActionCategory::Intermitente;
        }
        if last == Partial && !has(Failure) {
            return ActionCategory::SucessoParcial;
        }
        if last == Partial && !has(Success) {
            return self.config.failure_then_partial;
        }
        ActionCategory::Inconsistente
    }

    /// Label that drives the inefficiency factor: the most recent outcome
    /// that is not a no-status entry.
    pub fn governing_label<'c>(&self, chronology: &'c [String]) -> Option<&'c str> {
        chronology
            .iter()
            .rev()
            .map(String::as_str)
            .find(|label| self.config.outcome_kind(label) != OutcomeKind::NoStatus)
    }
}
