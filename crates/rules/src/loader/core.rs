//! Core [`RuleLoader`] struct: filesystem-backed rule loading and resolution
//! of the active [`RuleSet`].

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::analysis_config::CompiledAnalysisConfig;
use crate::schema::{RuleDocument, RuleEnvelope, RuleKind};
use crate::verdict_config::CompiledVerdictConfig;

use super::error::{LoadResult, LoadStatus, Result, RuleError};

/// Id reported for configuration that came from the built-in defaults.
const BUILTIN_ID: &str = "builtin";

/// Filesystem-backed rule loader.
///
/// Scans a directory (recursively) for `*.yml` / `*.yaml` files, deserializes
/// them into [`RuleDocument`] instances via two-pass deserialization, and
/// keeps them keyed by rule ID.
pub struct RuleLoader {
    /// Root directory containing rule YAML files.
    rules_dir: PathBuf,
    /// All loaded rule documents keyed by `metadata.id`.
    documents: BTreeMap<String, RuleDocument>,
}

/// Compiled configuration for one analysis run.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet {
    pub analysis: CompiledAnalysisConfig,
    pub verdict: CompiledVerdictConfig,
    /// Rule id the analysis config came from (`builtin` when defaulted).
    pub analysis_source: String,
    /// Rule id the verdict config came from (`builtin` when defaulted).
    pub verdict_source: String,
}

impl RuleSet {
    /// Configuration made only of built-in defaults.
    pub fn builtin() -> Self {
        Self {
            analysis: CompiledAnalysisConfig::default(),
            verdict: CompiledVerdictConfig::default(),
            analysis_source: BUILTIN_ID.to_string(),
            verdict_source: BUILTIN_ID.to_string(),
        }
    }
}

impl RuleLoader {
    /// Create a new loader for the given directory. Nothing is read until
    /// [`load_all`](Self::load_all).
    pub fn new(rules_dir: PathBuf) -> Self {
        Self {
            rules_dir,
            documents: BTreeMap::new(),
        }
    }

    pub fn rules_dir(&self) -> &Path {
        &self.rules_dir
    }

    /// Recursively scan the rules directory and load all YAML files.
    ///
    /// Dotfiles and non-YAML files are skipped. A missing directory yields no
    /// results. Parse errors are reported per-file but do not abort the scan.
    pub fn load_all(&mut self) -> Result<Vec<LoadResult>> {
        let mut results = Vec::new();
        if !self.rules_dir.exists() {
            warn!(path = %self.rules_dir.display(), "rules directory does not exist; using built-in defaults");
            return Ok(results);
        }
        let root = self.rules_dir.clone();
        self.scan_dir_recursive(&root, &mut results)?;
        Ok(results)
    }

    /// Recursively scan a directory for YAML rule files.
    fn scan_dir_recursive(&mut self, dir: &Path, results: &mut Vec<LoadResult>) -> Result<()> {
        let entries = match fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "failed to read directory");
                return Ok(());
            }
        };

        let mut paths = Vec::new();
        for entry in entries {
            paths.push(entry?.path());
        }
        // Deterministic load order regardless of filesystem.
        paths.sort();

        for path in paths {
            // Skip dotfiles/dotdirs
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.starts_with('.') {
                    if path.is_file() {
                        results.push(LoadResult {
                            path,
                            status: LoadStatus::Skipped {
                                reason: "dotfile".to_string(),
                            },
                        });
                    }
                    continue;
                }
            }

            if path.is_dir() {
                self.scan_dir_recursive(&path, results)?;
                continue;
            }

            let is_yaml = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e == "yml" || e == "yaml")
                .unwrap_or(false);

            if !is_yaml {
                results.push(LoadResult {
                    path,
                    status: LoadStatus::Skipped {
                        reason: "not a YAML file".to_string(),
                    },
                });
                continue;
            }

            match Self::load_file(&path) {
                Ok(doc) => {
                    let rule_id = doc.metadata().id.clone();
                    info!(rule_id = %rule_id, kind = %doc.kind(), path = %path.display(), "loaded rule");
                    if self.documents.insert(rule_id.clone(), doc).is_some() {
                        warn!(rule_id = %rule_id, "duplicate rule id; later file wins");
                    }
                    results.push(LoadResult {
                        path,
                        status: LoadStatus::Loaded { rule_id },
                    });
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load rule file");
                    results.push(LoadResult {
                        path,
                        status: LoadStatus::Failed {
                            error: e.to_string(),
                        },
                    });
                }
            }
        }

        Ok(())
    }

    /// Parse a single YAML file into a [`RuleDocument`] via two-pass deserialization.
    pub fn load_file(path: &Path) -> Result<RuleDocument> {
        let contents = fs::read_to_string(path)?;
        Self::parse_str(&contents)
    }

    /// Parse YAML text into a [`RuleDocument`].
    ///
    /// First pass: deserialize as [`RuleEnvelope`] to read the `kind` field.
    /// Second pass: reconstruct and deserialize into the kind-specific type.
    pub fn parse_str(contents: &str) -> Result<RuleDocument> {
        let envelope: RuleEnvelope = serde_yaml::from_str(contents)?;

        if envelope.metadata.id.is_empty() {
            return Err(RuleError::Validation(
                "rule metadata.id must not be empty".to_string(),
            ));
        }

        envelope.parse_full().map_err(|e| {
            RuleError::Validation(format!(
                "failed to parse rule '{}': {}",
                envelope.metadata.id, e
            ))
        })
    }

    /// All loaded documents, ordered by id.
    pub fn documents(&self) -> impl Iterator<Item = &RuleDocument> {
        self.documents.values()
    }

    /// Get a document by id.
    pub fn get(&self, id: &str) -> Option<&RuleDocument> {
        self.documents.get(id)
    }

    /// Enabled documents of one kind, ordered by id.
    fn enabled_of_kind(&self, kind: RuleKind) -> Vec<&RuleDocument> {
        self.documents
            .values()
            .filter(|d| d.kind() == kind && d.metadata().enabled)
            .collect()
    }

    /// Resolve the active configuration.
    ///
    /// For each kind the first enabled document (by id) wins; kinds with no
    /// enabled document fall back to the built-in defaults. A document that
    /// fails validation is an error rather than a silent fallback.
    pub fn rule_set(&self) -> Result<RuleSet> {
        let mut set = RuleSet::builtin();

        let analysis = self.enabled_of_kind(RuleKind::AnalysisConfig);
        if analysis.len() > 1 {
            warn!(count = analysis.len(), "multiple enabled AnalysisConfig rules; using the first by id");
        }
        if let Some(rule) = analysis.first().and_then(|d| d.as_analysis_config()) {
            set.analysis = rule.compile()?;
            set.analysis_source = rule.metadata.id.clone();
        }

        let verdict = self.enabled_of_kind(RuleKind::VerdictConfig);
        if verdict.len() > 1 {
            warn!(count = verdict.len(), "multiple enabled VerdictConfig rules; using the first by id");
        }
        if let Some(rule) = verdict.first().and_then(|d| d.as_verdict_config()) {
            set.verdict = rule.compile()?;
            set.verdict_source = rule.metadata.id.clone();
        }

        info!(
            analysis = %set.analysis_source,
            verdict = %set.verdict_source,
            chronic_threshold = set.analysis.chronic_threshold,
            "rule set resolved"
        );
        Ok(set)
    }
}
