use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

// ── Top-level config ──────────────────────────────────────────

/// Process-level settings: where rule files live, where reports go, and how
/// CSV input is delimited. Business weights live in the rule files, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub rules_dir: PathBuf,
    pub reports_dir: PathBuf,
    pub csv_delimiter: u8,
    /// Overrides `AnalysisConfig.spec.chronic_threshold` when set.
    pub chronic_threshold: Option<usize>,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `TRIAGE_PROFILE`. When set (e.g. `PROD`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("TRIAGE_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            rules_dir: PathBuf::from(profiled_env_or(p, "RULES_DIR", "data/rules")),
            reports_dir: PathBuf::from(profiled_env_or(p, "REPORTS_DIR", "reports")),
            csv_delimiter: parse_delimiter(&profiled_env_or(p, "CSV_DELIMITER", ";")),
            chronic_threshold: profiled_env_opt(p, "CHRONIC_THRESHOLD")
                .and_then(|v| v.parse().ok())
                .filter(|v| *v >= 1),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  rules_dir:   {}", self.rules_dir.display());
        tracing::info!("  reports_dir: {}", self.reports_dir.display());
        tracing::info!("  delimiter:   {:?}", self.csv_delimiter as char);
        if let Some(t) = self.chronic_threshold {
            tracing::info!("  chronic threshold override: {}", t);
        }
    }
}

/// Single-byte delimiter; `\t` is accepted as an escape. Anything else falls
/// back to `;`.
fn parse_delimiter(raw: &str) -> u8 {
    match raw {
        "\\t" | "\t" => b'\t',
        s if s.len() == 1 => s.as_bytes()[0],
        _ => b';',
    }
}
