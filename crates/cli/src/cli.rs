use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Alert triage over monitoring exports.
///
/// Groups alerts into cases, classifies how automated remediation behaved,
/// scores what needs attention and compares runs between periods.
#[derive(Parser, Debug)]
#[command(name = "triage", version, about)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyse one alert export and write its reports.
    Analyze {
        /// Delimited alert export.
        csv: PathBuf,

        /// Output directory (defaults to REPORTS_DIR/<file stem>).
        #[arg(long)]
        out: Option<PathBuf>,

        /// Directory holding AnalysisConfig / VerdictConfig YAML files
        /// (defaults to RULES_DIR).
        #[arg(long)]
        rules: Option<PathBuf>,

        /// Only write the case summary and invalid-row log.
        #[arg(long)]
        light: bool,
    },

    /// Compare two case summaries from consecutive periods.
    Compare {
        /// Summary of the earlier period.
        previous: PathBuf,

        /// Summary of the later period.
        current: PathBuf,

        /// Order the two summaries by period instead of by argument position.
        #[arg(long)]
        direct: bool,

        /// Write the comparison JSON here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Rules directory for the verdict thresholds (defaults to RULES_DIR).
        #[arg(long)]
        rules: Option<PathBuf>,
    },

    /// Print the span of occurrence timestamps in an export.
    DateRange {
        csv: PathBuf,
    },
}
