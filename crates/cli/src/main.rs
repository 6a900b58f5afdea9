mod cli;
mod commands;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use crate::cli::{CliArgs, Command};

fn main() -> Result<ExitCode> {
    triage_core::config::load_dotenv();

    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();
    let config = triage_core::Config::from_env();
    config.log_summary();

    match args.command {
        Command::Analyze {
            csv,
            out,
            rules,
            light,
        } => {
            let outcome = commands::analyze(&config, &csv, out, rules.as_deref(), light)?;
            commands::emit_json(&outcome, None)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Compare {
            previous,
            current,
            direct,
            out,
            rules,
        } => {
            let outcome = commands::compare(&config, &previous, &current, direct, rules.as_deref())?;
            commands::emit_json(&outcome, out.as_deref())?;
            Ok(commands::exit_for(&outcome))
        }
        Command::DateRange { csv } => match commands::date_range(&config, &csv)? {
            Some(range) => {
                println!("{range}");
                Ok(ExitCode::SUCCESS)
            }
            None => {
                info!(path = %csv.display(), "no valid timestamps");
                Ok(ExitCode::FAILURE)
            }
        },
    }
}
