//! omreval - score optical music recognition output against reference scores
//!
//! Subcommands:
//! - `omreval diff <left> <right>` - compare two score files
//! - `omreval batch <corpus>` - run the recognizer on every case and total the scores
//!
//! Exit status: 0 on success, 2 when a batch finished with failed cases,
//! 1 on any other error.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use omreval::{compare_files_detailed, Batch, CommandTemplate, Config};

#[derive(Parser)]
#[command(name = "omreval")]
#[command(about = "Score OMR output against reference MusicXML")]
#[command(version)]
struct Cli {
    /// Log per-case scores and recognizer invocations
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two MusicXML (.xml, .musicxml, .mxl) files
    Diff {
        left: PathBuf,
        right: PathBuf,

        /// Print the per-measure breakdown
        #[arg(short, long)]
        measures: bool,
    },

    /// Run the recognizer over a corpus of cases and sum the scores
    Batch {
        /// Directory holding one subdirectory per case
        corpus: PathBuf,

        /// YAML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Command template with {output} and {input} slots
        #[arg(long)]
        command: Option<String>,

        /// Per-case time limit in seconds
        #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
        timeout: Option<u64>,

        /// Cases to run at once
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Directory to run the recognizer from
        #[arg(long)]
        working_dir: Option<PathBuf>,

        /// Discard the recognizer's own output
        #[arg(short, long)]
        quiet: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "omreval=debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Diff {
            left,
            right,
            measures,
        } => {
            let diff = compare_files_detailed(&left, &right)?;
            if measures {
                println!(
                    "{:>8} {:>8} {:>10} {:>10} {:>8}",
                    "measure", "common", "left-only", "right-only", "score"
                );
                for m in &diff.measures {
                    println!(
                        "{:>8} {:>8} {:>10} {:>10} {:>8}",
                        m.measure,
                        m.common,
                        m.left_only,
                        m.right_only,
                        m.score()
                    );
                }
            }
            println!("{}", diff.score());
            Ok(ExitCode::SUCCESS)
        }
        Commands::Batch {
            corpus,
            config,
            command,
            timeout,
            jobs,
            working_dir,
            quiet,
            json,
        } => {
            let mut settings = match &config {
                Some(path) => Config::load(path)
                    .with_context(|| format!("loading config {}", path.display()))?,
                None => Config::default(),
            };
            if let Some(template) = command {
                settings.command = CommandTemplate::parse(&template)?;
            }
            if let Some(secs) = timeout {
                settings.timeout = Some(Duration::from_secs(secs));
            }
            if let Some(jobs) = jobs {
                settings.jobs = jobs;
            }
            if working_dir.is_some() {
                settings.working_dir = working_dir;
            }
            settings.quiet |= quiet;

            let batch = Batch::new(settings.runner()).with_jobs(settings.jobs);
            let report = batch
                .run(&corpus)
                .with_context(|| format!("evaluating corpus {}", corpus.display()))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report);
            }

            Ok(if report.is_clean() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_must_be_positive() {
        assert!(Cli::try_parse_from(["omreval", "batch", "corpus", "--timeout", "0"]).is_err());
        assert!(Cli::try_parse_from(["omreval", "batch", "corpus", "--timeout", "5"]).is_ok());
    }
}
