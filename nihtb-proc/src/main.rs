//! nihtb - NIH Toolbox export processing
//!
//! Subcommands:
//! - `organize`: merge raw exports and split them into subject folders
//! - `format`: build the NDA wide-format table from the master scores file
//! - `verify`: check subject folders against the master files

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use nihtb_common::config::{load_config, ConfigFileResolver};
use nihtb_proc::config::{ProcConfig, APP_NAME};
use nihtb_proc::logging;
use nihtb_proc::organizer::organize;
use nihtb_proc::pipeline::run_format;
use nihtb_proc::verifier::verify_all;
use nihtb_proc::TieBreak;
use tracing::{info, warn};

/// Mismatches printed per master file before summarizing the rest
const MAX_REPORTED_MISMATCHES: usize = 5;

/// Command-line arguments for nihtb
#[derive(Parser, Debug)]
#[command(name = "nihtb")]
#[command(about = "NIH Toolbox export organizer and NDA formatter")]
#[command(version)]
struct Args {
    /// Configuration file (TOML); NIHTB_CONFIG is used when absent
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true, env = "NIHTB_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge raw exports into master files and per-subject folders
    Organize {
        /// Folder with ScoresExport*.csv / ItemExport*.csv files
        #[arg(long)]
        raw_dir: Option<PathBuf>,

        /// Folder receiving master files and subject folders
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Convert the master scores file into the NDA wide format
    Format {
        /// Long-format scores file
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// NDA data dictionary
        #[arg(short, long)]
        dictionary: Option<PathBuf>,

        /// Output file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Rule choosing among several values in one group
        #[arg(long, value_enum)]
        tie_break: Option<TieBreak>,

        /// Write a JSON report of instrument matches here
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Check subject folders against the master files
    Verify {
        /// Folder holding master files and subject folders
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Logging first, so config resolution messages are not lost
    let log_level = logging::init(args.log_level.as_deref())?;

    let resolver = ConfigFileResolver::new(APP_NAME);
    let (mut config, config_path): (ProcConfig, _) =
        load_config(&resolver, args.config.as_deref()).context("Failed to load configuration")?;
    log_level.apply_config_level(&config.logging.level)?;

    info!("nihtb {}", env!("CARGO_PKG_VERSION"));
    match &config_path {
        Some(path) => info!("Configuration: {}", path.display()),
        None => info!("Configuration: built-in defaults"),
    }

    match args.command {
        Command::Organize { raw_dir, output_dir } => {
            let raw_dir = raw_dir.unwrap_or(config.raw_data_dir);
            let output_dir = output_dir.unwrap_or(config.output_dir);
            info!("Organizing exports from {} into {}", raw_dir.display(), output_dir.display());

            let summaries = organize(&raw_dir, &output_dir)
                .with_context(|| format!("Failed to organize {}", raw_dir.display()))?;
            for summary in &summaries {
                info!(
                    kind = summary.kind,
                    files = summary.source_files,
                    rows = summary.rows,
                    duplicates = summary.duplicates_removed,
                    subjects = summary.subjects,
                    "Organized exports"
                );
            }
            if summaries.iter().all(|s| s.rows == 0) {
                warn!("No data found in {}", raw_dir.display());
            }
        }

        Command::Format {
            input,
            dictionary,
            output,
            tie_break,
            report,
        } => {
            if let Some(rule) = tie_break {
                config.tie_break = rule;
            }
            let input = input.unwrap_or_else(|| config.scores_master_path());
            let dictionary = dictionary.unwrap_or_else(|| config.dictionary_path.clone());
            let output = output.unwrap_or_else(|| config.output_path.clone());

            let summary = run_format(
                &input,
                &dictionary,
                &output,
                report.as_deref(),
                &config.format_options(),
            )
            .context("Format run failed")?;

            info!(
                variables = summary.dictionary_variables,
                unresolved = summary.unresolved.len(),
                rows = summary.output_rows,
                "Formatting complete"
            );
        }

        Command::Verify { output_dir } => {
            let output_dir = output_dir.unwrap_or(config.output_dir);
            let reports = verify_all(&output_dir)
                .with_context(|| format!("Failed to verify {}", output_dir.display()))?;

            let mut failed = 0;
            for report in &reports {
                if !report.master_found {
                    println!("[Skipping] Master file not found: {}", report.master_file);
                } else if report.is_ok() {
                    println!(
                        "[SUCCESS] {}: verified {} subjects, all data matches",
                        report.master_file, report.subjects_verified
                    );
                } else {
                    failed += report.mismatches.len();
                    println!(
                        "[FAILURE] {}: mismatches for {} subjects",
                        report.master_file,
                        report.mismatches.len()
                    );
                    for mismatch in report.mismatches.iter().take(MAX_REPORTED_MISMATCHES) {
                        println!("    ! {}", mismatch);
                    }
                    if report.mismatches.len() > MAX_REPORTED_MISMATCHES {
                        println!(
                            "    ... and {} more.",
                            report.mismatches.len() - MAX_REPORTED_MISMATCHES
                        );
                    }
                }
            }

            if failed > 0 {
                bail!("Verification failed for {} subject files", failed);
            }
        }
    }

    Ok(())
}
