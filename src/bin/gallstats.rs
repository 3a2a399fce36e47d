//! Command-line entry point for the dump pipeline.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use gallstats::constants::remote::DEFAULT_TIMEOUT_SECS;
use gallstats::{InputInventory, Pipeline, PipelineConfig, PipelineError};

#[derive(Parser)]
#[command(name = "gallstats", version, about = "Merge, clean, tokenize, and aggregate forum CSV dumps")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Produce every pipeline artifact, reusing or fetching where possible.
    Run {
        /// Directory holding raw shards and produced artifacts.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
        /// Rebuild requested artifacts even when they already exist.
        #[arg(long)]
        force: bool,
        /// Also produce the morphologically tokenized parquet table.
        #[arg(long)]
        morph: bool,
        /// Base URL serving precomputed artifacts.
        #[arg(long)]
        remote_base: Option<String>,
        /// Bound on each remote artifact GET, in seconds.
        #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
        timeout_secs: u64,
    },
    /// Report discovered archives, shards, and subdirectories as JSON.
    Inspect {
        /// Directory to scan.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), PipelineError> {
    match cli.command {
        Command::Run {
            data_dir,
            force,
            morph,
            remote_base,
            timeout_secs,
        } => {
            let mut config = PipelineConfig::new(data_dir)
                .with_fetch_timeout(Duration::from_secs(timeout_secs));
            if let Some(base) = remote_base {
                config = config.with_remote_base(base);
            }
            let pipeline = Pipeline::new(config);
            for (artifact, outcome) in pipeline.ensure_all(morph, force)? {
                println!("{artifact}: {outcome:?}");
            }
            Ok(())
        }
        Command::Inspect { data_dir } => {
            let inventory = InputInventory::scan(&data_dir)?;
            let rendered = serde_json::to_string_pretty(&inventory)
                .map_err(|err| PipelineError::Artifact(format!("inventory encoding failed: {err}")))?;
            println!("{rendered}");
            Ok(())
        }
    }
}
