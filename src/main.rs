mod calendar;
mod config;
mod fsutil;
mod notify;
mod pipeline;
mod predict;
mod site;
mod visibility;
mod weather;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::pipeline::Delivery;

/// Exit status when the calendar was published but the digest could not be sent.
const EXIT_DELIVERY_FAILED: u8 = 2;

#[derive(Parser)]
#[command(name = "satpass-notify")]
#[command(about = "Visible satellite pass calendar and chat digest")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file and print the effective options
    Validate { config: PathBuf },
    /// Fetch predictions, update the calendar and send the digest
    Run {
        config: PathBuf,
        /// Replay raw predictions from a YAML file instead of fetching them
        #[arg(long)]
        predictions: Option<PathBuf>,
        /// Evaluate as if run at this RFC 3339 instant
        #[arg(long, value_parser = parse_instant)]
        now: Option<DateTime<Utc>>,
    },
}

fn parse_instant(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config } => validate(&config),
        Commands::Run {
            config,
            predictions,
            now,
        } => run(&config, predictions, now.unwrap_or_else(Utc::now)),
    }
}

fn validate(path: &Path) -> ExitCode {
    match Config::load(path) {
        Ok(settings) => {
            println!("Configuration is valid");
            for line in settings.summary() {
                println!("  {}", line);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(path: &Path, predictions: Option<PathBuf>, now: DateTime<Utc>) -> ExitCode {
    let settings = match Config::load(path) {
        Ok(s) => s,
        Err(e) => {
            log::error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    for line in settings.summary() {
        log::info!("{}", line);
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            log::error!("Failed to start async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let outcome = match runtime.block_on(pipeline::execute(&settings, predictions.as_deref(), now))
    {
        Ok(outcome) => outcome,
        Err(e) => {
            log::error!("Run aborted: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("{}", outcome.digest);
    log::info!(
        "Run complete: {} passes, {} qualifying, calendar {}",
        outcome.passes,
        outcome.qualifying,
        outcome.merge
    );

    match outcome.delivery {
        Delivery::Failed(e) => {
            log::error!("Digest delivery failed: {}", e);
            ExitCode::from(EXIT_DELIVERY_FAILED)
        }
        Delivery::Sent | Delivery::Suppressed => ExitCode::SUCCESS,
    }
}
