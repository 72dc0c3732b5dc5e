mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use hnrank_core::{AppConfig, ConfigError, ProviderKind};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "hnrank-cli")]
#[command(about = "Score and inspect Hacker News ranking snapshots offline")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one rescore cycle over a snapshot file and print the insight
    Score {
        /// Path to a ranking JSON file (same shape as `POST /api/v1/rankings`)
        #[arg(long)]
        input: PathBuf,

        /// Override `HNRANK_SCORE_PROVIDER` (lexicon, openai, disabled)
        #[arg(long)]
        provider: Option<ProviderKind>,
    },
    /// Re-check the sort order of a snapshot file against its recorded verdict
    Check {
        #[arg(long)]
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    match cli.command {
        Some(command) => run(command, hnrank_core::load_app_config).await?,
        None => println!("hnrank-cli: pass --help for available commands"),
    }

    Ok(())
}

/// Dispatches one command. App config is loaded only by commands that use it.
async fn run<F>(command: Commands, load_config: F) -> anyhow::Result<()>
where
    F: FnOnce() -> Result<AppConfig, ConfigError>,
{
    match command {
        Commands::Score { input, provider } => {
            let config = load_config()?;
            init_tracing(&config.log_level)?;
            commands::run_score(&config, &input, provider).await
        }
        Commands::Check { input } => {
            init_tracing("info")?;
            commands::run_check(&input)
        }
    }
}

fn init_tracing(fallback_level: &str) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(fallback_level))?;
    // Already set when several commands run in one process.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
    Ok(())
}

#[cfg(test)]
mod tests;
