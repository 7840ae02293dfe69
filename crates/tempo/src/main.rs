//! Tempo - per-user interval timer engine
//!
//! Main entry point for the Tempo CLI.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

mod commands;

use commands::{reset, run, settings, status};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Tempo - per-user interval timer engine
#[derive(Parser)]
#[command(name = "tempo")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// SQLite database path (overrides config)
    #[arg(long, global = true, env = "TEMPO_DATABASE")]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the engine in the foreground and start a user's timer
    Run(run::RunArgs),

    /// Show a user's timer status
    Status(status::StatusArgs),

    /// Show or change a user's timer settings
    Settings(settings::SettingsArgs),

    /// Reset a user's completed-interval counter
    Reset(reset::ResetArgs),
}

/// File log filter: everything from our crates.
const FILE_FILTER: &str =
    "tempo=trace,tempo_engine=trace,tempo_session=trace,tempo_store=trace,tempo_config=trace,info";

/// Console filter used with `--verbose`.
const VERBOSE_FILTER: &str =
    "tempo=debug,tempo_engine=debug,tempo_session=debug,tempo_store=debug,tempo_config=debug,info";

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = tempo_config::load_config(None).context("failed to load configuration")?;
    let config = loaded.config;

    // Initialize tracing: console (human-readable, stderr) + rotating JSON file
    let console_filter = if cli.verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_level()))
    };

    let (file_layer, _guard) = if config.log_to_file() {
        let log_dir = tempo_config::xdg_config_dir()
            .map(|d| d.join("logs"))
            .unwrap_or_else(|| PathBuf::from("logs"));
        let file_appender = tracing_appender::rolling::daily(&log_dir, "tempo.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(non_blocking)
            .with_filter(EnvFilter::new(FILE_FILTER));
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .with(file_layer)
        .init();

    for path in &loaded.loaded_from {
        tracing::debug!(path = %path.display(), "Loaded config file");
    }

    let database = match cli.database {
        Some(path) => path,
        None => {
            let data_dir = dirs::data_dir()
                .map(|d| d.join("tempo"))
                .unwrap_or_else(|| PathBuf::from("."));
            config.database_path(&data_dir)
        }
    };

    let ctx = commands::Context {
        config,
        database,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Run(args) => run::run(args, &ctx).await,
        Commands::Status(args) => status::run(args, &ctx).await,
        Commands::Settings(args) => settings::run(args, &ctx).await,
        Commands::Reset(args) => reset::run(args, &ctx).await,
    }
}
