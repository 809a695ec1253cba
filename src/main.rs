//! Acuity CLI - model inspector
//!
//! Command-line interface for reading Acuity models and their inferred shapes.

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use acuity::cli::{commands, Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Acuity model inspector v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Inspect { path, format } => commands::inspect(&path, format)
            .with_context(|| format!("failed to inspect {}", path.display())),
        Commands::Shapes { path } => {
            commands::shapes(&path).with_context(|| format!("failed to read {}", path.display()))
        }
    }
}
