//! CLI Module
//!
//! Command-line interface for inspecting Acuity models.

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Acuity model inspector - layer graph and inferred tensor shapes
#[derive(Parser, Debug)]
#[command(name = "acuity-cli")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the model header, graph boundary and nodes
    #[command(name = "inspect")]
    Inspect {
        /// Path to the Acuity model JSON
        path: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Print every value with its inferred type
    #[command(name = "shapes")]
    Shapes {
        /// Path to the Acuity model JSON
        path: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}
