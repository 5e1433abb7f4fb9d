//! CLI command definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// courier - inspect dispatch configuration and persisted script state
#[derive(Parser, Debug)]
#[command(name = "courier")]
#[command(about = "Inspect dispatch configuration and persisted script state", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Export spans through OpenTelemetry instead of plain logs
    #[arg(long, global = true)]
    pub telemetry: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the resolved rate limit and dispatch configuration
    Config {
        /// Platform to show; all platforms when omitted
        #[arg(long)]
        platform: Option<String>,

        /// Tier to show; the platform's default tier when omitted
        #[arg(long, requires = "platform")]
        tier: Option<String>,

        /// Read this file instead of the layered configuration
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Persisted script state commands
    #[command(subcommand)]
    State(StateCommands),
}

/// Persisted script state subcommands
#[derive(Subcommand, Debug)]
pub enum StateCommands {
    /// Show the suspended call stack of a channel
    Show {
        /// Channel identifier
        channel: String,

        /// State store directory
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Delete the script state of a channel
    Clear {
        /// Channel identifier
        channel: String,

        /// State store directory
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}
