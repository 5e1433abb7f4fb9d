//! courier CLI binary.
//!
//! This binary provides command-line access to courier's configuration and
//! persisted dialogue state:
//! - Print resolved platform tiers and dispatch settings
//! - Inspect or clear the suspended script of a channel

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{Cli, Commands, handle_config_command, handle_state_command};

    // Parse command-line arguments
    let cli = Cli::parse();

    // Initialize tracing
    let directive = if cli.verbose { "debug" } else { "info" };
    if cli.telemetry {
        courier::init_telemetry(directive)?;
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive)),
            )
            .with_target(false)
            .init();
    }

    // Execute the requested command
    let result = match cli.command {
        Commands::Config {
            platform,
            tier,
            file,
        } => handle_config_command(file.as_deref(), platform.as_deref(), tier.as_deref()),

        Commands::State(state_cmd) => handle_state_command(state_cmd).await,
    };

    if cli.telemetry {
        courier::shutdown_telemetry();
    }
    result?;
    Ok(())
}
