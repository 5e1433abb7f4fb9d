//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the courier binary.

mod commands;
mod config;
mod state;

pub use commands::{Cli, Commands, StateCommands};
pub use config::handle_config_command;
pub use state::handle_state_command;
