//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for archivelink using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Archivelink - archive integration for form workflows
#[derive(Parser, Debug)]
#[command(name = "archivelink")]
#[command(version, about, long_about = None)]
#[command(author = "Archivelink Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "archivelink.toml", env = "ARCHIVELINK_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "ARCHIVELINK_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Listen for archive receipts and error reports until interrupted
    Run(commands::run::RunArgs),

    /// Submit one instance to the archive
    Send(commands::send::SendArgs),

    /// Validate configuration against the application definition
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
