//! CLI definitions for procwarden.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// procwarden CLI.
#[derive(Parser, Debug)]
#[command(name = "procwarden")]
#[command(about = "Lifecycle manager for named, supervised OS processes")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path [default: config/procwarden.toml, optional]
    #[arg(short, long, global = true, env = "PROCWARDEN_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub(crate) enum Commands {
    /// Run the API server in foreground (default)
    Run(RunArgs),

    /// Validate the configuration and print the effective values
    CheckConfig,
}

/// Overrides for values otherwise taken from the configuration file.
#[derive(clap::Args, Debug, Default, PartialEq, Eq)]
pub(crate) struct RunArgs {
    /// Server host
    #[arg(long)]
    pub host: Option<String>,

    /// Server port
    #[arg(long)]
    pub port: Option<u16>,

    /// Daemon store database path
    #[arg(long)]
    pub store: Option<PathBuf>,
}
