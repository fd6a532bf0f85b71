//! procwarden - lifecycle manager for named, supervised OS processes.
//!
//! Main entry point for the procwarden CLI and server.

mod cli;
mod logging;
mod server;

use clap::Parser;

use procwarden_config::ConfigLoader;

use crate::cli::{Cli, Commands, RunArgs};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut config = server::load_config(cli.config.as_deref())?;

    match cli.command.unwrap_or(Commands::Run(RunArgs::default())) {
        Commands::Run(args) => {
            server::apply_overrides(&mut config, args);
            logging::init_tracing(&config.logging)?;
            server::validate(&config)?;
            server::run_server(config).await
        }
        Commands::CheckConfig => {
            let result = procwarden_config::ConfigValidator::validate(&config);
            for warning in &result.warnings {
                eprintln!("warning: {}: {}", warning.path, warning.message);
            }
            for error in &result.errors {
                eprintln!("error: {}: {}", error.path, error.message);
            }
            result.into_result()?;
            println!("{}", ConfigLoader::to_toml(&config)?);
            Ok(())
        }
    }
}
