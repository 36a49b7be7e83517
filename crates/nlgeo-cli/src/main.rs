//! nlgeo CLI - Command-line interface
//!
//! Geocodes request trees, searches the gazetteer and manages the
//! PostgreSQL place table.

mod cli;
mod commands;
mod config_loader;
mod errors;
mod output;
mod output_types;
mod storage;

use clap::Parser;
use cli::Cli;
use std::process::ExitCode;

fn main() -> ExitCode {
    // Logs go to stderr so --json output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Create async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            errors::CliError::new(format!("Failed to start async runtime: {}", e)).display();
            return ExitCode::FAILURE;
        }
    };

    // Execute the command
    match runtime.block_on(commands::execute(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            errors::from_anyhow(err).display();
            ExitCode::FAILURE
        }
    }
}
