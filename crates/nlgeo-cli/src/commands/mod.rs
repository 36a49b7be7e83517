//! Command implementations

mod config;
mod db;
mod geocode;
mod places;
mod search;

use crate::cli::{Cli, Commands};
use crate::output::OutputWriter;
use anyhow::Result;
use nlgeo_core::config::CliConfigOverrides;

/// Execute a CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);
    let config_path = cli.config.as_deref();
    let base = CliConfigOverrides { database_url: cli.database_url.clone(), ..Default::default() };

    match cli.command {
        Commands::Geocode(args) => {
            geocode::execute(args, &output, cli.storage, config_path, base).await
        }
        Commands::Search(args) => {
            search::execute(args, &output, cli.storage, config_path, base).await
        }
        Commands::Places(args) => {
            places::execute(args, &output, cli.storage, config_path, base).await
        }
        Commands::Db(args) => db::execute(args, &output, cli.storage, config_path, base).await,
        Commands::Config => config::execute(&output, config_path, base),
    }
}
