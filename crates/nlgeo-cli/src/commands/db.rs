use crate::cli::{DbArgs, DbCommand, StorageBackend};
use crate::config_loader::load_settings;
use crate::errors;
use crate::output::OutputWriter;
use crate::output_types::MigrationRow;
use crate::storage::connect_postgres;
use anyhow::{Context, Result};
use nlgeo_core::config::CliConfigOverrides;
use nlgeo_gazetteer::PostgresGazetteer;
use std::path::Path;

/// Execute database management commands
pub async fn execute(
    args: DbArgs,
    output: &OutputWriter,
    backend: StorageBackend,
    config_path: Option<&Path>,
    base: CliConfigOverrides,
) -> Result<()> {
    if backend != StorageBackend::Postgres {
        let name = match args.command {
            DbCommand::Migrate => "db migrate",
            DbCommand::Status => "db status",
        };
        return Err(errors::postgres_required(name).into());
    }

    let settings = load_settings(config_path, base)?;
    let store = connect_postgres(&settings, false).await?;

    match args.command {
        DbCommand::Migrate => execute_migrate(&store, output).await,
        DbCommand::Status => execute_status(&store, output).await,
    }
}

/// Apply pending migrations
async fn execute_migrate(store: &PostgresGazetteer, output: &OutputWriter) -> Result<()> {
    let before = store.current_version().await.context("Failed to read schema version")?;
    store.run_migrations().await.context("Failed to run migrations")?;
    let after = store.current_version().await.context("Failed to read schema version")?;

    if output.is_json() {
        output.result(serde_json::json!({
            "previous_version": before,
            "current_version": after,
        }))?;
    } else if before == after {
        output.success(format!("Schema already up to date (version {})", format_version(after)));
    } else {
        output.success(format!(
            "Migrated schema from version {} to {}",
            format_version(before),
            format_version(after)
        ));
    }
    Ok(())
}

/// Show applied and pending migrations
async fn execute_status(store: &PostgresGazetteer, output: &OutputWriter) -> Result<()> {
    let statuses = store.migration_status().await.context("Failed to check migrations")?;
    let pending = statuses.iter().filter(|s| !s.applied).count();
    let rows: Vec<MigrationRow> = statuses.into_iter().map(MigrationRow::from).collect();

    if output.is_json() {
        return output.table(rows);
    }

    output.section("Migrations");
    output.kv("Database", store.config().redacted_url());
    output.human_table(rows);
    if pending > 0 {
        output.warning(format!("{} pending migration(s); run: nlgeo db migrate", pending));
    }
    Ok(())
}

fn format_version(version: Option<i64>) -> String {
    version.map(|v| v.to_string()).unwrap_or_else(|| "none".to_string())
}
