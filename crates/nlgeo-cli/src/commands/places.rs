use crate::cli::{LoadArgs, PlacesArgs, PlacesCommand, StorageBackend};
use crate::config_loader::load_settings;
use crate::errors;
use crate::output::OutputWriter;
use crate::output_types::LoadOutput;
use crate::storage::connect_postgres;
use anyhow::{Context, Result};
use nlgeo_core::config::{CliConfigOverrides, GeocodeSettings};
use nlgeo_gazetteer::{GazetteerStore, PlaceLoader};
use std::path::Path;

/// Execute place management commands
pub async fn execute(
    args: PlacesArgs,
    output: &OutputWriter,
    backend: StorageBackend,
    config_path: Option<&Path>,
    base: CliConfigOverrides,
) -> Result<()> {
    let settings = load_settings(config_path, base)?;

    match args.command {
        PlacesCommand::Load(load_args) => {
            execute_load(load_args, output, backend, &settings).await
        }
        PlacesCommand::Count => {
            if backend != StorageBackend::Postgres {
                return Err(errors::postgres_required("places count").into());
            }
            let store = connect_postgres(&settings, false).await?;
            let count = store.count().await.context("Failed to count places")?;
            if output.is_json() {
                output.result(serde_json::json!({ "places": count }))?;
            } else {
                output.kv("Places", count);
            }
            Ok(())
        }
    }
}

/// Parse a places file and upsert it into the database
async fn execute_load(
    args: LoadArgs,
    output: &OutputWriter,
    backend: StorageBackend,
    settings: &GeocodeSettings,
) -> Result<()> {
    let places = PlaceLoader::new()
        .with_default_source(args.source.clone())
        .read_file(&args.path)
        .with_context(|| format!("Failed to read places from {}", args.path.display()))?;

    if args.dry_run {
        return report(output, &args, places.len(), 0);
    }
    if backend != StorageBackend::Postgres {
        return Err(errors::postgres_required("places load").into());
    }

    // The table may not exist yet on a fresh database.
    let store = connect_postgres(settings, true).await?;
    if !output.is_json() {
        output.info(format!("Writing {} place(s)...", places.len()));
    }
    let written = store.upsert_places(&places).await.context("Failed to write places")?;
    report(output, &args, places.len(), written)
}

fn report(output: &OutputWriter, args: &LoadArgs, parsed: usize, written: usize) -> Result<()> {
    if output.is_json() {
        return output.result(LoadOutput {
            path: args.path.display().to_string(),
            parsed,
            written,
            dry_run: args.dry_run,
        });
    }
    if args.dry_run {
        output.success(format!("{} valid place(s) in {}", parsed, args.path.display()));
    } else {
        output.success(format!("Loaded {} of {} place(s)", written, parsed));
    }
    Ok(())
}
