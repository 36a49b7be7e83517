use crate::cli::{GeocodeArgs, StorageBackend};
use crate::config_loader::load_settings;
use crate::output::OutputWriter;
use crate::output_types::{GeocodeFailure, GeocodeOutput, TraceRow};
use crate::storage::Storage;
use anyhow::{Context, Result};
use nlgeo_core::config::CliConfigOverrides;
use nlgeo_core::models::RequestNode;
use nlgeo_geo::models::to_geojson_geometry;
use nlgeo_resolve::SpatialTreeEvaluator;
use std::fs;
use std::path::Path;

pub async fn execute(
    args: GeocodeArgs,
    output: &OutputWriter,
    backend: StorageBackend,
    config_path: Option<&Path>,
    base: CliConfigOverrides,
) -> Result<()> {
    let overrides = CliConfigOverrides {
        ambiguity_margin: args.margin,
        containment_bonus: args.containment_bonus,
        query_timeout_ms: args.timeout_ms,
        clip_directional_to_parent: args.no_clip_directional.then_some(false),
        ..base
    };
    let settings = load_settings(config_path, overrides)?;

    let content = fs::read_to_string(&args.tree)
        .with_context(|| format!("Failed to read request tree {}", args.tree.display()))?;
    let tree = RequestNode::from_json(&content)?;

    let storage = Storage::open(backend, args.places.as_deref(), &settings, "geocode").await?;
    let evaluator = SpatialTreeEvaluator::from_settings(storage.store, &settings);
    let (result, trace) = evaluator.evaluate_with_trace(&tree).await;

    let resolved = match result {
        Ok(resolved) => resolved,
        Err(err) => {
            if output.is_json() {
                output.failure(GeocodeFailure {
                    kind: err.kind().to_string(),
                    message: err.to_string(),
                    retryable: err.is_retryable(),
                    trace,
                })?;
            } else if !trace.is_empty() {
                output.section("Resolution Trace");
                output.human_table(trace.entries.iter().map(TraceRow::from).collect());
            }
            return Err(err.into());
        }
    };

    let area = evaluator.algebra().area_square_meters(&resolved.geometry);
    let geometry = to_geojson_geometry(&resolved.geometry);

    if output.is_json() {
        output.result(GeocodeOutput {
            geometry,
            area_square_meters: area,
            provenance: resolved.provenance,
            trace,
        })?;
    } else {
        output.section("Resolution Trace");
        output.human_table(trace.entries.iter().map(TraceRow::from).collect());

        output.section("Result");
        output.kv("Geometry", format!("{:?}", resolved.geometry.geometry_type()));
        output.kv("Area", format!("{:.3} km²", area / 1_000_000.0));
        if resolved.geometry.is_empty() {
            output.warning("The request describes an empty area");
        }
        output.section("GeoJSON");
        output.data(&geometry)?;
    }

    Ok(())
}
