use crate::cli::{SearchArgs, StorageBackend};
use crate::config_loader::load_settings;
use crate::output::OutputWriter;
use crate::output_types::{CandidateRow, SearchOutput};
use crate::storage::Storage;
use anyhow::Result;
use nlgeo_core::config::CliConfigOverrides;
use nlgeo_core::models::PlaceType;
use nlgeo_gazetteer::GazetteerSearch;
use std::path::Path;

pub async fn execute(
    args: SearchArgs,
    output: &OutputWriter,
    backend: StorageBackend,
    config_path: Option<&Path>,
    base: CliConfigOverrides,
) -> Result<()> {
    let overrides = CliConfigOverrides { result_limit: args.limit, ..base };
    let settings = load_settings(config_path, overrides)?;

    let type_hint = args.place_type.as_deref().map(str::parse::<PlaceType>).transpose()?;

    let storage = Storage::open(backend, args.places.as_deref(), &settings, "search").await?;
    let search = GazetteerSearch::new(storage.store, settings.search.clone());
    let candidates = search.search(&args.name, type_hint, args.within.as_deref()).await?;

    if output.is_json() {
        output.result(SearchOutput {
            query: args.name,
            place_type: type_hint.map(|t| t.to_string()),
            within: args.within,
            candidates: candidates.iter().map(|c| c.summary()).collect(),
        })?;
        return Ok(());
    }

    output.section(format!("Candidates for \"{}\"", args.name));
    if candidates.is_empty() {
        output.info("No matching places");
        return Ok(());
    }
    output.human_table(
        candidates.iter().enumerate().map(|(i, c)| CandidateRow::new(i + 1, c)).collect(),
    );
    if let Some(hint) = &args.within {
        if candidates.iter().any(|c| c.containment_match) {
            output.info(format!("* lies within {}", hint));
        }
    }
    Ok(())
}
