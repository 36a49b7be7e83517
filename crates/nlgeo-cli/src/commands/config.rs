use crate::config_loader::load_config_with_overrides;
use crate::output::OutputWriter;
use crate::output_types::ConfigRow;
use anyhow::Result;
use nlgeo_core::config::CliConfigOverrides;
use std::path::Path;

/// Show every configuration value and the layer it came from
pub fn execute(
    output: &OutputWriter,
    config_path: Option<&Path>,
    base: CliConfigOverrides,
) -> Result<()> {
    let config = load_config_with_overrides(config_path, base)?;

    let mut rows: Vec<ConfigRow> = config
        .to_inspection_map()
        .into_iter()
        .map(|(key, (value, source))| ConfigRow { key, value, source: format!("{:?}", source) })
        .collect();
    rows.sort_by(|a, b| a.key.cmp(&b.key));

    if !output.is_json() {
        output.section("Configuration");
    }
    output.table(rows)?;

    // Reported after the table so invalid values are still shown.
    if let Err(err) = config.into_settings() {
        output.warning(err);
    }
    Ok(())
}
