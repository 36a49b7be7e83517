//! Configuration loading utilities for CLI commands

use anyhow::{Context, Result};
use nlgeo_core::config::{CliConfigOverrides, GeocodeSettings, LayeredConfig};
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "nlgeo.toml";

/// Load layered configuration: defaults, then the config file, then `NLGEO_*`
/// environment variables.
pub fn load_config(explicit: Option<&Path>) -> Result<LayeredConfig> {
    let mut config = LayeredConfig::with_defaults();

    if let Some(path) = config_file(explicit) {
        config = config
            .load_from_file(&path)
            .with_context(|| format!("Failed to load configuration file {}", path.display()))?;
    }

    Ok(config.load_from_env())
}

/// Load layered configuration with CLI overrides
pub fn load_config_with_overrides(
    explicit: Option<&Path>,
    overrides: CliConfigOverrides,
) -> Result<LayeredConfig> {
    let mut config = load_config(explicit)?;
    config.update_from_cli(overrides);
    Ok(config)
}

/// Load, override and freeze into settings
pub fn load_settings(
    explicit: Option<&Path>,
    overrides: CliConfigOverrides,
) -> Result<GeocodeSettings> {
    let settings = load_config_with_overrides(explicit, overrides)?.into_settings()?;
    Ok(settings)
}

/// The explicit file, or `nlgeo.toml` in the working directory if it exists
fn config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            default.is_file().then_some(default)
        }
    }
}
