use crate::cli::StorageBackend;
use crate::errors;
use anyhow::{Context, Result};
use nlgeo_core::config::GeocodeSettings;
use nlgeo_gazetteer::{GazetteerStore, MemoryGazetteer, PostgresConfig, PostgresGazetteer};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// The gazetteer store selected on the command line
pub struct Storage {
    pub store: Arc<dyn GazetteerStore>,
}

impl Storage {
    /// Open the selected backend. The memory backend is loaded from `places`;
    /// `command` names the subcommand for error messages.
    pub async fn open(
        backend: StorageBackend,
        places: Option<&Path>,
        settings: &GeocodeSettings,
        command: &str,
    ) -> Result<Self> {
        let store: Arc<dyn GazetteerStore> = match backend {
            StorageBackend::Memory => {
                let path = places.ok_or_else(|| errors::places_file_required(command))?;
                Arc::new(Self::load_memory(path)?)
            }
            StorageBackend::Postgres => Arc::new(connect_postgres(settings, false).await?),
        };
        Ok(Self { store })
    }

    /// Create an in-memory gazetteer from a places file
    fn load_memory(path: &Path) -> Result<MemoryGazetteer> {
        let store = MemoryGazetteer::from_file(path)
            .with_context(|| format!("Failed to load places from {}", path.display()))?;
        info!(path = %path.display(), "Loaded in-memory gazetteer");
        Ok(store)
    }
}

/// Connect to the PostgreSQL gazetteer named by the configuration,
/// applying pending migrations first when `migrate` is set
pub async fn connect_postgres(
    settings: &GeocodeSettings,
    migrate: bool,
) -> Result<PostgresGazetteer> {
    let url = settings.database_url.clone().ok_or_else(errors::database_url_missing)?;
    let config = PostgresConfig::new(url)
        .context("Invalid database configuration")?
        .with_auto_migrate(migrate);
    let redacted = config.redacted_url();

    PostgresGazetteer::connect(config).await.map_err(|e| {
        anyhow::Error::new(errors::database_connection_failed(&format!("{} ({})", e, redacted)))
    })
}
