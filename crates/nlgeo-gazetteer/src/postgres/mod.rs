//! PostgreSQL gazetteer adapter (PostGIS + pg_trgm)

pub mod config;
pub mod migrations;
mod places;

pub use config::{ConfigError, MigrationConfig, PoolConfig, PostgresConfig};
pub use migrations::{MigrationError, MigrationManager, MigrationStatus};

use nlgeo_core::error::{NlgeoError, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

/// PostgreSQL gazetteer store
pub struct PostgresGazetteer {
    pool: PgPool,
    config: PostgresConfig,
}

impl PostgresGazetteer {
    /// Connect with the given configuration, running migrations first when
    /// `migrations.auto_run` is set.
    pub async fn connect(config: PostgresConfig) -> Result<Self> {
        config.validate().map_err(|e| NlgeoError::ConfigInvalid {
            key: "database_url".to_string(),
            reason: e.to_string(),
        })?;

        let pool = PgPoolOptions::new()
            .min_connections(config.pool.min_connections)
            .max_connections(config.pool.max_connections)
            .acquire_timeout(config.pool.acquire_timeout)
            .idle_timeout(config.pool.idle_timeout)
            .max_lifetime(config.pool.max_lifetime)
            .connect(&config.database_url)
            .await
            .map_err(|e| {
                NlgeoError::backend(format!(
                    "Failed to connect to {}: {}",
                    config.redacted_url(),
                    e
                ))
            })?;

        let store = Self { pool, config };
        store.health_check().await?;
        info!(url = %store.config.redacted_url(), "Connected to gazetteer database");

        if store.config.migrations.auto_run {
            store.run_migrations().await?;
        }
        Ok(store)
    }

    /// Run all pending migrations
    pub async fn run_migrations(&self) -> Result<()> {
        let manager = MigrationManager::new(self.pool.clone());
        manager
            .run_migrations()
            .await
            .map_err(|e| NlgeoError::backend(format!("Migration failed: {}", e)))?;
        info!("Gazetteer schema is up to date");
        Ok(())
    }

    /// Status of every known migration
    pub async fn migration_status(&self) -> Result<Vec<MigrationStatus>> {
        let manager = MigrationManager::new(self.pool.clone());
        manager
            .check_status()
            .await
            .map_err(|e| NlgeoError::backend(format!("Failed to check migration status: {}", e)))
    }

    /// Highest applied migration version
    pub async fn current_version(&self) -> Result<Option<i64>> {
        let manager = MigrationManager::new(self.pool.clone());
        manager
            .current_version()
            .await
            .map_err(|e| NlgeoError::backend(format!("Failed to get current version: {}", e)))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn config(&self) -> &PostgresConfig {
        &self.config
    }

    /// Perform a health check on the database connection
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| NlgeoError::backend(format!("Health check failed: {}", e)))?;
        Ok(())
    }
}
