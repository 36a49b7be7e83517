use sqlx::migrate::Migrator;
use sqlx::PgPool;
use std::collections::HashSet;
use thiserror::Error;

/// Schema of the `geo_places` table and its indexes
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Migration error types
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Migration failed: {0}")]
    Failed(#[from] sqlx::migrate::MigrateError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Migration status information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    /// Version number of the migration
    pub version: i64,
    /// Description of the migration
    pub description: String,
    /// Whether the migration has been applied
    pub applied: bool,
}

/// Applies and inspects the gazetteer schema migrations
pub struct MigrationManager {
    pool: PgPool,
}

impl MigrationManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply every migration not yet recorded in `_sqlx_migrations`, in
    /// version order.
    pub async fn run_migrations(&self) -> Result<(), MigrationError> {
        MIGRATOR.run(&self.pool).await?;
        Ok(())
    }

    /// Status of every known migration
    pub async fn check_status(&self) -> Result<Vec<MigrationStatus>, MigrationError> {
        // The tracking table does not exist before the first run
        let applied: Vec<(i64,)> = sqlx::query_as("SELECT version FROM _sqlx_migrations")
            .fetch_all(&self.pool)
            .await
            .unwrap_or_default();
        let applied: HashSet<i64> = applied.into_iter().map(|(v,)| v).collect();

        Ok(known_migrations()
            .into_iter()
            .map(|(version, description)| MigrationStatus {
                applied: applied.contains(&version),
                version,
                description,
            })
            .collect())
    }

    /// Highest applied migration version
    pub async fn current_version(&self) -> Result<Option<i64>, MigrationError> {
        let version: Option<(i64,)> =
            sqlx::query_as("SELECT version FROM _sqlx_migrations ORDER BY version DESC LIMIT 1")
                .fetch_optional(&self.pool)
                .await?;

        Ok(version.map(|(v,)| v))
    }
}

/// Version and description of every embedded migration
pub fn known_migrations() -> Vec<(i64, String)> {
    MIGRATOR.iter().map(|m| (m.version, m.description.to_string())).collect()
}
