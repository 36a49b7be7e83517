use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// nlgeo - Geocode spatial request trees against a gazetteer
#[derive(Parser, Debug)]
#[command(name = "nlgeo")]
#[command(about = "Resolve place names and evaluate spatial request trees", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Gazetteer backend to use (memory or postgres)
    #[arg(long, global = true, default_value = "memory")]
    pub storage: StorageBackend,

    /// Configuration file (TOML); defaults to ./nlgeo.toml when present
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// PostgreSQL database URL (overrides NLGEO_DATABASE_URL and DATABASE_URL)
    #[arg(long, global = true, value_name = "URL")]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Gazetteer backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum StorageBackend {
    /// In-memory gazetteer loaded from a GeoJSON file
    Memory,
    /// PostgreSQL gazetteer (PostGIS + pg_trgm)
    Postgres,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate a request tree to a geometry
    Geocode(GeocodeArgs),

    /// Search the gazetteer by name
    Search(SearchArgs),

    /// Manage gazetteer places
    Places(PlacesArgs),

    /// Manage the gazetteer database
    Db(DbArgs),

    /// Show the effective configuration and where each value came from
    Config,
}

#[derive(Parser, Debug)]
pub struct GeocodeArgs {
    /// Path to the request tree (JSON)
    pub tree: PathBuf,

    /// Places file for the memory backend (GeoJSON FeatureCollection)
    #[arg(long, value_name = "FILE")]
    pub places: Option<PathBuf>,

    /// Score margin the best candidate needs over the runner-up
    #[arg(long)]
    pub margin: Option<f64>,

    /// Score bonus for candidates inside the primary containment hint
    #[arg(long)]
    pub containment_bonus: Option<f64>,

    /// Extend directional qualifiers to the whole world instead of the
    /// place's containing region
    #[arg(long)]
    pub no_clip_directional: bool,

    /// Gazetteer query timeout in milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,
}

#[derive(Parser, Debug)]
pub struct SearchArgs {
    /// Place name to search for
    pub name: String,

    /// Preferred place type (e.g. locality, county, region)
    #[arg(long = "type", value_name = "TYPE")]
    pub place_type: Option<String>,

    /// Name of a region the place should lie in
    #[arg(long, value_name = "HINT")]
    pub within: Option<String>,

    /// Places file for the memory backend (GeoJSON FeatureCollection)
    #[arg(long, value_name = "FILE")]
    pub places: Option<PathBuf>,

    /// Number of candidates to return
    #[arg(long, short = 'k')]
    pub limit: Option<usize>,
}

#[derive(Parser, Debug)]
pub struct PlacesArgs {
    #[command(subcommand)]
    pub command: PlacesCommand,
}

#[derive(Subcommand, Debug)]
pub enum PlacesCommand {
    /// Load places from a GeoJSON file into the database
    Load(LoadArgs),

    /// Count stored places
    Count,
}

#[derive(Parser, Debug)]
pub struct LoadArgs {
    /// Path to a GeoJSON FeatureCollection of places
    pub path: PathBuf,

    /// Source name for features without a `source` property
    #[arg(long, default_value = "comp")]
    pub source: String,

    /// Parse and validate the file without writing anything
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Parser, Debug)]
pub struct DbArgs {
    /// Database management command
    #[command(subcommand)]
    pub command: DbCommand,
}

#[derive(Subcommand, Debug)]
pub enum DbCommand {
    /// Apply pending schema migrations
    Migrate,

    /// Show applied and pending migrations
    Status,
}
