use crate::error::{NlgeoError, Result};
use crate::models::{PlaceType, UnitTable, ValidationLimits};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Place types in their default display/sort order. Types not listed sort
/// after these, alphabetically.
pub fn default_place_type_order() -> Vec<PlaceType> {
    vec![
        PlaceType::Continent,
        PlaceType::Country,
        PlaceType::Empire,
        PlaceType::Region,
        PlaceType::Marinearea,
        PlaceType::Ocean,
        PlaceType::Locality,
        PlaceType::County,
        PlaceType::Postalregion,
    ]
}

/// Gazetteer sources in preference order
pub fn default_source_order() -> Vec<String> {
    vec!["comp".to_string(), "ne".to_string(), "wof".to_string()]
}

/// Layered configuration for nlgeo
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub ambiguity_margin: ConfigValue<f64>,
    pub containment_bonus: ConfigValue<f64>,
    pub trigram_threshold: ConfigValue<f64>,
    pub result_limit: ConfigValue<usize>,
    pub fetch_limit: ConfigValue<usize>,
    pub query_timeout_ms: ConfigValue<u64>,
    pub coordinate_precision: ConfigValue<u32>,
    pub max_buffer_meters: ConfigValue<f64>,
    pub border_width_meters: ConfigValue<f64>,
    pub clip_directional_to_parent: ConfigValue<bool>,
    pub place_type_order: ConfigValue<Vec<PlaceType>>,
    pub source_order: ConfigValue<Vec<String>>,
    pub database_url: ConfigValue<Option<String>>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            ambiguity_margin: ConfigValue::new(0.05, ConfigSource::Default),
            containment_bonus: ConfigValue::new(0.1, ConfigSource::Default),
            trigram_threshold: ConfigValue::new(0.3, ConfigSource::Default),
            result_limit: ConfigValue::new(10, ConfigSource::Default),
            fetch_limit: ConfigValue::new(100, ConfigSource::Default),
            query_timeout_ms: ConfigValue::new(5000, ConfigSource::Default),
            coordinate_precision: ConfigValue::new(7, ConfigSource::Default),
            max_buffer_meters: ConfigValue::new(
                ValidationLimits::default().max_buffer_meters,
                ConfigSource::Default,
            ),
            border_width_meters: ConfigValue::new(2000.0, ConfigSource::Default),
            clip_directional_to_parent: ConfigValue::new(true, ConfigSource::Default),
            place_type_order: ConfigValue::new(default_place_type_order(), ConfigSource::Default),
            source_order: ConfigValue::new(default_source_order(), ConfigSource::Default),
            database_url: ConfigValue::new(None, ConfigSource::Default),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| NlgeoError::ConfigInvalid {
            key: "file".to_string(),
            reason: format!("Failed to read config file: {}", e),
        })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| NlgeoError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        let FileConfig { resolver, search, geometry, database } = file_config;

        if let Some(resolver) = resolver {
            if let Some(v) = resolver.ambiguity_margin {
                self.ambiguity_margin.update(v, ConfigSource::File);
            }
            if let Some(v) = resolver.containment_bonus {
                self.containment_bonus.update(v, ConfigSource::File);
            }
        }

        if let Some(search) = search {
            if let Some(v) = search.trigram_threshold {
                self.trigram_threshold.update(v, ConfigSource::File);
            }
            if let Some(v) = search.result_limit {
                self.result_limit.update(v, ConfigSource::File);
            }
            if let Some(v) = search.fetch_limit {
                self.fetch_limit.update(v, ConfigSource::File);
            }
            if let Some(v) = search.query_timeout_ms {
                self.query_timeout_ms.update(v, ConfigSource::File);
            }
            if let Some(v) = search.place_type_order {
                self.place_type_order.update(v, ConfigSource::File);
            }
            if let Some(v) = search.source_order {
                self.source_order.update(v, ConfigSource::File);
            }
        }

        if let Some(geometry) = geometry {
            if let Some(v) = geometry.coordinate_precision {
                self.coordinate_precision.update(v, ConfigSource::File);
            }
            if let Some(v) = geometry.max_buffer_meters {
                self.max_buffer_meters.update(v, ConfigSource::File);
            }
            if let Some(v) = geometry.border_width_meters {
                self.border_width_meters.update(v, ConfigSource::File);
            }
            if let Some(v) = geometry.clip_directional_to_parent {
                self.clip_directional_to_parent.update(v, ConfigSource::File);
            }
        }

        if let Some(url) = database.and_then(|d| d.url) {
            self.database_url.update(Some(url), ConfigSource::File);
        }

        Ok(self)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        if let Some(v) = env_parsed::<f64>("NLGEO_AMBIGUITY_MARGIN", "a number") {
            self.ambiguity_margin.update(v, ConfigSource::Environment);
        }
        if let Some(v) = env_parsed::<f64>("NLGEO_CONTAINMENT_BONUS", "a number") {
            self.containment_bonus.update(v, ConfigSource::Environment);
        }
        if let Some(v) = env_parsed::<f64>("NLGEO_TRIGRAM_THRESHOLD", "a number") {
            self.trigram_threshold.update(v, ConfigSource::Environment);
        }
        if let Some(v) = env_parsed::<usize>("NLGEO_RESULT_LIMIT", "a positive integer") {
            self.result_limit.update(v, ConfigSource::Environment);
        }
        if let Some(v) = env_parsed::<usize>("NLGEO_FETCH_LIMIT", "a positive integer") {
            self.fetch_limit.update(v, ConfigSource::Environment);
        }
        if let Some(v) = env_parsed::<u64>("NLGEO_QUERY_TIMEOUT_MS", "milliseconds") {
            self.query_timeout_ms.update(v, ConfigSource::Environment);
        }
        if let Some(v) = env_parsed::<u32>("NLGEO_COORDINATE_PRECISION", "a number of decimals") {
            self.coordinate_precision.update(v, ConfigSource::Environment);
        }
        if let Some(v) = env_parsed::<f64>("NLGEO_MAX_BUFFER_METERS", "a number") {
            self.max_buffer_meters.update(v, ConfigSource::Environment);
        }
        if let Some(v) = env_parsed::<f64>("NLGEO_BORDER_WIDTH_METERS", "a number") {
            self.border_width_meters.update(v, ConfigSource::Environment);
        }
        if let Some(v) = env_parsed::<bool>("NLGEO_CLIP_DIRECTIONAL_TO_PARENT", "true or false") {
            self.clip_directional_to_parent.update(v, ConfigSource::Environment);
        }

        // NLGEO_PLACE_TYPE_ORDER
        if let Ok(order_str) = env::var("NLGEO_PLACE_TYPE_ORDER") {
            match parse_place_type_order(&order_str) {
                Ok(order) => self.place_type_order.update(order, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid NLGEO_PLACE_TYPE_ORDER value '{}': expected comma-separated place types",
                    order_str
                ),
            }
        }

        // NLGEO_SOURCE_ORDER
        if let Ok(order_str) = env::var("NLGEO_SOURCE_ORDER") {
            let order = parse_list(&order_str);
            if order.is_empty() {
                tracing::warn!("Ignoring empty NLGEO_SOURCE_ORDER");
            } else {
                self.source_order.update(order, ConfigSource::Environment);
            }
        }

        // DATABASE_URL is the conventional name; NLGEO_DATABASE_URL wins over it.
        if let Ok(url) = env::var("NLGEO_DATABASE_URL").or_else(|_| env::var("DATABASE_URL")) {
            self.database_url.update(Some(url), ConfigSource::Environment);
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        if let Some(v) = overrides.ambiguity_margin {
            self.ambiguity_margin.update(v, ConfigSource::Cli);
        }
        if let Some(v) = overrides.containment_bonus {
            self.containment_bonus.update(v, ConfigSource::Cli);
        }
        if let Some(v) = overrides.result_limit {
            self.result_limit.update(v, ConfigSource::Cli);
        }
        if let Some(v) = overrides.query_timeout_ms {
            self.query_timeout_ms.update(v, ConfigSource::Cli);
        }
        if let Some(v) = overrides.clip_directional_to_parent {
            self.clip_directional_to_parent.update(v, ConfigSource::Cli);
        }
        if let Some(url) = overrides.database_url {
            self.database_url.update(Some(url), ConfigSource::Cli);
        }
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        map.insert(
            "ambiguity_margin".to_string(),
            (self.ambiguity_margin.value.to_string(), self.ambiguity_margin.source),
        );
        map.insert(
            "containment_bonus".to_string(),
            (self.containment_bonus.value.to_string(), self.containment_bonus.source),
        );
        map.insert(
            "trigram_threshold".to_string(),
            (self.trigram_threshold.value.to_string(), self.trigram_threshold.source),
        );
        map.insert(
            "result_limit".to_string(),
            (self.result_limit.value.to_string(), self.result_limit.source),
        );
        map.insert(
            "fetch_limit".to_string(),
            (self.fetch_limit.value.to_string(), self.fetch_limit.source),
        );
        map.insert(
            "query_timeout".to_string(),
            (format!("{}ms", self.query_timeout_ms.value), self.query_timeout_ms.source),
        );
        map.insert(
            "coordinate_precision".to_string(),
            (self.coordinate_precision.value.to_string(), self.coordinate_precision.source),
        );
        map.insert(
            "max_buffer".to_string(),
            (format!("{}m", self.max_buffer_meters.value), self.max_buffer_meters.source),
        );
        map.insert(
            "border_width".to_string(),
            (format!("{}m", self.border_width_meters.value), self.border_width_meters.source),
        );
        map.insert(
            "clip_directional_to_parent".to_string(),
            (
                self.clip_directional_to_parent.value.to_string(),
                self.clip_directional_to_parent.source,
            ),
        );
        map.insert(
            "place_type_order".to_string(),
            (
                self.place_type_order
                    .value
                    .iter()
                    .map(|t| t.as_str())
                    .collect::<Vec<_>>()
                    .join(","),
                self.place_type_order.source,
            ),
        );
        map.insert(
            "source_order".to_string(),
            (self.source_order.value.join(","), self.source_order.source),
        );
        map.insert(
            "database_url".to_string(),
            (
                self.database_url
                    .value
                    .as_deref()
                    .map(redact_url)
                    .unwrap_or_else(|| "(not set)".to_string()),
                self.database_url.source,
            ),
        );

        map
    }

    /// Validate and freeze the configuration into the settings threaded
    /// through the search, resolver, algebra and evaluator constructors.
    pub fn into_settings(self) -> Result<GeocodeSettings> {
        let margin = self.ambiguity_margin.value;
        if !margin.is_finite() || margin < 0.0 {
            return Err(invalid("ambiguity_margin", format!("must be >= 0, got {}", margin)));
        }
        let bonus = self.containment_bonus.value;
        if !bonus.is_finite() || bonus < 0.0 {
            return Err(invalid("containment_bonus", format!("must be >= 0, got {}", bonus)));
        }
        let threshold = self.trigram_threshold.value;
        if !(0.0..1.0).contains(&threshold) {
            return Err(invalid(
                "trigram_threshold",
                format!("must be in [0, 1), got {}", threshold),
            ));
        }
        if self.result_limit.value == 0 {
            return Err(invalid("result_limit", "must be at least 1"));
        }
        if self.fetch_limit.value < self.result_limit.value {
            return Err(invalid(
                "fetch_limit",
                format!(
                    "must be at least result_limit ({}), got {}",
                    self.result_limit.value, self.fetch_limit.value
                ),
            ));
        }
        if self.query_timeout_ms.value == 0 {
            return Err(invalid("query_timeout_ms", "must be positive"));
        }
        if self.coordinate_precision.value > 15 {
            return Err(invalid(
                "coordinate_precision",
                format!("at most 15 decimals, got {}", self.coordinate_precision.value),
            ));
        }
        let max_buffer = self.max_buffer_meters.value;
        if !max_buffer.is_finite() || max_buffer <= 0.0 {
            return Err(invalid(
                "max_buffer_meters",
                format!("must be positive, got {}", max_buffer),
            ));
        }
        let border = self.border_width_meters.value;
        if !border.is_finite() || border <= 0.0 {
            return Err(invalid("border_width_meters", format!("must be positive, got {}", border)));
        }

        Ok(GeocodeSettings {
            search: SearchConfig {
                result_limit: self.result_limit.value,
                fetch_limit: self.fetch_limit.value,
                trigram_threshold: threshold,
                query_timeout: Duration::from_millis(self.query_timeout_ms.value),
                place_type_order: self.place_type_order.value,
                source_order: self.source_order.value,
            },
            resolver: ResolverConfig { ambiguity_margin: margin, containment_bonus: bonus },
            algebra: AlgebraConfig {
                units: UnitTable::standard(),
                coordinate_precision: self.coordinate_precision.value,
                border_width_meters: border,
                ..AlgebraConfig::default()
            },
            evaluator: EvaluatorConfig {
                limits: ValidationLimits {
                    max_buffer_meters: max_buffer,
                    ..ValidationLimits::default()
                },
                clip_directional_to_parent: self.clip_directional_to_parent.value,
            },
            database_url: self.database_url.value,
        })
    }
}

/// Gazetteer search settings
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub result_limit: usize,
    /// Upper bound on records the store returns for one query
    pub fetch_limit: usize,
    pub trigram_threshold: f64,
    pub query_timeout: Duration,
    pub place_type_order: Vec<PlaceType>,
    pub source_order: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            result_limit: 10,
            fetch_limit: 100,
            trigram_threshold: 0.3,
            query_timeout: Duration::from_millis(5000),
            place_type_order: default_place_type_order(),
            source_order: default_source_order(),
        }
    }
}

impl SearchConfig {
    /// Sort key of a place type: configured position, then alphabetical.
    pub fn place_type_rank(&self, place_type: PlaceType) -> usize {
        match self.place_type_order.iter().position(|t| *t == place_type) {
            Some(pos) => pos,
            None => {
                let fallback = PlaceType::ALL.iter().position(|t| *t == place_type);
                self.place_type_order.len() + fallback.unwrap_or(PlaceType::ALL.len())
            }
        }
    }

    /// Sort key of a source; unknown sources share the last slot and are
    /// further ordered by name by the caller.
    pub fn source_rank(&self, source: &str) -> usize {
        self.source_order.iter().position(|s| s == source).unwrap_or(self.source_order.len())
    }
}

/// Entity resolver settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolverConfig {
    /// A top candidate must lead the runner-up by more than this to win
    pub ambiguity_margin: f64,
    /// Added to the score of candidates matching the containment hint
    pub containment_bonus: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self { ambiguity_margin: 0.05, containment_bonus: 0.1 }
    }
}

/// Geometry algebra settings
#[derive(Debug, Clone, PartialEq)]
pub struct AlgebraConfig {
    pub units: UnitTable,
    /// Decimals kept in output coordinates
    pub coordinate_precision: u32,
    /// Half-width of the strip produced for a shared border
    pub border_width_meters: f64,
    /// Relative symmetric-difference area under which two geometries are
    /// considered equal
    pub equivalence_tolerance: f64,
}

impl Default for AlgebraConfig {
    fn default() -> Self {
        Self {
            units: UnitTable::standard(),
            coordinate_precision: 7,
            border_width_meters: 2000.0,
            equivalence_tolerance: 1e-6,
        }
    }
}

/// Spatial tree evaluator settings
#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    pub limits: ValidationLimits,
    /// Clip directional half-planes to the child's containing region when
    /// it is known; the world extent is used otherwise
    pub clip_directional_to_parent: bool,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self { limits: ValidationLimits::default(), clip_directional_to_parent: true }
    }
}

/// Frozen configuration for one geocoder instance
#[derive(Debug, Clone, Default)]
pub struct GeocodeSettings {
    pub search: SearchConfig,
    pub resolver: ResolverConfig,
    pub algebra: AlgebraConfig,
    pub evaluator: EvaluatorConfig,
    pub database_url: Option<String>,
}

/// Configuration loaded from TOML file
#[derive(Debug, Default, Deserialize, Serialize)]
struct FileConfig {
    resolver: Option<ResolverSection>,
    search: Option<SearchSection>,
    geometry: Option<GeometrySection>,
    database: Option<DatabaseSection>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct ResolverSection {
    ambiguity_margin: Option<f64>,
    containment_bonus: Option<f64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct SearchSection {
    trigram_threshold: Option<f64>,
    result_limit: Option<usize>,
    fetch_limit: Option<usize>,
    query_timeout_ms: Option<u64>,
    place_type_order: Option<Vec<PlaceType>>,
    source_order: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct GeometrySection {
    coordinate_precision: Option<u32>,
    max_buffer_meters: Option<f64>,
    border_width_meters: Option<f64>,
    clip_directional_to_parent: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct DatabaseSection {
    url: Option<String>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub ambiguity_margin: Option<f64>,
    pub containment_bonus: Option<f64>,
    pub result_limit: Option<usize>,
    pub query_timeout_ms: Option<u64>,
    pub clip_directional_to_parent: Option<bool>,
    pub database_url: Option<String>,
}

/// Parse a comma-separated list of place types
pub fn parse_place_type_order(s: &str) -> Result<Vec<PlaceType>> {
    let order = parse_list(s)
        .iter()
        .map(|t| t.parse::<PlaceType>())
        .collect::<Result<Vec<_>>>()
        .map_err(|e| invalid("place_type_order", e.to_string()))?;
    if order.is_empty() {
        return Err(invalid("place_type_order", "list is empty"));
    }
    Ok(order)
}

fn parse_list(s: &str) -> Vec<String> {
    s.split(',').map(|p| p.trim().to_string()).filter(|p| !p.is_empty()).collect()
}

fn env_parsed<T: std::str::FromStr>(key: &str, expected: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Invalid {} value '{}': expected {}", key, raw, expected);
            None
        }
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> NlgeoError {
    NlgeoError::ConfigInvalid { key: key.to_string(), reason: reason.into() }
}

/// Hide the password part of a connection URL
pub fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            let userinfo = &url[scheme_end + 3..at];
            match userinfo.find(':') {
                Some(colon) => format!(
                    "{}{}:****{}",
                    &url[..scheme_end + 3],
                    &userinfo[..colon],
                    &url[at..]
                ),
                None => url.to_string(),
            }
        }
        _ => url.to_string(),
    }
}
