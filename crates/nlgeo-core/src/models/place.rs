//! Gazetteer place models

use super::geometry::Geometry;
use crate::error::{NlgeoError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// The closed set of place types a gazetteer entry may have.
///
/// Based on the Who's On First placetypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceType {
    Borough,
    Continent,
    Country,
    County,
    Dependency,
    Disputed,
    Empire,
    Localadmin,
    Locality,
    Macrocounty,
    Macrohood,
    Macroregion,
    Marinearea,
    Marketarea,
    Microhood,
    Neighbourhood,
    Ocean,
    Postalregion,
    Region,
}

impl PlaceType {
    /// Every place type, in alphabetical order of the type name
    pub const ALL: [PlaceType; 19] = [
        PlaceType::Borough,
        PlaceType::Continent,
        PlaceType::Country,
        PlaceType::County,
        PlaceType::Dependency,
        PlaceType::Disputed,
        PlaceType::Empire,
        PlaceType::Localadmin,
        PlaceType::Locality,
        PlaceType::Macrocounty,
        PlaceType::Macrohood,
        PlaceType::Macroregion,
        PlaceType::Marinearea,
        PlaceType::Marketarea,
        PlaceType::Microhood,
        PlaceType::Neighbourhood,
        PlaceType::Ocean,
        PlaceType::Postalregion,
        PlaceType::Region,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlaceType::Borough => "borough",
            PlaceType::Continent => "continent",
            PlaceType::Country => "country",
            PlaceType::County => "county",
            PlaceType::Dependency => "dependency",
            PlaceType::Disputed => "disputed",
            PlaceType::Empire => "empire",
            PlaceType::Localadmin => "localadmin",
            PlaceType::Locality => "locality",
            PlaceType::Macrocounty => "macrocounty",
            PlaceType::Macrohood => "macrohood",
            PlaceType::Macroregion => "macroregion",
            PlaceType::Marinearea => "marinearea",
            PlaceType::Marketarea => "marketarea",
            PlaceType::Microhood => "microhood",
            PlaceType::Neighbourhood => "neighbourhood",
            PlaceType::Ocean => "ocean",
            PlaceType::Postalregion => "postalregion",
            PlaceType::Region => "region",
        }
    }

    /// Types that usually contain other named places; mentions of these make
    /// good containment hints for their neighbours in a request tree.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            PlaceType::Continent
                | PlaceType::Country
                | PlaceType::Empire
                | PlaceType::Region
                | PlaceType::Macroregion
                | PlaceType::Dependency
                | PlaceType::County
                | PlaceType::Macrocounty
        )
    }
}

impl fmt::Display for PlaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlaceType {
    type Err = NlgeoError;

    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim().to_lowercase();
        PlaceType::ALL.iter().copied().find(|t| t.as_str() == lowered).ok_or_else(|| {
            NlgeoError::invalid_parameter("place_type", format!("Unknown place type: {}", s))
        })
    }
}

/// Unique key of a gazetteer entry: the source dataset and the id the source
/// assigned to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlaceId {
    pub source: String,
    pub source_id: String,
}

impl PlaceId {
    pub fn new(source: impl Into<String>, source_id: impl Into<String>) -> Self {
        Self { source: source.into(), source_id: source_id.into() }
    }
}

impl fmt::Display for PlaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.source_id)
    }
}

/// A place that contains another place
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ancestor {
    pub id: PlaceId,
    pub name: String,
    pub place_type: PlaceType,
}

/// A gazetteer entry as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceRecord {
    pub id: PlaceId,
    pub name: String,
    pub place_type: PlaceType,
    #[serde(default)]
    pub alternate_names: Vec<String>,
    /// Containing places, outermost first
    #[serde(default)]
    pub ancestors: Vec<Ancestor>,
    #[serde(default)]
    pub population: Option<u64>,
    #[serde(default)]
    pub properties: HashMap<String, serde_json::Value>,
    pub geometry: Geometry,
}

impl PlaceRecord {
    pub fn new(
        id: PlaceId,
        name: impl Into<String>,
        place_type: PlaceType,
        geometry: Geometry,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            place_type,
            alternate_names: Vec::new(),
            ancestors: Vec::new(),
            population: None,
            properties: HashMap::new(),
            geometry,
        }
    }

    pub fn with_alternate_names(
        mut self,
        names: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.alternate_names.extend(names.into_iter().map(Into::into));
        self
    }

    /// Append a containing place; call outermost first.
    pub fn with_ancestor(mut self, ancestor: &PlaceRecord) -> Self {
        self.ancestors.push(Ancestor {
            id: ancestor.id.clone(),
            name: ancestor.name.clone(),
            place_type: ancestor.place_type,
        });
        self
    }

    pub fn with_population(mut self, population: u64) -> Self {
        self.population = Some(population);
        self
    }
}

/// How a candidate matched the query text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Exact,
    Trigram,
    Fulltext,
}

impl MatchKind {
    /// Priority tier; lower wins
    pub fn tier(&self) -> u8 {
        match self {
            MatchKind::Exact => 1,
            MatchKind::Trigram => 2,
            MatchKind::Fulltext => 3,
        }
    }
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatchKind::Exact => "exact",
            MatchKind::Trigram => "trigram",
            MatchKind::Fulltext => "fulltext",
        };
        f.write_str(s)
    }
}

/// A ranked gazetteer search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceCandidate {
    pub id: PlaceId,
    pub name: String,
    pub place_type: PlaceType,
    pub geometry: Geometry,
    /// Containing places, outermost first
    pub ancestors: Vec<Ancestor>,
    pub population: Option<u64>,
    pub score: f64,
    pub match_kind: MatchKind,
    /// The ancestor chain contains a place matching the containment hint
    pub containment_match: bool,
    /// The place type equals the requested type hint
    pub type_match: bool,
}

impl PlaceCandidate {
    pub fn source(&self) -> &str {
        &self.id.source
    }

    /// Does any ancestor carry this name (case and whitespace insensitive)?
    pub fn has_ancestor_named(&self, name: &str) -> bool {
        let wanted = normalize_name(name);
        !wanted.is_empty() && self.ancestors.iter().any(|a| normalize_name(&a.name) == wanted)
    }

    /// Nearest containing place
    pub fn parent(&self) -> Option<&Ancestor> {
        self.ancestors.last()
    }

    pub fn summary(&self) -> CandidateSummary {
        CandidateSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            place_type: self.place_type,
            match_kind: self.match_kind,
            score: self.score,
            ancestors: self.ancestors.iter().map(|a| a.name.clone()).collect(),
        }
    }
}

/// Geometry-free view of a candidate, used in traces and provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub id: PlaceId,
    pub name: String,
    pub place_type: PlaceType,
    pub match_kind: MatchKind,
    pub score: f64,
    pub ancestors: Vec<String>,
}

/// Lowercase and collapse internal whitespace.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}
