use nlgeo_core::models::{
    CandidateSummary, PlaceCandidate, Provenance, ResolutionTrace, TraceEntry, TraceOutcome,
};
use nlgeo_gazetteer::postgres::MigrationStatus;
use serde::Serialize;
use tabled::Tabled;

/// Output for the geocode command
#[derive(Debug, Serialize)]
pub struct GeocodeOutput {
    /// GeoJSON geometry of the result
    pub geometry: geojson::Geometry,
    pub area_square_meters: f64,
    pub provenance: Provenance,
    pub trace: ResolutionTrace,
}

/// Output for a failed geocode command
#[derive(Debug, Serialize)]
pub struct GeocodeFailure {
    pub kind: String,
    pub message: String,
    pub retryable: bool,
    pub trace: ResolutionTrace,
}

/// One trace entry as a table row
#[derive(Debug, Tabled)]
pub struct TraceRow {
    #[tabled(rename = "Path")]
    pub path: String,
    #[tabled(rename = "Entity")]
    pub text: String,
    #[tabled(rename = "Hints")]
    pub hints: String,
    #[tabled(rename = "Outcome")]
    pub outcome: String,
}

impl From<&TraceEntry> for TraceRow {
    fn from(entry: &TraceEntry) -> Self {
        let outcome = match &entry.outcome {
            TraceOutcome::Resolved { chosen, alternatives } => {
                format!("{} (+{} alternatives)", describe(chosen), alternatives.len())
            }
            TraceOutcome::Failed { kind, candidates, .. } if !candidates.is_empty() => {
                let tied: Vec<String> = candidates.iter().map(describe).collect();
                format!("{}: {}", kind, tied.join("; "))
            }
            TraceOutcome::Failed { kind, .. } => kind.clone(),
        };
        Self {
            path: entry.path.to_string(),
            text: entry.text.clone(),
            hints: entry.hints.join(", "),
            outcome,
        }
    }
}

fn describe(summary: &CandidateSummary) -> String {
    format!("{} {} [{}]", summary.id, summary.name, summary.place_type)
}

/// Output for the search command
#[derive(Debug, Serialize)]
pub struct SearchOutput {
    pub query: String,
    pub place_type: Option<String>,
    pub within: Option<String>,
    pub candidates: Vec<CandidateSummary>,
}

/// One ranked candidate as a table row
#[derive(Debug, Tabled)]
pub struct CandidateRow {
    #[tabled(rename = "#")]
    pub rank: usize,
    #[tabled(rename = "Id")]
    pub id: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Type")]
    pub place_type: String,
    #[tabled(rename = "Match")]
    pub match_kind: String,
    #[tabled(rename = "Score")]
    pub score: String,
    #[tabled(rename = "In")]
    pub ancestors: String,
}

impl CandidateRow {
    pub fn new(rank: usize, candidate: &PlaceCandidate) -> Self {
        let marker = if candidate.containment_match { " *" } else { "" };
        Self {
            rank,
            id: candidate.id.to_string(),
            name: candidate.name.clone(),
            place_type: candidate.place_type.to_string(),
            match_kind: candidate.match_kind.to_string(),
            score: format!("{:.3}{}", candidate.score, marker),
            ancestors: candidate
                .ancestors
                .iter()
                .rev()
                .map(|a| a.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

/// Output for the places load command
#[derive(Debug, Serialize)]
pub struct LoadOutput {
    pub path: String,
    pub parsed: usize,
    pub written: usize,
    pub dry_run: bool,
}

/// One migration as a table row
#[derive(Debug, Serialize, Tabled)]
pub struct MigrationRow {
    #[tabled(rename = "Version")]
    pub version: i64,
    #[tabled(rename = "Description")]
    pub description: String,
    #[tabled(rename = "Applied")]
    pub applied: bool,
}

impl From<MigrationStatus> for MigrationRow {
    fn from(status: MigrationStatus) -> Self {
        Self { version: status.version, description: status.description, applied: status.applied }
    }
}

/// One configuration value as a table row
#[derive(Debug, Serialize, Tabled)]
pub struct ConfigRow {
    #[tabled(rename = "Key")]
    pub key: String,
    #[tabled(rename = "Value")]
    pub value: String,
    #[tabled(rename = "Source")]
    pub source: String,
}
