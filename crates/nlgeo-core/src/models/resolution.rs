//! Evaluation results and the per-entity resolution trace

use super::geometry::{Distance, Geometry};
use super::place::{CandidateSummary, PlaceCandidate};
use super::request::{Direction, NodePath, Subportion};
use serde::{Deserialize, Serialize};

/// Which operator produced a geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operator", rename_all = "snake_case")]
pub enum OperatorKind {
    Buffer { distance: Distance },
    Intersection,
    Union,
    Difference,
    Between,
    Directional { direction: Direction },
    Subportion { subportion: Subportion },
    BorderOf,
    BorderBetween,
}

/// Where a resolved geometry came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Provenance {
    /// A gazetteer place
    Place { place: CandidateSummary },
    /// An operator applied to its children's results
    Operator {
        #[serde(flatten)]
        operator: OperatorKind,
        inputs: Vec<Provenance>,
    },
}

/// A geometry with its provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedGeometry {
    pub geometry: Geometry,
    pub provenance: Provenance,
}

impl ResolvedGeometry {
    pub fn from_place(candidate: &PlaceCandidate) -> Self {
        Self {
            geometry: candidate.geometry.clone(),
            provenance: Provenance::Place { place: candidate.summary() },
        }
    }

    pub fn from_operator(
        geometry: Geometry,
        operator: OperatorKind,
        inputs: Vec<Provenance>,
    ) -> Self {
        Self { geometry, provenance: Provenance::Operator { operator, inputs } }
    }
}

/// Outcome of resolving one named entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TraceOutcome {
    Resolved {
        chosen: CandidateSummary,
        /// The other ranked candidates, best first
        alternatives: Vec<CandidateSummary>,
    },
    Failed {
        kind: String,
        message: String,
        /// Tied candidates for an ambiguous name
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        candidates: Vec<CandidateSummary>,
    },
}

/// One named entity visited during evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub path: NodePath,
    pub text: String,
    /// Containment hints passed to the resolver, primary first
    pub hints: Vec<String>,
    pub outcome: TraceOutcome,
}

/// Every resolution decision made while evaluating a request tree, in
/// evaluation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionTrace {
    pub entries: Vec<TraceEntry>,
}

impl ResolutionTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: TraceEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The first failed entry, if evaluation stopped on a resolution error
    pub fn failure(&self) -> Option<&TraceEntry> {
        self.entries.iter().find(|e| matches!(e.outcome, TraceOutcome::Failed { .. }))
    }
}

/// Result of a successful evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub result: ResolvedGeometry,
    pub trace: ResolutionTrace,
}
