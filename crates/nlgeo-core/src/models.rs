pub mod geometry;
pub mod place;
pub mod request;
pub mod resolution;

pub use geometry::{Distance, DistanceUnit, Extent, Geometry, GeometryType, UnitTable};
pub use place::{
    normalize_name, Ancestor, CandidateSummary, MatchKind, PlaceCandidate, PlaceId, PlaceRecord,
    PlaceType,
};
pub use request::{Direction, NodePath, RequestNode, Subportion, ValidationLimits};
pub use resolution::{
    Evaluation, OperatorKind, Provenance, ResolutionTrace, ResolvedGeometry, TraceEntry,
    TraceOutcome,
};
