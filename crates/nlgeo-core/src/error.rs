//! Error types for nlgeo

use crate::models::PlaceCandidate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NlgeoError {
    // Resolution errors
    #[error("No place found matching [{text}]")]
    NotFound { text: String },

    #[error("Place name [{text}] is ambiguous between {} candidates", candidates.len())]
    Ambiguous {
        text: String,
        candidates: Vec<PlaceCandidate>,
    },

    // Geometry errors
    #[error("Degenerate geometry in {operation}: {reason}")]
    DegenerateGeometry { operation: String, reason: String },

    // Input errors
    #[error("Invalid parameter {parameter}: {reason}")]
    InvalidParameter { parameter: String, reason: String },

    #[error("Schema violation: {reason}")]
    SchemaViolation { reason: String },

    // Gazetteer backend errors
    #[error("Gazetteer backend unavailable: {reason}")]
    BackendUnavailable { reason: String },

    // Configuration errors
    #[error("Missing required configuration: {key}")]
    ConfigMissing { key: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl NlgeoError {
    /// Whether a caller may retry the same request (with backoff).
    ///
    /// Only backend failures are transient; every other kind is terminal for
    /// the request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, NlgeoError::BackendUnavailable { .. })
    }

    /// The named-entity text that caused the failure, when there is one.
    pub fn entity_text(&self) -> Option<&str> {
        match self {
            NlgeoError::NotFound { text } | NlgeoError::Ambiguous { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Short machine-readable kind, used in traces and JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            NlgeoError::NotFound { .. } => "not_found",
            NlgeoError::Ambiguous { .. } => "ambiguous",
            NlgeoError::DegenerateGeometry { .. } => "degenerate_geometry",
            NlgeoError::InvalidParameter { .. } => "invalid_parameter",
            NlgeoError::SchemaViolation { .. } => "schema_violation",
            NlgeoError::BackendUnavailable { .. } => "backend_unavailable",
            NlgeoError::ConfigMissing { .. } | NlgeoError::ConfigInvalid { .. } => "config",
            NlgeoError::Io(_) => "io",
            NlgeoError::Serialization(_) => "serialization",
        }
    }

    pub fn degenerate(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        NlgeoError::DegenerateGeometry { operation: operation.into(), reason: reason.into() }
    }

    pub fn invalid_parameter(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        NlgeoError::InvalidParameter { parameter: parameter.into(), reason: reason.into() }
    }

    pub fn backend(reason: impl Into<String>) -> Self {
        NlgeoError::BackendUnavailable { reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, NlgeoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_backend_errors_are_retryable() {
        assert!(NlgeoError::backend("timed out").is_retryable());
        assert!(!NlgeoError::NotFound { text: "Atlantis".into() }.is_retryable());
        assert!(!NlgeoError::degenerate("between", "overlap").is_retryable());
        assert!(!NlgeoError::SchemaViolation { reason: "x".into() }.is_retryable());
    }

    #[test]
    fn test_entity_text_attached() {
        let err = NlgeoError::Ambiguous { text: "Springfield".into(), candidates: vec![] };
        assert_eq!(err.entity_text(), Some("Springfield"));
        assert_eq!(err.kind(), "ambiguous");
        assert_eq!(NlgeoError::backend("down").entity_text(), None);
    }
}
