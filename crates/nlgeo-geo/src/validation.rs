use crate::models::Geometry;
use nlgeo_core::error::{NlgeoError, Result};

/// Validation result with details
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

/// Validation error with location details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub location: String,
    pub reason: String,
}

impl ValidationResult {
    /// Create a valid result
    pub fn valid() -> Self {
        Self { is_valid: true, errors: Vec::new() }
    }

    /// Add an error to the result
    pub fn add_error(&mut self, location: String, reason: String) {
        self.is_valid = false;
        self.errors.push(ValidationError { location, reason });
    }

    fn absorb(&mut self, prefix: &str, other: ValidationResult) {
        for error in other.errors {
            self.add_error(format!("{}.{}", prefix, error.location), error.reason);
        }
    }
}

/// Validate the structure of a geometry: finite lon/lat coordinates in
/// range, lines with two or more points, closed rings of four or more.
pub fn validate_geometry(geometry: &Geometry) -> ValidationResult {
    match geometry {
        Geometry::Point { coordinates } => {
            validate_coords("Point", std::slice::from_ref(coordinates))
        }
        Geometry::LineString { coordinates } => validate_linestring("LineString", coordinates),
        Geometry::Polygon { coordinates } => validate_polygon("Polygon", coordinates),
        Geometry::MultiPoint { coordinates } => validate_coords("MultiPoint", coordinates),
        Geometry::MultiLineString { coordinates } => {
            let mut result = ValidationResult::valid();
            for (i, line) in coordinates.iter().enumerate() {
                let location = format!("MultiLineString[{}]", i);
                result.absorb(&location, validate_linestring("LineString", line));
            }
            result
        }
        Geometry::MultiPolygon { coordinates } => {
            let mut result = ValidationResult::valid();
            for (i, polygon) in coordinates.iter().enumerate() {
                let location = format!("MultiPolygon[{}]", i);
                result.absorb(&location, validate_polygon("Polygon", polygon));
            }
            result
        }
        Geometry::GeometryCollection { geometries } => {
            let mut result = ValidationResult::valid();
            for (i, member) in geometries.iter().enumerate() {
                result.absorb(&format!("GeometryCollection[{}]", i), validate_geometry(member));
            }
            result
        }
    }
}

fn validate_coords(location: &str, coords: &[[f64; 2]]) -> ValidationResult {
    let mut result = ValidationResult::valid();
    for (i, [x, y]) in coords.iter().enumerate() {
        if !x.is_finite() || !y.is_finite() {
            let at = format!("{}[{}]", location, i);
            result.add_error(at, "Coordinates must be finite".to_string());
        } else if x.abs() > 180.0 || y.abs() > 90.0 {
            result.add_error(
                format!("{}[{}]", location, i),
                format!("Coordinate ({}, {}) is outside lon/lat range", x, y),
            );
        }
    }
    result
}

fn validate_linestring(location: &str, coords: &[[f64; 2]]) -> ValidationResult {
    if coords.len() < 2 {
        let mut result = ValidationResult::valid();
        result.add_error(
            location.to_string(),
            format!("LineString must have at least 2 points, found {}", coords.len()),
        );
        return result;
    }
    validate_coords(location, coords)
}

fn validate_polygon(location: &str, rings: &[Vec<[f64; 2]>]) -> ValidationResult {
    let mut result = ValidationResult::valid();

    if rings.is_empty() {
        result.add_error(location.to_string(), "Polygon has no exterior ring".to_string());
        return result;
    }

    for (i, ring) in rings.iter().enumerate() {
        let ring_name = if i == 0 {
            format!("{} exterior", location)
        } else {
            format!("{} interior[{}]", location, i - 1)
        };

        if ring.len() < 4 {
            result.add_error(
                ring_name.clone(),
                format!("Ring must have at least 4 points, found {}", ring.len()),
            );
        }

        if let (Some(first), Some(last)) = (ring.first(), ring.last()) {
            if first != last {
                result.add_error(
                    ring_name.clone(),
                    "Ring must be closed (first point == last point)".to_string(),
                );
            }
        }

        result.absorb(&ring_name, validate_coords("coords", ring));
    }

    result
}

/// Reject a structurally invalid geometry, naming the first problem.
pub fn ensure_valid(geometry: &Geometry, context: &str) -> Result<()> {
    let validation = validate_geometry(geometry);
    if validation.is_valid {
        return Ok(());
    }
    let first = validation
        .errors
        .first()
        .map(|e| format!("{}: {}", e.location, e.reason))
        .unwrap_or_else(|| "Invalid geometry".to_string());
    Err(NlgeoError::SchemaViolation {
        reason: format!(
            "{} has an invalid geometry ({} problems), first: {}",
            context,
            validation.errors.len(),
            first
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_rect() {
        assert!(validate_geometry(&Geometry::rect(-77.0, 38.0, -76.0, 39.0)).is_valid);
    }

    #[test]
    fn test_unclosed_ring() {
        let geom = Geometry::polygon(vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]]);
        let result = validate_geometry(&geom);
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.reason.contains("closed")));
    }

    #[test]
    fn test_non_finite_point() {
        let result = validate_geometry(&Geometry::point(f64::NAN, 0.0));
        assert!(!result.is_valid);
    }

    #[test]
    fn test_out_of_range_multipolygon_member() {
        let geom = Geometry::MultiPolygon {
            coordinates: vec![
                vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]],
                vec![vec![[0.0, 0.0], [200.0, 0.0], [1.0, 1.0], [0.0, 0.0]]],
            ],
        };
        let result = validate_geometry(&geom);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].location.starts_with("MultiPolygon[1]"));
    }

    #[test]
    fn test_ensure_valid_maps_to_schema_violation() {
        let err = ensure_valid(&Geometry::line_string(vec![[0.0, 0.0]]), "place wof:1").unwrap_err();
        assert!(matches!(err, NlgeoError::SchemaViolation { .. }));
        assert!(ensure_valid(&Geometry::empty(), "empty").is_ok());
    }
}
