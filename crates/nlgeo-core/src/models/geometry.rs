//! Canonical geometry types used across all nlgeo crates.
//!
//! These types provide a bridge between GeoJSON serialization and the
//! computational geo crate types.

use crate::error::{NlgeoError, Result};
use serde::{Deserialize, Serialize};

/// Linear units accepted by buffer operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DistanceUnit {
    #[default]
    #[serde(alias = "meter", alias = "m")]
    Meters,
    #[serde(alias = "kilometer", alias = "km")]
    Kilometers,
    #[serde(alias = "mile", alias = "mi")]
    Miles,
    #[serde(alias = "foot", alias = "ft")]
    Feet,
    #[serde(alias = "nautical_mile", alias = "nmi")]
    NauticalMiles,
}

impl DistanceUnit {
    pub const ALL: [DistanceUnit; 5] = [
        DistanceUnit::Meters,
        DistanceUnit::Kilometers,
        DistanceUnit::Miles,
        DistanceUnit::Feet,
        DistanceUnit::NauticalMiles,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceUnit::Meters => "meters",
            DistanceUnit::Kilometers => "kilometers",
            DistanceUnit::Miles => "miles",
            DistanceUnit::Feet => "feet",
            DistanceUnit::NauticalMiles => "nautical_miles",
        }
    }
}

/// Explicit conversion table from each accepted unit to meters, the single
/// internal linear unit.
///
/// The table is configuration: a unit missing from it is rejected rather than
/// guessed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitTable {
    entries: Vec<(DistanceUnit, f64)>,
}

impl Default for UnitTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl UnitTable {
    /// The international definitions of each unit.
    pub fn standard() -> Self {
        Self {
            entries: vec![
                (DistanceUnit::Meters, 1.0),
                (DistanceUnit::Kilometers, 1000.0),
                (DistanceUnit::Miles, 1609.344),
                (DistanceUnit::Feet, 0.3048),
                (DistanceUnit::NauticalMiles, 1852.0),
            ],
        }
    }

    /// Build a table from explicit `(unit, meters per unit)` entries.
    pub fn from_entries(entries: Vec<(DistanceUnit, f64)>) -> Result<Self> {
        for (unit, factor) in &entries {
            if !factor.is_finite() || *factor <= 0.0 {
                return Err(NlgeoError::ConfigInvalid {
                    key: format!("units.{}", unit.as_str()),
                    reason: format!("meters per unit must be positive and finite, got {}", factor),
                });
            }
        }
        Ok(Self { entries })
    }

    pub fn meters_per(&self, unit: DistanceUnit) -> Option<f64> {
        self.entries.iter().find(|(u, _)| *u == unit).map(|(_, f)| *f)
    }

    /// Convert a distance value to meters
    pub fn to_meters(&self, value: f64, unit: DistanceUnit) -> Result<f64> {
        let factor = self.meters_per(unit).ok_or_else(|| {
            NlgeoError::invalid_parameter(
                "distance_unit",
                format!("unit {} is not in the configured unit table", unit.as_str()),
            )
        })?;
        Ok(value * factor)
    }
}

/// Distance with unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Distance {
    pub value: f64,
    pub unit: DistanceUnit,
}

impl Distance {
    /// Create a new distance
    pub fn new(value: f64, unit: DistanceUnit) -> Self {
        Self { value, unit }
    }

    pub fn meters(value: f64) -> Self {
        Self::new(value, DistanceUnit::Meters)
    }

    pub fn kilometers(value: f64) -> Self {
        Self::new(value, DistanceUnit::Kilometers)
    }

    pub fn miles(value: f64) -> Self {
        Self::new(value, DistanceUnit::Miles)
    }
}

/// Axis-aligned lon/lat extent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Extent {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self { west, south, east, north }
    }

    /// The whole lon/lat plane; used as the unbounded sentinel extent.
    pub fn world() -> Self {
        Self::new(-180.0, -90.0, 180.0, 90.0)
    }

    pub fn is_valid(&self) -> bool {
        [self.west, self.south, self.east, self.north].iter().all(|v| v.is_finite())
            && self.west < self.east
            && self.south < self.north
    }
}

/// Geometry type classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryType {
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
}

/// GeoJSON-compatible geometry representation
///
/// This enum directly maps to GeoJSON geometry types with coordinate arrays.
/// It can be serialized/deserialized as GeoJSON and converted to/from `geo` crate types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point {
        coordinates: [f64; 2],
    },
    LineString {
        coordinates: Vec<[f64; 2]>,
    },
    Polygon {
        coordinates: Vec<Vec<[f64; 2]>>,
    },
    MultiPoint {
        coordinates: Vec<[f64; 2]>,
    },
    MultiLineString {
        coordinates: Vec<Vec<[f64; 2]>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<[f64; 2]>>>,
    },
    GeometryCollection {
        geometries: Vec<Geometry>,
    },
}

impl Geometry {
    /// Create a Point geometry
    pub fn point(x: f64, y: f64) -> Self {
        Geometry::Point { coordinates: [x, y] }
    }

    /// Create a LineString geometry
    pub fn line_string(coords: Vec<[f64; 2]>) -> Self {
        Geometry::LineString { coordinates: coords }
    }

    /// Create a Polygon geometry
    pub fn polygon(rings: Vec<Vec<[f64; 2]>>) -> Self {
        Geometry::Polygon { coordinates: rings }
    }

    /// Axis-aligned rectangle as a closed polygon
    pub fn rect(west: f64, south: f64, east: f64, north: f64) -> Self {
        Geometry::polygon(vec![vec![
            [west, south],
            [east, south],
            [east, north],
            [west, north],
            [west, south],
        ]])
    }

    /// The empty geometry: a collection with no members.
    pub fn empty() -> Self {
        Geometry::GeometryCollection { geometries: Vec::new() }
    }

    /// True when the geometry has no coordinates at all
    pub fn is_empty(&self) -> bool {
        match self {
            Geometry::Point { .. } => false,
            Geometry::LineString { coordinates } | Geometry::MultiPoint { coordinates } => {
                coordinates.is_empty()
            }
            Geometry::Polygon { coordinates } | Geometry::MultiLineString { coordinates } => {
                coordinates.iter().all(|ring| ring.is_empty())
            }
            Geometry::MultiPolygon { coordinates } => {
                coordinates.iter().all(|poly| poly.iter().all(|ring| ring.is_empty()))
            }
            Geometry::GeometryCollection { geometries } => {
                geometries.iter().all(Geometry::is_empty)
            }
        }
    }

    /// Get the geometry type
    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Geometry::Point { .. } => GeometryType::Point,
            Geometry::LineString { .. } => GeometryType::LineString,
            Geometry::Polygon { .. } => GeometryType::Polygon,
            Geometry::MultiPoint { .. } => GeometryType::MultiPoint,
            Geometry::MultiLineString { .. } => GeometryType::MultiLineString,
            Geometry::MultiPolygon { .. } => GeometryType::MultiPolygon,
            Geometry::GeometryCollection { .. } => GeometryType::GeometryCollection,
        }
    }

    /// Try to parse from a serde_json::Value (GeoJSON)
    pub fn from_geojson(value: &serde_json::Value) -> Result<Self> {
        serde_json::from_value(value.clone())
            .map_err(|e| NlgeoError::Serialization(format!("Invalid GeoJSON geometry: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_serialization() {
        let point = Geometry::point(-76.49, 38.97);
        let json = serde_json::to_string(&point).unwrap();
        assert!(json.contains("Point"));

        let parsed: Geometry = serde_json::from_str(&json).unwrap();
        assert_eq!(point, parsed);
    }

    #[test]
    fn test_empty_collection() {
        let empty = Geometry::empty();
        assert!(empty.is_empty());
        assert_eq!(empty.geometry_type(), GeometryType::GeometryCollection);
        assert!(!Geometry::rect(0.0, 0.0, 1.0, 1.0).is_empty());
    }

    #[test]
    fn test_unit_table_conversion() {
        let table = UnitTable::standard();
        assert!((table.to_meters(3.0, DistanceUnit::Miles).unwrap() - 4828.032).abs() < 1e-9);
        assert_eq!(table.to_meters(-2.0, DistanceUnit::Kilometers).unwrap(), -2000.0);
    }

    #[test]
    fn test_unit_table_rejects_missing_unit() {
        let table = UnitTable::from_entries(vec![(DistanceUnit::Meters, 1.0)]).unwrap();
        let err = table.to_meters(1.0, DistanceUnit::Miles).unwrap_err();
        assert!(matches!(err, NlgeoError::InvalidParameter { .. }));
    }

    #[test]
    fn test_unit_table_rejects_bad_factor() {
        assert!(UnitTable::from_entries(vec![(DistanceUnit::Feet, 0.0)]).is_err());
        assert!(UnitTable::from_entries(vec![(DistanceUnit::Feet, f64::NAN)]).is_err());
    }

    #[test]
    fn test_distance_unit_aliases() {
        let unit: DistanceUnit = serde_json::from_str("\"km\"").unwrap();
        assert_eq!(unit, DistanceUnit::Kilometers);
        let unit: DistanceUnit = serde_json::from_str("\"miles\"").unwrap();
        assert_eq!(unit, DistanceUnit::Miles);
        assert!(serde_json::from_str::<DistanceUnit>("\"furlongs\"").is_err());
    }
}
