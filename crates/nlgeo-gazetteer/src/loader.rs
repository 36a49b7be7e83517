//! GeoJSON place file reader
//!
//! A place file is a FeatureCollection. Each feature carries the place
//! geometry and these properties:
//!
//! | property          | meaning                                            |
//! |-------------------|----------------------------------------------------|
//! | `name`            | display name (required)                            |
//! | `placetype`       | one of the place types (required)                  |
//! | `source`          | source dataset, defaults to the loader's default   |
//! | `source_id`       | id within the source, falls back to the feature id |
//! | `alternate_names` | array of strings                                   |
//! | `ancestors`       | array of `{source, source_id, name, placetype}`    |
//! | `population`      | non-negative integer                               |
//!
//! Every other property is kept in [`PlaceRecord::properties`].

use nlgeo_core::error::{NlgeoError, Result};
use nlgeo_core::models::{Ancestor, Geometry, PlaceId, PlaceRecord, PlaceType};
use nlgeo_geo::validation::ensure_valid;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

const KNOWN_PROPERTIES: [&str; 7] =
    ["name", "placetype", "source", "source_id", "alternate_names", "ancestors", "population"];

/// Reads place files into [`PlaceRecord`]s
#[derive(Debug, Clone)]
pub struct PlaceLoader {
    default_source: String,
}

impl Default for PlaceLoader {
    fn default() -> Self {
        Self { default_source: "comp".to_string() }
    }
}

impl PlaceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Source recorded for features without a `source` property
    pub fn with_default_source(mut self, source: impl Into<String>) -> Self {
        self.default_source = source.into();
        self
    }

    /// Read and parse a place file
    pub fn read_file(&self, path: &Path) -> Result<Vec<PlaceRecord>> {
        let content = fs::read_to_string(path)?;
        let records = self.parse(&content)?;
        debug!(path = %path.display(), places = records.len(), "Read place file");
        Ok(records)
    }

    /// Parse a FeatureCollection document
    pub fn parse(&self, content: &str) -> Result<Vec<PlaceRecord>> {
        let geojson: geojson::GeoJson = content.parse().map_err(|e| NlgeoError::SchemaViolation {
            reason: format!("Failed to parse GeoJSON: {}", e),
        })?;

        match geojson {
            geojson::GeoJson::FeatureCollection(fc) => fc
                .features
                .iter()
                .enumerate()
                .map(|(idx, feature)| self.convert_feature(feature, idx))
                .collect(),
            geojson::GeoJson::Feature(feature) => Ok(vec![self.convert_feature(&feature, 0)?]),
            geojson::GeoJson::Geometry(_) => Err(NlgeoError::SchemaViolation {
                reason: "Place file must be a FeatureCollection, found a bare geometry".to_string(),
            }),
        }
    }

    fn convert_feature(&self, feature: &geojson::Feature, idx: usize) -> Result<PlaceRecord> {
        let empty = Map::new();
        let props = feature.properties.as_ref().unwrap_or(&empty);
        let context = format!("feature {}", idx);

        let name = required_str(props, "name", &context)?;
        let place_type: PlaceType = required_str(props, "placetype", &context)?
            .parse()
            .map_err(|e: NlgeoError| schema(&context, &e.to_string()))?;

        let source = optional_str(props, "source")?.unwrap_or_else(|| self.default_source.clone());
        let source_id = match props.get("source_id") {
            Some(value) => id_string(value)
                .ok_or_else(|| schema(&context, "source_id must be a string or number"))?,
            None => match &feature.id {
                Some(geojson::feature::Id::String(s)) => s.clone(),
                Some(geojson::feature::Id::Number(n)) => n.to_string(),
                None => return Err(schema(&context, "missing source_id and feature id")),
            },
        };
        let id = PlaceId::new(source, source_id);
        let context = format!("place {}", id);

        let geometry = match &feature.geometry {
            Some(geometry) => {
                let value = serde_json::to_value(geometry).map_err(|e| {
                    NlgeoError::Serialization(format!("Failed to serialize geometry: {}", e))
                })?;
                Geometry::from_geojson(&value)?
            }
            None => return Err(schema(&context, "missing geometry")),
        };
        ensure_valid(&geometry, &context)?;

        let mut record = PlaceRecord::new(id, name, place_type, geometry);

        if let Some(value) = props.get("alternate_names") {
            record.alternate_names = value
                .as_array()
                .and_then(|names| {
                    names.iter().map(|n| n.as_str().map(str::to_string)).collect::<Option<Vec<_>>>()
                })
                .ok_or_else(|| schema(&context, "alternate_names must be an array of strings"))?;
        }

        if let Some(value) = props.get("ancestors") {
            let ancestors =
                value.as_array().ok_or_else(|| schema(&context, "ancestors must be an array"))?;
            record.ancestors = ancestors
                .iter()
                .map(|a| self.convert_ancestor(a, &context))
                .collect::<Result<Vec<_>>>()?;
        }

        if let Some(value) = props.get("population") {
            if !value.is_null() {
                let population = value
                    .as_u64()
                    .ok_or_else(|| schema(&context, "population must be a non-negative integer"))?;
                record.population = Some(population);
            }
        }

        record.properties = props
            .iter()
            .filter(|(k, _)| !KNOWN_PROPERTIES.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect::<HashMap<_, _>>();

        Ok(record)
    }

    fn convert_ancestor(&self, value: &Value, context: &str) -> Result<Ancestor> {
        let obj = value.as_object().ok_or_else(|| schema(context, "ancestor must be an object"))?;
        let name = required_str(obj, "name", context)?;
        let place_type: PlaceType = required_str(obj, "placetype", context)?
            .parse()
            .map_err(|e: NlgeoError| schema(context, &e.to_string()))?;
        let source = optional_str(obj, "source")?.unwrap_or_else(|| self.default_source.clone());
        let source_id = obj
            .get("source_id")
            .and_then(id_string)
            .ok_or_else(|| schema(context, "ancestor source_id must be a string or number"))?;
        Ok(Ancestor { id: PlaceId::new(source, source_id), name, place_type })
    }
}

fn schema(context: &str, reason: &str) -> NlgeoError {
    NlgeoError::SchemaViolation { reason: format!("{}: {}", context, reason) }
}

fn required_str(props: &Map<String, Value>, key: &str, context: &str) -> Result<String> {
    match props.get(key).and_then(Value::as_str).map(str::trim) {
        Some(s) if !s.is_empty() => Ok(s.to_string()),
        _ => Err(schema(context, &format!("missing or empty property '{}'", key))),
    }
}

fn optional_str(props: &Map<String, Value>, key: &str) -> Result<Option<String>> {
    match props.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(schema(key, "expected a string")),
    }
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLACES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "id": 85688501,
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[-79.5, 37.9], [-75.0, 37.9], [-75.0, 39.7], [-79.5, 39.7], [-79.5, 37.9]]]
                },
                "properties": {"name": "Maryland", "placetype": "region", "source": "wof", "iso": "US-MD"}
            },
            {
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [-76.49, 38.97]},
                "properties": {
                    "name": "Annapolis",
                    "placetype": "locality",
                    "source": "wof",
                    "source_id": "85949461",
                    "alternate_names": ["Annapolis City"],
                    "ancestors": [
                        {"source": "wof", "source_id": 85688501, "name": "Maryland", "placetype": "region"}
                    ],
                    "population": 40812
                }
            }
        ]
    }"#;

    #[test]
    fn test_parse_feature_collection() {
        let records = PlaceLoader::new().parse(PLACES).unwrap();
        assert_eq!(records.len(), 2);

        let maryland = &records[0];
        assert_eq!(maryland.id, PlaceId::new("wof", "85688501"));
        assert_eq!(maryland.place_type, PlaceType::Region);
        assert_eq!(maryland.properties.get("iso"), Some(&Value::String("US-MD".to_string())));
        assert!(!maryland.properties.contains_key("name"));

        let annapolis = &records[1];
        assert_eq!(annapolis.alternate_names, vec!["Annapolis City".to_string()]);
        assert_eq!(annapolis.ancestors.len(), 1);
        assert_eq!(annapolis.ancestors[0].id, maryland.id);
        assert_eq!(annapolis.population, Some(40812));
        assert_eq!(annapolis.geometry, Geometry::point(-76.49, 38.97));
    }

    #[test]
    fn test_default_source() {
        let doc = r#"{"type": "Feature", "id": "a",
            "geometry": {"type": "Point", "coordinates": [0, 0]},
            "properties": {"name": "Null Island", "placetype": "locality"}}"#;
        let records = PlaceLoader::new().with_default_source("test").parse(doc).unwrap();
        assert_eq!(records[0].id.to_string(), "test:a");
    }

    #[test]
    fn test_rejects_unknown_place_type() {
        let doc = r#"{"type": "Feature", "id": 1,
            "geometry": {"type": "Point", "coordinates": [0, 0]},
            "properties": {"name": "Atlantis", "placetype": "lost city"}}"#;
        let err = PlaceLoader::new().parse(doc).unwrap_err();
        assert!(matches!(err, NlgeoError::SchemaViolation { .. }));
    }

    #[test]
    fn test_rejects_invalid_geometry() {
        let doc = r#"{"type": "Feature", "id": 1,
            "geometry": {"type": "Point", "coordinates": [400, 0]},
            "properties": {"name": "Nowhere", "placetype": "locality"}}"#;
        let err = PlaceLoader::new().parse(doc).unwrap_err();
        assert!(err.to_string().contains("comp:1"));
    }

    #[test]
    fn test_rejects_bare_geometry() {
        let doc = r#"{"type": "Point", "coordinates": [0, 0]}"#;
        assert!(PlaceLoader::new().parse(doc).is_err());
    }
}
