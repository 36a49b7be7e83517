//! Geometry models for nlgeo-geo.
//!
//! Re-exports the canonical types from `nlgeo-core` and bridges them to and
//! from the `geo` crate types the algebra computes with.

use geo::Geometry as GeoGeometry;

pub use nlgeo_core::models::{Distance, DistanceUnit, Extent, Geometry, GeometryType, UnitTable};

fn to_coord(c: &[f64; 2]) -> geo::Coord {
    geo::Coord { x: c[0], y: c[1] }
}

fn to_line_string(coords: &[[f64; 2]]) -> geo::LineString {
    geo::LineString::new(coords.iter().map(to_coord).collect())
}

fn to_polygon(rings: &[Vec<[f64; 2]>]) -> geo::Polygon {
    match rings.split_first() {
        Some((exterior, interiors)) => geo::Polygon::new(
            to_line_string(exterior),
            interiors.iter().map(|r| to_line_string(r)).collect(),
        ),
        None => geo::Polygon::new(geo::LineString::new(vec![]), vec![]),
    }
}

fn ring_coords(ring: &geo::LineString) -> Vec<[f64; 2]> {
    ring.coords().map(|c| [c.x, c.y]).collect()
}

fn polygon_rings(p: &geo::Polygon) -> Vec<Vec<[f64; 2]>> {
    std::iter::once(p.exterior()).chain(p.interiors()).map(ring_coords).collect()
}

/// Convert a canonical Geometry to a geo::Geometry
pub fn to_geo_geometry(geom: &Geometry) -> GeoGeometry {
    match geom {
        Geometry::Point { coordinates } => {
            GeoGeometry::Point(geo::Point::from(to_coord(coordinates)))
        }
        Geometry::LineString { coordinates } => {
            GeoGeometry::LineString(to_line_string(coordinates))
        }
        Geometry::Polygon { coordinates } => GeoGeometry::Polygon(to_polygon(coordinates)),
        Geometry::MultiPoint { coordinates } => GeoGeometry::MultiPoint(geo::MultiPoint::new(
            coordinates.iter().map(|c| geo::Point::from(to_coord(c))).collect(),
        )),
        Geometry::MultiLineString { coordinates } => GeoGeometry::MultiLineString(
            geo::MultiLineString::new(coordinates.iter().map(|l| to_line_string(l)).collect()),
        ),
        Geometry::MultiPolygon { coordinates } => GeoGeometry::MultiPolygon(geo::MultiPolygon::new(
            coordinates.iter().map(|p| to_polygon(p)).collect(),
        )),
        Geometry::GeometryCollection { geometries } => GeoGeometry::GeometryCollection(
            geo::GeometryCollection::new_from(geometries.iter().map(to_geo_geometry).collect()),
        ),
    }
}

/// Convert a geo::Geometry to a canonical Geometry
pub fn from_geo_geometry(geom: &GeoGeometry) -> Geometry {
    match geom {
        GeoGeometry::Point(p) => Geometry::Point { coordinates: [p.x(), p.y()] },
        GeoGeometry::Line(l) => Geometry::LineString {
            coordinates: vec![[l.start.x, l.start.y], [l.end.x, l.end.y]],
        },
        GeoGeometry::LineString(ls) => Geometry::LineString { coordinates: ring_coords(ls) },
        GeoGeometry::Polygon(p) => Geometry::Polygon { coordinates: polygon_rings(p) },
        GeoGeometry::MultiPoint(mp) => Geometry::MultiPoint {
            coordinates: mp.iter().map(|p| [p.x(), p.y()]).collect(),
        },
        GeoGeometry::MultiLineString(mls) => Geometry::MultiLineString {
            coordinates: mls.iter().map(ring_coords).collect(),
        },
        GeoGeometry::MultiPolygon(mp) => Geometry::MultiPolygon {
            coordinates: mp.iter().map(polygon_rings).collect(),
        },
        GeoGeometry::GeometryCollection(gc) => Geometry::GeometryCollection {
            geometries: gc.iter().map(from_geo_geometry).collect(),
        },
        GeoGeometry::Rect(r) => from_geo_geometry(&GeoGeometry::Polygon(r.to_polygon())),
        GeoGeometry::Triangle(t) => from_geo_geometry(&GeoGeometry::Polygon(t.to_polygon())),
    }
}

/// Extension trait for Geometry with geo-crate operations
pub trait GeometryExt {
    /// Convert to geo::Geometry
    fn to_geo(&self) -> GeoGeometry;

    /// Get the centroid as coordinates
    fn centroid_coords(&self) -> Option<[f64; 2]>;

    /// Bounding extent, `None` for empty geometries
    fn extent(&self) -> Option<Extent>;
}

impl GeometryExt for Geometry {
    fn to_geo(&self) -> GeoGeometry {
        to_geo_geometry(self)
    }

    fn centroid_coords(&self) -> Option<[f64; 2]> {
        use geo::Centroid;
        self.to_geo().centroid().map(|p| [p.x(), p.y()])
    }

    fn extent(&self) -> Option<Extent> {
        use geo::BoundingRect;
        self.to_geo()
            .bounding_rect()
            .map(|r| Extent::new(r.min().x, r.min().y, r.max().x, r.max().y))
    }
}

/// Convert to a `geojson` geometry for output.
pub fn to_geojson_geometry(geom: &Geometry) -> geojson::Geometry {
    geojson::Geometry::new(geojson::Value::from(&to_geo_geometry(geom)))
}
