//! Decomposition of geometries into polygonal, lineal and puntal parts, and
//! the spatial helpers the algebra builds on.

use crate::models::{from_geo_geometry, to_geo_geometry, Extent, Geometry};
use geo::{
    Area, BooleanOps, BoundingRect, Coord, Distance, Euclidean, Geometry as GeoGeometry, Intersects,
    LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon, Rect,
};
use nlgeo_core::models::Direction;

/// A geometry split by dimension.
#[derive(Debug, Clone)]
pub struct Parts {
    pub polygons: MultiPolygon,
    pub lines: MultiLineString,
    pub points: MultiPoint,
}

impl Default for Parts {
    fn default() -> Self {
        Self {
            polygons: MultiPolygon::new(vec![]),
            lines: MultiLineString::new(vec![]),
            points: MultiPoint::new(vec![]),
        }
    }
}

impl Parts {
    pub fn from_geometry(geometry: &Geometry) -> Self {
        Self::from_geo(&to_geo_geometry(geometry))
    }

    pub fn from_geo(geometry: &GeoGeometry) -> Self {
        let mut parts = Parts::default();
        parts.collect(geometry);
        parts
    }

    pub fn from_polygons(polygons: MultiPolygon) -> Self {
        let mut parts = Parts::default();
        parts.collect(&GeoGeometry::MultiPolygon(polygons));
        parts
    }

    fn collect(&mut self, geometry: &GeoGeometry) {
        match geometry {
            GeoGeometry::Point(p) => self.points.0.push(*p),
            GeoGeometry::MultiPoint(mp) => self.points.0.extend(mp.iter().copied()),
            GeoGeometry::Line(l) => self.lines.0.push(LineString::from(vec![l.start, l.end])),
            GeoGeometry::LineString(ls) => self.push_line(ls.clone()),
            GeoGeometry::MultiLineString(mls) => {
                for ls in mls.iter() {
                    self.push_line(ls.clone());
                }
            }
            GeoGeometry::Polygon(p) => self.push_polygon(p.clone()),
            GeoGeometry::MultiPolygon(mp) => {
                for p in mp.iter() {
                    self.push_polygon(p.clone());
                }
            }
            GeoGeometry::Rect(r) => self.push_polygon(r.to_polygon()),
            GeoGeometry::Triangle(t) => self.push_polygon(t.to_polygon()),
            GeoGeometry::GeometryCollection(gc) => {
                for member in gc.iter() {
                    self.collect(member);
                }
            }
        }
    }

    fn push_line(&mut self, line: LineString) {
        if line.0.len() >= 2 {
            self.lines.0.push(line);
        }
    }

    fn push_polygon(&mut self, polygon: Polygon) {
        if polygon.exterior().0.len() >= 4 && polygon.unsigned_area() > 0.0 {
            self.polygons.0.push(polygon);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.0.is_empty() && self.lines.0.is_empty() && self.points.0.is_empty()
    }

    pub fn has_area(&self) -> bool {
        !self.polygons.0.is_empty()
    }

    /// Every part as its own geometry: each polygon, each line, each point
    pub fn components(&self) -> Vec<GeoGeometry> {
        self.polygons
            .iter()
            .cloned()
            .map(GeoGeometry::Polygon)
            .chain(self.lines.iter().cloned().map(GeoGeometry::LineString))
            .chain(self.points.iter().copied().map(GeoGeometry::Point))
            .collect()
    }

    pub fn to_geo(&self) -> GeoGeometry {
        GeoGeometry::GeometryCollection(geo::GeometryCollection::new_from(self.components()))
    }

    pub fn bounding_rect(&self) -> Option<Rect> {
        self.to_geo().bounding_rect()
    }

    /// Assemble the simplest canonical geometry holding these parts.
    pub fn into_geometry(self) -> Geometry {
        let has_polygons = !self.polygons.0.is_empty();
        let has_lines = !self.lines.0.is_empty();
        let has_points = !self.points.0.is_empty();

        let kinds = [has_polygons, has_lines, has_points].iter().filter(|k| **k).count();
        if kinds == 0 {
            return Geometry::empty();
        }

        let polygons = || match self.polygons.0.len() {
            1 => GeoGeometry::Polygon(self.polygons.0[0].clone()),
            _ => GeoGeometry::MultiPolygon(self.polygons.clone()),
        };
        let lines = || match self.lines.0.len() {
            1 => GeoGeometry::LineString(self.lines.0[0].clone()),
            _ => GeoGeometry::MultiLineString(self.lines.clone()),
        };
        let points = || match self.points.0.len() {
            1 => GeoGeometry::Point(self.points.0[0]),
            _ => GeoGeometry::MultiPoint(self.points.clone()),
        };

        if kinds == 1 {
            let single = if has_polygons {
                polygons()
            } else if has_lines {
                lines()
            } else {
                points()
            };
            return from_geo_geometry(&single);
        }

        let mut members = Vec::new();
        if has_polygons {
            members.push(from_geo_geometry(&polygons()));
        }
        if has_lines {
            members.push(from_geo_geometry(&lines()));
        }
        if has_points {
            members.push(from_geo_geometry(&points()));
        }
        Geometry::GeometryCollection { geometries: members }
    }
}

/// Keep only what lies inside `mask`: polygons intersected, lines clipped,
/// points filtered.
pub fn clip_to(parts: &Parts, mask: &MultiPolygon) -> Parts {
    let mut out = Parts::default();
    if mask.0.is_empty() {
        return out;
    }
    if parts.has_area() {
        out.collect(&GeoGeometry::MultiPolygon(parts.polygons.intersection(mask)));
    }
    if !parts.lines.0.is_empty() {
        out.collect(&GeoGeometry::MultiLineString(mask.clip(&parts.lines, false)));
    }
    out.points.0.extend(parts.points.iter().filter(|p| mask.intersects(*p)).copied());
    out
}

/// Remove what lies inside `mask`.
pub fn cut_away(parts: &Parts, mask: &MultiPolygon) -> Parts {
    if mask.0.is_empty() {
        return parts.clone();
    }
    let mut out = Parts::default();
    if parts.has_area() {
        out.collect(&GeoGeometry::MultiPolygon(parts.polygons.difference(mask)));
    }
    if !parts.lines.0.is_empty() {
        out.collect(&GeoGeometry::MultiLineString(mask.clip(&parts.lines, true)));
    }
    out.points.0.extend(parts.points.iter().filter(|p| !mask.intersects(*p)).copied());
    out
}

/// Do the two geometries share any point (overlap or touch)?
pub fn overlaps_or_touches(a: &Parts, b: &Parts) -> bool {
    a.to_geo().intersects(&b.to_geo())
}

/// The closest pair of components, one from each side, with their planar
/// distance in degrees. Ties keep the earliest pair.
pub fn nearest_components(a: &Parts, b: &Parts) -> Option<(GeoGeometry, GeoGeometry, f64)> {
    let mut best: Option<(GeoGeometry, GeoGeometry, f64)> = None;
    let b_components = b.components();
    for ca in a.components() {
        for cb in &b_components {
            let d = Euclidean.distance(&ca, cb);
            if best.as_ref().map_or(true, |(_, _, bd)| d < *bd) {
                best = Some((ca.clone(), cb.clone(), d));
            }
        }
    }
    best
}

/// All vertices of a geometry as points.
pub fn vertices(geometry: &GeoGeometry) -> Vec<Point> {
    use geo::CoordsIter;
    geometry.coords_iter().map(Point::from).collect()
}

/// The part of `reference` lying beyond the `direction` edge of `bounds`.
///
/// Returns `None` when nothing of the reference extent lies on that side.
pub fn half_plane(bounds: &Rect, direction: Direction, reference: &Extent) -> Option<Polygon> {
    let (min, max) = (bounds.min(), bounds.max());
    let (west, south, east, north) = match direction {
        Direction::North => (reference.west, max.y, reference.east, reference.north),
        Direction::South => (reference.west, reference.south, reference.east, min.y),
        Direction::East => (max.x, reference.south, reference.east, reference.north),
        Direction::West => (reference.west, reference.south, min.x, reference.north),
    };
    if west >= east || south >= north {
        return None;
    }
    Some(Rect::new(Coord { x: west, y: south }, Coord { x: east, y: north }).to_polygon())
}

/// The half of `bounds` on the `direction` side of `pivot`.
pub fn side_of(bounds: &Rect, pivot: Coord, direction: Direction) -> Option<Polygon> {
    let (min, max) = (bounds.min(), bounds.max());
    let (west, south, east, north) = match direction {
        Direction::North => (min.x, pivot.y, max.x, max.y),
        Direction::South => (min.x, min.y, max.x, pivot.y),
        Direction::East => (pivot.x, min.y, max.x, max.y),
        Direction::West => (min.x, min.y, pivot.x, max.y),
    };
    if west >= east || south >= north {
        return None;
    }
    Some(Rect::new(Coord { x: west, y: south }, Coord { x: east, y: north }).to_polygon())
}

/// Grow a rectangle by a margin on every side.
pub fn expand(rect: &Rect, margin: f64) -> Rect {
    Rect::new(
        Coord { x: rect.min().x - margin, y: rect.min().y - margin },
        Coord { x: rect.max().x + margin, y: rect.max().y + margin },
    )
}
