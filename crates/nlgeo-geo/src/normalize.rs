//! Canonical output form for geometries.
//!
//! Two evaluations of the same request must produce byte-identical output,
//! so every result goes through [`normalize`]: exterior rings counter-clockwise,
//! holes clockwise, rings starting at their lowest vertex, parts sorted, and
//! coordinates rounded to a fixed number of decimals.

use crate::models::Geometry;
use crate::spatial::Parts;
use geo::orient::{Direction as Winding, Orient};
use geo::{
    Area, BooleanOps, Coord, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon,
};
use std::cmp::Ordering;

/// Normalize a geometry and round its coordinates to `precision` decimals.
pub fn normalize(geometry: &Geometry, precision: u32) -> Geometry {
    normalize_parts(Parts::from_geometry(geometry), precision).into_geometry()
}

pub fn normalize_parts(parts: Parts, precision: u32) -> Parts {
    let round = Rounder::new(precision);

    let mut polygons: Vec<Polygon> = parts
        .polygons
        .orient(Winding::Default)
        .into_iter()
        .filter_map(|p| normalize_polygon(&p, &round))
        .collect();
    polygons.sort_by(|a, b| cmp_coords(&a.exterior().0, &b.exterior().0));

    let mut lines: Vec<LineString> =
        parts.lines.iter().filter_map(|l| normalize_line(l, &round)).collect();
    lines.sort_by(|a, b| cmp_coords(&a.0, &b.0));
    lines.dedup();

    let mut points: Vec<Point> =
        parts.points.iter().map(|p| Point::from(round.coord(p.0))).collect();
    points.sort_by(|a, b| cmp_coord(&a.0, &b.0));
    points.dedup();

    let mut out = Parts::default();
    out.polygons = MultiPolygon::new(polygons);
    out.lines = MultiLineString::new(lines);
    out.points = MultiPoint::new(points);
    out
}

struct Rounder {
    factor: f64,
}

impl Rounder {
    fn new(precision: u32) -> Self {
        Self { factor: 10f64.powi(precision as i32) }
    }

    fn value(&self, v: f64) -> f64 {
        let r = (v * self.factor).round() / self.factor;
        // Avoid emitting -0.0
        if r == 0.0 {
            0.0
        } else {
            r
        }
    }

    fn coord(&self, c: Coord) -> Coord {
        Coord { x: self.value(c.x), y: self.value(c.y) }
    }
}

fn normalize_polygon(polygon: &Polygon, round: &Rounder) -> Option<Polygon> {
    let exterior = normalize_ring(polygon.exterior(), round)?;
    let mut interiors: Vec<LineString> =
        polygon.interiors().iter().filter_map(|r| normalize_ring(r, round)).collect();
    interiors.sort_by(|a, b| cmp_coords(&a.0, &b.0));
    let normalized = Polygon::new(exterior, interiors);
    if normalized.unsigned_area() == 0.0 {
        return None;
    }
    Some(normalized)
}

/// Round, drop repeated vertices, and rotate a closed ring so it starts at
/// its lowest vertex.
fn normalize_ring(ring: &LineString, round: &Rounder) -> Option<LineString> {
    let mut open: Vec<Coord> = Vec::with_capacity(ring.0.len());
    for c in ring.0.iter().map(|c| round.coord(*c)) {
        if open.last() != Some(&c) {
            open.push(c);
        }
    }
    while open.len() > 1 && open.first() == open.last() {
        open.pop();
    }
    if open.len() < 3 {
        return None;
    }

    let start = open
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| cmp_coord(a, b))
        .map(|(i, _)| i)
        .unwrap_or(0);
    open.rotate_left(start);
    open.push(open[0]);
    Some(LineString::new(open))
}

fn normalize_line(line: &LineString, round: &Rounder) -> Option<LineString> {
    let mut coords: Vec<Coord> = Vec::with_capacity(line.0.len());
    for c in line.0.iter().map(|c| round.coord(*c)) {
        if coords.last() != Some(&c) {
            coords.push(c);
        }
    }
    if coords.len() < 2 {
        return None;
    }
    let closed = coords.first() == coords.last();
    if !closed && cmp_coord(&coords[coords.len() - 1], &coords[0]) == Ordering::Less {
        coords.reverse();
    }
    Some(LineString::new(coords))
}

fn cmp_coord(a: &Coord, b: &Coord) -> Ordering {
    a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y))
}

fn cmp_coords(a: &[Coord], b: &[Coord]) -> Ordering {
    for (ca, cb) in a.iter().zip(b.iter()) {
        let ord = cmp_coord(ca, cb);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

/// Are two geometries the same shape within `tolerance`?
///
/// Areas are compared by the symmetric difference relative to the larger
/// area; lines and points must match after normalization.
pub fn equivalent(a: &Geometry, b: &Geometry, tolerance: f64) -> bool {
    let pa = normalize_parts(Parts::from_geometry(a), 9);
    let pb = normalize_parts(Parts::from_geometry(b), 9);

    let area_a = pa.polygons.unsigned_area();
    let area_b = pb.polygons.unsigned_area();
    let largest = area_a.max(area_b);
    let areas_match = if largest == 0.0 {
        true
    } else {
        pa.polygons.xor(&pb.polygons).unsigned_area() <= tolerance * largest
    };

    areas_match && pa.lines == pb.lines && pa.points == pb.points
}
