//! Polygon algebra over canonical geometries.
//!
//! Every operation is a pure function of its inputs and the configuration it
//! was built with, and returns a normalized geometry. An empty result is a
//! valid output (an empty `GeometryCollection`); only [`between`],
//! [`directional`], [`border_of`] and [`border_between`] can refuse their
//! inputs with [`NlgeoError::DegenerateGeometry`].
//!
//! [`between`]: GeometryAlgebra::between
//! [`directional`]: GeometryAlgebra::directional
//! [`border_of`]: GeometryAlgebra::border_of
//! [`border_between`]: GeometryAlgebra::border_between

use crate::models::{Distance, Extent, Geometry, GeometryExt};
use crate::normalize::{equivalent, normalize_parts};
use crate::projection::{area_square_meters, LocalProjection};
use crate::spatial::{self, Parts};
use geo::{
    Area, BooleanOps, Buffer, Centroid, ConvexHull, Densify, Euclidean, Geometry as GeoGeometry,
    Intersects, MultiLineString, MultiPoint, MultiPolygon,
};
use nlgeo_core::config::AlgebraConfig;
use nlgeo_core::error::{NlgeoError, Result};
use nlgeo_core::models::{Direction, Subportion};

/// Longest edge, in degrees, projected as-is before buffering
const MAX_SEGMENT_DEGREES: f64 = 0.05;

/// Longest buffered edge, in meters, projected back as-is
const MAX_SEGMENT_METERS: f64 = 5_000.0;

/// Stateless geometry algebra
#[derive(Debug, Clone, Default)]
pub struct GeometryAlgebra {
    config: AlgebraConfig,
}

impl GeometryAlgebra {
    pub fn new(config: AlgebraConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AlgebraConfig {
        &self.config
    }

    fn finish(&self, parts: Parts) -> Geometry {
        normalize_parts(parts, self.config.coordinate_precision).into_geometry()
    }

    /// Normalize a geometry with the configured precision.
    pub fn normalize(&self, geometry: &Geometry) -> Geometry {
        self.finish(Parts::from_geometry(geometry))
    }

    /// Grow the geometry by `distance`; a negative distance shrinks areas and
    /// removes points and lines entirely.
    pub fn buffer(&self, geometry: &Geometry, distance: Distance) -> Result<Geometry> {
        if !distance.value.is_finite() {
            return Err(NlgeoError::invalid_parameter(
                "distance",
                format!("buffer distance must be finite, got {}", distance.value),
            ));
        }
        let meters = self.config.units.to_meters(distance.value, distance.unit)?;
        self.buffer_meters(geometry, meters)
    }

    pub fn buffer_meters(&self, geometry: &Geometry, meters: f64) -> Result<Geometry> {
        let parts = Parts::from_geometry(geometry);
        if parts.is_empty() || meters == 0.0 {
            return Ok(self.finish(parts));
        }

        // Edges are straight in lon/lat; project enough vertices to keep them so.
        let densified = Parts {
            polygons: Euclidean.densify(&parts.polygons, MAX_SEGMENT_DEGREES),
            lines: Euclidean.densify(&parts.lines, MAX_SEGMENT_DEGREES),
            points: parts.points.clone(),
        };
        let geo_geometry = densified.to_geo();
        let projection = LocalProjection::centred_on(&geo_geometry)?;

        let projected = projection.forward(&geo_geometry)?;
        let buffered: MultiPolygon = projected.buffer(meters);
        let back = projection.inverse(&Euclidean.densify(&buffered, MAX_SEGMENT_METERS))?;

        tracing::debug!(meters, parts = back.0.len(), "buffered geometry");
        Ok(self.finish(Parts::from_polygons(back)))
    }

    /// Points shared by both inputs
    pub fn intersection(&self, a: &Geometry, b: &Geometry) -> Geometry {
        let (pa, pb) = (Parts::from_geometry(a), Parts::from_geometry(b));

        let mut out = Parts::default();
        if pa.has_area() && pb.has_area() {
            out.polygons = Parts::from_polygons(pa.polygons.intersection(&pb.polygons)).polygons;
        }
        // Lines and points of each side survive where they fall inside the other's area.
        let a_in_b =
            spatial::clip_to(&Parts { polygons: empty_polygons(), ..pa.clone() }, &pb.polygons);
        let b_in_a =
            spatial::clip_to(&Parts { polygons: empty_polygons(), ..pb.clone() }, &pa.polygons);
        out.lines.0.extend(a_in_b.lines.0.into_iter().chain(b_in_a.lines.0));
        out.points.0.extend(a_in_b.points.0.into_iter().chain(b_in_a.points.0));

        // Points of one side lying on the other side's points or lines.
        let (a_lineal, b_lineal) = (lineal(&pa), lineal(&pb));
        out.points.0.extend(pa.points.iter().filter(|p| b_lineal.intersects(*p)).copied());
        out.points.0.extend(pb.points.iter().filter(|p| a_lineal.intersects(*p)).copied());

        self.finish(out)
    }

    /// N-ary intersection, folded left to right
    pub fn intersection_all(&self, geometries: &[Geometry]) -> Result<Geometry> {
        let (first, rest) = geometries.split_first().ok_or_else(|| {
            NlgeoError::invalid_parameter("child_nodes", "intersection needs at least one input")
        })?;
        Ok(rest.iter().fold(self.normalize(first), |acc, g| self.intersection(&acc, g)))
    }

    /// Points in either input
    pub fn union(&self, a: &Geometry, b: &Geometry) -> Geometry {
        let (pa, pb) = (Parts::from_geometry(a), Parts::from_geometry(b));

        let polygons = Parts::from_polygons(pa.polygons.union(&pb.polygons)).polygons;
        let mut rest = Parts::default();
        rest.lines.0.extend(pa.lines.0.into_iter().chain(pb.lines.0));
        rest.points.0.extend(pa.points.0.into_iter().chain(pb.points.0));

        // Lower-dimensional parts already covered by the merged area are absorbed.
        let mut out = spatial::cut_away(&rest, &polygons);
        out.polygons = polygons;
        self.finish(out)
    }

    /// N-ary union, folded left to right
    pub fn union_all(&self, geometries: &[Geometry]) -> Result<Geometry> {
        let (first, rest) = geometries.split_first().ok_or_else(|| {
            NlgeoError::invalid_parameter("child_nodes", "union needs at least one input")
        })?;
        Ok(rest.iter().fold(self.normalize(first), |acc, g| self.union(&acc, g)))
    }

    /// Points of `a` not in `b`
    pub fn difference(&self, a: &Geometry, b: &Geometry) -> Geometry {
        let (pa, pb) = (Parts::from_geometry(a), Parts::from_geometry(b));
        let mut out = spatial::cut_away(&pa, &pb.polygons);

        if !pb.points.0.is_empty() || !pb.lines.0.is_empty() {
            let b_lineal = lineal(&pb);
            out.points.0.retain(|p| !b_lineal.intersects(p));
        }
        self.finish(out)
    }

    /// The corridor between two disjoint inputs.
    ///
    /// The corridor is the convex hull of the closest component of each
    /// input, with both inputs removed from it.
    pub fn between(&self, a: &Geometry, b: &Geometry) -> Result<Geometry> {
        let (pa, pb) = (Parts::from_geometry(a), Parts::from_geometry(b));
        if pa.is_empty() || pb.is_empty() {
            return Err(NlgeoError::degenerate("between", "one of the inputs is empty"));
        }
        if spatial::overlaps_or_touches(&pa, &pb) {
            return Err(NlgeoError::degenerate(
                "between",
                "the inputs overlap or touch, so nothing lies between them",
            ));
        }

        let (ca, cb, gap) = spatial::nearest_components(&pa, &pb)
            .ok_or_else(|| NlgeoError::degenerate("between", "one of the inputs is empty"))?;

        let mut vertices = spatial::vertices(&ca);
        vertices.extend(spatial::vertices(&cb));
        let hull = MultiPoint::new(vertices).convex_hull();

        let corridor =
            MultiPolygon::new(vec![hull]).difference(&pa.polygons).difference(&pb.polygons);
        let corridor = Parts::from_polygons(corridor);
        if corridor.polygons.unsigned_area() <= f64::EPSILON {
            return Err(NlgeoError::degenerate(
                "between",
                "the region between the inputs has no area",
            ));
        }

        tracing::debug!(gap_degrees = gap, "computed between corridor");
        Ok(self.finish(corridor))
    }

    /// Everything beyond the `direction` edge of the geometry's bounding box,
    /// within `reference` (or the whole world when there is none).
    pub fn directional(
        &self,
        geometry: &Geometry,
        direction: Direction,
        reference: Option<&Geometry>,
    ) -> Result<Geometry> {
        let parts = Parts::from_geometry(geometry);
        let bounds = parts
            .bounding_rect()
            .ok_or_else(|| NlgeoError::degenerate("directional", "input geometry is empty"))?;

        let reference_extent = match reference {
            Some(r) => r.extent().ok_or_else(|| {
                NlgeoError::degenerate("directional", "reference region is empty")
            })?,
            None => Extent::world(),
        };

        let plane = spatial::half_plane(&bounds, direction, &reference_extent).ok_or_else(|| {
            NlgeoError::degenerate(
                "directional",
                format!(
                    "nothing lies {} of the input within the reference extent",
                    direction.as_str()
                ),
            )
        })?;

        let mut region = Parts::from_polygons(MultiPolygon::new(vec![plane]));
        if let Some(r) = reference {
            let clip = Parts::from_geometry(r);
            if clip.has_area() {
                region = Parts::from_polygons(region.polygons.intersection(&clip.polygons));
            }
        }

        if !region.has_area() {
            return Err(NlgeoError::degenerate(
                "directional",
                format!(
                    "nothing lies {} of the input within the reference region",
                    direction.as_str()
                ),
            ));
        }
        Ok(self.finish(region))
    }

    /// One compass half of a place, split through its centroid.
    ///
    /// Multipart areas are split through the centroid of a part holding
    /// most of the area when there is one, so a far-off island does not drag
    /// the dividing line away from the mainland.
    pub fn subportion(&self, geometry: &Geometry, subportion: Subportion) -> Result<Geometry> {
        let parts = Parts::from_geometry(geometry);
        if !parts.has_area() && parts.lines.0.is_empty() {
            // A point has no halves.
            return Ok(self.finish(parts));
        }

        let total_area = parts.polygons.unsigned_area();
        let dominant = parts
            .polygons
            .iter()
            .find(|p| total_area > 0.0 && p.unsigned_area() > total_area * 0.5);
        let pivot = match dominant {
            Some(p) => p.centroid(),
            None => parts.to_geo().centroid(),
        }
        .ok_or_else(|| NlgeoError::degenerate("subportion", "input geometry has no centroid"))?;

        let bounds = parts
            .bounding_rect()
            .ok_or_else(|| NlgeoError::degenerate("subportion", "input geometry is empty"))?;
        let half = spatial::side_of(&spatial::expand(&bounds, 1.0), pivot.0, subportion.direction())
            .ok_or_else(|| NlgeoError::degenerate("subportion", "input geometry has no extent"))?;

        Ok(self.finish(spatial::clip_to(&parts, &MultiPolygon::new(vec![half]))))
    }

    /// The boundary rings of the input's areas.
    pub fn border_of(&self, geometry: &Geometry) -> Result<Geometry> {
        let parts = Parts::from_geometry(geometry);
        if !parts.has_area() {
            return Err(NlgeoError::degenerate("border_of", "input geometry has no area"));
        }
        let mut out = Parts::default();
        out.lines = MultiLineString::new(
            parts
                .polygons
                .iter()
                .flat_map(|p| {
                    std::iter::once(p.exterior().clone()).chain(p.interiors().iter().cloned())
                })
                .collect(),
        );
        Ok(self.finish(out))
    }

    /// A strip covering the border shared by two inputs: both inputs grown by
    /// the configured border width, then intersected.
    pub fn border_between(&self, a: &Geometry, b: &Geometry) -> Result<Geometry> {
        let width = self.config.border_width_meters;
        let grown_a = self.buffer_meters(a, width)?;
        let grown_b = self.buffer_meters(b, width)?;
        let strip = self.intersection(&grown_a, &grown_b);
        if strip.is_empty() {
            return Err(NlgeoError::degenerate(
                "border_between",
                format!("the inputs are more than {} m apart and share no border", 2.0 * width),
            ));
        }
        Ok(strip)
    }

    /// Shape equality within the configured tolerance
    pub fn equivalent(&self, a: &Geometry, b: &Geometry) -> bool {
        equivalent(a, b, self.config.equivalence_tolerance)
    }

    /// Area in square meters
    pub fn area_square_meters(&self, geometry: &Geometry) -> f64 {
        let parts = Parts::from_geometry(geometry);
        if !parts.has_area() {
            return 0.0;
        }
        area_square_meters(&GeoGeometry::MultiPolygon(parts.polygons))
    }
}

fn empty_polygons() -> MultiPolygon {
    MultiPolygon::new(vec![])
}

fn lineal(parts: &Parts) -> GeoGeometry {
    GeoGeometry::GeometryCollection(geo::GeometryCollection::new_from(vec![
        GeoGeometry::MultiLineString(parts.lines.clone()),
        GeoGeometry::MultiPoint(parts.points.clone()),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nlgeo_core::models::DistanceUnit;

    fn algebra() -> GeometryAlgebra {
        GeometryAlgebra::new(AlgebraConfig::default())
    }

    fn bounds(g: &Geometry) -> Extent {
        g.extent().unwrap()
    }

    #[test]
    fn test_intersection_of_overlapping_squares() {
        let a = Geometry::rect(0.0, 0.0, 2.0, 2.0);
        let b = Geometry::rect(1.0, 1.0, 3.0, 3.0);
        let result = algebra().intersection(&a, &b);
        assert_eq!(result, Geometry::rect(1.0, 1.0, 2.0, 2.0));
    }

    #[test]
    fn test_disjoint_intersection_is_empty_not_error() {
        let a = Geometry::rect(0.0, 0.0, 1.0, 1.0);
        let b = Geometry::rect(5.0, 5.0, 6.0, 6.0);
        let result = algebra().intersection(&a, &b);
        assert!(result.is_empty());
        assert!(matches!(result, Geometry::GeometryCollection { .. }));
    }

    #[test]
    fn test_union_of_disjoint_squares_is_multipolygon() {
        let a = Geometry::rect(0.0, 0.0, 1.0, 1.0);
        let b = Geometry::rect(5.0, 5.0, 6.0, 6.0);
        let result = algebra().union(&a, &b);
        match result {
            Geometry::MultiPolygon { coordinates } => assert_eq!(coordinates.len(), 2),
            other => panic!("expected multipolygon, got {:?}", other),
        }
    }

    #[test]
    fn test_union_absorbs_covered_point() {
        let a = Geometry::rect(0.0, 0.0, 2.0, 2.0);
        let p = Geometry::point(1.0, 1.0);
        assert_eq!(algebra().union(&a, &p), a);
    }

    #[test]
    fn test_difference() {
        let a = Geometry::rect(0.0, 0.0, 2.0, 1.0);
        let b = Geometry::rect(1.0, -1.0, 3.0, 2.0);
        assert_eq!(algebra().difference(&a, &b), Geometry::rect(0.0, 0.0, 1.0, 1.0));
        assert!(algebra().difference(&b, &b).is_empty());
    }

    #[test]
    fn test_intersection_keeps_point_inside_area() {
        let area = Geometry::rect(0.0, 0.0, 2.0, 2.0);
        let point = Geometry::point(1.0, 1.0);
        assert_eq!(algebra().intersection(&area, &point), point);
        assert!(algebra().intersection(&area, &Geometry::point(9.0, 9.0)).is_empty());
    }

    #[test]
    fn test_buffer_point_grows_area() {
        let point = Geometry::point(-76.49, 38.97);
        let buffered = algebra().buffer(&point, Distance::new(3.0, DistanceUnit::Miles)).unwrap();
        assert!(matches!(buffered, Geometry::Polygon { .. }));

        // 3 mi = 4828 m; a circle of that radius is about 73 km²
        let area = algebra().area_square_meters(&buffered);
        let expected = std::f64::consts::PI * 4828.032f64.powi(2);
        assert!((area - expected).abs() / expected < 0.1, "area {} vs {}", area, expected);
    }

    #[test]
    fn test_negative_buffer_shrinks() {
        let square = Geometry::rect(0.0, 0.0, 1.0, 1.0);
        let shrunk = algebra().buffer(&square, Distance::kilometers(-10.0)).unwrap();
        let e = bounds(&shrunk);
        assert!(e.west > 0.0 && e.east < 1.0 && e.south > 0.0 && e.north < 1.0);

        let gone = algebra().buffer(&Geometry::point(0.0, 0.0), Distance::miles(-5.0)).unwrap();
        assert!(gone.is_empty());
    }

    /// Easternmost point of a geometry on the parallel at `lat`
    fn east_reach_at(g: &Geometry, lat: f64) -> f64 {
        let parallel = geo::LineString::from(vec![(-180.0, lat), (180.0, lat)]);
        let inside =
            Parts::from_geometry(g).polygons.clip(&MultiLineString::new(vec![parallel]), false);
        inside.0.iter().flat_map(|l| l.0.iter()).map(|c| c.x).fold(f64::MIN, f64::max)
    }

    #[test]
    fn test_buffer_distance_does_not_drift_with_latitude() {
        use geo::{Distance as _, Geodesic, Point};

        let wide = Geometry::rect(-100.0, 45.0, -60.0, 75.0);
        let buffered = algebra().buffer(&wide, Distance::kilometers(100.0)).unwrap();
        for lat in [50.0, 70.0] {
            let reach = east_reach_at(&buffered, lat);
            let km = Geodesic.distance(Point::new(-60.0, lat), Point::new(reach, lat)) / 1000.0;
            assert!((km - 100.0).abs() < 5.0, "grew {:.1} km at {}N", km, lat);
        }
    }

    #[test]
    fn test_buffer_rejects_non_finite_distance() {
        let err = algebra()
            .buffer(&Geometry::point(0.0, 0.0), Distance::meters(f64::NAN))
            .unwrap_err();
        assert!(matches!(err, NlgeoError::InvalidParameter { .. }));
    }

    #[test]
    fn test_between_disjoint_squares() {
        let a = Geometry::rect(0.0, 0.0, 1.0, 1.0);
        let b = Geometry::rect(3.0, 0.0, 4.0, 1.0);
        let corridor = algebra().between(&a, &b).unwrap();
        assert!(algebra().equivalent(&corridor, &Geometry::rect(1.0, 0.0, 3.0, 1.0)));
    }

    #[test]
    fn test_between_overlapping_is_degenerate() {
        let a = Geometry::rect(0.0, 0.0, 2.0, 2.0);
        let b = Geometry::rect(1.0, 1.0, 3.0, 3.0);
        let err = algebra().between(&a, &b).unwrap_err();
        assert!(matches!(err, NlgeoError::DegenerateGeometry { .. }));

        let touching = Geometry::rect(2.0, 0.0, 3.0, 2.0);
        assert!(algebra().between(&a, &touching).is_err());
    }

    #[test]
    fn test_between_two_points_is_degenerate() {
        let err = algebra()
            .between(&Geometry::point(0.0, 0.0), &Geometry::point(1.0, 1.0))
            .unwrap_err();
        assert!(matches!(err, NlgeoError::DegenerateGeometry { .. }));
    }

    #[test]
    fn test_directional_north_of_world() {
        let bravo = Geometry::rect(0.0, 5.0, 10.0, 9.0);
        let north = algebra().directional(&bravo, Direction::North, None).unwrap();
        assert_eq!(bounds(&north), Extent::new(-180.0, 9.0, 180.0, 90.0));

        let west = algebra().directional(&bravo, Direction::West, None).unwrap();
        assert_eq!(bounds(&west), Extent::new(-180.0, -90.0, 0.0, 90.0));
    }

    #[test]
    fn test_directional_clipped_to_reference() {
        let child = Geometry::rect(2.0, 2.0, 3.0, 3.0);
        let parent = Geometry::rect(0.0, 0.0, 10.0, 10.0);
        let east = algebra().directional(&child, Direction::East, Some(&parent)).unwrap();
        assert_eq!(east, Geometry::rect(3.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn test_directional_beyond_pole_is_degenerate() {
        let polar = Geometry::rect(-10.0, 80.0, 10.0, 90.0);
        assert!(algebra().directional(&polar, Direction::North, None).is_err());
    }

    #[test]
    fn test_subportion_western_half() {
        let place = Geometry::rect(0.0, 0.0, 4.0, 2.0);
        let west = algebra().subportion(&place, Subportion::WesternHalf).unwrap();
        assert_eq!(west, Geometry::rect(0.0, 0.0, 2.0, 2.0));
    }

    #[test]
    fn test_subportion_uses_dominant_part() {
        let place = Geometry::MultiPolygon {
            coordinates: vec![
                vec![vec![[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0], [0.0, 0.0]]],
                vec![vec![[20.0, 0.0], [21.0, 0.0], [21.0, 1.0], [20.0, 1.0], [20.0, 0.0]]],
            ],
        };
        let east = algebra().subportion(&place, Subportion::EasternHalf).unwrap();
        // split at x = 2 (mainland centroid), so the island stays in the east half
        let e = bounds(&east);
        assert_eq!(e.west, 2.0);
        assert_eq!(e.east, 21.0);
    }

    #[test]
    fn test_subportion_of_point_is_unchanged() {
        let point = Geometry::point(1.0, 2.0);
        assert_eq!(algebra().subportion(&point, Subportion::NorthernHalf).unwrap(), point);
    }

    #[test]
    fn test_border_of() {
        let border = algebra().border_of(&Geometry::rect(0.0, 0.0, 1.0, 1.0)).unwrap();
        assert!(matches!(border, Geometry::LineString { .. }));
        assert!(algebra().border_of(&Geometry::point(0.0, 0.0)).is_err());
    }

    #[test]
    fn test_border_between_neighbours() {
        let a = Geometry::rect(0.0, 0.0, 1.0, 1.0);
        let b = Geometry::rect(1.0, 0.0, 2.0, 1.0);
        let strip = algebra().border_between(&a, &b).unwrap();
        let e = bounds(&strip);
        assert!(e.west < 1.0 && e.east > 1.0);
        assert!(e.east - e.west < 0.1);

        let far = Geometry::rect(5.0, 0.0, 6.0, 1.0);
        assert!(algebra().border_between(&a, &far).is_err());
    }
}
