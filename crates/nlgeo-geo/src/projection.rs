//! Metric projection used for distance-based operations.
//!
//! Buffers are computed in meters on an azimuthal equidistant plane centred
//! on the geometry being buffered, then projected back to WGS 84 lon/lat.

use geo::{BoundingRect, Coord, GeodesicArea, Geometry as GeoGeometry, MapCoords};
use nlgeo_core::error::{NlgeoError, Result};
use proj::Proj;

/// Geographic CRS of every canonical geometry
pub const GEOGRAPHIC_CRS: &str = "EPSG:4326";

/// Azimuthal equidistant projection around an origin, in meters.
pub struct LocalProjection {
    origin: Coord,
    to_local: Proj,
    to_geographic: Proj,
}

impl LocalProjection {
    pub fn new(origin_lon: f64, origin_lat: f64) -> Result<Self> {
        let local = format!(
            "+proj=aeqd +lat_0={} +lon_0={} +datum=WGS84 +units=m +no_defs +type=crs",
            origin_lat, origin_lon
        );
        Ok(Self {
            origin: Coord { x: origin_lon, y: origin_lat },
            to_local: create(GEOGRAPHIC_CRS, &local)?,
            to_geographic: create(&local, GEOGRAPHIC_CRS)?,
        })
    }

    /// Projection centred on the middle of the geometry's bounding box.
    pub fn centred_on(geometry: &GeoGeometry) -> Result<Self> {
        let rect = geometry
            .bounding_rect()
            .ok_or_else(|| NlgeoError::degenerate("projection", "geometry has no extent"))?;
        let center = rect.center();
        Self::new(center.x, center.y)
    }

    pub fn origin(&self) -> Coord {
        self.origin
    }

    pub fn forward_coord(&self, c: Coord) -> Result<Coord> {
        convert(&self.to_local, c)
    }

    pub fn inverse_coord(&self, c: Coord) -> Result<Coord> {
        convert(&self.to_geographic, c)
    }

    /// Lon/lat to local meters
    pub fn forward<G: MapCoords<f64, f64, Output = G>>(&self, geometry: &G) -> Result<G> {
        geometry.try_map_coords(|c| self.forward_coord(c))
    }

    /// Local meters back to lon/lat
    pub fn inverse<G: MapCoords<f64, f64, Output = G>>(&self, geometry: &G) -> Result<G> {
        geometry.try_map_coords(|c| self.inverse_coord(c))
    }
}

fn create(from: &str, to: &str) -> Result<Proj> {
    Proj::new_known_crs(from, to, None).map_err(|e| NlgeoError::ConfigInvalid {
        key: "projection".to_string(),
        reason: format!("Failed to create projection from {} to {}: {}", from, to, e),
    })
}

fn convert(proj: &Proj, c: Coord) -> Result<Coord> {
    proj.convert((c.x, c.y))
        .map(|(x, y)| Coord { x, y })
        .map_err(|e| NlgeoError::degenerate("projection", format!("Projection failed: {}", e)))
}

/// Area of a lon/lat geometry in square meters, on the WGS 84 ellipsoid.
pub fn area_square_meters(geometry: &GeoGeometry) -> f64 {
    geometry.geodesic_area_unsigned()
}
