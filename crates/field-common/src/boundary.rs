//! Field boundaries and the polygon geometry built from them.

use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;
use crate::error::{AnalysisError, AnalysisResult};

/// Buffer applied around a field boundary unless the caller says otherwise.
pub const DEFAULT_BUFFER_METERS: f64 = 10.0;

/// Meters per degree of latitude (mean, WGS84).
const METERS_PER_DEGREE: f64 = 111_320.0;

/// One boundary vertex in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    fn validate(&self) -> AnalysisResult<()> {
        if !self.lat.is_finite() || !self.lng.is_finite() {
            return Err(AnalysisError::InvalidGeometry(format!(
                "non-finite coordinate ({}, {})",
                self.lat, self.lng
            )));
        }
        if !(-90.0..=90.0).contains(&self.lat) || !(-180.0..=180.0).contains(&self.lng) {
            return Err(AnalysisError::InvalidGeometry(format!(
                "coordinate out of range ({}, {})",
                self.lat, self.lng
            )));
        }
        Ok(())
    }
}

/// A closed polygon ring with an isotropic buffer distance.
///
/// Built once per request from the boundary collaborator's vertices. The
/// ring always repeats its first vertex at the end.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    ring: Vec<LatLng>,
    buffer_meters: f64,
}

impl Geometry {
    /// Close `boundary` into a polygon ring and attach a buffer distance.
    ///
    /// Needs at least three distinct vertices. A boundary that is already
    /// closed is not closed a second time.
    pub fn build(boundary: &[LatLng], buffer_meters: f64) -> AnalysisResult<Self> {
        if !buffer_meters.is_finite() || buffer_meters < 0.0 {
            return Err(AnalysisError::InvalidGeometry(format!(
                "buffer distance must be a non-negative number of meters, got {}",
                buffer_meters
            )));
        }

        for vertex in boundary {
            vertex.validate()?;
        }

        let mut distinct: Vec<LatLng> = Vec::with_capacity(boundary.len());
        for vertex in boundary {
            if !distinct.contains(vertex) {
                distinct.push(*vertex);
            }
        }
        if distinct.len() < 3 {
            return Err(AnalysisError::InvalidGeometry(format!(
                "boundary needs at least 3 distinct vertices, got {}",
                distinct.len()
            )));
        }

        let mut ring = boundary.to_vec();
        if ring.first() != ring.last() {
            ring.push(ring[0]);
        }

        Ok(Self {
            ring,
            buffer_meters,
        })
    }

    /// Same ring with a different buffer distance.
    pub fn with_buffer(&self, buffer_meters: f64) -> AnalysisResult<Self> {
        Self::build(&self.ring, buffer_meters)
    }

    /// The closed ring, first vertex repeated last.
    pub fn ring(&self) -> &[LatLng] {
        &self.ring
    }

    pub fn buffer_meters(&self) -> f64 {
        self.buffer_meters
    }

    /// Bounding box of the unbuffered ring (x = longitude).
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::from_points(self.ring.iter().map(|p| (p.lng, p.lat)))
            .unwrap_or_else(|| BoundingBox::new(0.0, 0.0, 0.0, 0.0))
    }

    /// Bounding box grown by the buffer distance.
    ///
    /// Meters are converted to degrees at the box's central latitude, so the
    /// result is approximate but always contains the buffered polygon for
    /// field-sized extents.
    pub fn buffered_bounds(&self) -> BoundingBox {
        let bounds = self.bounds();
        if self.buffer_meters == 0.0 {
            return bounds;
        }
        let mid_lat = (bounds.min_y + bounds.max_y) / 2.0;
        let dy = self.buffer_meters / METERS_PER_DEGREE;
        let cos_lat = mid_lat.to_radians().cos().max(1e-6);
        let dx = self.buffer_meters / (METERS_PER_DEGREE * cos_lat);
        bounds.expand(dx, dy)
    }

    /// GeoJSON Polygon geometry, `[lng, lat]` ordered.
    pub fn to_geojson(&self) -> serde_json::Value {
        let coords: Vec<[f64; 2]> = self.ring.iter().map(|p| [p.lng, p.lat]).collect();
        serde_json::json!({
            "type": "Polygon",
            "coordinates": [coords],
        })
    }
}
