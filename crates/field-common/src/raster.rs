//! Band planes and raster metadata.

use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;
use crate::error::{AnalysisError, AnalysisResult};

/// A 2-D grid of values in row-major order (top row first).
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    width: usize,
    height: usize,
    values: Vec<f64>,
}

impl Plane {
    /// Wrap `values` as a `width` x `height` grid.
    ///
    /// Returns `None` when the value count does not match the dimensions.
    pub fn new(width: usize, height: usize, values: Vec<f64>) -> Option<Self> {
        if values.len() != width * height {
            return None;
        }
        Some(Self {
            width,
            height,
            values,
        })
    }

    /// A plane with every cell set to `value`.
    pub fn filled(width: usize, height: usize, value: f64) -> Self {
        Self {
            width,
            height,
            values: vec![value; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// (width, height)
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    pub fn get(&self, x: usize, y: usize) -> Option<f64> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.values.get(y * self.width + x).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Min, max and mean over the finite cells. `None` if there are none.
    pub fn finite_stats(&self) -> Option<PlaneStats> {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut count = 0usize;
        for &v in self.values.iter().filter(|v| v.is_finite()) {
            min = min.min(v);
            max = max.max(v);
            sum += v;
            count += 1;
        }
        (count > 0).then(|| PlaneStats {
            min,
            max,
            mean: sum / count as f64,
            finite_count: count,
        })
    }
}

/// Summary statistics of a plane's finite values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub finite_count: usize,
}

/// Georeferencing of a decoded raster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterMetadata {
    /// Extent in the raster's own CRS.
    pub bounds: BoundingBox,
    /// e.g. `EPSG:32643`; `None` when the file carries no CRS keys.
    pub crs: Option<String>,
    /// Affine transform in GDAL order:
    /// `[origin_x, pixel_width, row_rotation, origin_y, col_rotation, pixel_height]`.
    pub transform: [f64; 6],
    pub width: usize,
    pub height: usize,
}

impl RasterMetadata {
    /// Metadata for a raster with no georeferencing: one unit per pixel,
    /// origin at the top-left corner.
    pub fn pixel_grid(width: usize, height: usize) -> Self {
        let transform = [0.0, 1.0, 0.0, height as f64, 0.0, -1.0];
        Self::from_transform(transform, None, width, height)
    }

    /// Derive bounds from an affine transform.
    pub fn from_transform(
        transform: [f64; 6],
        crs: Option<String>,
        width: usize,
        height: usize,
    ) -> Self {
        let [ox, pw, rr, oy, cr, ph] = transform;
        let (w, h) = (width as f64, height as f64);
        let corners = [
            (ox, oy),
            (ox + pw * w, oy + cr * w),
            (ox + rr * h, oy + ph * h),
            (ox + pw * w + rr * h, oy + cr * w + ph * h),
        ];
        let bounds = BoundingBox::from_points(corners)
            .unwrap_or_else(|| BoundingBox::new(0.0, 0.0, 0.0, 0.0));
        Self {
            bounds,
            crs,
            transform,
            width,
            height,
        }
    }
}

/// The four spectral planes used for index computation.
///
/// All planes share the raster's width and height. A band set can only be
/// built from at least four bands, so holding one means index computation
/// may proceed.
#[derive(Debug, Clone)]
pub struct BandSet {
    pub blue: Plane,
    pub green: Plane,
    pub red: Plane,
    pub nir: Plane,
    /// Dedicated red-edge band. Four-band sources have none.
    pub red_edge: Option<Plane>,
    pub metadata: RasterMetadata,
}

impl BandSet {
    /// Build a band set, checking that every plane matches the metadata size.
    pub fn new(
        blue: Plane,
        green: Plane,
        red: Plane,
        nir: Plane,
        red_edge: Option<Plane>,
        metadata: RasterMetadata,
    ) -> AnalysisResult<Self> {
        let expected = (metadata.width, metadata.height);
        let planes = [
            ("blue", Some(&blue)),
            ("green", Some(&green)),
            ("red", Some(&red)),
            ("nir", Some(&nir)),
            ("red_edge", red_edge.as_ref()),
        ];
        for (name, plane) in planes {
            if let Some(plane) = plane {
                if plane.dimensions() != expected {
                    return Err(AnalysisError::UnsupportedRaster(format!(
                        "{} band is {}x{}, expected {}x{}",
                        name,
                        plane.width(),
                        plane.height(),
                        expected.0,
                        expected.1
                    )));
                }
            }
        }
        Ok(Self {
            blue,
            green,
            red,
            nir,
            red_edge,
            metadata,
        })
    }

    /// Map positional bands onto blue, green, red, near-infrared.
    ///
    /// Bands past the fourth are ignored; fewer than four is an
    /// `UnsupportedRaster` error.
    pub fn from_ordered_bands(bands: Vec<Plane>, metadata: RasterMetadata) -> AnalysisResult<Self> {
        if bands.len() < 4 {
            return Err(AnalysisError::UnsupportedRaster(format!(
                "expected at least 4 bands (blue, green, red, nir), found {}",
                bands.len()
            )));
        }
        let mut iter = bands.into_iter();
        let (Some(blue), Some(green), Some(red), Some(nir)) =
            (iter.next(), iter.next(), iter.next(), iter.next())
        else {
            return Err(AnalysisError::UnsupportedRaster(
                "band list shorter than reported".to_string(),
            ));
        };
        Self::new(blue, green, red, nir, None, metadata)
    }

    /// (width, height)
    pub fn dimensions(&self) -> (usize, usize) {
        (self.metadata.width, self.metadata.height)
    }

    pub fn has_red_edge(&self) -> bool {
        self.red_edge.is_some()
    }
}
