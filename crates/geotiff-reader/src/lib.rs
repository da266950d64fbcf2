//! GeoTIFF reader for multispectral field imagery.
//!
//! Decodes a multi-band GeoTIFF into full-resolution `f64` planes plus its
//! georeferencing. Bands are mapped by position:
//!
//! | Band | Meaning |
//! |------|---------|
//! | 1 | blue |
//! | 2 | green |
//! | 3 | red |
//! | 4 | near-infrared |
//!
//! Extra bands are decoded but ignored when building a [`BandSet`].
//!
//! # Supported layouts
//!
//! - One image with 4+ interleaved samples per pixel, either MinIsBlack (the
//!   GDAL / rasterio default for analytic products) or RGB with extra samples
//! - One image with separate sample planes
//! - One single-sample page per band, all pages the same size
//!
//! Multi-sample images that `tiff` cannot decode itself are read from their
//! strips or tiles directly (uncompressed, LZW or Deflate).
//!
//! No reprojection or resampling is ever done.

mod chunks;
mod error;
pub mod geokeys;
mod reader;

pub use error::{RasterError, RasterResult};
pub use reader::{decode_raster, read_raster, DecodedRaster};

use field_common::{AnalysisResult, BandSet};
use std::path::Path;

/// Minimum number of bands required to build a band set.
pub const REQUIRED_BANDS: usize = 4;

/// Read `path` and map its first four bands onto a [`BandSet`].
///
/// Any failure (unreadable file, unsupported layout, fewer than four bands)
/// surfaces as `AnalysisError::UnsupportedRaster`.
pub fn read_band_set(path: impl AsRef<Path>) -> AnalysisResult<BandSet> {
    let raster = read_raster(path)?;
    raster.into_band_set()
}
