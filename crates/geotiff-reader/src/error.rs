//! Error types for GeoTIFF decoding.

use field_common::AnalysisError;
use thiserror::Error;

/// Result type for GeoTIFF reader operations.
pub type RasterResult<T> = Result<T, RasterError>;

/// Error types for GeoTIFF decoding.
#[derive(Error, Debug)]
pub enum RasterError {
    /// File could not be opened or read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or unsupported TIFF structure
    #[error("TIFF decode error: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// Not enough spectral bands
    #[error("expected at least {required} bands, found {found}")]
    TooFewBands { required: usize, found: usize },

    /// Sample encoding or compression the reader does not handle
    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    /// Pixel data does not match the declared layout
    #[error("invalid raster layout: {0}")]
    InvalidLayout(String),
}

impl From<RasterError> for AnalysisError {
    fn from(err: RasterError) -> Self {
        AnalysisError::UnsupportedRaster(err.to_string())
    }
}
