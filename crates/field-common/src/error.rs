//! Error taxonomy for field analysis.

use thiserror::Error;

/// Result type alias using AnalysisError.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Failure kinds that can surface while analysing a field.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Invalid field geometry: {0}")]
    InvalidGeometry(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Unsupported raster: {0}")]
    UnsupportedRaster(String),

    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("Index computation failed: {0}")]
    IndexComputationFailed(String),

    #[error("Overlay encoding failed: {0}")]
    EncodingFailed(String),
}

impl AnalysisError {
    /// Whether this failure aborts the whole request.
    ///
    /// Encoding failures only drop one overlay, and an unavailable catalog
    /// degrades to a pending envelope.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            AnalysisError::EncodingFailed(_) | AnalysisError::CatalogUnavailable(_)
        )
    }

    /// Short machine-readable code, used as a metrics label.
    pub fn code(&self) -> &'static str {
        match self {
            AnalysisError::InvalidGeometry(_) => "invalid_geometry",
            AnalysisError::DownloadFailed(_) => "download_failed",
            AnalysisError::UnsupportedRaster(_) => "unsupported_raster",
            AnalysisError::CatalogUnavailable(_) => "catalog_unavailable",
            AnalysisError::IndexComputationFailed(_) => "index_computation_failed",
            AnalysisError::EncodingFailed(_) => "encoding_failed",
        }
    }
}
