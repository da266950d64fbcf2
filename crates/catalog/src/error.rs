//! Error types for catalog access.

use field_common::AnalysisError;
use thiserror::Error;

pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(Error, Debug)]
pub enum CatalogError {
    /// Credential artifact missing or malformed
    #[error("credentials unavailable at {path}: {reason}")]
    Credentials { path: String, reason: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("unexpected response from {service}: {reason}")]
    Parse {
        service: &'static str,
        reason: String,
    },
}

impl CatalogError {
    /// 5xx and transport failures are worth retrying; 4xx are not.
    pub fn is_transient(&self) -> bool {
        match self {
            CatalogError::Http(e) => !e.is_builder(),
            CatalogError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<CatalogError> for AnalysisError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Credentials { .. } => AnalysisError::CatalogUnavailable(err.to_string()),
            other => AnalysisError::DownloadFailed(other.to_string()),
        }
    }
}
