use field_common::{AnalysisError, IndexName};
use thiserror::Error;

pub type SpectralResult<T> = Result<T, SpectralError>;

#[derive(Error, Debug)]
pub enum SpectralError {
    #[error("band set is empty")]
    EmptyBandSet,

    #[error("{band} band is {found:?}, expected {expected:?}")]
    DimensionMismatch {
        band: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("{0} produced no finite values")]
    NoFiniteValues(IndexName),
}

impl From<SpectralError> for AnalysisError {
    fn from(err: SpectralError) -> Self {
        AnalysisError::IndexComputationFailed(err.to_string())
    }
}
