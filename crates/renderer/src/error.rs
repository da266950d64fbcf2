use field_common::AnalysisError;
use thiserror::Error;

pub type RenderResult<T> = Result<T, RenderError>;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("cannot render an empty {width}x{height} plane")]
    EmptyPlane { width: usize, height: usize },

    #[error("pixel buffer does not match {width}x{height}")]
    BufferSize { width: usize, height: usize },

    #[error("PNG encoding failed: {0}")]
    Png(#[from] std::io::Error),
}

impl From<RenderError> for AnalysisError {
    fn from(err: RenderError) -> Self {
        AnalysisError::EncodingFailed(err.to_string())
    }
}
