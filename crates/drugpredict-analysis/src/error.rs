//! Analysis error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Input the pipeline cannot continue with; shown to clients verbatim.
    #[error("{0}")]
    Validation(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
