//! Retrieval error types.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, IngestionError>;

#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("No targets found for: {0}")]
    TargetNotFound(String),

    #[error("Insufficient {activity_type} data for target: {target} (found {found} compounds, minimum {required} required)")]
    InsufficientRecords {
        target: String,
        activity_type: String,
        found: usize,
        required: usize,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("ChEMBL returned HTTP {status} for {url}")]
    Upstream { status: u16, url: String },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Common(#[from] drugpredict_common::DrugPredictError),
}

impl IngestionError {
    /// Errors caused by the caller's input rather than by ChEMBL.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            IngestionError::TargetNotFound(_)
                | IngestionError::InsufficientRecords { .. }
                | IngestionError::InvalidRequest(_)
        )
    }
}
