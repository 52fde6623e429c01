//! Shared error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DrugPredictError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Outbound request to a host outside the allowlist.
    #[error("Security error: {0}")]
    Security(String),
}

impl From<toml::de::Error> for DrugPredictError {
    fn from(err: toml::de::Error) -> Self {
        DrugPredictError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DrugPredictError>;
