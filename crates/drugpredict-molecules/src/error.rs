use thiserror::Error;

pub type Result<T> = std::result::Result<T, MoleculeError>;

#[derive(Debug, Error)]
pub enum MoleculeError {
    #[error("Cannot parse SMILES {smiles:?}: {reason}")]
    Parse { smiles: String, reason: String },

    #[error("Unsupported element: {0}")]
    UnsupportedElement(String),

    #[error("Explicit valence {valence} exceeds the maximum for {element}")]
    Valence { element: String, valence: u32 },

    #[error("Extended descriptor computation unavailable: {0}")]
    Unavailable(String),

    #[error("Extended descriptor computation timed out after {0}s")]
    Timeout(u64),

    #[error("Extended descriptor computation failed: {0}")]
    Failed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl MoleculeError {
    pub(crate) fn parse(smiles: &str, reason: impl Into<String>) -> Self {
        MoleculeError::Parse {
            smiles: smiles.to_string(),
            reason: reason.into(),
        }
    }
}
