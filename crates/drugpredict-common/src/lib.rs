//! drugpredict-common: Shared errors, configuration and the network-capped
//! HTTP client used across all DrugPredict crates.

pub mod error;
pub mod config;
pub mod sandbox;

// Re-export commonly used types
pub use config::{
    ChemblConfig, Config, ModelConfig, OutputConfig, PadelConfig, PipelineConfig, ServerConfig,
};
pub use error::{DrugPredictError, Result};
