//! drugpredict-analysis: From raw bioassay rows to statistics, charts and a
//! potency model.
//!
//! Stages live in their own modules and are wired together by
//! [`pipeline::AnalysisPipeline`]:
//! - [`preprocess`], [`classify`], [`descriptors`], [`normalize`] build the
//!   enriched dataset
//! - [`stats`] compares active and inactive compounds
//! - [`model`] trains and evaluates the random forest
//! - [`plots`] and [`artifacts`] write charts and CSV files
//! - [`report`] assembles the client payload

pub mod artifacts;
pub mod classify;
pub mod descriptors;
pub mod error;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod plots;
pub mod preprocess;
pub mod records;
pub mod report;
pub mod stats;

pub use error::{AnalysisError, Result};
pub use pipeline::{
    AnalysisPipeline, AnalysisRequest, LoggingObserver, PipelineError, ProgressObserver, Stage,
};
pub use records::{ClassCounts, CompoundRecord, PotencyClass};
pub use report::AnalysisResults;
