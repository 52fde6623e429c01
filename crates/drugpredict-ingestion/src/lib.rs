//! drugpredict-ingestion: Record retrieval from ChEMBL.
//!
//! Resolves a free-text target name or a ChEMBL target ID, then pages
//! through the target's bioactivity records (IC50 by default). The
//! [`sources::ActivitySource`] trait is the seam the pipeline depends on;
//! [`sources::chembl::ChemblClient`] is the live implementation.

pub mod error;
pub mod models;
pub mod retrieve;
pub mod sources;

pub use error::{IngestionError, Result};
pub use models::{RawActivity, RecordLimit, ResolvedTarget, TargetSuggestion};
pub use retrieve::{retrieve_target_data, RetrievedData};
