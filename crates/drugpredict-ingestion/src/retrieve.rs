//! Target resolution plus activity download, with the minimum-size gate.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::{IngestionError, Result};
use crate::models::{RawActivity, RecordLimit, ResolvedTarget};
use crate::sources::ActivitySource;

/// Everything the pipeline needs from the retrieval stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedData {
    pub target: ResolvedTarget,
    pub records: Vec<RawActivity>,
}

/// Resolve `query`, download its activities and reject tiny datasets.
#[instrument(skip(source))]
pub async fn retrieve_target_data(
    source: &dyn ActivitySource,
    query: &str,
    limit: RecordLimit,
    min_records: usize,
) -> Result<RetrievedData> {
    info!(query = query, limit = %limit, "Searching for target");
    let target = source.resolve_target(query).await?;
    let records = source.fetch_activities(&target.chembl_id, limit).await?;

    if records.len() < min_records {
        return Err(IngestionError::InsufficientRecords {
            target: query.to_string(),
            activity_type: source.activity_type().to_string(),
            found: records.len(),
            required: min_records,
        });
    }

    info!(records = records.len(), target = %target.display_name, "Retrieved compounds");
    Ok(RetrievedData { target, records })
}
