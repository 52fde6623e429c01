//! Activity source clients.

pub mod chembl;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{RawActivity, RecordLimit, ResolvedTarget, TargetSuggestion};

/// Common interface for bioactivity databases.
#[async_trait]
pub trait ActivitySource: Send + Sync {
    /// Resolve a free-text name or a target identifier.
    async fn resolve_target(&self, query: &str) -> Result<ResolvedTarget>;

    /// Fetch raw activity rows for a resolved target identifier.
    async fn fetch_activities(
        &self,
        target_id: &str,
        limit: RecordLimit,
    ) -> Result<Vec<RawActivity>>;

    /// Autocomplete suggestions; never fails on upstream errors.
    async fn search_targets(&self, query: &str, max_results: usize) -> Vec<TargetSuggestion>;

    /// Activity type this source filters on (e.g. IC50).
    fn activity_type(&self) -> &str;
}
