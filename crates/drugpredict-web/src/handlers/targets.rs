//! Target autocomplete.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use drugpredict_ingestion::TargetSuggestion;

use crate::state::SharedState;

pub const MAX_SUGGESTIONS: usize = 10;
const MIN_QUERY_CHARS: usize = 2;

#[derive(Debug, Default, Deserialize)]
pub struct TargetSearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct TargetSearchResponse {
    pub suggestions: Vec<TargetSuggestion>,
}

/// Upstream failures surface as an empty list.
pub async fn search_targets(
    State(state): State<SharedState>,
    Query(params): Query<TargetSearchParams>,
) -> Json<TargetSearchResponse> {
    let query = params.q.trim();
    if query.chars().count() < MIN_QUERY_CHARS {
        return Json(TargetSearchResponse { suggestions: Vec::new() });
    }

    info!("Searching targets for: {}", query);
    let mut suggestions = state.pipeline.source().search_targets(query, MAX_SUGGESTIONS).await;
    suggestions.truncate(MAX_SUGGESTIONS);
    Json(TargetSearchResponse { suggestions })
}
