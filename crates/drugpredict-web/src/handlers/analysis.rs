//! Analysis submission.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use drugpredict_analysis::AnalysisRequest;
use drugpredict_ingestion::RecordLimit;

use crate::error::ApiError;
use crate::state::SharedState;

pub const STARTED_MESSAGE: &str = "Analysis started. Use the task ID to check progress.";

/// `limit` arrives either as a JSON number or as text (`"500"`, `"all"`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LimitParam {
    Count(u64),
    Text(String),
}

impl LimitParam {
    fn as_text(&self) -> String {
        match self {
            LimitParam::Count(n) => n.to_string(),
            LimitParam::Text(s) => s.trim().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub target: Option<String>,
    pub limit: Option<LimitParam>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub task_id: String,
    pub status: &'static str,
    pub message: &'static str,
}

/// Ids are not unique across identical submissions within one second.
pub fn task_id(target: &str, limit: &str, unix_secs: i64) -> String {
    format!("{}_{}_{}", target, limit, unix_secs)
}

pub async fn start_analysis(
    State(state): State<SharedState>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::Validation(e.body_text()))?;

    let target = body
        .target
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Validation("Target parameter is required".into()))?
        .to_string();

    let limit_text = match &body.limit {
        Some(limit) => limit.as_text(),
        None => state.config.pipeline.default_limit.clone(),
    };
    let limit: RecordLimit = match &body.limit {
        Some(_) => limit_text.parse().map_err(|e| ApiError::Validation(format!("{}", e)))?,
        // A bad configured default is a server fault, not the caller's.
        None => limit_text.parse().map_err(|e| ApiError::Submit(format!("{}", e)))?,
    };

    let id = task_id(&target, &limit_text, Utc::now().timestamp());
    info!(task_id = %id, "Accepted analysis request for {} (limit {})", target, limit);
    state.workers.submit(id.clone(), AnalysisRequest { target, limit });

    Ok(Json(SearchResponse { task_id: id, status: "started", message: STARTED_MESSAGE }))
}
