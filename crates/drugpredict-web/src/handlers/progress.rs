//! Progress polling.

use axum::extract::{Path, State};
use axum::Json;

use crate::error::ApiError;
use crate::state::SharedState;
use crate::tasks::ProgressDocument;

pub async fn get_progress(
    State(state): State<SharedState>,
    Path(task_id): Path<String>,
) -> Result<Json<ProgressDocument>, ApiError> {
    state
        .tasks
        .get(&task_id)
        .map(|task| Json(task.progress_document()))
        .ok_or(ApiError::TaskNotFound(task_id))
}
