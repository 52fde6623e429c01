//! Liveness check.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

use crate::state::SharedState;

pub const SERVICE_NAME: &str = "DrugPredict API";

pub async fn health(State(state): State<SharedState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "service": SERVICE_NAME,
        "tasks": state.tasks.len(),
        "idleWorkers": state.workers.idle_workers(),
    }))
}
