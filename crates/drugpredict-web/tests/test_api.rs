//! HTTP API tests driven through the router with `tower::ServiceExt`.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use drugpredict_analysis::AnalysisPipeline;
use drugpredict_common::Config;
use drugpredict_ingestion::TargetSuggestion;
use drugpredict_molecules::LipinskiEngine;
use drugpredict_test_utils::{
    synthetic_activities, InMemoryActivitySource, UnavailableDescriptors, MIXED_POTENCIES_NM,
};
use drugpredict_web::{build_router, AppEvent, AppState};

fn test_state(data_dir: &std::path::Path) -> AppState {
    let mut config = Config::default();
    config.output.data_dir = data_dir.to_path_buf();
    config.model.n_estimators = 20;
    config.server.max_workers = 2;
    let config = Arc::new(config);

    let source = InMemoryActivitySource::new(synthetic_activities(&MIXED_POTENCIES_NM))
        .with_suggestions(vec![TargetSuggestion {
            id: "CHEMBL203".into(),
            name: "Epidermal growth factor receptor erbB1".into(),
            organism: "Homo sapiens".into(),
            target_type: "SINGLE PROTEIN".into(),
            description: "Epidermal growth factor receptor erbB1".into(),
        }]);
    let pipeline = Arc::new(AnalysisPipeline::new(
        config.clone(),
        Arc::new(source),
        Arc::new(LipinskiEngine::new()),
        Arc::new(UnavailableDescriptors),
    ));
    AppState::new(config, pipeline)
}

async fn send(state: &AppState, request: Request<Body>) -> Response {
    build_router(state.clone()).oneshot(request).await.unwrap()
}

async fn get(state: &AppState, uri: &str) -> Response {
    send(state, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

async fn post_json(state: &AppState, uri: &str, body: &str) -> Response {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(state, request).await
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Wait for the terminal event of `task_id`.
async fn wait_for_finish(rx: &mut tokio::sync::broadcast::Receiver<AppEvent>, task_id: &str) -> AppEvent {
    tokio::time::timeout(Duration::from_secs(60), async {
        loop {
            let event = rx.recv().await.unwrap();
            if event.task_id() != task_id {
                continue;
            }
            if matches!(event, AppEvent::TaskComplete { .. } | AppEvent::TaskFailed { .. }) {
                return event;
            }
        }
    })
    .await
    .expect("task did not finish in time")
}

#[tokio::test]
async fn test_health() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path());
    let response = get(&state, "/api/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "DrugPredict API");
    assert!(body["timestamp"].as_str().is_some());
}

#[tokio::test]
async fn test_search_requires_target() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path());

    for body in [r#"{}"#, r#"{"target":""}"#, r#"{"target":"   ","limit":"100"}"#] {
        let response = post_json(&state, "/api/search", body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await, json!({"error": "Target parameter is required"}));
    }
    assert!(state.tasks.is_empty());
}

#[tokio::test]
async fn test_search_rejects_bad_limit_and_bad_json() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path());

    let response = post_json(&state, "/api/search", r#"{"target":"EGFR","limit":"lots"}"#).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"].as_str().is_some());

    let response = post_json(&state, "/api/search", "not json").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(state.tasks.is_empty());
}

#[tokio::test]
async fn test_unknown_task_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path());
    let response = get(&state, "/api/progress/EGFR_1000_0").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await, json!({"error": "Task not found"}));
}

#[tokio::test]
async fn test_target_search() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path());

    let short = json_body(get(&state, "/api/targets/search?q=E").await).await;
    assert_eq!(short, json!({"suggestions": []}));
    let missing = json_body(get(&state, "/api/targets/search").await).await;
    assert_eq!(missing, json!({"suggestions": []}));

    let found = json_body(get(&state, "/api/targets/search?q=EGFR").await).await;
    let suggestions = found["suggestions"].as_array().unwrap();
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0]["id"], "CHEMBL203");
    assert_eq!(suggestions[0]["type"], "SINGLE PROTEIN");
}

#[tokio::test]
async fn test_outputs_served_and_missing_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path());
    let outputs = state.config.output.outputs_dir();
    std::fs::create_dir_all(&outputs).unwrap();
    std::fs::write(outputs.join("plot_MW.svg"), "<svg></svg>").unwrap();

    let response = get(&state, "/outputs/plot_MW.svg").await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"<svg></svg>");

    let response = get(&state, "/outputs/nope.svg").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await, json!({"error": "File not found"}));
}

#[tokio::test]
async fn test_analysis_runs_to_completion() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path());
    let mut events = state.subscribe();

    let response = post_json(&state, "/api/search", r#"{"target":"EGFR"}"#).await;
    assert_eq!(response.status(), StatusCode::OK);
    let started = json_body(response).await;
    assert_eq!(started["status"], "started");
    assert_eq!(started["message"], "Analysis started. Use the task ID to check progress.");
    let task_id = started["taskId"].as_str().unwrap().to_string();
    assert!(task_id.starts_with("EGFR_1000_"));

    // Registered before the worker starts.
    let early = json_body(get(&state, &format!("/api/progress/{}", task_id)).await).await;
    assert_eq!(early["status"], "running");
    assert!(early.get("results").is_none());

    match wait_for_finish(&mut events, &task_id).await {
        AppEvent::TaskComplete { total_compounds, .. } => assert_eq!(total_compounds, 12),
        other => panic!("unexpected event: {:?}", other),
    }

    let done = json_body(get(&state, &format!("/api/progress/{}", task_id)).await).await;
    assert_eq!(done["status"], "complete");
    assert_eq!(done["currentStep"], "complete");
    assert_eq!(done["progress"], 100);
    assert_eq!(done["message"], "Analysis completed successfully");
    assert_eq!(done["results"]["targetId"], "CHEMBL203");
    assert_eq!(done["results"]["totalCompounds"], 12);
    assert_eq!(done["results"]["dataLimit"], "1000");
    assert_eq!(done["results"]["statistics"]["mannWhitneyTests"].as_array().unwrap().len(), 5);

    // Charts of this run are served from its own directory.
    let run_id = done["results"]["runId"].as_str().unwrap();
    let chart = done["results"]["plots"][1]["imagePath"].as_str().unwrap();
    assert_eq!(chart, format!("/outputs/{}/plot_MW_vs_LogP.svg", run_id));
    let response = get(&state, chart).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_failed_analysis_reports_error() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path());
    let mut events = state.subscribe();

    let response = post_json(&state, "/api/search", r#"{"target":"Unknown kinase","limit":50}"#).await;
    let task_id = json_body(response).await["taskId"].as_str().unwrap().to_string();
    assert!(task_id.starts_with("Unknown kinase_50_"));

    match wait_for_finish(&mut events, &task_id).await {
        AppEvent::TaskFailed { stage, .. } => assert_eq!(stage.as_str(), "retrieving"),
        other => panic!("unexpected event: {:?}", other),
    }

    let response = get(&state, &format!("/api/progress/{}", task_id.replace(' ', "%20"))).await;
    let failed = json_body(response).await;
    assert_eq!(failed["status"], "error");
    assert_eq!(failed["currentStep"], "retrieving");
    assert_eq!(failed["message"], "No targets found for: Unknown kinase");
    assert!(failed.get("results").is_none());
}
