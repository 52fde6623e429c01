//! Axum router with every route.

use axum::handler::HandlerWithoutStateExt;
use axum::http::{header, HeaderValue, Method};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::warn;

use crate::{
    handlers::{analysis, health, outputs, progress, targets},
    sse::sse_handler,
    state::AppState,
};

/// CORS for the configured origins; any origin when none are configured.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

pub fn build_router(state: AppState) -> Router {
    let outputs_dir = state.config.output.outputs_dir();
    let cors = cors_layer(&state.config.server.allowed_origins);
    let shared = Arc::new(state);

    Router::new()
        .route("/api/health",              get(health::health))
        .route("/api/search",              post(analysis::start_analysis))
        .route("/api/progress/{task_id}",  get(progress::get_progress))
        .route("/api/targets/search",      get(targets::search_targets))
        .route("/api/events",              get(sse_handler))
        // Generated charts
        .nest_service(
            "/outputs",
            ServeDir::new(outputs_dir).not_found_service(outputs::output_not_found.into_service()),
        )
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}
