//! Server startup.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use drugpredict_common::Config;

use crate::router::build_router;
use crate::state::AppState;

/// Bind `config.server.bind` and serve until the process is stopped.
pub async fn serve(config: Arc<Config>) -> anyhow::Result<()> {
    let state = AppState::from_config(config.clone())?;
    serve_with_state(state).await
}

pub async fn serve_with_state(state: AppState) -> anyhow::Result<()> {
    let config = state.config.clone();
    for dir in [config.output.processed_dir(), config.output.outputs_dir()] {
        tokio::fs::create_dir_all(&dir).await?;
    }

    let sweeper = state
        .tasks
        .clone()
        .spawn_sweeper(Duration::from_secs(config.server.sweep_interval_secs));

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!("Server listening on http://{}", listener.local_addr()?);
    info!(
        workers = config.server.max_workers,
        outputs = %config.output.outputs_dir().display(),
        "Serving analysis API"
    );

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;
    sweeper.abort();
    served?;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!("Could not listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
