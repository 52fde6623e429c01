//! Shared application state for the web server.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use drugpredict_analysis::{AnalysisPipeline, Stage};
use drugpredict_common::Config;

use crate::tasks::{RetentionPolicy, TaskStore};
use crate::worker::WorkerPool;

/// Events pushed to connected clients via SSE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    /// A task was accepted and is waiting for a worker
    TaskQueued { task_id: String, target: String },
    /// A stage transition inside a running task
    TaskProgress { task_id: String, stage: Stage, progress: u8, message: String },
    /// A task finished with results
    TaskComplete { task_id: String, target_name: String, total_compounds: usize },
    /// A task stopped with an error
    TaskFailed { task_id: String, stage: Stage, message: String },
}

/// Shared state injected into every Axum handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pipeline: Arc<AnalysisPipeline>,
    pub tasks: Arc<TaskStore>,
    pub workers: WorkerPool,
    /// Broadcast channel for SSE push events
    pub event_tx: broadcast::Sender<AppEvent>,
}

impl AppState {
    pub fn new(config: Arc<Config>, pipeline: Arc<AnalysisPipeline>) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        let tasks = Arc::new(TaskStore::new(RetentionPolicy::from_config(&config.server)));
        let workers = WorkerPool::new(
            pipeline.clone(),
            tasks.clone(),
            config.server.max_workers,
            event_tx.clone(),
        );
        Self { config, pipeline, tasks, workers, event_tx }
    }

    /// Live ChEMBL client and local descriptor tooling.
    pub fn from_config(config: Arc<Config>) -> anyhow::Result<Self> {
        let pipeline = Arc::new(AnalysisPipeline::from_config(config.clone())?);
        Ok(Self::new(config, pipeline))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.event_tx.subscribe()
    }
}

pub type SharedState = Arc<AppState>;
