//! Bounded pool that runs submitted analyses.
//!
//! Every submission gets its own tokio task, which waits on a semaphore
//! before running the pipeline, so at most `max_workers` runs are active.
//! Progress flows into the [`TaskStore`] and out to SSE subscribers.

use std::sync::Arc;
use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinHandle;
use tracing::{error, info};

use drugpredict_analysis::{AnalysisPipeline, AnalysisRequest, ProgressObserver, Stage};

use crate::state::AppEvent;
use crate::tasks::{AnalysisTask, TaskStore, INITIAL_MESSAGE};

/// Writes a single task's progress to the store and the event channel.
pub struct TaskObserver {
    task_id: String,
    store: Arc<TaskStore>,
    events: broadcast::Sender<AppEvent>,
}

impl TaskObserver {
    pub fn new(task_id: String, store: Arc<TaskStore>, events: broadcast::Sender<AppEvent>) -> Self {
        Self { task_id, store, events }
    }
}

impl ProgressObserver for TaskObserver {
    fn update(&self, stage: Stage, progress: u8, message: &str) {
        info!("Progress {}: {} - {}% - {}", self.task_id, stage, progress, message);
        self.store.update(&self.task_id, stage, progress, message);
        // No subscribers is fine.
        let _ = self.events.send(AppEvent::TaskProgress {
            task_id: self.task_id.clone(),
            stage,
            progress,
            message: message.to_string(),
        });
    }
}

#[derive(Clone)]
pub struct WorkerPool {
    pipeline: Arc<AnalysisPipeline>,
    store: Arc<TaskStore>,
    permits: Arc<Semaphore>,
    events: broadcast::Sender<AppEvent>,
}

impl WorkerPool {
    pub fn new(
        pipeline: Arc<AnalysisPipeline>,
        store: Arc<TaskStore>,
        max_workers: usize,
        events: broadcast::Sender<AppEvent>,
    ) -> Self {
        Self {
            pipeline,
            store,
            permits: Arc::new(Semaphore::new(max_workers.max(1))),
            events,
        }
    }

    /// Runs that could start right now without queueing.
    pub fn idle_workers(&self) -> usize {
        self.permits.available_permits()
    }

    /// Register `task_id` and run `request` in the background.
    pub fn submit(&self, task_id: String, request: AnalysisRequest) -> JoinHandle<()> {
        self.store.insert(AnalysisTask::queued(task_id.clone()));
        let _ = self.events.send(AppEvent::TaskQueued {
            task_id: task_id.clone(),
            target: request.target.clone(),
        });

        let pool = self.clone();
        tokio::spawn(async move { pool.execute(task_id, request).await })
    }

    async fn execute(self, task_id: String, request: AnalysisRequest) {
        let _permit = match self.permits.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                self.finish_with_error(&task_id, Stage::Starting, &e.to_string());
                return;
            }
        };

        let observer =
            TaskObserver::new(task_id.clone(), self.store.clone(), self.events.clone());
        observer.update(Stage::Starting, 0, INITIAL_MESSAGE);
        info!("Starting analysis for target: {} with limit: {}", request.target, request.limit);

        // Run on a separate task so a panic inside the pipeline still
        // finishes the task record.
        let pipeline = self.pipeline.clone();
        let target = request.target.clone();
        let run = tokio::spawn(async move { pipeline.run(&request, &observer).await });

        match run.await {
            Ok(Ok(results)) => {
                info!("Analysis completed for target: {}", target);
                let _ = self.events.send(AppEvent::TaskComplete {
                    task_id: task_id.clone(),
                    target_name: results.target_name.clone(),
                    total_compounds: results.total_compounds,
                });
                self.store.complete(&task_id, results);
            }
            Ok(Err(e)) => {
                error!("Analysis failed: {}", e);
                self.finish_with_error(&task_id, e.stage, &e.to_string());
            }
            Err(e) => {
                error!("Analysis worker panicked: {}", e);
                let stage = self.store.get(&task_id).map(|t| t.stage).unwrap_or(Stage::Starting);
                self.finish_with_error(&task_id, stage, "Analysis worker stopped unexpectedly");
            }
        }
    }

    fn finish_with_error(&self, task_id: &str, stage: Stage, message: &str) {
        self.store.fail(task_id, message);
        let _ = self.events.send(AppEvent::TaskFailed {
            task_id: task_id.to_string(),
            stage,
            message: message.to_string(),
        });
    }
}
