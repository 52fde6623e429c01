//! In-memory registry of analysis tasks.
//!
//! Each submitted run owns one [`AnalysisTask`], written only by the worker
//! running it. Finished tasks are evicted once older than the retention TTL,
//! or oldest-first when the store exceeds its entry cap. Running tasks are
//! never evicted.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use drugpredict_analysis::{AnalysisResults, Stage};
use drugpredict_common::ServerConfig;

pub const INITIAL_MESSAGE: &str = "Initializing analysis...";
pub const QUEUED_MESSAGE: &str = "Queued, waiting for a free worker...";
pub const COMPLETE_MESSAGE: &str = "Analysis completed successfully";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Running,
    Complete,
    Error,
}

impl TaskStatus {
    pub fn is_finished(&self) -> bool {
        !matches!(self, TaskStatus::Running)
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisTask {
    pub id: String,
    pub status: TaskStatus,
    pub stage: Stage,
    pub progress: u8,
    pub message: String,
    pub results: Option<AnalysisResults>,
    pub created_at: Instant,
    pub finished_at: Option<Instant>,
}

impl AnalysisTask {
    /// A task waiting for a worker.
    pub fn queued(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: TaskStatus::Running,
            stage: Stage::Starting,
            progress: 0,
            message: QUEUED_MESSAGE.to_string(),
            results: None,
            created_at: Instant::now(),
            finished_at: None,
        }
    }

    /// Document returned by the progress endpoint. `results` only appears
    /// once the task is complete.
    pub fn progress_document(&self) -> ProgressDocument {
        ProgressDocument {
            task_id: self.id.clone(),
            status: self.status,
            current_step: self.stage,
            progress: self.progress,
            message: self.message.clone(),
            results: match self.status {
                TaskStatus::Complete => self.results.clone(),
                _ => None,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressDocument {
    pub task_id: String,
    pub status: TaskStatus,
    pub current_step: Stage,
    pub progress: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<AnalysisResults>,
}

/// When finished tasks may be dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub ttl: Duration,
    pub max_entries: usize,
}

impl RetentionPolicy {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            ttl: Duration::from_secs(config.task_ttl_secs),
            max_entries: config.max_tasks.max(1),
        }
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::from_config(&ServerConfig::default())
    }
}

pub struct TaskStore {
    tasks: RwLock<HashMap<String, AnalysisTask>>,
    policy: RetentionPolicy,
}

impl TaskStore {
    pub fn new(policy: RetentionPolicy) -> Self {
        Self { tasks: RwLock::new(HashMap::new()), policy }
    }

    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    // A panicking writer leaves the map itself consistent, so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, AnalysisTask>> {
        self.tasks.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, AnalysisTask>> {
        self.tasks.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a task, evicting finished tasks first to make room.
    /// A task with the same id is replaced.
    pub fn insert(&self, task: AnalysisTask) {
        let mut tasks = self.write();
        Self::evict_locked(&mut tasks, &self.policy, Instant::now(), 1);
        if let Some(previous) = tasks.get(&task.id) {
            if !previous.status.is_finished() {
                warn!(task_id = %task.id, "Replacing a task that is still running");
            }
        }
        tasks.insert(task.id.clone(), task);
    }

    /// Snapshot of a task.
    pub fn get(&self, id: &str) -> Option<AnalysisTask> {
        self.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Record a stage transition. Ignored once the task has finished.
    pub fn update(&self, id: &str, stage: Stage, progress: u8, message: &str) {
        let mut tasks = self.write();
        if let Some(task) = tasks.get_mut(id).filter(|t| !t.status.is_finished()) {
            task.stage = stage;
            task.progress = progress.min(100);
            task.message = message.to_string();
        }
    }

    pub fn complete(&self, id: &str, results: AnalysisResults) {
        let mut tasks = self.write();
        if let Some(task) = tasks.get_mut(id) {
            task.status = TaskStatus::Complete;
            task.stage = Stage::Complete;
            task.progress = 100;
            task.message = COMPLETE_MESSAGE.to_string();
            task.results = Some(results);
            task.finished_at = Some(Instant::now());
        }
    }

    /// Mark the task failed. The stage stays where the failure happened.
    pub fn fail(&self, id: &str, message: &str) {
        let mut tasks = self.write();
        if let Some(task) = tasks.get_mut(id) {
            task.status = TaskStatus::Error;
            task.message = message.to_string();
            task.finished_at = Some(Instant::now());
        }
    }

    /// Apply the retention policy as of `now`. Returns the number evicted.
    pub fn evict_at(&self, now: Instant) -> usize {
        let mut tasks = self.write();
        Self::evict_locked(&mut tasks, &self.policy, now, 0)
    }

    pub fn evict_expired(&self) -> usize {
        self.evict_at(Instant::now())
    }

    fn evict_locked(
        tasks: &mut HashMap<String, AnalysisTask>,
        policy: &RetentionPolicy,
        now: Instant,
        reserve: usize,
    ) -> usize {
        let before = tasks.len();
        tasks.retain(|_, t| match t.finished_at {
            Some(done) => now.saturating_duration_since(done) < policy.ttl,
            None => true,
        });

        let cap = policy.max_entries.saturating_sub(reserve);
        if tasks.len() > cap {
            let mut finished: Vec<(Instant, String)> = tasks
                .values()
                .filter_map(|t| t.finished_at.map(|done| (done, t.id.clone())))
                .collect();
            finished.sort();
            let excess = tasks.len() - cap;
            for (_, id) in finished.into_iter().take(excess) {
                tasks.remove(&id);
            }
        }

        let evicted = before - tasks.len();
        if evicted > 0 {
            debug!(evicted, remaining = tasks.len(), "Evicted finished tasks");
        }
        evicted
    }

    /// Periodically apply the retention policy until the runtime shuts down.
    pub fn spawn_sweeper(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        info!(interval_secs = every.as_secs(), "Starting task sweeper");
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every.max(Duration::from_millis(10)));
            // First tick fires immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                self.evict_expired();
            }
        })
    }
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new(RetentionPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(ttl_secs: u64, max_entries: usize) -> TaskStore {
        TaskStore::new(RetentionPolicy { ttl: Duration::from_secs(ttl_secs), max_entries })
    }

    #[test]
    fn test_queued_task_document() {
        let store = TaskStore::default();
        store.insert(AnalysisTask::queued("EGFR_1000_1700000000"));
        let doc = store.get("EGFR_1000_1700000000").unwrap().progress_document();
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["taskId"], "EGFR_1000_1700000000");
        assert_eq!(json["status"], "running");
        assert_eq!(json["currentStep"], "starting");
        assert_eq!(json["progress"], 0);
        assert!(json.get("results").is_none());
    }

    #[test]
    fn test_update_then_fail_keeps_stage() {
        let store = TaskStore::default();
        store.insert(AnalysisTask::queued("t"));
        store.update("t", Stage::Retrieving, 15, "Searching ChemBL database for EGFR...");
        store.fail("t", "No targets found for: EGFR");

        let task = store.get("t").unwrap();
        assert_eq!(task.status, TaskStatus::Error);
        assert_eq!(task.stage, Stage::Retrieving);
        assert_eq!(task.progress, 15);
        assert_eq!(task.message, "No targets found for: EGFR");

        // Late updates do not resurrect a finished task.
        store.update("t", Stage::Preprocessing, 25, "late");
        assert_eq!(store.get("t").unwrap().stage, Stage::Retrieving);
    }

    #[test]
    fn test_unknown_task_updates_are_ignored() {
        let store = TaskStore::default();
        store.update("missing", Stage::Ml, 90, "x");
        store.fail("missing", "x");
        assert!(store.get("missing").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_ttl_evicts_only_finished_tasks() {
        let store = store(60, 100);
        store.insert(AnalysisTask::queued("running"));
        store.insert(AnalysisTask::queued("failed"));
        store.fail("failed", "boom");

        assert_eq!(store.evict_at(Instant::now()), 0);
        let later = Instant::now() + Duration::from_secs(61);
        assert_eq!(store.evict_at(later), 1);
        assert!(store.get("running").is_some());
        assert!(store.get("failed").is_none());
    }

    #[test]
    fn test_cap_evicts_oldest_finished_on_insert() {
        let store = store(3600, 2);
        store.insert(AnalysisTask::queued("a"));
        store.fail("a", "first");
        std::thread::sleep(Duration::from_millis(5));
        store.insert(AnalysisTask::queued("b"));
        store.fail("b", "second");

        store.insert(AnalysisTask::queued("c"));
        assert_eq!(store.len(), 2);
        assert!(store.get("a").is_none());
        assert!(store.get("b").is_some());
        assert!(store.get("c").is_some());
    }

    #[test]
    fn test_cap_never_evicts_running_tasks() {
        let store = store(3600, 1);
        store.insert(AnalysisTask::queued("a"));
        store.insert(AnalysisTask::queued("b"));
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_sweeper_evicts_expired() {
        let store = Arc::new(store(0, 10));
        store.insert(AnalysisTask::queued("done"));
        store.fail("done", "x");
        let handle = store.clone().spawn_sweeper(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(60)).await;
        handle.abort();
        assert!(store.is_empty());
    }
}
