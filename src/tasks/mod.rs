//! Session-scoped task lifecycle manager.
//!
//! Tracks one long-running analysis per `(task id, session id)`. Each task
//! owns an abortable worker: cancellation is immediate and unconditional,
//! killing the worker at its next await point (which includes blocked
//! network calls) and discarding partial work. The registry is the one piece
//! of truly shared mutable state in the system and sits behind a single
//! mutex; all mutations (insert, cancel, reap) are serialized.
//!
//! Starting a task for a session first cancels the session's other tasks:
//! one active analysis per session, by policy.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info};
use uuid::Uuid;

use crate::constants::{TASK_MAX_AGE_SECS, TASK_REAPER_INTERVAL_SECS};

/// Lifecycle state of a tracked task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Running,
    Completed,
    Cancelled,
}

struct TaskEntry {
    session_id: String,
    started_at: Instant,
    handle: Option<JoinHandle<()>>,
    result: Option<Value>,
    state: TaskState,
}

impl TaskEntry {
    fn worker_exited(&self) -> bool {
        // A missing handle means the task is still being registered.
        self.state != TaskState::Running
            || self.handle.as_ref().is_some_and(|h| h.is_finished())
    }
}

/// Outcome of [`TaskManager::cancel_all`].
#[derive(Debug, Clone)]
pub struct CancelOutcome {
    pub cancelled: usize,
    pub task_ids: Vec<Uuid>,
}

struct Registry {
    tasks: Mutex<HashMap<Uuid, TaskEntry>>,
    reaper_running: AtomicBool,
    max_age: Duration,
}

/// Cloneable handle to the registry of in-flight analyses.
#[derive(Clone)]
pub struct TaskManager {
    inner: Arc<Registry>,
}

impl TaskManager {
    pub fn new() -> Self {
        Self::with_max_age(Duration::from_secs(TASK_MAX_AGE_SECS))
    }

    /// A manager whose reaper uses a custom task age limit.
    pub fn with_max_age(max_age: Duration) -> Self {
        Self {
            inner: Arc::new(Registry {
                tasks: Mutex::new(HashMap::new()),
                reaper_running: AtomicBool::new(false),
                max_age,
            }),
        }
    }

    /// Dispatches `work` as a new task owned by `session_id`, cancelling any
    /// other task the session owns first.
    pub fn start<F>(&self, session_id: &str, work: F) -> Uuid
    where
        F: Future<Output = Value> + Send + 'static,
    {
        let previous = self.cancel_all(session_id);
        if previous.cancelled > 0 {
            debug!(
                session_id,
                cancelled = previous.cancelled,
                "single-flight: cancelled session's previous tasks"
            );
        }

        let task_id = Uuid::new_v4();

        // Register before spawning so a fast worker can always record its
        // result.
        self.inner.tasks.lock().insert(task_id, TaskEntry {
            session_id: session_id.to_string(),
            started_at: Instant::now(),
            handle: None,
            result: None,
            state: TaskState::Running,
        });

        let registry = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            let value = work.await;
            let mut tasks = registry.tasks.lock();
            if let Some(entry) = tasks.get_mut(&task_id)
                && entry.state == TaskState::Running
            {
                entry.result = Some(value);
                entry.state = TaskState::Completed;
            }
        });

        if let Some(entry) = self.inner.tasks.lock().get_mut(&task_id) {
            entry.handle = Some(handle);
        }

        info!(%task_id, session_id, "task started");
        task_id
    }

    /// Hard-cancels a task. Returns `false` for unknown ids.
    pub fn cancel(&self, task_id: Uuid) -> bool {
        let mut tasks = self.inner.tasks.lock();
        let Some(entry) = tasks.get_mut(&task_id) else {
            return false;
        };

        Self::cancel_entry(entry, json!({"status": "cancelled"}));
        info!(%task_id, "task cancelled");
        true
    }

    /// Hard-cancels every running task owned by `session_id`.
    pub fn cancel_all(&self, session_id: &str) -> CancelOutcome {
        let mut tasks = self.inner.tasks.lock();
        let mut task_ids = Vec::new();

        for (task_id, entry) in tasks.iter_mut() {
            if entry.session_id == session_id && entry.state == TaskState::Running {
                Self::cancel_entry(entry, json!({"status": "cancelled", "reason": "user_exit"}));
                task_ids.push(*task_id);
            }
        }

        CancelOutcome {
            cancelled: task_ids.len(),
            task_ids,
        }
    }

    /// Returns a task's result (completed, cancelled, or error value), if any.
    pub fn get_result(&self, task_id: Uuid) -> Option<Value> {
        self.inner.tasks.lock().get(&task_id).and_then(|e| e.result.clone())
    }

    /// Returns a task's state, if the task is still tracked.
    pub fn state(&self, task_id: Uuid) -> Option<TaskState> {
        self.inner.tasks.lock().get(&task_id).map(|e| e.state)
    }

    /// Ids of the session's running tasks. Entries whose worker has exited
    /// are reaped on the way.
    pub fn list_active(&self, session_id: &str) -> Vec<Uuid> {
        let mut tasks = self.inner.tasks.lock();
        let mut active = Vec::new();

        tasks.retain(|task_id, entry| {
            if entry.worker_exited() {
                return false;
            }
            if entry.session_id == session_id {
                active.push(*task_id);
            }
            true
        });

        active
    }

    /// Removes tasks older than `max_age`, aborting their workers first.
    pub fn reap_expired(&self, max_age: Duration) -> Vec<Uuid> {
        let mut tasks = self.inner.tasks.lock();
        let mut reaped = Vec::new();

        tasks.retain(|task_id, entry| {
            if entry.started_at.elapsed() <= max_age {
                return true;
            }
            if let Some(handle) = &entry.handle {
                handle.abort();
            }
            reaped.push(*task_id);
            false
        });

        if !reaped.is_empty() {
            info!(count = reaped.len(), "expired tasks reaped");
        }
        reaped
    }

    /// Waits for a task to leave the running state, polling on a bounded
    /// interval. Returns `None` for unknown tasks or on deadline.
    pub async fn wait_for_result(
        &self,
        task_id: Uuid,
        poll: Duration,
        timeout: Duration,
    ) -> Option<Value> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.state(task_id)? {
                TaskState::Running => {}
                _ => return self.get_result(task_id),
            }
            if Instant::now() >= deadline {
                return None;
            }
            time::sleep(poll).await;
        }
    }

    /// Number of tracked tasks (any state).
    pub fn len(&self) -> usize {
        self.inner.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.tasks.lock().is_empty()
    }

    /// Starts the background reaper (no-op if already running).
    pub fn start_reaper(&self) -> JoinHandle<()> {
        if self.inner.reaper_running.swap(true, Ordering::AcqRel) {
            return tokio::spawn(async {});
        }

        let manager = self.clone();
        tokio::spawn(async move {
            let mut interval = time::interval(Duration::from_secs(TASK_REAPER_INTERVAL_SECS));
            loop {
                interval.tick().await;
                manager.reap_expired(manager.inner.max_age);
            }
        })
    }

    fn cancel_entry(entry: &mut TaskEntry, result: Value) {
        if let Some(handle) = &entry.handle {
            handle.abort();
        }
        entry.result = Some(result);
        entry.state = TaskState::Cancelled;
    }
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new()
    }
}
