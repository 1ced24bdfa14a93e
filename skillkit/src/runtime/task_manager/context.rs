//! Per-invocation task handle given to skills that need progress reporting.

use crate::errors::{AgentError, AgentResult};
use crate::runtime::task_manager::{Task, TaskState, TaskStore};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Callback invoked with the task snapshot after every status change.
pub type StatusObserver = Arc<dyn Fn(&Task) -> AgentResult<()> + Send + Sync>;

/// Handle to one task for the duration of one skill invocation.
///
/// Clones share state. Observers registered through
/// [`on_status_change`](Self::on_status_change) belong to this handle and are
/// dropped with it; they are never persisted.
#[derive(Clone)]
pub struct TaskContext {
    inner: Arc<Inner>,
}

struct Inner {
    id: String,
    skill: String,
    store: Arc<dyn TaskStore>,
    // Held across the store write so concurrent updates persist in order.
    task: Mutex<Task>,
    observers: StdMutex<Vec<StatusObserver>>,
}

impl std::fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskContext")
            .field("id", &self.inner.id)
            .field("skill", &self.inner.skill)
            .finish_non_exhaustive()
    }
}

impl TaskContext {
    pub(crate) fn new(task: Task, store: Arc<dyn TaskStore>) -> Self {
        Self {
            inner: Arc::new(Inner {
                id: task.id.clone(),
                skill: task.skill.clone(),
                store,
                task: Mutex::new(task),
                observers: StdMutex::new(Vec::new()),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    #[must_use]
    pub fn skill(&self) -> &str {
        &self.inner.skill
    }

    /// Returns a copy of the task as this handle last wrote it.
    pub async fn snapshot(&self) -> Task {
        self.inner.task.lock().await.clone()
    }

    pub async fn state(&self) -> TaskState {
        self.inner.task.lock().await.status.state
    }

    /// Registers a status-change observer for this invocation.
    ///
    /// Observers run synchronously after each update, in registration order.
    /// An observer that errors or panics is logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Internal`] if the observer list lock is poisoned.
    pub fn on_status_change<F>(&self, observer: F) -> AgentResult<()>
    where
        F: Fn(&Task) -> AgentResult<()> + Send + Sync + 'static,
    {
        self.observers()?.push(Arc::new(observer));
        Ok(())
    }

    /// Installs a new status, archiving the previous one into history.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the write. Observer failures are
    /// never returned.
    pub async fn update(
        &self,
        state: TaskState,
        message: Option<String>,
        progress: Option<f64>,
    ) -> AgentResult<()> {
        let mut current = self.inner.task.lock().await;
        let mut next = current.clone();
        next.update_status(state, message, progress);
        self.inner.store.update(&next).await?;
        *current = next.clone();
        drop(current);
        debug!(task_id = %self.inner.id, state = %state, "task status updated");

        for err in self.notify(&next)? {
            warn!(error = %err, "task status observer failed");
        }
        Ok(())
    }

    /// Moves the task to `working`.
    ///
    /// # Errors
    ///
    /// See [`update`](Self::update).
    pub async fn working(&self, message: impl Into<String>, progress: Option<f64>) -> AgentResult<()> {
        self.update(TaskState::Working, Some(message.into()), progress)
            .await
    }

    /// Pauses the task until the caller supplies more input.
    ///
    /// # Errors
    ///
    /// See [`update`](Self::update).
    pub async fn request_input(&self, message: impl Into<String>) -> AgentResult<()> {
        self.update(TaskState::InputRequired, Some(message.into()), None)
            .await
    }

    /// Completes the task with progress `1.0`.
    ///
    /// # Errors
    ///
    /// See [`update`](Self::update).
    pub async fn complete(&self, message: Option<String>) -> AgentResult<()> {
        self.update(TaskState::Completed, message, Some(1.0)).await
    }

    /// # Errors
    ///
    /// See [`update`](Self::update).
    pub async fn fail(&self, error: impl Into<String>) -> AgentResult<()> {
        self.update(TaskState::Failed, Some(error.into()), None)
            .await
    }

    /// # Errors
    ///
    /// See [`update`](Self::update).
    pub async fn cancel(&self, reason: Option<String>) -> AgentResult<()> {
        self.update(TaskState::Canceled, reason, None).await
    }

    fn observers(&self) -> AgentResult<std::sync::MutexGuard<'_, Vec<StatusObserver>>> {
        self.inner
            .observers
            .lock()
            .map_err(|_| AgentError::Internal {
                component: "task_context".to_string(),
                reason: "observer list lock poisoned".to_string(),
            })
    }

    /// Runs every observer and returns the failures, in observer order.
    fn notify(&self, task: &Task) -> AgentResult<Vec<AgentError>> {
        let observers = self.observers()?.clone();
        let mut failures = Vec::new();
        for observer in &observers {
            let reason = match catch_unwind(AssertUnwindSafe(|| observer(task))) {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => err.to_string(),
                Err(_) => "observer panicked".to_string(),
            };
            failures.push(AgentError::ObserverFailed {
                task_id: task.id.clone(),
                reason,
            });
        }
        Ok(failures)
    }
}
