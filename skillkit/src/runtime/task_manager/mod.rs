//! Task lifecycle management.
//!
//! Skills that declare a task need receive a [`TaskContext`] through which
//! they report progress. Task records live in a [`TaskStore`]; the default
//! [`InMemoryTaskStore`] keeps them for the lifetime of the process.
//!
//! # State machine
//!
//! `submitted` is assigned on creation. Skills normally move to `working` and
//! then to one of `input-required`, `completed`, `failed`, or `canceled`.
//! The manager does not enforce transitions: any state may follow any other,
//! so human-in-the-loop flows can bounce between `working` and
//! `input-required`. Validity is the caller's responsibility.
//!
//! # History
//!
//! Each update pushes the previous status onto `history` before installing
//! the new one, so `history` never contains the current status and its
//! length equals the number of updates applied.

pub mod context;
pub mod in_memory;

pub use context::{StatusObserver, TaskContext};
pub use in_memory::InMemoryTaskStore;

use crate::compat::{MaybeSend, MaybeSync};
use crate::errors::{AgentError, AgentResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

// ============================================================================
// Data Structures
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    Submitted,
    Working,
    InputRequired,
    Completed,
    Failed,
    Canceled,
}

impl TaskState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Working => "working",
            Self::InputRequired => "input-required",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        }
    }

    /// `input-required` is not terminal: the task may resume `working`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Canceled)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskState {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "submitted" => Ok(Self::Submitted),
            "working" => Ok(Self::Working),
            "input-required" => Ok(Self::InputRequired),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "canceled" => Ok(Self::Canceled),
            other => Err(AgentError::InvalidInput(format!("unknown task state '{other}'"))),
        }
    }
}

/// A point-in-time status. Replaced wholesale on every update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub state: TaskState,
    pub message: Option<String>,
    /// Fraction complete in `[0.0, 1.0]`.
    pub progress: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl TaskStatus {
    pub fn new(state: TaskState, message: Option<String>, progress: Option<f64>) -> Self {
        Self {
            state,
            message,
            progress: progress.map(|p| p.clamp(0.0, 1.0)),
            timestamp: Utc::now(),
        }
    }
}

/// One tracked long-running skill invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub skill: String,
    /// Caller parameters as they were when the task was created.
    pub params: Map<String, Value>,
    pub status: TaskStatus,
    pub history: Vec<TaskStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a `submitted` task with a fresh id and empty history.
    pub fn new(skill: impl Into<String>, params: Map<String, Value>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            skill: skill.into(),
            params,
            status: TaskStatus::new(TaskState::Submitted, None, None),
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Archives the current status and installs a new one.
    pub fn update_status(&mut self, state: TaskState, message: Option<String>, progress: Option<f64>) {
        let status = TaskStatus::new(state, message, progress);
        let previous = std::mem::replace(&mut self.status, status);
        self.history.push(previous);
        self.updated_at = self.status.timestamp;
    }
}

/// Filter for listing tasks.
#[derive(Debug, Default, Clone)]
pub struct ListTasksFilter<'a> {
    pub skill: Option<&'a str>,
    pub state: Option<TaskState>,
    pub limit: Option<usize>,
}

impl<'a> ListTasksFilter<'a> {
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        self.skill.map_or(true, |skill| task.skill == skill)
            && self.state.map_or(true, |state| task.status.state == state)
    }
}

// ============================================================================
// TaskStore Trait
// ============================================================================

/// Persistence backend for task records.
#[cfg_attr(all(target_os = "wasi", target_env = "p1"), async_trait::async_trait(?Send))]
#[cfg_attr(
    not(all(target_os = "wasi", target_env = "p1")),
    async_trait::async_trait
)]
pub trait TaskStore: MaybeSend + MaybeSync {
    /// Creates and stores a new `submitted` task.
    async fn create(&self, skill: &str, params: Map<String, Value>) -> AgentResult<Task>;

    async fn get(&self, task_id: &str) -> AgentResult<Option<Task>>;

    /// Replaces the stored record for `task.id`.
    async fn update(&self, task: &Task) -> AgentResult<()>;

    /// Lists matching tasks, newest first.
    async fn list(&self, filter: &ListTasksFilter<'_>) -> AgentResult<Vec<Task>>;

    /// Removes a task. Returns `false` if it did not exist.
    async fn delete(&self, task_id: &str) -> AgentResult<bool>;
}

// ============================================================================
// TaskManager
// ============================================================================

/// Issues [`TaskContext`] handles and fronts the configured store.
#[derive(Clone)]
pub struct TaskManager {
    store: Arc<dyn TaskStore>,
}

impl TaskManager {
    /// Creates a manager backed by the provided store.
    #[must_use]
    pub fn new(store: impl TaskStore + 'static) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Creates a manager from a shared store handle.
    #[must_use]
    pub fn with_store(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    /// Convenience constructor for the default in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(InMemoryTaskStore::new())
    }

    #[must_use]
    pub fn store(&self) -> Arc<dyn TaskStore> {
        self.store.clone()
    }

    /// Creates a task for one skill invocation and returns its handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails to create the record.
    pub async fn start(&self, skill: &str, params: Map<String, Value>) -> AgentResult<TaskContext> {
        let task = self.store.create(skill, params).await?;
        Ok(TaskContext::new(task, self.store.clone()))
    }

    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn get(&self, task_id: &str) -> AgentResult<Option<Task>> {
        self.store.get(task_id).await
    }

    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn list(&self, filter: &ListTasksFilter<'_>) -> AgentResult<Vec<Task>> {
        self.store.list(filter).await
    }

    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn delete(&self, task_id: &str) -> AgentResult<bool> {
        self.store.delete(task_id).await
    }
}
