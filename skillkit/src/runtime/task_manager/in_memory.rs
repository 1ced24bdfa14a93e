//! In-memory implementation of the [`TaskStore`] trait.

use crate::errors::{AgentError, AgentResult};
use crate::runtime::task_manager::{ListTasksFilter, Task, TaskStore};
use dashmap::DashMap;
use serde_json::{Map, Value};
use std::sync::Arc;

/// An in-memory, thread-safe [`TaskStore`].
///
/// Records live for the lifetime of the process. Clones share the same map.
///
/// # Examples
///
/// ```ignore
/// use skillkit::runtime::task_manager::{InMemoryTaskStore, TaskStore};
///
/// let store = InMemoryTaskStore::new();
/// let task = store.create("process_data", Default::default()).await?;
/// assert!(store.get(&task.id).await?.is_some());
/// ```
#[derive(Debug, Default, Clone)]
pub struct InMemoryTaskStore {
    tasks: Arc<DashMap<String, Task>>,
}

impl InMemoryTaskStore {
    /// Creates a new `InMemoryTaskStore`.
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg_attr(all(target_os = "wasi", target_env = "p1"), async_trait::async_trait(?Send))]
#[cfg_attr(
    not(all(target_os = "wasi", target_env = "p1")),
    async_trait::async_trait
)]
impl TaskStore for InMemoryTaskStore {
    async fn create(&self, skill: &str, params: Map<String, Value>) -> AgentResult<Task> {
        let task = Task::new(skill, params);
        self.tasks.insert(task.id.clone(), task.clone());
        Ok(task)
    }

    async fn get(&self, task_id: &str) -> AgentResult<Option<Task>> {
        Ok(self.tasks.get(task_id).map(|t| t.value().clone()))
    }

    async fn update(&self, task: &Task) -> AgentResult<()> {
        match self.tasks.get_mut(&task.id) {
            Some(mut entry) => {
                *entry = task.clone();
                Ok(())
            }
            None => Err(AgentError::TaskNotFound {
                task_id: task.id.clone(),
            }),
        }
    }

    async fn list(&self, filter: &ListTasksFilter<'_>) -> AgentResult<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .tasks
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = filter.limit {
            tasks.truncate(limit);
        }
        Ok(tasks)
    }

    async fn delete(&self, task_id: &str) -> AgentResult<bool> {
        Ok(self.tasks.remove(task_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::task_manager::TaskState;
    use chrono::Duration;

    #[tokio::test]
    async fn create_get_delete() {
        let store = InMemoryTaskStore::new();
        let task = store.create("process", Map::new()).await.unwrap();

        let fetched = store.get(&task.id).await.unwrap().unwrap();
        assert_eq!(fetched, task);
        assert_eq!(fetched.status.state, TaskState::Submitted);

        assert!(store.delete(&task.id).await.unwrap());
        assert!(!store.delete(&task.id).await.unwrap());
        assert!(store.get(&task.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_requires_existing_record() {
        let store = InMemoryTaskStore::new();
        let orphan = Task::new("process", Map::new());
        let err = store.update(&orphan).await.unwrap_err();
        assert!(matches!(err, AgentError::TaskNotFound { .. }));
    }

    #[tokio::test]
    async fn list_filters_and_orders_newest_first() {
        let store = InMemoryTaskStore::new();

        // Timestamps are set explicitly so ordering does not depend on clock resolution.
        let base = chrono::Utc::now();
        for (i, skill) in ["a", "b", "a"].into_iter().enumerate() {
            let mut task = store.create(skill, Map::new()).await.unwrap();
            task.created_at = base + Duration::seconds(i as i64);
            if i == 2 {
                task.update_status(TaskState::Working, None, None);
            }
            store.update(&task).await.unwrap();
        }

        let all = store.list(&ListTasksFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0].created_at >= w[1].created_at));

        let only_a = ListTasksFilter {
            skill: Some("a"),
            ..Default::default()
        };
        assert_eq!(store.list(&only_a).await.unwrap().len(), 2);

        let working = ListTasksFilter {
            state: Some(TaskState::Working),
            ..Default::default()
        };
        let working = store.list(&working).await.unwrap();
        assert_eq!(working.len(), 1);
        assert_eq!(working[0].skill, "a");

        let limited = ListTasksFilter {
            limit: Some(1),
            ..Default::default()
        };
        let newest = store.list(&limited).await.unwrap();
        assert_eq!(newest.len(), 1);
        assert_eq!(newest[0].created_at, all[0].created_at);
    }
}
