//! In-memory store implementation for testing and development.
//!
//! This module provides [`InMemoryTaskGraphStore`], a simple in-memory
//! implementation of the [`TaskGraphStore`] trait.
//!
//! ## Limitations
//!
//! - **NOT suitable for production**: No durability, no cross-process
//!   coordination
//! - **Single-process only**: State is not shared across process boundaries
//! - **No persistence**: All state is lost when the process exits

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use collabflow_core::{ProjectId, TaskId};

use super::{TaskGraphStore, UpdateResult};
use crate::error::{Error, Result};
use crate::project::Project;
use crate::task::{Task, TaskStatus};

/// Converts a lock poison error to a storage error.
fn poison_err<T>(_: PoisonError<T>) -> Error {
    Error::storage("lock poisoned")
}

#[derive(Debug, Default)]
struct State {
    projects: HashMap<ProjectId, Project>,
    tasks: HashMap<TaskId, Task>,
}

/// In-memory store for testing.
///
/// Provides a simple, thread-safe implementation of [`TaskGraphStore`]
/// using a single `RwLock` so projects and tasks stay consistent with
/// each other.
///
/// ## Example
///
/// ```rust
/// use collabflow_orch::store::memory::InMemoryTaskGraphStore;
///
/// let store = InMemoryTaskGraphStore::new();
/// // Use store in tests...
/// ```
#[derive(Debug, Default)]
pub struct InMemoryTaskGraphStore {
    state: RwLock<State>,
}

impl InMemoryTaskGraphStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of projects currently stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn project_count(&self) -> Result<usize> {
        let count = {
            let state = self.state.read().map_err(poison_err)?;
            state.projects.len()
        };
        Ok(count)
    }

    /// Returns the number of tasks currently stored across all projects.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn task_count(&self) -> Result<usize> {
        let count = {
            let state = self.state.read().map_err(poison_err)?;
            state.tasks.len()
        };
        Ok(count)
    }
}

#[async_trait]
impl TaskGraphStore for InMemoryTaskGraphStore {
    async fn get_project(&self, project_id: &ProjectId) -> Result<Option<Project>> {
        let result = {
            let state = self.state.read().map_err(poison_err)?;
            state.projects.get(project_id).cloned()
        };
        Ok(result)
    }

    async fn save_project(&self, project: &Project) -> Result<()> {
        {
            let mut state = self.state.write().map_err(poison_err)?;
            state.projects.insert(project.id, project.clone());
        }
        Ok(())
    }

    async fn delete_project(&self, project_id: &ProjectId) -> Result<()> {
        let mut state = self.state.write().map_err(poison_err)?;
        if state.projects.remove(project_id).is_none() {
            drop(state);
            return Err(Error::ProjectNotFound {
                project_id: *project_id,
            });
        }
        // Cascade: a project exclusively owns its tasks.
        state.tasks.retain(|_, task| task.project_id != *project_id);
        drop(state);
        Ok(())
    }

    async fn get_task(&self, task_id: &TaskId) -> Result<Option<Task>> {
        let result = {
            let state = self.state.read().map_err(poison_err)?;
            state.tasks.get(task_id).cloned()
        };
        Ok(result)
    }

    async fn insert_task(&self, task: &Task) -> Result<()> {
        let mut state = self.state.write().map_err(poison_err)?;

        if !state.projects.contains_key(&task.project_id) {
            drop(state);
            return Err(Error::ProjectNotFound {
                project_id: task.project_id,
            });
        }

        for dep_id in &task.depends_on {
            let Some(dep) = state.tasks.get(dep_id) else {
                drop(state);
                return Err(Error::TaskNotFound { task_id: *dep_id });
            };
            if dep.project_id != task.project_id {
                let dependency_id = *dep_id;
                drop(state);
                return Err(Error::CrossProjectDependency {
                    task_id: task.id,
                    dependency_id,
                });
            }
        }

        state.tasks.insert(task.id, task.clone());
        drop(state);
        Ok(())
    }

    async fn update_task_status(
        &self,
        task_id: &TaskId,
        target: TaskStatus,
    ) -> Result<UpdateResult> {
        let mut state = self.state.write().map_err(poison_err)?;

        let Some(task) = state.tasks.get_mut(task_id) else {
            drop(state);
            return Ok(UpdateResult::NotFound);
        };

        if task.status.is_terminal() {
            let actual = task.status;
            drop(state);
            return Ok(UpdateResult::AlreadyTerminal { actual });
        }

        let transition = task.transition_to(target);
        drop(state);
        transition.map(|()| UpdateResult::Updated)
    }

    async fn list_tasks(&self, project_id: &ProjectId) -> Result<Vec<Task>> {
        let result = {
            let state = self.state.read().map_err(poison_err)?;
            state
                .tasks
                .values()
                .filter(|t| t.project_id == *project_id)
                .cloned()
                .collect()
        };
        Ok(result)
    }
}
