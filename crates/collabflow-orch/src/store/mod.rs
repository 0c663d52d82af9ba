//! Pluggable storage for the project/task graph.
//!
//! The [`TaskGraphStore`] trait defines the persistence layer the
//! orchestration core reads from and writes to. The core never holds
//! ambient references to storage; the store is passed in explicitly
//! (dependency injection, not singletons).
//!
//! ## Design Principles
//!
//! - **Re-read on every evaluation**: task statuses change externally
//!   between calls, so nothing here is cached by callers
//! - **Graph invariants at the boundary**: same-project dependency edges
//!   and terminal-status immutability are enforced at insertion/update
//! - **Testability**: in-memory implementation for tests and development

pub mod memory;

use async_trait::async_trait;

use collabflow_core::{ProjectId, TaskId};

use crate::error::Result;
use crate::project::Project;
use crate::task::{Task, TaskStatus};

/// Result of a status update operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateResult {
    /// The status was updated.
    Updated,
    /// The task does not exist.
    NotFound,
    /// The task is already in a terminal status; terminal statuses
    /// never revert.
    AlreadyTerminal {
        /// The terminal status that was found.
        actual: TaskStatus,
    },
}

impl UpdateResult {
    /// Returns true if the update was applied.
    #[must_use]
    pub const fn is_updated(&self) -> bool {
        matches!(self, Self::Updated)
    }
}

/// Storage abstraction for projects and their task dependency graphs.
///
/// Implementations must provide:
/// - Cascade ownership: deleting a project invalidates its tasks
/// - Referential integrity: dependency edges reference tasks within the
///   same project
/// - Terminal-status protection on updates
///
/// ## Thread Safety
///
/// All methods are `Send + Sync` to support concurrent access from
/// multiple signal handlers.
#[async_trait]
pub trait TaskGraphStore: Send + Sync {
    // --- Project operations ---

    /// Gets a project by ID.
    ///
    /// Returns `None` if the project does not exist.
    async fn get_project(&self, project_id: &ProjectId) -> Result<Option<Project>>;

    /// Saves a project (insert or update).
    async fn save_project(&self, project: &Project) -> Result<()>;

    /// Deletes a project and all of its tasks (cascade).
    async fn delete_project(&self, project_id: &ProjectId) -> Result<()>;

    // --- Task operations ---

    /// Gets a task by ID.
    ///
    /// Returns `None` if the task does not exist.
    async fn get_task(&self, task_id: &TaskId) -> Result<Option<Task>>;

    /// Inserts a new task.
    ///
    /// Tasks may be created at project setup or appended dynamically by
    /// orchestration.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::ProjectNotFound`] if the owning project does
    ///   not exist
    /// - [`crate::Error::TaskNotFound`] if a dependency does not exist
    /// - [`crate::Error::CrossProjectDependency`] if a dependency
    ///   belongs to another project
    async fn insert_task(&self, task: &Task) -> Result<()>;

    /// Updates a task's status.
    ///
    /// Returns [`UpdateResult::AlreadyTerminal`] instead of applying the
    /// change when the task has reached a terminal status.
    async fn update_task_status(
        &self,
        task_id: &TaskId,
        target: TaskStatus,
    ) -> Result<UpdateResult>;

    /// Lists every task owned by a project.
    ///
    /// Order is unspecified; callers sort as needed.
    async fn list_tasks(&self, project_id: &ProjectId) -> Result<Vec<Task>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_result_is_updated() {
        assert!(UpdateResult::Updated.is_updated());
        assert!(!UpdateResult::NotFound.is_updated());
        assert!(!UpdateResult::AlreadyTerminal {
            actual: TaskStatus::Completed
        }
        .is_updated());
    }
}
