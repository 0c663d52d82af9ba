//! Error types for the orchestration domain.

use collabflow_core::{ProjectId, TaskId};

/// The result type used throughout collabflow-orch.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in orchestration operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A cycle was detected in the dependency graph.
    ///
    /// A cyclic graph is a configuration error: no task on the cycle can
    /// ever become ready, so evaluation fails loudly instead of silently
    /// returning an empty ready set.
    #[error("cycle detected in dependency graph: {cycle:?}")]
    CycleDetected {
        /// The cycle path (task IDs in dependency order).
        cycle: Vec<String>,
    },

    /// A task was not found in the store.
    #[error("task not found: {task_id}")]
    TaskNotFound {
        /// The task ID that was not found.
        task_id: TaskId,
    },

    /// A project was not found in the store.
    #[error("project not found: {project_id}")]
    ProjectNotFound {
        /// The project ID that was not found.
        project_id: ProjectId,
    },

    /// A task referenced a dependency in another project.
    #[error("task {task_id} depends on {dependency_id} which belongs to another project")]
    CrossProjectDependency {
        /// The task holding the offending edge.
        task_id: TaskId,
        /// The dependency that lives outside the task's project.
        dependency_id: TaskId,
    },

    /// An invalid status transition was attempted.
    #[error("invalid status transition: {from} -> {to} ({reason})")]
    InvalidStatusTransition {
        /// The current status.
        from: String,
        /// The attempted target status.
        to: String,
        /// The reason the transition is invalid.
        reason: String,
    },

    /// An outbound workflow trigger exhausted its retries.
    ///
    /// Non-fatal by design: the gate records the failure and the next
    /// completion signal re-derives readiness from current state.
    #[error("workflow dispatch failed after {attempts} attempt(s) for event {event}: {message}")]
    DispatchFailed {
        /// The trigger event kind that failed to deliver.
        event: String,
        /// How many delivery attempts were made.
        attempts: u32,
        /// Description of the final failure.
        message: String,
    },

    /// A graph node was not found (internal graph operation error).
    #[error("graph node not found: {node}")]
    GraphNodeNotFound {
        /// The node identifier (index or value).
        node: String,
    },

    /// A storage operation failed.
    #[error("storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A serialization error occurred.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure.
        message: String,
    },

    /// An error from collabflow-core.
    #[error("core error: {0}")]
    Core(#[from] collabflow_core::Error),
}

impl Error {
    /// Creates a new storage error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new storage error with a source.
    #[must_use]
    pub fn storage_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns true if this error is a graph configuration error.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::CycleDetected { .. } | Self::CrossProjectDependency { .. }
        )
    }
}
