//! Task domain model: status lifecycle, worker type, and dependency edges.
//!
//! A task references other tasks in the same project as dependencies by ID
//! only. Dependency edges are weak references; ownership stays with the
//! project.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use collabflow_core::{ProjectId, TaskId};

use crate::error::{Error, Result};

/// The worker type a task is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Executed by an AI agent in the workflow engine.
    Ai,
    /// Executed by a human collaborator.
    Human,
    /// Human-in-the-loop: AI output requiring human approval before
    /// being considered complete.
    Hitl,
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ai => write!(f, "ai"),
            Self::Human => write!(f, "human"),
            Self::Hitl => write!(f, "hitl"),
        }
    }
}

/// The task status state machine.
///
/// ```text
/// generated ──┐
///             ├──> in_progress ──> review ──> completed
/// pending ────┘          │            │
///                        └────────────┴─────> cancelled
/// blocked ──> (pending | cancelled)
/// ```
///
/// `completed` and `cancelled` are terminal: once reached, the status
/// never reverts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created by orchestration, not yet claimed.
    Generated,
    /// Waiting to be started.
    Pending,
    /// A worker is executing the task.
    InProgress,
    /// Awaiting review or HITL approval.
    Review,
    /// Finished successfully. Terminal.
    Completed,
    /// Abandoned. Terminal.
    Cancelled,
    /// Explicitly held back; never ready while blocked.
    Blocked,
}

impl TaskStatus {
    /// Returns true for terminal statuses (`completed`, `cancelled`).
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Returns true if the status permits the task to start.
    ///
    /// Only `generated` and `pending` tasks can become ready.
    #[must_use]
    pub const fn permits_start(&self) -> bool {
        matches!(self, Self::Generated | Self::Pending)
    }

    /// Returns the status as a stable string for logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Generated => "generated",
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Review => "review",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Blocked => "blocked",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "generated" => Ok(Self::Generated),
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "review" => Ok(Self::Review),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "blocked" => Ok(Self::Blocked),
            other => Err(Error::Serialization {
                message: format!("unknown task status '{other}'"),
            }),
        }
    }
}

/// A unit of work within a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier.
    pub id: TaskId,
    /// The owning project (non-owning back-reference).
    pub project_id: ProjectId,
    /// Human-readable name.
    pub name: String,
    /// Worker type.
    pub task_type: TaskType,
    /// Current lifecycle status.
    pub status: TaskStatus,
    /// IDs of tasks this task depends on. Must reference tasks in the
    /// same project; the store enforces this at insertion.
    #[serde(default)]
    pub depends_on: Vec<TaskId>,
    /// Advisory ordering hint. Not authoritative for readiness.
    #[serde(default)]
    pub sequence: u32,
    /// When the task was created.
    pub created_at: DateTime<Utc>,
    /// When the task reached a terminal status, if it has.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Creates a new pending task in the given project.
    #[must_use]
    pub fn new(project_id: ProjectId, name: impl Into<String>, task_type: TaskType) -> Self {
        Self {
            id: TaskId::generate(),
            project_id,
            name: name.into(),
            task_type,
            status: TaskStatus::Pending,
            depends_on: Vec::new(),
            sequence: 0,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Sets the initial status (e.g. `generated` for orchestration-created
    /// tasks).
    #[must_use]
    pub const fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the dependency edges.
    #[must_use]
    pub fn with_dependencies(mut self, depends_on: Vec<TaskId>) -> Self {
        self.depends_on = depends_on;
        self
    }

    /// Sets the advisory sequence number.
    #[must_use]
    pub const fn with_sequence(mut self, sequence: u32) -> Self {
        self.sequence = sequence;
        self
    }

    /// Transitions the task to a new status.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidStatusTransition`] if the task is already
    /// in a terminal status. Terminal statuses never revert.
    pub fn transition_to(&mut self, target: TaskStatus) -> Result<()> {
        if self.status.is_terminal() {
            return Err(Error::InvalidStatusTransition {
                from: self.status.to_string(),
                to: target.to_string(),
                reason: "terminal status never reverts".to_string(),
            });
        }
        self.status = target;
        if target.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }
}
