//! Project domain model.
//!
//! A project exclusively owns its tasks: deleting a project cascades to
//! its tasks in the store. The project status here is advisory for the
//! orchestration core; completeness is always derived from task states
//! (see [`crate::readiness::ReadinessEvaluator`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use collabflow_core::ProjectId;

/// The project lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    /// Being drafted, tasks not yet final.
    Draft,
    /// Task graph being planned.
    Planning,
    /// Ready for orchestration.
    Active,
    /// Orchestration has started work.
    InProgress,
    /// Temporarily paused.
    OnHold,
    /// All work finished. Terminal.
    Completed,
    /// Abandoned. Terminal.
    Cancelled,
}

impl ProjectStatus {
    /// Returns true for terminal statuses.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Returns the status as a stable string for logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Planning => "planning",
            Self::Active => "active",
            Self::InProgress => "in_progress",
            Self::OnHold => "on_hold",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A project: the unit of orchestration, owning a set of tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Unique project identifier.
    pub id: ProjectId,
    /// Human-readable name.
    pub name: String,
    /// Current lifecycle status.
    pub status: ProjectStatus,
    /// When the project was created.
    pub created_at: DateTime<Utc>,
}

impl Project {
    /// Creates a new active project.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ProjectId::generate(),
            name: name.into(),
            status: ProjectStatus::Active,
            created_at: Utc::now(),
        }
    }

    /// Sets the initial status.
    #[must_use]
    pub const fn with_status(mut self, status: ProjectStatus) -> Self {
        self.status = status;
        self
    }
}
