//! Workflow trigger dispatch abstraction.
//!
//! This module provides:
//!
//! - [`WorkflowDispatcher`]: Trait for delivering triggers to the
//!   external workflow engine
//! - [`TriggerEnvelope`]: Serializable trigger payload
//! - [`WebhookKind`]: The distinct outbound webhook endpoints
//! - [`memory::RecordingDispatcher`]: In-memory dispatcher for testing
//!
//! ## Design Principles
//!
//! - **Backend agnostic**: Same interface for n8n webhooks, queues, or
//!   local test doubles
//! - **Idempotent engine assumed**: The workflow engine must be
//!   idempotent per ready-task ID; [`TriggerEnvelope::dedup_key`] gives
//!   it a stable key for deduplication
//! - **Structured payloads**: JSON-serializable envelopes

pub mod memory;
pub mod webhook;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use collabflow_core::{ProjectId, TaskId};

use crate::error::Result;

/// The trigger event kind carried in the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerEvent {
    /// Project bootstrap: fired once at project start.
    ProjectStarted,
    /// Newly unblocked tasks exist.
    TasksReady,
}

impl TriggerEvent {
    /// Returns the event as a stable string for logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ProjectStarted => "project_started",
            Self::TasksReady => "tasks_ready",
        }
    }
}

impl std::fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The distinct outbound webhook endpoints of the workflow engine.
///
/// Each kind can have its path overridden independently in the
/// configuration (see [`crate::config`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WebhookKind {
    /// Project bootstrap trigger.
    ProjectStart,
    /// Multi-task readiness trigger.
    TasksReady,
    /// Task status callback registration.
    TaskStatus,
    /// Human-in-the-loop start.
    HitlStart,
    /// Document upload processing.
    DocumentUpload,
    /// Outbound notification.
    Notification,
}

impl WebhookKind {
    /// Returns the default webhook path for this kind.
    #[must_use]
    pub const fn default_path(&self) -> &'static str {
        match self {
            Self::ProjectStart => "/webhook/project-start",
            Self::TasksReady => "/webhook/tasks-ready",
            Self::TaskStatus => "/webhook/task-status",
            Self::HitlStart => "/webhook/hitl-start",
            Self::DocumentUpload => "/webhook/document-upload",
            Self::Notification => "/webhook/notification",
        }
    }

    /// Returns the kind as a stable string for logs and configuration.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ProjectStart => "project_start",
            Self::TasksReady => "tasks_ready",
            Self::TaskStatus => "task_status",
            Self::HitlStart => "hitl_start",
            Self::DocumentUpload => "document_upload",
            Self::Notification => "notification",
        }
    }
}

impl std::fmt::Display for WebhookKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Envelope for a workflow trigger.
///
/// Serialized as the JSON body of the outbound webhook call:
///
/// ```json
/// {
///   "project_id": "01HQ...",
///   "ready_task_ids": ["01HQ...", "01HQ..."],
///   "event": "tasks_ready"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerEnvelope {
    /// The project whose graph produced the trigger.
    pub project_id: ProjectId,
    /// The ready tasks at evaluation time, sorted for determinism.
    pub ready_task_ids: Vec<TaskId>,
    /// The trigger event kind.
    pub event: TriggerEvent,
}

impl TriggerEnvelope {
    /// Creates a project-start bootstrap envelope.
    #[must_use]
    pub fn project_started(project_id: ProjectId, ready_task_ids: Vec<TaskId>) -> Self {
        Self {
            project_id,
            ready_task_ids,
            event: TriggerEvent::ProjectStarted,
        }
    }

    /// Creates a tasks-ready envelope.
    #[must_use]
    pub fn tasks_ready(project_id: ProjectId, ready_task_ids: Vec<TaskId>) -> Self {
        Self {
            project_id,
            ready_task_ids,
            event: TriggerEvent::TasksReady,
        }
    }

    /// Returns a deterministic deduplication key for this readiness
    /// snapshot: the project ID plus the sorted ready-task IDs.
    ///
    /// Two triggers for the same project carrying the same ready set map
    /// to the same key regardless of event kind, which is what the
    /// engine needs to drop redundant deliveries.
    #[must_use]
    pub fn dedup_key(&self) -> String {
        let mut ids: Vec<String> = self.ready_task_ids.iter().map(ToString::to_string).collect();
        ids.sort_unstable();
        format!("{}:{}", self.project_id, ids.join(","))
    }
}

/// Result of a successful dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The trigger was delivered.
    Delivered {
        /// How many delivery attempts were needed (1-indexed).
        attempts: u32,
    },
}

impl DispatchOutcome {
    /// Returns the number of delivery attempts made.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Delivered { attempts } => *attempts,
        }
    }
}

/// Dispatch abstraction for workflow triggers.
///
/// Implementations may target:
/// - n8n webhook endpoints (production)
/// - In-memory recorders (testing)
///
/// ## Thread Safety
///
/// All methods are `Send + Sync` to support concurrent access from
/// multiple signal handlers.
#[async_trait]
pub trait WorkflowDispatcher: Send + Sync {
    /// Delivers a trigger to the workflow engine.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::DispatchFailed`] after retries are
    /// exhausted. The caller treats this as non-fatal: the next
    /// completion signal re-derives readiness and retries independently.
    async fn dispatch(
        &self,
        kind: WebhookKind,
        envelope: TriggerEnvelope,
    ) -> Result<DispatchOutcome>;

    /// Returns the dispatcher's endpoint name for logs.
    fn endpoint_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_serializes_with_snake_case_keys() {
        let envelope = TriggerEnvelope::tasks_ready(ProjectId::generate(), vec![TaskId::generate()]);
        let json = serde_json::to_string(&envelope).unwrap();
        assert!(json.contains("\"project_id\""));
        assert!(json.contains("\"ready_task_ids\""));
        assert!(json.contains("\"event\":\"tasks_ready\""));
    }

    #[test]
    fn project_started_event_name() {
        let envelope = TriggerEnvelope::project_started(ProjectId::generate(), vec![]);
        let json = serde_json::to_string(&envelope).unwrap();
        assert!(json.contains("\"event\":\"project_started\""));
    }

    #[test]
    fn dedup_key_is_order_insensitive() {
        let project_id = ProjectId::generate();
        let a = TaskId::generate();
        let b = TaskId::generate();

        let first = TriggerEnvelope::tasks_ready(project_id, vec![a, b]);
        let second = TriggerEnvelope::tasks_ready(project_id, vec![b, a]);
        assert_eq!(first.dedup_key(), second.dedup_key());
    }

    #[test]
    fn dedup_key_ignores_event_kind() {
        let project_id = ProjectId::generate();
        let a = TaskId::generate();

        let started = TriggerEnvelope::project_started(project_id, vec![a]);
        let ready = TriggerEnvelope::tasks_ready(project_id, vec![a]);
        assert_eq!(started.dedup_key(), ready.dedup_key());
    }

    #[test]
    fn default_paths_are_distinct() {
        let kinds = [
            WebhookKind::ProjectStart,
            WebhookKind::TasksReady,
            WebhookKind::TaskStatus,
            WebhookKind::HitlStart,
            WebhookKind::DocumentUpload,
            WebhookKind::Notification,
        ];
        let mut paths: Vec<&str> = kinds.iter().map(WebhookKind::default_path).collect();
        paths.sort_unstable();
        paths.dedup();
        assert_eq!(paths.len(), kinds.len());
    }
}
