//! Inbound HTTP surface: the workflow engine reports task status here.
//!
//! The engine calls `POST /orchestration/callback` when a task it is
//! driving changes status. The handler updates the store and, when the
//! new status is `completed`, raises [`Signal::TaskCompleted`] through
//! the router so the gate re-evaluates readiness.
//!
//! Rejections map to HTTP statuses:
//!
//! - malformed task ID or unknown status -> 400
//! - unknown task -> 404
//! - task already terminal -> 409 (terminal statuses never revert)

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use collabflow_core::TaskId;

use crate::metrics::OrchMetrics;
use crate::signal::{Signal, SignalRouter};
use crate::store::{TaskGraphStore, UpdateResult};
use crate::task::TaskStatus;

/// Shared state of the callback router.
#[derive(Clone)]
pub struct AppState {
    /// Task graph storage.
    pub store: Arc<dyn TaskGraphStore>,
    /// Signal router the callback raises `TaskCompleted` through.
    pub signals: Arc<SignalRouter>,
    /// Metrics recorder.
    pub metrics: OrchMetrics,
}

/// JSON body of `POST /orchestration/callback`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackRequest {
    /// The task the engine reports on.
    pub task_id: String,
    /// The reported status (`completed`, `cancelled`, ...).
    pub status: String,
    /// Optional free-form output from the workflow run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    /// Optional human-readable note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// JSON body of a successful callback response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackResponse {
    /// The task that was updated.
    pub task_id: String,
    /// The status it now holds.
    pub status: String,
    /// Whether a `TaskCompleted` signal was raised.
    pub orchestration_signalled: bool,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// HTTP-mapped rejection.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn conflict(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: message.into(),
        }
    }

    /// Returns the HTTP status of the rejection.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<crate::error::Error> for ApiError {
    fn from(error: crate::error::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

/// Builds the callback router.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/orchestration/callback", post(callback_handler))
        .route("/healthz", get(health_handler))
        .with_state(state)
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn callback_handler(
    State(state): State<AppState>,
    Json(request): Json<CallbackRequest>,
) -> Result<Json<CallbackResponse>, ApiError> {
    let result = handle_callback(&state, &request).await;
    let status_code = match &result {
        Ok(_) => StatusCode::OK,
        Err(e) => e.status,
    };
    state.metrics.record_callback(status_code.as_u16());
    result
}

async fn handle_callback(
    state: &AppState,
    request: &CallbackRequest,
) -> Result<Json<CallbackResponse>, ApiError> {
    let task_id: TaskId = request
        .task_id
        .parse()
        .map_err(|_| ApiError::bad_request(format!("malformed task id '{}'", request.task_id)))?;
    let status: TaskStatus = request
        .status
        .parse()
        .map_err(|_| ApiError::bad_request(format!("unknown status '{}'", request.status)))?;

    let task = state
        .store
        .get_task(&task_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("task {task_id} not found")))?;

    match state.store.update_task_status(&task_id, status).await? {
        UpdateResult::Updated => {}
        UpdateResult::NotFound => {
            return Err(ApiError::not_found(format!("task {task_id} not found")));
        }
        UpdateResult::AlreadyTerminal { actual } => {
            return Err(ApiError::conflict(format!(
                "task {task_id} is already {actual}"
            )));
        }
    }

    tracing::info!(
        task_id = %task_id,
        project_id = %task.project_id,
        status = %status,
        "task status reported by workflow engine"
    );

    let mut signalled = false;
    if status == TaskStatus::Completed {
        state
            .signals
            .emit(Signal::TaskCompleted {
                task_id,
                project_id: task.project_id,
            })
            .await;
        signalled = true;
    }

    Ok(Json(CallbackResponse {
        task_id: task_id.to_string(),
        status: status.to_string(),
        orchestration_signalled: signalled,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::memory::RecordingDispatcher;
    use crate::gate::OrchestrationGate;
    use crate::project::Project;
    use crate::store::memory::InMemoryTaskGraphStore;
    use crate::task::{Task, TaskType};

    struct Fixture {
        state: AppState,
        store: Arc<InMemoryTaskGraphStore>,
        dispatcher: Arc<RecordingDispatcher>,
        project: Project,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryTaskGraphStore::new());
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let gate = OrchestrationGate::new(store.clone(), dispatcher.clone());

        let mut signals = SignalRouter::new();
        signals.register(Arc::new(gate));

        let project = Project::new("launch");
        store.save_project(&project).await.unwrap();

        Fixture {
            state: AppState {
                store: store.clone(),
                signals: Arc::new(signals),
                metrics: OrchMetrics::new(),
            },
            store,
            dispatcher,
            project,
        }
    }

    fn completed_request(task_id: &TaskId) -> CallbackRequest {
        CallbackRequest {
            task_id: task_id.to_string(),
            status: "completed".to_string(),
            output: None,
            note: None,
        }
    }

    #[tokio::test]
    async fn callback_updates_status_and_signals_completion() {
        let fx = fixture().await;
        let a = Task::new(fx.project.id, "a", TaskType::Ai);
        fx.store.insert_task(&a).await.unwrap();
        let b = Task::new(fx.project.id, "b", TaskType::Ai).with_dependencies(vec![a.id]);
        fx.store.insert_task(&b).await.unwrap();

        let response = handle_callback(&fx.state, &completed_request(&a.id))
            .await
            .unwrap();
        assert!(response.0.orchestration_signalled);

        let stored = fx.store.get_task(&a.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Completed);

        // The completion unblocked b and the gate fired.
        assert_eq!(fx.dispatcher.sent_count(), 1);
        assert_eq!(fx.dispatcher.sent()[0].envelope.ready_task_ids, vec![b.id]);
    }

    #[tokio::test]
    async fn non_completed_status_does_not_signal() {
        let fx = fixture().await;
        let a = Task::new(fx.project.id, "a", TaskType::Human);
        fx.store.insert_task(&a).await.unwrap();

        let request = CallbackRequest {
            task_id: a.id.to_string(),
            status: "in_progress".to_string(),
            output: None,
            note: None,
        };
        let response = handle_callback(&fx.state, &request).await.unwrap();
        assert!(!response.0.orchestration_signalled);
        assert_eq!(fx.dispatcher.sent_count(), 0);
    }

    #[tokio::test]
    async fn malformed_task_id_is_bad_request() {
        let fx = fixture().await;
        let request = CallbackRequest {
            task_id: "not-a-ulid".to_string(),
            status: "completed".to_string(),
            output: None,
            note: None,
        };
        let err = handle_callback(&fx.state, &request).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_status_is_bad_request() {
        let fx = fixture().await;
        let a = Task::new(fx.project.id, "a", TaskType::Ai);
        fx.store.insert_task(&a).await.unwrap();

        let request = CallbackRequest {
            task_id: a.id.to_string(),
            status: "done".to_string(),
            output: None,
            note: None,
        };
        let err = handle_callback(&fx.state, &request).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_task_is_not_found() {
        let fx = fixture().await;
        let err = handle_callback(&fx.state, &completed_request(&TaskId::generate()))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn terminal_task_is_conflict() {
        let fx = fixture().await;
        let a = Task::new(fx.project.id, "a", TaskType::Ai);
        fx.store.insert_task(&a).await.unwrap();
        fx.store
            .update_task_status(&a.id, TaskStatus::Cancelled)
            .await
            .unwrap();

        let err = handle_callback(&fx.state, &completed_request(&a.id))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }
}
