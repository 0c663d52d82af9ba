//! The orchestration gate: signals in, workflow triggers out.
//!
//! The gate is the only component that decides whether a workflow trigger
//! fires. It reacts to two signals:
//!
//! - [`Signal::ProjectStarted`]: evaluate the initial ready set and fire
//!   the project-start trigger
//! - [`Signal::TaskCompleted`]: re-evaluate readiness and fire a
//!   tasks-ready trigger when newly unblocked tasks exist
//!
//! ## Serialization and deduplication
//!
//! Signals for the same project run the whole evaluate -> decide ->
//! dispatch sequence under a per-project lock ([`ProjectLocks`]), in
//! arrival order. Within that ordering the gate remembers the key of the
//! last readiness snapshot it delivered per project and skips a trigger
//! whose snapshot matches it, so concurrent completions that observe the
//! same ready set produce at most one dispatch.
//!
//! ## Failure policy
//!
//! Dispatch failure is non-fatal: it is logged, counted, and the
//! snapshot key is NOT recorded, so the next completion signal for the
//! project retries the delivery. Graph configuration errors
//! ([`Error::CycleDetected`], dangling dependencies) propagate loudly.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tracing::Instrument;

use collabflow_core::observability::orchestration_span;
use collabflow_core::ProjectId;

use crate::dispatch::{TriggerEnvelope, WebhookKind, WorkflowDispatcher};
use crate::error::{Error, Result};
use crate::locks::ProjectLocks;
use crate::metrics::{OrchMetrics, TimingGuard};
use crate::readiness::ReadinessEvaluator;
use crate::signal::{Signal, SignalHandler};
use crate::store::TaskGraphStore;

/// What the gate decided for one signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// A trigger was delivered to the workflow engine.
    Dispatched {
        /// Size of the ready set carried by the trigger.
        ready: usize,
        /// Delivery attempts the dispatcher needed.
        attempts: u32,
    },
    /// The readiness snapshot was already delivered; nothing fired.
    SkippedDuplicate,
    /// Every task is terminal; orchestration is complete.
    Complete,
    /// No task is ready yet; waiting for more completions.
    Waiting,
    /// No task is ready and some never will be: a cancelled dependency
    /// blocks them permanently.
    Stalled {
        /// Number of permanently blocked tasks.
        stalled: usize,
    },
    /// Delivery failed after retries; the snapshot stays pending and the
    /// next signal retries.
    DispatchFailed,
}

impl GateOutcome {
    /// Returns the outcome as a stable string for logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Dispatched { .. } => "dispatched",
            Self::SkippedDuplicate => "skipped_duplicate",
            Self::Complete => "complete",
            Self::Waiting => "waiting",
            Self::Stalled { .. } => "stalled",
            Self::DispatchFailed => "dispatch_failed",
        }
    }
}

/// Decides when workflow triggers fire.
///
/// All collaborators are injected; the gate holds no ambient state
/// beyond the per-project last-dispatched snapshot keys.
pub struct OrchestrationGate {
    store: Arc<dyn TaskGraphStore>,
    evaluator: ReadinessEvaluator,
    dispatcher: Arc<dyn WorkflowDispatcher>,
    locks: ProjectLocks,
    metrics: OrchMetrics,
    last_dispatched: Mutex<HashMap<ProjectId, String>>,
}

impl OrchestrationGate {
    /// Creates a gate over the given store and dispatcher.
    #[must_use]
    pub fn new(store: Arc<dyn TaskGraphStore>, dispatcher: Arc<dyn WorkflowDispatcher>) -> Self {
        let evaluator = ReadinessEvaluator::new(store.clone());
        Self {
            store,
            evaluator,
            dispatcher,
            locks: ProjectLocks::new(),
            metrics: OrchMetrics::new(),
            last_dispatched: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the number of projects the gate currently retains state
    /// for (lock entries and dispatched snapshot keys). Entries are
    /// evicted when a project's orchestration completes.
    #[must_use]
    pub fn tracked_projects(&self) -> usize {
        let snapshots = self
            .last_dispatched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        self.locks.len().max(snapshots)
    }

    /// Handles a project-start signal: evaluates the initial ready set
    /// and fires the project-start trigger.
    ///
    /// # Errors
    ///
    /// Propagates [`Error::ProjectNotFound`], [`Error::CycleDetected`]
    /// and dangling-dependency errors. Dispatch failure is absorbed into
    /// [`GateOutcome::DispatchFailed`].
    pub async fn on_project_started(&self, project_id: ProjectId) -> Result<GateOutcome> {
        let _guard = self.locks.acquire(project_id).await;

        let ready = self.evaluator.ready_tasks(&project_id).await?;
        self.metrics.observe_ready_tasks(ready.len());

        let envelope =
            TriggerEnvelope::project_started(project_id, ready.iter().map(|t| t.id).collect());
        self.deliver(project_id, WebhookKind::ProjectStart, envelope)
            .await
    }

    /// Handles a task-completed signal: re-evaluates readiness and fires
    /// a tasks-ready trigger when newly unblocked tasks exist.
    ///
    /// When no task is ready the gate distinguishes three quiet states:
    /// orchestration complete, waiting for more completions, and stalled
    /// behind a cancelled dependency. Stalled projects are logged at
    /// warn level and exported as a gauge; nothing will fire for them
    /// again without operator intervention.
    ///
    /// # Errors
    ///
    /// Propagates [`Error::TaskNotFound`] when the completed task is
    /// unknown or belongs to a different project, plus the same graph
    /// errors as [`Self::on_project_started`].
    pub async fn on_task_completed(
        &self,
        project_id: ProjectId,
        task_id: collabflow_core::TaskId,
    ) -> Result<GateOutcome> {
        let task = self
            .store
            .get_task(&task_id)
            .await?
            .ok_or(Error::TaskNotFound { task_id })?;
        if task.project_id != project_id {
            return Err(Error::TaskNotFound { task_id });
        }

        let guard = self.locks.acquire(project_id).await;

        if self.evaluator.is_orchestration_complete(&project_id).await? {
            tracing::info!(
                project_id = %project_id,
                "all tasks terminal, orchestration complete"
            );
            // Drop the per-project state so finished projects are not
            // retained for the life of the process.
            self.last_dispatched
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&project_id);
            drop(guard);
            self.locks.evict(&project_id);
            return Ok(GateOutcome::Complete);
        }

        let ready = self.evaluator.ready_tasks(&project_id).await?;
        self.metrics.observe_ready_tasks(ready.len());

        if ready.is_empty() {
            let stalled = self.evaluator.stalled_tasks(&project_id).await?;
            self.metrics
                .set_stalled_tasks(&project_id.to_string(), stalled.len());
            if stalled.is_empty() {
                return Ok(GateOutcome::Waiting);
            }
            tracing::warn!(
                project_id = %project_id,
                stalled = stalled.len(),
                "tasks permanently blocked behind a cancelled dependency"
            );
            return Ok(GateOutcome::Stalled {
                stalled: stalled.len(),
            });
        }

        let envelope =
            TriggerEnvelope::tasks_ready(project_id, ready.iter().map(|t| t.id).collect());
        self.deliver(project_id, WebhookKind::TasksReady, envelope)
            .await
    }

    /// Dispatches an envelope unless its snapshot was already delivered.
    async fn deliver(
        &self,
        project_id: ProjectId,
        kind: WebhookKind,
        envelope: TriggerEnvelope,
    ) -> Result<GateOutcome> {
        let key = envelope.dedup_key();
        let already_sent = self
            .last_dispatched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&project_id)
            .is_some_and(|last| *last == key);
        if already_sent {
            tracing::debug!(
                project_id = %project_id,
                event = %envelope.event,
                "readiness snapshot already dispatched, skipping"
            );
            self.metrics
                .record_dispatch(envelope.event.as_str(), "skipped_duplicate");
            return Ok(GateOutcome::SkippedDuplicate);
        }

        let event = envelope.event;
        let ready = envelope.ready_task_ids.len();
        match self.dispatcher.dispatch(kind, envelope).await {
            Ok(outcome) => {
                let attempts = outcome.attempts();
                for _ in 0..attempts {
                    self.metrics.record_dispatch_attempt(event.as_str());
                }
                self.metrics.record_dispatch(event.as_str(), "delivered");
                self.last_dispatched
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(project_id, key);
                tracing::info!(
                    project_id = %project_id,
                    event = %event,
                    ready,
                    attempts,
                    endpoint = self.dispatcher.endpoint_name(),
                    "workflow trigger dispatched"
                );
                Ok(GateOutcome::Dispatched { ready, attempts })
            }
            Err(Error::DispatchFailed {
                attempts, message, ..
            }) => {
                for _ in 0..attempts {
                    self.metrics.record_dispatch_attempt(event.as_str());
                }
                self.metrics.record_dispatch(event.as_str(), "failed");
                tracing::error!(
                    project_id = %project_id,
                    event = %event,
                    attempts,
                    error = %message,
                    "workflow trigger failed, will retry on next signal"
                );
                Ok(GateOutcome::DispatchFailed)
            }
            Err(other) => Err(other),
        }
    }
}

#[async_trait]
impl SignalHandler for OrchestrationGate {
    async fn handle(&self, signal: Signal) -> Result<()> {
        let project_id = signal.project_id();
        let span = orchestration_span(signal.as_str(), &project_id.to_string());
        let metrics = self.metrics.clone();
        let signal_name = signal.as_str();
        let _timer = TimingGuard::new(move |duration| {
            metrics.observe_signal_duration(signal_name, duration);
        });

        let outcome = async {
            match signal {
                Signal::ProjectStarted { project_id } => {
                    self.on_project_started(project_id).await
                }
                Signal::TaskCompleted {
                    task_id,
                    project_id,
                } => self.on_task_completed(project_id, task_id).await,
            }
        }
        .instrument(span)
        .await?;

        self.metrics.record_signal(signal_name, outcome.as_str());
        Ok(())
    }

    fn name(&self) -> &str {
        "orchestration-gate"
    }
}
