//! Readiness evaluation: pure queries over the stored task graph.
//!
//! The evaluator answers three questions about a project:
//!
//! - Which tasks are **ready** (status permits starting, every dependency
//!   completed)?
//! - Is orchestration **complete** (every task terminal)?
//! - Which tasks are **stalled** (can never become ready because a
//!   transitive dependency was cancelled)?
//!
//! Evaluation re-reads persisted state on every call; task statuses change
//! externally between calls, so nothing is cached here. The evaluator has
//! no side effects - dispatch decisions belong to
//! [`crate::gate::OrchestrationGate`].
//!
//! ## Cancelled dependencies
//!
//! A dependency in `cancelled` status does NOT satisfy readiness. The
//! dependent task stays unready forever and is reported by
//! [`ReadinessEvaluator::stalled_tasks`] so the condition is monitorable
//! instead of silently waiting.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use collabflow_core::{ProjectId, TaskId};

use crate::dag::Dag;
use crate::error::{Error, Result};
use crate::store::TaskGraphStore;
use crate::task::{Task, TaskStatus};

/// Computes ready/complete/stalled views of a project's task graph.
///
/// Cheap to clone; holds only a shared store handle.
#[derive(Clone)]
pub struct ReadinessEvaluator {
    store: Arc<dyn TaskGraphStore>,
}

impl ReadinessEvaluator {
    /// Creates an evaluator reading from the given store.
    #[must_use]
    pub fn new(store: Arc<dyn TaskGraphStore>) -> Self {
        Self { store }
    }

    /// Returns every ready task of the project.
    ///
    /// A task is ready iff its status permits starting (`generated` or
    /// `pending`) and every dependency is `completed`. The result is
    /// sorted by (sequence, id) so identical stored state always yields
    /// the same list.
    ///
    /// # Errors
    ///
    /// - [`Error::ProjectNotFound`] if the project does not exist
    /// - [`Error::CycleDetected`] if the dependency graph is cyclic; a
    ///   cycle is a configuration error and is never skipped silently
    /// - [`Error::TaskNotFound`] if a dependency edge dangles
    pub async fn ready_tasks(&self, project_id: &ProjectId) -> Result<Vec<Task>> {
        let tasks = self.load_project_tasks(project_id).await?;
        let by_id: HashMap<TaskId, &Task> = tasks.iter().map(|t| (t.id, t)).collect();

        Self::ensure_acyclic(&tasks)?;

        let mut ready = Vec::new();
        for task in &tasks {
            if !task.status.permits_start() {
                continue;
            }
            let mut satisfied = true;
            for dep_id in &task.depends_on {
                let dep = by_id
                    .get(dep_id)
                    .ok_or(Error::TaskNotFound { task_id: *dep_id })?;
                if dep.status != TaskStatus::Completed {
                    satisfied = false;
                    break;
                }
            }
            if satisfied {
                ready.push(task.clone());
            }
        }

        ready.sort_by(|a, b| a.sequence.cmp(&b.sequence).then(a.id.cmp(&b.id)));
        Ok(ready)
    }

    /// Returns true iff orchestration is complete for the project:
    /// every task is in a terminal status (`completed` or `cancelled`).
    ///
    /// Idempotent: calling twice without a state change yields the same
    /// result. A project with no tasks is trivially complete.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProjectNotFound`] if the project does not exist.
    pub async fn is_orchestration_complete(&self, project_id: &ProjectId) -> Result<bool> {
        let tasks = self.load_project_tasks(project_id).await?;
        Ok(tasks.iter().all(|t| t.status.is_terminal()))
    }

    /// Returns the non-terminal tasks that can never become ready because
    /// a transitive dependency was cancelled.
    ///
    /// Used for stuck-project monitoring: if the last completion signal
    /// leaves a project neither complete nor with ready tasks, stalled
    /// tasks explain why nothing will ever fire again.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProjectNotFound`] if the project does not exist.
    pub async fn stalled_tasks(&self, project_id: &ProjectId) -> Result<Vec<Task>> {
        let tasks = self.load_project_tasks(project_id).await?;
        let by_id: HashMap<TaskId, &Task> = tasks.iter().map(|t| (t.id, t)).collect();

        // Propagate doom from cancelled tasks to everything downstream.
        let mut doomed: HashSet<TaskId> = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Cancelled)
            .map(|t| t.id)
            .collect();

        loop {
            let mut grew = false;
            for task in &tasks {
                if doomed.contains(&task.id) {
                    continue;
                }
                if task.depends_on.iter().any(|dep| doomed.contains(dep)) {
                    doomed.insert(task.id);
                    grew = true;
                }
            }
            if !grew {
                break;
            }
        }

        let mut stalled: Vec<Task> = doomed
            .iter()
            .filter_map(|id| by_id.get(id))
            .filter(|t| !t.status.is_terminal())
            .map(|t| (*t).clone())
            .collect();
        stalled.sort_by(|a, b| a.sequence.cmp(&b.sequence).then(a.id.cmp(&b.id)));
        Ok(stalled)
    }

    async fn load_project_tasks(&self, project_id: &ProjectId) -> Result<Vec<Task>> {
        self.store
            .get_project(project_id)
            .await?
            .ok_or(Error::ProjectNotFound {
                project_id: *project_id,
            })?;
        self.store.list_tasks(project_id).await
    }

    /// Validates that the dependency graph is a DAG.
    fn ensure_acyclic(tasks: &[Task]) -> Result<()> {
        let mut dag: Dag<TaskId> = Dag::new();
        let mut indices = HashMap::with_capacity(tasks.len());
        for task in tasks {
            indices.insert(task.id, dag.add_node(task.id));
        }
        for task in tasks {
            for dep_id in &task.depends_on {
                if let (Some(&dep_idx), Some(&task_idx)) =
                    (indices.get(dep_id), indices.get(&task.id))
                {
                    // Edge points dependency -> dependent.
                    dag.add_edge(dep_idx, task_idx)?;
                }
            }
        }
        dag.toposort().map(|_| ())
    }
}
