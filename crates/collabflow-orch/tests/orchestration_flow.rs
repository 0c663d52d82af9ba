//! End-to-end orchestration flow tests.
//!
//! Drives the gate through full project lifecycles over the in-memory
//! store and recording dispatcher and checks the trigger stream it
//! produces.

use std::sync::Arc;

use collabflow_core::TaskId;
use collabflow_orch::dispatch::memory::RecordingDispatcher;
use collabflow_orch::dispatch::{TriggerEvent, WebhookKind};
use collabflow_orch::error::Error;
use collabflow_orch::gate::{GateOutcome, OrchestrationGate};
use collabflow_orch::project::Project;
use collabflow_orch::readiness::ReadinessEvaluator;
use collabflow_orch::store::memory::InMemoryTaskGraphStore;
use collabflow_orch::store::TaskGraphStore;
use collabflow_orch::task::{Task, TaskStatus, TaskType};

struct Harness {
    store: Arc<InMemoryTaskGraphStore>,
    dispatcher: Arc<RecordingDispatcher>,
    gate: Arc<OrchestrationGate>,
    evaluator: ReadinessEvaluator,
    project: Project,
}

async fn harness() -> Harness {
    let store = Arc::new(InMemoryTaskGraphStore::new());
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let gate = Arc::new(OrchestrationGate::new(store.clone(), dispatcher.clone()));
    let evaluator = ReadinessEvaluator::new(store.clone());
    let project = Project::new("launch");
    store.save_project(&project).await.unwrap();
    Harness {
        store,
        dispatcher,
        gate,
        evaluator,
        project,
    }
}

impl Harness {
    async fn add_task(&self, name: &str, deps: Vec<TaskId>) -> Task {
        let task = Task::new(self.project.id, name, TaskType::Ai).with_dependencies(deps);
        self.store.insert_task(&task).await.unwrap();
        task
    }

    async fn complete(&self, task: &Task) {
        self.store
            .update_task_status(&task.id, TaskStatus::Completed)
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn task_without_dependencies_is_immediately_ready() {
    let h = harness().await;
    let a = h.add_task("a", vec![]).await;

    let ready = h.evaluator.ready_tasks(&h.project.id).await.unwrap();
    assert_eq!(ready.len(), 1);
    assert_eq!(ready[0].id, a.id);
}

#[tokio::test]
async fn non_completed_dependency_excludes_dependent() {
    let h = harness().await;
    let a = h.add_task("a", vec![]).await;
    let _b = h.add_task("b", vec![a.id]).await;

    // a is in progress: neither a (not startable) nor b (dep unmet).
    h.store
        .update_task_status(&a.id, TaskStatus::InProgress)
        .await
        .unwrap();

    let ready = h.evaluator.ready_tasks(&h.project.id).await.unwrap();
    assert!(ready.is_empty());
}

#[tokio::test]
async fn completeness_check_is_idempotent() {
    let h = harness().await;
    let a = h.add_task("a", vec![]).await;
    h.complete(&a).await;

    for _ in 0..3 {
        assert!(h
            .evaluator
            .is_orchestration_complete(&h.project.id)
            .await
            .unwrap());
    }
}

#[tokio::test]
async fn completing_a_unblocks_b_with_exactly_one_dispatch() {
    let h = harness().await;
    let a = h.add_task("a", vec![]).await;
    let b = h.add_task("b", vec![a.id]).await;

    h.complete(&a).await;
    let outcome = h.gate.on_task_completed(h.project.id, a.id).await.unwrap();

    assert!(matches!(outcome, GateOutcome::Dispatched { ready: 1, .. }));
    let sent = h.dispatcher.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, WebhookKind::TasksReady);
    assert_eq!(sent[0].envelope.event, TriggerEvent::TasksReady);
    assert_eq!(sent[0].envelope.ready_task_ids, vec![b.id]);
}

#[tokio::test]
async fn concurrent_completion_signals_dispatch_at_most_once() {
    let h = harness().await;
    let a = h.add_task("a", vec![]).await;
    let b = h.add_task("b", vec![]).await;
    let _c = h.add_task("c", vec![a.id, b.id]).await;

    h.complete(&a).await;
    h.complete(&b).await;

    // Both signals race; each observes the same ready set {c}.
    let first = {
        let gate = h.gate.clone();
        let project_id = h.project.id;
        let task_id = a.id;
        tokio::spawn(async move { gate.on_task_completed(project_id, task_id).await })
    };
    let second = {
        let gate = h.gate.clone();
        let project_id = h.project.id;
        let task_id = b.id;
        tokio::spawn(async move { gate.on_task_completed(project_id, task_id).await })
    };

    let outcomes = [
        first.await.unwrap().unwrap(),
        second.await.unwrap().unwrap(),
    ];
    let dispatched = outcomes
        .iter()
        .filter(|o| matches!(o, GateOutcome::Dispatched { .. }))
        .count();
    assert_eq!(dispatched, 1);
    assert_eq!(h.dispatcher.sent_count(), 1);
}

#[tokio::test]
async fn cycle_in_dependency_graph_is_a_loud_error() {
    let h = harness().await;
    let a = h.add_task("a", vec![]).await;
    let b = h.add_task("b", vec![a.id]).await;

    // Close the cycle a -> b -> a by re-inserting a with the back edge.
    let mut a_cyclic = a.clone();
    a_cyclic.depends_on = vec![b.id];
    h.store.insert_task(&a_cyclic).await.unwrap();

    let err = h.evaluator.ready_tasks(&h.project.id).await.unwrap_err();
    match err {
        Error::CycleDetected { cycle } => assert!(cycle.len() >= 2),
        other => panic!("expected CycleDetected, got {other}"),
    }
    assert!(err_is_configuration(&h).await);
}

async fn err_is_configuration(h: &Harness) -> bool {
    h.evaluator
        .ready_tasks(&h.project.id)
        .await
        .unwrap_err()
        .is_configuration()
}

#[tokio::test]
async fn full_project_lifecycle_ends_quiet() {
    let h = harness().await;
    let a = h.add_task("a", vec![]).await;
    let b = h.add_task("b", vec![a.id]).await;

    // Project start fires the bootstrap trigger carrying {a}.
    let started = h.gate.on_project_started(h.project.id).await.unwrap();
    assert!(matches!(started, GateOutcome::Dispatched { ready: 1, .. }));

    // a completes: b becomes ready, one tasks-ready trigger.
    h.complete(&a).await;
    let after_a = h.gate.on_task_completed(h.project.id, a.id).await.unwrap();
    assert!(matches!(after_a, GateOutcome::Dispatched { ready: 1, .. }));

    // b completes: everything terminal, nothing more fires.
    h.complete(&b).await;
    let after_b = h.gate.on_task_completed(h.project.id, b.id).await.unwrap();
    assert_eq!(after_b, GateOutcome::Complete);

    let sent = h.dispatcher.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].envelope.event, TriggerEvent::ProjectStarted);
    assert_eq!(sent[0].envelope.ready_task_ids, vec![a.id]);
    assert_eq!(sent[1].envelope.event, TriggerEvent::TasksReady);
    assert_eq!(sent[1].envelope.ready_task_ids, vec![b.id]);
}

#[tokio::test]
async fn dispatch_failure_self_heals_on_next_signal() {
    let h = harness().await;
    let a = h.add_task("a", vec![]).await;
    let b = h.add_task("b", vec![a.id]).await;

    h.complete(&a).await;
    h.dispatcher.fail_times(1);

    let failed = h.gate.on_task_completed(h.project.id, a.id).await.unwrap();
    assert_eq!(failed, GateOutcome::DispatchFailed);

    let retried = h.gate.on_task_completed(h.project.id, a.id).await.unwrap();
    assert!(matches!(retried, GateOutcome::Dispatched { .. }));
    assert_eq!(h.dispatcher.sent()[0].envelope.ready_task_ids, vec![b.id]);
}
