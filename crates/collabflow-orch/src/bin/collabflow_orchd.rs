//! CollabFlow orchestration daemon.
//!
//! Hosts the workflow-engine callback endpoint and wires the
//! orchestration gate to it. Configuration comes from `COLLABFLOW_*`
//! environment variables; see [`collabflow_orch::config`].

use std::sync::Arc;

use collabflow_core::observability::init_logging;
use collabflow_orch::callback::{self, AppState};
use collabflow_orch::config::OrchestratorConfig;
use collabflow_orch::dispatch::webhook::WebhookDispatcher;
use collabflow_orch::dispatch::WorkflowDispatcher;
use collabflow_orch::error::{Error, Result};
use collabflow_orch::gate::OrchestrationGate;
use collabflow_orch::metrics::OrchMetrics;
use collabflow_orch::signal::SignalRouter;
use collabflow_orch::store::memory::InMemoryTaskGraphStore;
use collabflow_orch::store::TaskGraphStore;

#[tokio::main]
async fn main() -> Result<()> {
    let config = OrchestratorConfig::from_env()?;
    init_logging(config.log_format);

    let store: Arc<dyn TaskGraphStore> = Arc::new(InMemoryTaskGraphStore::new());
    let dispatcher = Arc::new(WebhookDispatcher::new(config.webhook.clone())?);
    let gate = OrchestrationGate::new(store.clone(), dispatcher.clone());

    let mut signals = SignalRouter::new();
    signals.register(Arc::new(gate));

    let app = callback::router(AppState {
        store,
        signals: Arc::new(signals),
        metrics: OrchMetrics::new(),
    });

    tracing::info!(
        listen_addr = %config.listen_addr,
        engine = dispatcher.endpoint_name(),
        "collabflow orchestration daemon starting"
    );

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .map_err(|e| Error::storage_with_source("failed to bind listen address", e))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::storage_with_source("server error", e))
}
