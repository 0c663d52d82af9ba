//! # collabflow-orch
//!
//! Task-readiness evaluation and workflow orchestration triggers for
//! CollabFlow.
//!
//! This crate decides when the external workflow engine (n8n) should be
//! triggered, based on the project task dependency graph:
//!
//! - **Readiness evaluation**: Pure queries deriving which tasks are
//!   unblocked from persisted state, re-computed on every signal
//! - **Orchestration gate**: Completion and project-start signals in,
//!   deduplicated workflow triggers out
//! - **Webhook dispatch**: Bounded-retry HTTP delivery with per-endpoint
//!   path overrides
//! - **Inbound callback**: HTTP surface the engine reports task status to
//!
//! ## Guarantees
//!
//! - **Self-healing**: No derived readiness state is cached; a missed or
//!   failed trigger is retried on the next completion signal
//! - **Per-project ordering**: Signals for one project run the whole
//!   evaluate-decide-dispatch sequence serially, in arrival order
//! - **Loud configuration errors**: A cyclic dependency graph fails the
//!   evaluation instead of silently stalling the project
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use collabflow_orch::dispatch::memory::RecordingDispatcher;
//! use collabflow_orch::error::Result;
//! use collabflow_orch::gate::OrchestrationGate;
//! use collabflow_orch::project::Project;
//! use collabflow_orch::store::memory::InMemoryTaskGraphStore;
//! use collabflow_orch::store::TaskGraphStore;
//! use collabflow_orch::task::{Task, TaskType};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<()> {
//! let store = Arc::new(InMemoryTaskGraphStore::new());
//! let dispatcher = Arc::new(RecordingDispatcher::new());
//! let gate = OrchestrationGate::new(store.clone(), dispatcher);
//!
//! let project = Project::new("launch");
//! store.save_project(&project).await?;
//! store
//!     .insert_task(&Task::new(project.id, "extract", TaskType::Ai))
//!     .await?;
//!
//! let outcome = gate.on_project_started(project.id).await?;
//! println!("{}", outcome.as_str());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod callback;
pub mod config;
pub(crate) mod dag;
pub mod dispatch;
pub mod error;
pub mod gate;
pub mod locks;
pub mod metrics;
pub mod project;
pub mod readiness;
pub mod signal;
pub mod store;
pub mod task;

pub use error::{Error, Result};
pub use gate::{GateOutcome, OrchestrationGate};
pub use readiness::ReadinessEvaluator;
pub use signal::{Signal, SignalRouter};
