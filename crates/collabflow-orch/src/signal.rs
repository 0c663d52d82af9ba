//! Typed orchestration signals and their routing.
//!
//! Two things happen in the system that orchestration must react to: a
//! project starts, and a task reaches `completed`. Both arrive here as
//! explicit [`Signal`] values and are routed to registered
//! [`SignalHandler`]s. Registration is explicit at startup; there is no
//! global event bus and no reflection over handler types, so the set of
//! reactions to a signal is readable from the composition root.
//!
//! Handlers for one signal run sequentially in registration order. A
//! handler error is logged and does not stop delivery to the remaining
//! handlers.

use std::sync::Arc;

use async_trait::async_trait;

use collabflow_core::{ProjectId, TaskId};

use crate::error::Result;

/// A domain event the orchestration core reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// A project entered orchestration and its initial tasks exist.
    ProjectStarted {
        /// The started project.
        project_id: ProjectId,
    },
    /// A task transitioned to `completed`.
    TaskCompleted {
        /// The completed task.
        task_id: TaskId,
        /// The project owning the task.
        project_id: ProjectId,
    },
}

impl Signal {
    /// Returns the signal kind as a stable string for logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ProjectStarted { .. } => "project_started",
            Self::TaskCompleted { .. } => "task_completed",
        }
    }

    /// Returns the project the signal belongs to.
    #[must_use]
    pub const fn project_id(&self) -> ProjectId {
        match self {
            Self::ProjectStarted { project_id } | Self::TaskCompleted { project_id, .. } => {
                *project_id
            }
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reaction to an orchestration signal.
#[async_trait]
pub trait SignalHandler: Send + Sync {
    /// Handles one signal.
    ///
    /// # Errors
    ///
    /// Implementations return errors for conditions the router should
    /// log; the router never aborts delivery because of them.
    async fn handle(&self, signal: Signal) -> Result<()>;

    /// Returns the handler's name for logs.
    fn name(&self) -> &str;
}

/// Routes signals to explicitly registered handlers.
///
/// ## Example
///
/// ```rust,ignore
/// let mut router = SignalRouter::new();
/// router.register(gate.clone());
/// router.emit(Signal::ProjectStarted { project_id }).await;
/// ```
#[derive(Default)]
pub struct SignalRouter {
    handlers: Vec<Arc<dyn SignalHandler>>,
}

impl SignalRouter {
    /// Creates a router with no handlers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler. Handlers run in registration order.
    pub fn register(&mut self, handler: Arc<dyn SignalHandler>) {
        self.handlers.push(handler);
    }

    /// Returns the number of registered handlers.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Delivers a signal to every registered handler, sequentially.
    ///
    /// Handler errors are logged at error level and swallowed; a failing
    /// handler must not starve the others. Returns the number of handlers
    /// that completed without error.
    pub async fn emit(&self, signal: Signal) -> usize {
        let mut succeeded = 0;
        for handler in &self.handlers {
            match handler.handle(signal).await {
                Ok(()) => succeeded += 1,
                Err(error) => {
                    tracing::error!(
                        handler = handler.name(),
                        signal = %signal,
                        project_id = %signal.project_id(),
                        %error,
                        "signal handler failed"
                    );
                }
            }
        }
        succeeded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::error::Error;

    struct CountingHandler {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingHandler {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }
    }

    #[async_trait]
    impl SignalHandler for CountingHandler {
        async fn handle(&self, _signal: Signal) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::storage("scripted handler failure"));
            }
            Ok(())
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    #[tokio::test]
    async fn delivers_to_all_handlers_in_order() {
        let first = CountingHandler::new(false);
        let second = CountingHandler::new(false);

        let mut router = SignalRouter::new();
        router.register(first.clone());
        router.register(second.clone());

        let ok = router
            .emit(Signal::ProjectStarted {
                project_id: ProjectId::generate(),
            })
            .await;

        assert_eq!(ok, 2);
        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failing_handler_does_not_stop_delivery() {
        let failing = CountingHandler::new(true);
        let healthy = CountingHandler::new(false);

        let mut router = SignalRouter::new();
        router.register(failing.clone());
        router.register(healthy.clone());

        let ok = router
            .emit(Signal::TaskCompleted {
                task_id: TaskId::generate(),
                project_id: ProjectId::generate(),
            })
            .await;

        assert_eq!(ok, 1);
        assert_eq!(healthy.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn signal_names_are_stable() {
        let project_id = ProjectId::generate();
        assert_eq!(Signal::ProjectStarted { project_id }.as_str(), "project_started");
        assert_eq!(
            Signal::TaskCompleted {
                task_id: TaskId::generate(),
                project_id,
            }
            .as_str(),
            "task_completed"
        );
    }
}
