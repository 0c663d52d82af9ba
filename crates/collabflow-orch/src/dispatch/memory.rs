//! In-memory recording dispatcher for testing.
//!
//! Records every trigger it is asked to deliver and can be scripted to
//! fail a number of dispatches, which is how the gate's
//! failure-is-non-fatal behavior is exercised in tests.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use super::{DispatchOutcome, TriggerEnvelope, WebhookKind, WorkflowDispatcher};
use crate::error::{Error, Result};

/// A recorded dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedDispatch {
    /// The endpoint kind the trigger targeted.
    pub kind: WebhookKind,
    /// The delivered envelope.
    pub envelope: TriggerEnvelope,
}

#[derive(Debug, Default)]
struct Inner {
    sent: Vec<RecordedDispatch>,
    fail_remaining: u32,
}

/// In-memory dispatcher for tests.
///
/// ## Example
///
/// ```rust
/// use collabflow_orch::dispatch::memory::RecordingDispatcher;
///
/// let dispatcher = RecordingDispatcher::new();
/// dispatcher.fail_times(1); // first dispatch will fail
/// ```
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    inner: Mutex<Inner>,
}

impl RecordingDispatcher {
    /// Creates a dispatcher that accepts every trigger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` dispatch calls fail.
    pub fn fail_times(&self, count: u32) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fail_remaining = count;
    }

    /// Returns every successfully delivered trigger, in order.
    #[must_use]
    pub fn sent(&self) -> Vec<RecordedDispatch> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sent
            .clone()
    }

    /// Returns the number of successfully delivered triggers.
    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sent
            .len()
    }
}

#[async_trait]
impl WorkflowDispatcher for RecordingDispatcher {
    async fn dispatch(
        &self,
        kind: WebhookKind,
        envelope: TriggerEnvelope,
    ) -> Result<DispatchOutcome> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.fail_remaining > 0 {
            inner.fail_remaining -= 1;
            drop(inner);
            return Err(Error::DispatchFailed {
                event: envelope.event.to_string(),
                attempts: 1,
                message: "scripted failure".to_string(),
            });
        }
        inner.sent.push(RecordedDispatch { kind, envelope });
        drop(inner);
        Ok(DispatchOutcome::Delivered { attempts: 1 })
    }

    fn endpoint_name(&self) -> &str {
        "in-memory"
    }
}
