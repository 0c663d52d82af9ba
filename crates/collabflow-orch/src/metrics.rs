//! Observability metrics for the orchestration core.
//!
//! Prometheus-compatible metrics exposed via the `metrics` crate facade.
//! This subsystem has no UI; stuck projects and dropped triggers are only
//! visible here and in the logs, so the gate records every decision it
//! makes.
//!
//! ## Metrics Exported
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `collabflow_dispatches_total` | Counter | `event`, `result` | Workflow triggers by outcome |
//! | `collabflow_dispatch_attempts_total` | Counter | `event` | Individual webhook delivery attempts |
//! | `collabflow_signals_total` | Counter | `signal`, `outcome` | Signals handled by the gate |
//! | `collabflow_signal_duration_seconds` | Histogram | `signal` | Evaluate->decide->dispatch latency |
//! | `collabflow_ready_tasks` | Histogram | - | Ready-set size per evaluation |
//! | `collabflow_stalled_tasks` | Gauge | `project` | Tasks that can never become ready |
//! | `collabflow_callbacks_total` | Counter | `status` | Inbound callback requests by HTTP status |
//!
//! ## Integration
//!
//! To export to Prometheus install a recorder at startup:
//!
//! ```rust,ignore
//! use metrics_exporter_prometheus::PrometheusBuilder;
//!
//! PrometheusBuilder::new()
//!     .with_http_listener(([0, 0, 0, 0], 9090))
//!     .install()
//!     .expect("failed to install Prometheus recorder");
//! ```

use std::time::{Duration, Instant};

use metrics::{counter, gauge, histogram};

/// Metric names as constants for consistency.
pub mod names {
    /// Counter: Workflow triggers by outcome.
    pub const DISPATCHES_TOTAL: &str = "collabflow_dispatches_total";
    /// Counter: Individual webhook delivery attempts.
    pub const DISPATCH_ATTEMPTS_TOTAL: &str = "collabflow_dispatch_attempts_total";
    /// Counter: Signals handled by the gate.
    pub const SIGNALS_TOTAL: &str = "collabflow_signals_total";
    /// Histogram: Signal handling latency in seconds.
    pub const SIGNAL_DURATION_SECONDS: &str = "collabflow_signal_duration_seconds";
    /// Histogram: Ready-set size per evaluation.
    pub const READY_TASKS: &str = "collabflow_ready_tasks";
    /// Gauge: Tasks that can never become ready, per project.
    pub const STALLED_TASKS: &str = "collabflow_stalled_tasks";
    /// Counter: Inbound callback requests by HTTP status.
    pub const CALLBACKS_TOTAL: &str = "collabflow_callbacks_total";
}

/// Label keys used across metrics.
pub mod labels {
    /// Trigger event kind (`project_started`, `tasks_ready`).
    pub const EVENT: &str = "event";
    /// Dispatch result (`delivered`, `failed`, `skipped_duplicate`).
    pub const RESULT: &str = "result";
    /// Signal kind (`project_started`, `task_completed`).
    pub const SIGNAL: &str = "signal";
    /// Gate outcome (`dispatched`, `skipped_duplicate`, `complete`,
    /// `waiting`, `stalled`, `dispatch_failed`).
    pub const OUTCOME: &str = "outcome";
    /// Project identifier.
    pub const PROJECT: &str = "project";
    /// HTTP status class for callbacks.
    pub const STATUS: &str = "status";
}

/// High-level interface for recording orchestration metrics.
///
/// Cheap to clone and share across handlers.
#[derive(Debug, Clone, Default)]
pub struct OrchMetrics {
    _private: (),
}

impl OrchMetrics {
    /// Creates a new metrics recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a workflow trigger outcome.
    pub fn record_dispatch(&self, event: &str, result: &str) {
        counter!(
            names::DISPATCHES_TOTAL,
            labels::EVENT => event.to_string(),
            labels::RESULT => result.to_string(),
        )
        .increment(1);
    }

    /// Records one webhook delivery attempt.
    pub fn record_dispatch_attempt(&self, event: &str) {
        counter!(
            names::DISPATCH_ATTEMPTS_TOTAL,
            labels::EVENT => event.to_string(),
        )
        .increment(1);
    }

    /// Records a handled signal with its gate outcome.
    pub fn record_signal(&self, signal: &str, outcome: &str) {
        counter!(
            names::SIGNALS_TOTAL,
            labels::SIGNAL => signal.to_string(),
            labels::OUTCOME => outcome.to_string(),
        )
        .increment(1);
    }

    /// Records signal handling latency.
    pub fn observe_signal_duration(&self, signal: &str, duration: Duration) {
        histogram!(
            names::SIGNAL_DURATION_SECONDS,
            labels::SIGNAL => signal.to_string(),
        )
        .record(duration.as_secs_f64());
    }

    /// Records the ready-set size of an evaluation.
    #[allow(clippy::cast_precision_loss)] // Ready sets are small
    pub fn observe_ready_tasks(&self, count: usize) {
        histogram!(names::READY_TASKS).record(count as f64);
    }

    /// Sets the stalled-task gauge for a project.
    #[allow(clippy::cast_precision_loss)] // Gauge values are typically small
    pub fn set_stalled_tasks(&self, project: &str, count: usize) {
        gauge!(
            names::STALLED_TASKS,
            labels::PROJECT => project.to_string(),
        )
        .set(count as f64);
    }

    /// Records an inbound callback by response status.
    pub fn record_callback(&self, status: u16) {
        counter!(
            names::CALLBACKS_TOTAL,
            labels::STATUS => status.to_string(),
        )
        .increment(1);
    }
}

/// RAII guard for timing operations.
///
/// Automatically records duration when dropped.
///
/// ## Example
///
/// ```rust,no_run
/// use collabflow_orch::metrics::{OrchMetrics, TimingGuard};
///
/// let metrics = OrchMetrics::new();
///
/// {
///     let _guard = TimingGuard::new(|duration| {
///         metrics.observe_signal_duration("task_completed", duration);
///     });
///
///     // Handle signal...
/// } // Duration recorded automatically on drop
/// ```
pub struct TimingGuard<F>
where
    F: FnOnce(Duration),
{
    start: Instant,
    on_drop: Option<F>,
}

impl<F> TimingGuard<F>
where
    F: FnOnce(Duration),
{
    /// Creates a new timing guard that will call `on_drop` with the
    /// elapsed duration.
    pub fn new(on_drop: F) -> Self {
        Self {
            start: Instant::now(),
            on_drop: Some(on_drop),
        }
    }

    /// Returns the elapsed time since the guard was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl<F> Drop for TimingGuard<F>
where
    F: FnOnce(Duration),
{
    fn drop(&mut self) {
        if let Some(f) = self.on_drop.take() {
            f(self.start.elapsed());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_can_record_without_a_recorder() {
        // These calls should not panic even without a metrics recorder installed
        let metrics = OrchMetrics::new();
        metrics.record_dispatch("tasks_ready", "delivered");
        metrics.record_dispatch_attempt("tasks_ready");
        metrics.record_signal("task_completed", "dispatched");
        metrics.observe_signal_duration("task_completed", Duration::from_millis(3));
        metrics.observe_ready_tasks(2);
        metrics.set_stalled_tasks("01HQ123PROJECT", 1);
        metrics.record_callback(200);
    }

    #[test]
    fn timing_guard_measures_duration() {
        let mut recorded = None;
        {
            let _guard = TimingGuard::new(|d| {
                recorded = Some(d);
            });
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(recorded.is_some_and(|d| d >= Duration::from_millis(10)));
    }

    #[test]
    fn timing_guard_elapsed_works() {
        let guard = TimingGuard::new(|_| {});
        std::thread::sleep(Duration::from_millis(5));
        assert!(guard.elapsed() >= Duration::from_millis(5));
    }
}
