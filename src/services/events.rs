//! Execution event stream.
//!
//! Events are emitted best-effort on an mpsc channel so embedders can
//! observe progress live. A full or dropped receiver never stalls the
//! engine.

use tokio::sync::mpsc;

use crate::domain::models::{TaskStatus, WaveStatus};

/// Event emitted while a plan executes.
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    /// Plan execution started.
    Started {
        /// Plan id.
        plan_id: String,
        /// Total phases in the plan.
        total_phases: usize,
        /// Total waves across all phases.
        total_waves: usize,
    },
    /// A wave began executing.
    WaveStarted {
        /// Wave id.
        wave_id: String,
        /// Global wave index (0-based).
        wave_index: usize,
        /// Tasks in the wave.
        task_count: usize,
    },
    /// A task began its first attempt.
    TaskStarted {
        /// Task id.
        task_id: String,
    },
    /// A task is being retried after a failed attempt.
    TaskRetrying {
        /// Task id.
        task_id: String,
        /// Attempt number (1 = first retry).
        attempt: u32,
        /// Retries permitted.
        max_retries: u32,
    },
    /// A task reached a terminal status.
    TaskFinished {
        /// Task id.
        task_id: String,
        /// Terminal status.
        status: TaskStatus,
        /// Retries consumed.
        retry_count: u32,
    },
    /// A wave finished (or was interrupted).
    WaveCompleted {
        /// Wave id.
        wave_id: String,
        /// Terminal wave status.
        status: WaveStatus,
        /// Tasks that succeeded.
        completed: usize,
        /// Tasks that failed or timed out.
        failed: usize,
        /// Wave confidence.
        confidence: f64,
    },
    /// A phase finished aggregation.
    PhaseCompleted {
        /// Phase id.
        phase_id: String,
        /// Mean of the phase's wave confidences.
        confidence: f64,
        /// Whether the phase cleared its threshold.
        validation_passed: bool,
    },
    /// The halt signal was observed and the controller stopped.
    Halted {
        /// Global wave index at the halt point.
        wave_index: usize,
    },
    /// Plan execution finished.
    Completed {
        /// Plan id.
        plan_id: String,
    },
}

/// Sender half used throughout the engine.
pub type EventSender = mpsc::Sender<ExecutionEvent>;

/// Emit an event without ever blocking the engine.
pub fn emit(events: Option<&EventSender>, event: ExecutionEvent) {
    if let Some(tx) = events {
        let _ = tx.try_send(event);
    }
}
