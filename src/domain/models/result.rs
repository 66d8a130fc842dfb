//! Execution result aggregates.
//!
//! Tasks, waves, and phases are read-only after construction; these are
//! their mutable counterparts, created fresh per execution attempt and
//! retained in history until the controller is reset.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::models::task::TaskStatus;

/// Result of a single task execution attempt chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    /// Id of the task this result belongs to.
    pub task_id: String,
    /// Final status.
    pub status: TaskStatus,
    /// When the first attempt started.
    pub started_at: DateTime<Utc>,
    /// When the final attempt finished.
    pub finished_at: Option<DateTime<Utc>>,
    /// Output produced by the executor, if any.
    pub output: Option<String>,
    /// Error message from the last failed attempt.
    pub error: Option<String>,
    /// Number of retries consumed (0 = succeeded or failed first try).
    pub retry_count: u32,
    /// Executor-reported metrics.
    pub metrics: HashMap<String, f64>,
}

impl TaskResult {
    /// Create a result marking the start of execution.
    pub fn started(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
            output: None,
            error: None,
            retry_count: 0,
            metrics: HashMap::new(),
        }
    }

    /// Create a result for a task cancelled before it started.
    pub fn cancelled(task_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            task_id: task_id.into(),
            status: TaskStatus::Cancelled,
            started_at: now,
            finished_at: Some(now),
            output: None,
            error: None,
            retry_count: 0,
            metrics: HashMap::new(),
        }
    }

    /// Finalize with the given terminal status. Called exactly once.
    pub fn finish(&mut self, status: TaskStatus) {
        self.status = status;
        self.finished_at = Some(Utc::now());
    }

    /// Wall-clock duration, if the task has finished.
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }
}

/// Status of a wave (or whole-plan) execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaveStatus {
    /// Not started.
    Pending,
    /// Currently running.
    Running,
    /// All tasks completed successfully.
    Completed,
    /// Some tasks completed, some failed.
    PartialSuccess,
    /// No task completed.
    Failed,
    /// Interrupted by a halt before finishing.
    Halted,
}

impl WaveStatus {
    /// Stable string form for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::PartialSuccess => "partial_success",
            Self::Failed => "failed",
            Self::Halted => "halted",
        }
    }
}

/// Aggregated outcome of one wave execution.
///
/// Owned exclusively by the scheduler invocation that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaveResult {
    /// Id of the wave this result belongs to.
    pub wave_id: String,
    /// Final status.
    pub status: WaveStatus,
    /// Total tasks in the wave.
    pub total_tasks: usize,
    /// Tasks that completed successfully.
    pub completed_tasks: usize,
    /// Tasks that failed or timed out.
    pub failed_tasks: usize,
    /// Confidence score for the wave (validator output or success rate).
    pub confidence: f64,
    /// Whether confidence and success rate cleared the wave's thresholds.
    pub validation_passed: bool,
    /// Per-task results, in completion order.
    pub task_results: Vec<TaskResult>,
    /// Errors gathered from failed tasks.
    pub errors: Vec<String>,
}

impl WaveResult {
    /// Create an empty result for a wave about to run.
    pub fn new(wave_id: impl Into<String>, total_tasks: usize) -> Self {
        Self {
            wave_id: wave_id.into(),
            status: WaveStatus::Running,
            total_tasks,
            completed_tasks: 0,
            failed_tasks: 0,
            confidence: 0.0,
            validation_passed: false,
            task_results: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Fraction of tasks that completed successfully.
    pub fn success_rate(&self) -> f64 {
        if self.total_tasks == 0 {
            return 0.0;
        }
        self.completed_tasks as f64 / self.total_tasks as f64
    }

    /// Record a finished task result, updating the aggregate counters.
    pub fn record(&mut self, result: TaskResult) {
        match result.status {
            TaskStatus::Completed => self.completed_tasks += 1,
            TaskStatus::Failed | TaskStatus::TimedOut => {
                self.failed_tasks += 1;
                if let Some(err) = &result.error {
                    self.errors.push(format!("{}: {}", result.task_id, err));
                }
            }
            TaskStatus::Pending | TaskStatus::Running | TaskStatus::Cancelled => {}
        }
        self.task_results.push(result);
    }

    /// Derive the terminal status from the counters.
    pub fn derived_status(&self) -> WaveStatus {
        if self.failed_tasks == 0 && self.completed_tasks == self.total_tasks {
            WaveStatus::Completed
        } else if self.completed_tasks > 0 {
            WaveStatus::PartialSuccess
        } else {
            WaveStatus::Failed
        }
    }
}

/// Aggregated outcome of one phase: the wave results it produced plus the
/// derived confidence (mean of wave confidences).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseResult {
    /// Id of the phase this result belongs to.
    pub phase_id: String,
    /// Wave results, in execution order.
    pub wave_results: Vec<WaveResult>,
    /// Mean of the wave confidences.
    pub overall_confidence: f64,
    /// Whether the phase confidence cleared the phase threshold.
    pub validation_passed: bool,
}

impl PhaseResult {
    /// Aggregate a phase result from its wave results.
    pub fn from_waves(
        phase_id: impl Into<String>,
        wave_results: Vec<WaveResult>,
        confidence_threshold: f64,
    ) -> Self {
        let overall_confidence = if wave_results.is_empty() {
            0.0
        } else {
            wave_results.iter().map(|w| w.confidence).sum::<f64>() / wave_results.len() as f64
        };
        Self {
            phase_id: phase_id.into(),
            overall_confidence,
            validation_passed: overall_confidence >= confidence_threshold
                && wave_results.iter().all(|w| w.validation_passed),
            wave_results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_rate() {
        let mut result = WaveResult::new("wave-1", 10);
        result.completed_tasks = 8;
        result.failed_tasks = 2;
        assert!((result.success_rate() - 0.8).abs() < f64::EPSILON);
        assert_eq!(result.derived_status(), WaveStatus::PartialSuccess);
    }

    #[test]
    fn test_empty_wave_success_rate_is_zero() {
        let result = WaveResult::new("wave-1", 0);
        assert!(result.success_rate().abs() < f64::EPSILON);
    }

    #[test]
    fn test_record_updates_counters() {
        let mut wave = WaveResult::new("wave-1", 2);

        let mut ok = TaskResult::started("t1");
        ok.finish(TaskStatus::Completed);
        wave.record(ok);

        let mut bad = TaskResult::started("t2");
        bad.error = Some("boom".to_string());
        bad.finish(TaskStatus::Failed);
        wave.record(bad);

        assert_eq!(wave.completed_tasks, 1);
        assert_eq!(wave.failed_tasks, 1);
        assert_eq!(wave.errors, vec!["t2: boom".to_string()]);
    }

    #[test]
    fn test_phase_confidence_is_mean_of_waves() {
        let mut w1 = WaveResult::new("w1", 1);
        w1.confidence = 0.8;
        w1.validation_passed = true;
        let mut w2 = WaveResult::new("w2", 1);
        w2.confidence = 0.6;
        w2.validation_passed = true;

        let phase = PhaseResult::from_waves("p1", vec![w1, w2], 0.5);
        assert!((phase.overall_confidence - 0.7).abs() < f64::EPSILON);
        assert!(phase.validation_passed);
    }
}
