//! Task executor port - interface for the backend that performs real work.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::errors::OrchestratorResult;
use crate::domain::models::Task;

/// Output of a successful executor invocation.
#[derive(Debug, Clone, Default)]
pub struct ExecutorOutput {
    /// Textual output produced by the backend.
    pub output: String,
    /// Backend-reported metrics (durations, token counts, etc.).
    pub metrics: HashMap<String, f64>,
}

impl ExecutorOutput {
    /// Build an output with no metrics.
    pub fn text(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            metrics: HashMap::new(),
        }
    }
}

/// Trait for task execution backends.
///
/// This is the sole point where actual work happens; the orchestration
/// core never inspects what the call does. Implementations must be
/// cancel-safe: the runner wraps every call in a deadline and drops the
/// future on timeout.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Get the executor type name.
    fn name(&self) -> &'static str;

    /// Execute a task to completion and return its output.
    ///
    /// Per-task failure is an `Err`; it is recorded in the task's result
    /// and never escalated to the scheduler.
    async fn execute(&self, task: &Task) -> OrchestratorResult<ExecutorOutput>;
}
