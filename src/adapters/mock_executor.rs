//! Mock executor for tests and embedder experiments.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::errors::{OrchestratorError, OrchestratorResult};
use crate::domain::models::Task;
use crate::domain::ports::{ExecutorOutput, TaskExecutor};

/// Scripted outcome for one task id.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    /// Succeed with the given output after an optional delay.
    Success {
        /// Output text returned to the runner.
        output: String,
        /// Simulated work duration.
        delay: Duration,
    },
    /// Fail the first `failures` attempts, then succeed.
    FailTimes {
        /// Attempts that fail before the first success.
        failures: u32,
        /// Error message for the failing attempts.
        error: String,
    },
    /// Fail every attempt.
    AlwaysFail {
        /// Error message.
        error: String,
    },
    /// Never return; exercises the runner's deadline handling.
    Hang,
}

impl MockOutcome {
    /// Succeed immediately with the given output.
    pub fn success(output: impl Into<String>) -> Self {
        Self::Success {
            output: output.into(),
            delay: Duration::ZERO,
        }
    }

    /// Succeed after simulating `delay` of work.
    pub fn success_after(delay: Duration) -> Self {
        Self::Success {
            output: "ok".to_string(),
            delay,
        }
    }

    /// Fail the first `failures` attempts, then succeed.
    pub fn fail_times(failures: u32) -> Self {
        Self::FailTimes {
            failures,
            error: "transient failure".to_string(),
        }
    }

    /// Fail every attempt with the given message.
    pub fn always_fail(error: impl Into<String>) -> Self {
        Self::AlwaysFail {
            error: error.into(),
        }
    }

    /// Never return.
    pub fn hang() -> Self {
        Self::Hang
    }
}

/// Mock [`TaskExecutor`] with per-task scripted outcomes.
///
/// Unscripted tasks succeed after the default delay.
///
/// Cloning yields a handle to the same scripted state and attempt
/// counters.
#[derive(Clone)]
pub struct MockExecutor {
    outcomes: Arc<RwLock<HashMap<String, MockOutcome>>>,
    attempts: Arc<RwLock<HashMap<String, u32>>>,
    default_delay: Duration,
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExecutor {
    /// Create an executor where every task succeeds immediately.
    pub fn new() -> Self {
        Self {
            outcomes: Arc::new(RwLock::new(HashMap::new())),
            attempts: Arc::new(RwLock::new(HashMap::new())),
            default_delay: Duration::ZERO,
        }
    }

    /// Set the simulated work duration for unscripted tasks.
    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    /// Script the outcome for one task id.
    pub async fn script(&self, task_id: impl Into<String>, outcome: MockOutcome) {
        self.outcomes.write().await.insert(task_id.into(), outcome);
    }

    /// Attempts recorded for a task id.
    pub async fn attempts(&self, task_id: &str) -> u32 {
        self.attempts
            .read()
            .await
            .get(task_id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl TaskExecutor for MockExecutor {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn execute(&self, task: &Task) -> OrchestratorResult<ExecutorOutput> {
        let attempt = {
            let mut attempts = self.attempts.write().await;
            let counter = attempts.entry(task.id.clone()).or_insert(0);
            *counter += 1;
            *counter
        };

        let outcome = self.outcomes.read().await.get(&task.id).cloned();
        match outcome {
            None => {
                if !self.default_delay.is_zero() {
                    tokio::time::sleep(self.default_delay).await;
                }
                Ok(ExecutorOutput::text(format!("completed {}", task.id)))
            }
            Some(MockOutcome::Success { output, delay }) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok(ExecutorOutput::text(output))
            }
            Some(MockOutcome::FailTimes { failures, error }) => {
                if attempt <= failures {
                    Err(OrchestratorError::Execution(error))
                } else {
                    Ok(ExecutorOutput::text(format!("completed {}", task.id)))
                }
            }
            Some(MockOutcome::AlwaysFail { error }) => Err(OrchestratorError::Execution(error)),
            Some(MockOutcome::Hang) => {
                // Long enough to guarantee the runner's deadline fires first.
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(ExecutorOutput::text("unreachable"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unscripted_task_succeeds() {
        let executor = MockExecutor::new();
        let task = Task::new("t1", "work");
        let output = executor.execute(&task).await.unwrap();
        assert!(output.output.contains("t1"));
        assert_eq!(executor.attempts("t1").await, 1);
    }

    #[tokio::test]
    async fn test_fail_times_recovers() {
        let executor = MockExecutor::new();
        executor.script("t1", MockOutcome::fail_times(1)).await;
        let task = Task::new("t1", "work");

        assert!(executor.execute(&task).await.is_err());
        assert!(executor.execute(&task).await.is_ok());
    }
}
