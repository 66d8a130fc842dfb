//! Single-task execution with timeout and bounded retry.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::domain::errors::OrchestratorError;
use crate::domain::models::{Task, TaskResult, TaskStatus};
use crate::domain::ports::TaskExecutor;
use crate::services::events::{emit, EventSender, ExecutionEvent};
use crate::services::halt::HaltSignal;

/// Default backoff time unit; attempt n waits `base * 2^n`.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(100);

/// Executes one task against the external executor, applying the task's
/// timeout and retry policy. Stateless apart from its executor handle.
pub struct TaskRunner {
    executor: Arc<dyn TaskExecutor>,
    backoff_base: Duration,
}

impl TaskRunner {
    /// Create a runner with the default backoff base.
    pub fn new(executor: Arc<dyn TaskExecutor>) -> Self {
        Self {
            executor,
            backoff_base: DEFAULT_BACKOFF_BASE,
        }
    }

    /// Override the backoff time unit.
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// Run a task to a terminal result.
    ///
    /// Attempts up to `max_retries + 1` times. Between attempts the runner
    /// waits `base * 2^attempt` without stalling sibling tasks; the wait
    /// races the halt signal, and a halt abandons the remaining retries.
    /// A timed-out attempt is marked [`TaskStatus::TimedOut`] and is only
    /// retried when `retry_timed_out` is set (the wave's retry-on-failure
    /// flag); if the final attempt also times out the terminal status stays
    /// `TimedOut`. Hook failures are logged, never propagated.
    pub async fn run(
        &self,
        task: &Task,
        retry_timed_out: bool,
        halt: &HaltSignal,
        events: Option<&EventSender>,
    ) -> TaskResult {
        let mut result = TaskResult::started(&task.id);
        emit(
            events,
            ExecutionEvent::TaskStarted {
                task_id: task.id.clone(),
            },
        );

        let mut last_error: Option<String> = None;
        let mut last_timed_out = false;

        for attempt in 0..=task.max_retries {
            if attempt > 0 {
                result.retry_count = attempt;
                emit(
                    events,
                    ExecutionEvent::TaskRetrying {
                        task_id: task.id.clone(),
                        attempt,
                        max_retries: task.max_retries,
                    },
                );

                let delay = self.backoff_base * 2u32.saturating_pow(attempt);
                tokio::select! {
                    () = sleep(delay) => {}
                    () = halt.halted() => {
                        debug!(task_id = %task.id, "Halt observed during backoff; abandoning retries");
                        break;
                    }
                }
            }

            match timeout(task.timeout, self.executor.execute(task)).await {
                Ok(Ok(output)) => {
                    result.output = Some(output.output);
                    result.metrics = output.metrics;
                    result.finish(TaskStatus::Completed);
                    self.invoke_hook(task, &result, true);
                    emit(
                        events,
                        ExecutionEvent::TaskFinished {
                            task_id: task.id.clone(),
                            status: result.status,
                            retry_count: result.retry_count,
                        },
                    );
                    return result;
                }
                Ok(Err(err)) => {
                    debug!(task_id = %task.id, attempt, error = %err, "Task attempt failed");
                    // Keep the executor's bare message; the variant prefix
                    // would otherwise be repeated in WaveResult.errors.
                    last_error = Some(match err {
                        OrchestratorError::Execution(msg) => msg,
                        other => other.to_string(),
                    });
                    last_timed_out = false;
                }
                Err(_elapsed) => {
                    let msg = format!("timed out after {:?}", task.timeout);
                    debug!(task_id = %task.id, attempt, "Task attempt {msg}");
                    last_error = Some(msg);
                    last_timed_out = true;
                    if !retry_timed_out {
                        result.error = last_error;
                        result.finish(TaskStatus::TimedOut);
                        self.invoke_hook(task, &result, false);
                        emit(
                            events,
                            ExecutionEvent::TaskFinished {
                                task_id: task.id.clone(),
                                status: result.status,
                                retry_count: result.retry_count,
                            },
                        );
                        return result;
                    }
                }
            }
        }

        result.error = last_error.or_else(|| Some("unknown error".to_string()));
        // Exhausting retries does not relabel a timeout as a failure.
        result.finish(if last_timed_out {
            TaskStatus::TimedOut
        } else {
            TaskStatus::Failed
        });
        self.invoke_hook(task, &result, false);
        emit(
            events,
            ExecutionEvent::TaskFinished {
                task_id: task.id.clone(),
                status: result.status,
                retry_count: result.retry_count,
            },
        );
        result
    }

    /// Invoke the completion or error hook, swallowing panics.
    fn invoke_hook(&self, task: &Task, result: &TaskResult, success: bool) {
        let hook = if success {
            task.hooks.on_complete.as_ref()
        } else {
            task.hooks.on_error.as_ref()
        };
        if let Some(hook) = hook {
            if catch_unwind(AssertUnwindSafe(|| hook(result))).is_err() {
                warn!(task_id = %task.id, "Task hook panicked; ignoring");
            }
        }
    }
}
