//! Task domain model.
//!
//! Tasks are the smallest schedulable units of work. They carry their
//! dependency edges, so a wave's task list doubles as a dependency graph.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::errors::{OrchestratorError, OrchestratorResult};
use crate::domain::models::result::TaskResult;

/// Status of a task in the execution pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task is defined but has not started.
    Pending,
    /// Task is currently being executed.
    Running,
    /// Task completed successfully.
    Completed,
    /// Task failed after exhausting its retries.
    Failed,
    /// Task exceeded its timeout. Distinct from [`TaskStatus::Failed`].
    TimedOut,
    /// Task was cancelled before it started (fail-fast or halt).
    Cancelled,
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl TaskStatus {
    /// Stable string form for logs and serialized results.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
            Self::Cancelled => "cancelled",
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::TimedOut | Self::Cancelled
        )
    }

    /// Check if this status counts as a success.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Callback invoked with the final result of a task.
pub type TaskHook = Arc<dyn Fn(&TaskResult) + Send + Sync>;

/// Optional completion/error hooks attached to a task.
///
/// Hook failures are logged by the runner and never propagated as
/// scheduler failures.
#[derive(Clone, Default)]
pub struct TaskHooks {
    /// Invoked after the task completes successfully.
    pub on_complete: Option<TaskHook>,
    /// Invoked after the task fails or times out.
    pub on_error: Option<TaskHook>,
}

impl fmt::Debug for TaskHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHooks")
            .field("on_complete", &self.on_complete.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// A discrete unit of work scheduled by the engine.
///
/// Tasks are immutable after construction; execution progress lives in the
/// [`TaskResult`] the runner produces, never in the task itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique, stable identifier. Referenced by dependency lists.
    pub id: String,
    /// Detailed description handed to the executor.
    pub description: String,
    /// Work-kind tag used for executor routing.
    pub kind: String,
    /// Priority; higher is more urgent.
    pub priority: i32,
    /// Per-attempt execution deadline.
    pub timeout: Duration,
    /// Maximum retries after the first attempt.
    pub max_retries: u32,
    /// Ids of tasks that must complete before this one starts.
    pub depends_on: Vec<String>,
    /// Arbitrary context passed through to the executor.
    pub context: HashMap<String, serde_json::Value>,
    /// Optional completion/error callbacks.
    #[serde(skip)]
    pub hooks: TaskHooks,
}

impl Task {
    /// Create a task with the given id and description.
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            kind: "general".to_string(),
            priority: 0,
            timeout: Duration::from_secs(600),
            max_retries: 0,
            depends_on: Vec::new(),
            context: HashMap::new(),
            hooks: TaskHooks::default(),
        }
    }

    /// Set the work-kind tag.
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the maximum retry count.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Add a dependency. Duplicate and self references are ignored.
    pub fn with_dependency(mut self, task_id: impl Into<String>) -> Self {
        let task_id = task_id.into();
        if task_id != self.id && !self.depends_on.contains(&task_id) {
            self.depends_on.push(task_id);
        }
        self
    }

    /// Add a context entry.
    pub fn with_context(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    /// Set the completion hook.
    pub fn on_complete(mut self, hook: TaskHook) -> Self {
        self.hooks.on_complete = Some(hook);
        self
    }

    /// Set the error hook.
    pub fn on_error(mut self, hook: TaskHook) -> Self {
        self.hooks.on_error = Some(hook);
        self
    }

    /// Validate construction invariants.
    ///
    /// Raised eagerly when a wave is built, never deferred to execution.
    pub fn validate(&self) -> OrchestratorResult<()> {
        if self.id.trim().is_empty() {
            return Err(OrchestratorError::Config(
                "task id cannot be empty".to_string(),
            ));
        }
        if self.description.trim().is_empty() {
            return Err(OrchestratorError::Config(format!(
                "task '{}' has an empty description",
                self.id
            )));
        }
        if self.timeout.is_zero() {
            return Err(OrchestratorError::Config(format!(
                "task '{}' has a non-positive timeout",
                self.id
            )));
        }
        if self.depends_on.contains(&self.id) {
            return Err(OrchestratorError::Config(format!(
                "task '{}' cannot depend on itself",
                self.id
            )));
        }
        Ok(())
    }
}
