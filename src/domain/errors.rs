//! Domain errors for the Wavefront orchestration engine.

use thiserror::Error;

/// Format a cycle path as a human-readable string: `a -> b -> c -> a`.
fn format_cycle_path(path: &[String]) -> String {
    let mut joined = path.join(" -> ");
    if let Some(first) = path.first() {
        joined.push_str(" -> ");
        joined.push_str(first);
    }
    joined
}

/// Errors surfaced by the orchestration engine.
///
/// Structural and configuration errors are raised eagerly, before any task
/// starts. Individual task failures are never represented here; they are
/// recorded in the task's result and aggregated into wave statistics.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// A task references a dependency id that is not part of the task set.
    #[error("Task '{task}' depends on unknown task '{dependency}'")]
    MissingDependency {
        /// The task declaring the dependency.
        task: String,
        /// The id that could not be resolved.
        dependency: String,
    },

    /// The dependency graph contains a cycle. Carries one concrete cycle.
    #[error("Dependency cycle detected: {}", format_cycle_path(.0))]
    DependencyCycle(Vec<String>),

    /// Invalid Task/Wave/Phase/Plan construction. Raised at build time,
    /// never deferred to execution.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A task id was referenced that the current plan does not contain.
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    /// A confidence component or overall value fell outside [0, 1].
    #[error("Confidence component '{component}' out of range: {value}")]
    ScoreOutOfRange {
        /// The offending component name.
        component: String,
        /// The rejected value.
        value: f64,
    },

    /// Rollback was requested for a snapshot that does not exist.
    #[error("Rollback of {requested} step(s) unavailable: {available} snapshot(s) retained")]
    Rollback {
        /// Steps back requested by the caller.
        requested: usize,
        /// Snapshots currently retained.
        available: usize,
    },

    /// An operation was invoked in a state that does not permit it.
    #[error("Invalid state for {operation}: controller is {state}")]
    InvalidState {
        /// The operation that was attempted.
        operation: &'static str,
        /// The controller state at the time.
        state: String,
    },

    /// Plan-level inconsistency detected while driving execution.
    #[error("Orchestration error: {0}")]
    Orchestration(String),

    /// Failure in an external collaborator (executor, checkpoint store,
    /// approval service) that the engine cannot recover from.
    #[error("Execution failed: {0}")]
    Execution(String),

    /// Serialization of a snapshot or checkpoint payload failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Convenience alias used throughout the engine.
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

impl From<serde_json::Error> for OrchestratorError {
    fn from(err: serde_json::Error) -> Self {
        OrchestratorError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_error_names_every_member() {
        let err = OrchestratorError::DependencyCycle(vec![
            "a".to_string(),
            "b".to_string(),
            "c".to_string(),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("a -> b -> c -> a"), "got: {msg}");
    }

    #[test]
    fn rollback_error_reports_bounds() {
        let err = OrchestratorError::Rollback {
            requested: 5,
            available: 2,
        };
        assert!(err.to_string().contains('5'));
        assert!(err.to_string().contains('2'));
    }
}
