//! Domain models: plain data, no behavior beyond construction rules.

pub mod confidence;
pub mod config;
pub mod plan;
pub mod result;
pub mod snapshot;
pub mod task;

pub use confidence::{ConfidenceComponents, ConfidenceLevel, ConfidenceScore};
pub use config::{
    ConfidenceConfig, LoggingConfig, OrchestratorConfig, SchedulerConfig, SnapshotConfig,
};
pub use plan::{CheckpointFrequency, ExecutionPlan, Phase, Wave, WaveStrategy};
pub use result::{PhaseResult, TaskResult, WaveResult, WaveStatus};
pub use snapshot::Snapshot;
pub use task::{Task, TaskHook, TaskHooks, TaskStatus};
