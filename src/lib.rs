//! Wavefront - Confidence-Gated Orchestration Engine
//!
//! Wavefront executes hierarchical plans (plan -> phases -> waves ->
//! tasks) with dependency-aware scheduling, confidence gating,
//! snapshot-based rollback, and low-latency halt/resume control.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Plans, tasks, results, confidence scores,
//!   and the ports the engine depends on
//! - **Service Layer** (`services`): Dependency resolution, wave scheduling,
//!   gating, snapshots, and the execution controller
//! - **Adapters** (`adapters`): Concrete port implementations
//! - **Infrastructure Layer** (`infrastructure`): Configuration loading and
//!   logging setup
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use wavefront::{ExecutionController, ExecutionPlan, MockExecutor, Phase, Task, Wave};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let plan = ExecutionPlan::new("plan", "Example").with_phase(
//!         Phase::new("p1", "Build", 1)
//!             .with_wave(Wave::new("w1", "Compile", vec![Task::new("t1", "compile")])),
//!     );
//!     let controller = ExecutionController::new(plan, Arc::new(MockExecutor::new()))?;
//!     let report = controller.execute().await?;
//!     println!("{:?}", report.state);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use adapters::{AutoApprovalService, MemoryCheckpointStore, MockExecutor, MockOutcome};
pub use domain::errors::{OrchestratorError, OrchestratorResult};
pub use domain::models::{
    CheckpointFrequency, ConfidenceComponents, ConfidenceLevel, ConfidenceScore, ExecutionPlan,
    OrchestratorConfig, Phase, PhaseResult, Snapshot, Task, TaskResult, TaskStatus, Wave,
    WaveResult, WaveStatus, WaveStrategy,
};
pub use domain::ports::{
    ApprovalService, CheckpointStore, DecisionOption, DecisionRequest, DecisionResponse,
    ExecutorOutput, TaskExecutor,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    ConfidenceGate, ControllerStatus, DependencyResolver, EventSender, ExecutionController,
    ExecutionEvent, ExecutionReport, ExecutionState, HaltSignal, SnapshotStore, WaveScheduler,
};
