//! Orchestration services: dependency resolution, scheduling, gating,
//! and the execution controller that ties them together.

pub mod confidence_gate;
pub mod controller;
pub mod dependency_resolver;
pub mod events;
pub mod halt;
pub mod snapshot_store;
pub mod task_runner;
pub mod wave_scheduler;

pub use confidence_gate::{ConfidenceGate, GateDecision, GateIssue, GateStatus, IssueSeverity};
pub use controller::{ControllerStatus, ExecutionController, ExecutionReport, ExecutionState};
pub use dependency_resolver::DependencyResolver;
pub use events::{EventSender, ExecutionEvent};
pub use halt::HaltSignal;
pub use snapshot_store::{SnapshotStore, DEFAULT_SNAPSHOT_CAPACITY};
pub use task_runner::TaskRunner;
pub use wave_scheduler::WaveScheduler;
