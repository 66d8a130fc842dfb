//! Port trait definitions (Hexagonal Architecture)
//!
//! Async trait interfaces the engine consumes but never implements:
//! - TaskExecutor: the backend that performs a task's actual work
//! - CheckpointStore: optional persistence for controller progress
//! - ApprovalService: optional human-in-the-loop escalation
//!
//! These contracts keep the orchestration core independent of any
//! particular backend.

pub mod approval;
pub mod checkpoint;
pub mod executor;

pub use approval::{
    ApprovalService, DecisionOption, DecisionRequest, DecisionResponse, AUTO_ACCEPT_CONFIDENCE,
};
pub use checkpoint::CheckpointStore;
pub use executor::{ExecutorOutput, TaskExecutor};
