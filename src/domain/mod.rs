//! Domain layer for the Wavefront orchestration engine
//!
//! This module contains core domain models, the error taxonomy, and the
//! ports the engine consumes.

pub mod errors;
pub mod models;
pub mod ports;

// Re-export error types for convenient access
pub use errors::{OrchestratorError, OrchestratorResult};
