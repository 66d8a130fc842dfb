//! Concrete implementations of the engine's ports.

pub mod auto_approval;
pub mod memory_checkpoint;
pub mod mock_executor;

pub use auto_approval::AutoApprovalService;
pub use memory_checkpoint::MemoryCheckpointStore;
pub use mock_executor::{MockExecutor, MockOutcome};
