//! Checkpoint store port - optional persistence for controller progress.

use async_trait::async_trait;

use crate::domain::errors::OrchestratorResult;
use crate::domain::models::Snapshot;

/// Trait for checkpoint persistence backends.
///
/// Invoked by the controller at boundaries dictated by the plan's
/// checkpoint frequency. Persistence format and backend are the
/// implementation's concern; the engine only hands over owned snapshots.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Persist a snapshot under the given checkpoint id.
    async fn save(&self, checkpoint_id: &str, snapshot: &Snapshot) -> OrchestratorResult<()>;

    /// Load a previously saved snapshot, if present.
    async fn load(&self, checkpoint_id: &str) -> OrchestratorResult<Option<Snapshot>>;

    /// List all stored checkpoint ids.
    async fn list(&self) -> OrchestratorResult<Vec<String>>;

    /// Delete a checkpoint. Deleting an unknown id is not an error.
    async fn delete(&self, checkpoint_id: &str) -> OrchestratorResult<()>;
}
