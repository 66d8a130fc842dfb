//! In-memory checkpoint store for tests and single-process embedders.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::errors::OrchestratorResult;
use crate::domain::models::Snapshot;
use crate::domain::ports::checkpoint::CheckpointStore;

/// Keeps checkpoints in a process-local map. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryCheckpointStore {
    checkpoints: RwLock<HashMap<String, Snapshot>>,
}

impl MemoryCheckpointStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored checkpoints.
    pub async fn len(&self) -> usize {
        self.checkpoints.read().await.len()
    }

    /// Whether the store holds no checkpoints.
    pub async fn is_empty(&self) -> bool {
        self.checkpoints.read().await.is_empty()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn save(&self, checkpoint_id: &str, snapshot: &Snapshot) -> OrchestratorResult<()> {
        self.checkpoints
            .write()
            .await
            .insert(checkpoint_id.to_string(), snapshot.clone());
        Ok(())
    }

    async fn load(&self, checkpoint_id: &str) -> OrchestratorResult<Option<Snapshot>> {
        Ok(self.checkpoints.read().await.get(checkpoint_id).cloned())
    }

    async fn list(&self) -> OrchestratorResult<Vec<String>> {
        let mut ids: Vec<String> = self.checkpoints.read().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    async fn delete(&self, checkpoint_id: &str) -> OrchestratorResult<()> {
        self.checkpoints.write().await.remove(checkpoint_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_save_load_roundtrip() {
        let store = MemoryCheckpointStore::new();
        let snapshot = Snapshot::capture(3, &[], &BTreeMap::new());

        store.save("plan-wave-3", &snapshot).await.unwrap();
        let loaded = store.load("plan-wave-3").await.unwrap().unwrap();
        assert_eq!(loaded.wave_index, 3);
        assert!(store.load("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_is_sorted_and_delete_is_idempotent() {
        let store = MemoryCheckpointStore::new();
        let snapshot = Snapshot::capture(0, &[], &BTreeMap::new());
        store.save("b", &snapshot).await.unwrap();
        store.save("a", &snapshot).await.unwrap();

        assert_eq!(store.list().await.unwrap(), vec!["a", "b"]);

        store.delete("a").await.unwrap();
        store.delete("a").await.unwrap();
        assert_eq!(store.len().await, 1);
    }
}
