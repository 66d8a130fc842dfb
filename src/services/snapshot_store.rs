//! Bounded ring of execution snapshots.

use std::collections::{BTreeMap, VecDeque};

use tracing::debug;

use crate::domain::errors::{OrchestratorError, OrchestratorResult};
use crate::domain::models::{Snapshot, WaveResult, WaveStatus};

/// Default number of snapshots retained.
pub const DEFAULT_SNAPSHOT_CAPACITY: usize = 100;

/// Retains a bounded FIFO ring of immutable snapshots.
///
/// The store is the sole owner of its buffer; captured snapshots are
/// deep copies and never alias live state.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    snapshots: VecDeque<Snapshot>,
    capacity: usize,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore {
    /// Create a store with the default capacity.
    pub fn new() -> Self {
        Self {
            snapshots: VecDeque::new(),
            capacity: DEFAULT_SNAPSHOT_CAPACITY,
        }
    }

    /// Create a store with a custom capacity.
    pub fn with_capacity(capacity: usize) -> OrchestratorResult<Self> {
        if capacity == 0 {
            return Err(OrchestratorError::Config(
                "snapshot capacity must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            snapshots: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    /// Capture a snapshot of the given live state.
    ///
    /// When capacity is exceeded, the oldest snapshot is evicted first.
    pub fn capture(
        &mut self,
        wave_index: usize,
        history: &[WaveResult],
        wave_states: &BTreeMap<String, WaveStatus>,
    ) -> &Snapshot {
        let snapshot = Snapshot::capture(wave_index, history, wave_states);
        if self.snapshots.len() == self.capacity {
            self.snapshots.pop_front();
        }
        debug!(wave_index, retained = self.snapshots.len() + 1, "Snapshot captured");
        self.snapshots.push_back(snapshot);
        // Just pushed; the buffer cannot be empty.
        &self.snapshots[self.snapshots.len() - 1]
    }

    /// Get the snapshot `steps_back` positions before the most recent
    /// (1 = immediately prior capture).
    pub fn get(&self, steps_back: usize) -> OrchestratorResult<&Snapshot> {
        let count = self.snapshots.len();
        if steps_back < 1 || steps_back > count {
            return Err(OrchestratorError::Rollback {
                requested: steps_back,
                available: count,
            });
        }
        Ok(&self.snapshots[count - steps_back])
    }

    /// Number of snapshots retained.
    pub fn count(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Drop all snapshots.
    pub fn clear(&mut self) {
        self.snapshots.clear();
    }
}
