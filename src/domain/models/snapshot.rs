//! Point-in-time snapshots of scheduler progress.
//!
//! Captured at wave boundaries and never mutated afterwards. Payloads are
//! fully-owned value types cloned by value, so rollback correctness never
//! depends on a generic object-graph copy.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::models::result::{WaveResult, WaveStatus};

/// An immutable capture of scheduler progress at a wave boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Global wave index at capture time (the wave about to run).
    pub wave_index: usize,
    /// Deep copy of the wave history up to the capture point.
    pub history: Vec<WaveResult>,
    /// Per-wave status at the capture point, keyed by wave id.
    pub wave_states: BTreeMap<String, WaveStatus>,
    /// When the snapshot was captured.
    pub captured_at: DateTime<Utc>,
}

impl Snapshot {
    /// Capture a snapshot by deep-copying the live state.
    pub fn capture(
        wave_index: usize,
        history: &[WaveResult],
        wave_states: &BTreeMap<String, WaveStatus>,
    ) -> Self {
        Self {
            wave_index,
            history: history.to_vec(),
            wave_states: wave_states.clone(),
            captured_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_does_not_alias_live_state() {
        let mut history = vec![WaveResult::new("w1", 3)];
        let mut states = BTreeMap::new();
        states.insert("w1".to_string(), WaveStatus::Running);

        let snapshot = Snapshot::capture(1, &history, &states);

        // Mutate live state after capture.
        history[0].completed_tasks = 3;
        states.insert("w1".to_string(), WaveStatus::Completed);

        assert_eq!(snapshot.history[0].completed_tasks, 0);
        assert_eq!(snapshot.wave_states["w1"], WaveStatus::Running);
    }
}
