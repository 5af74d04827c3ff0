//! Authoritative home of the current model weights.
//!
//! The store is the single source of truth workers and the trainer read
//! and write. Publishing replaces the snapshot wholesale under a lock, so a
//! reader always observes either the prior or the new snapshot, never a
//! mix. The store also owns checkpoint persistence and the append-only
//! placement record used by evaluation runs.

use crate::core::transition::AgentId;
use crate::core::weights::{VersionCounter, WeightsSnapshot};
use crate::store::checkpoint::{CheckpointError, CheckpointStore};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Final placements of one evaluation game.
///
/// Placement 0 is the winner; eliminated agents count down from
/// `num_players - 1` in elimination order.
#[derive(Debug, Clone, Default)]
pub struct PlacementResult {
    /// Placement per agent.
    pub placements: HashMap<AgentId, u8>,
}

impl PlacementResult {
    /// The winning agent, if one was recorded.
    pub fn winner(&self) -> Option<&AgentId> {
        self.placements
            .iter()
            .find(|(_, &place)| place == 0)
            .map(|(agent, _)| agent)
    }
}

/// Shared weight authority.
pub struct ModelStore {
    current: RwLock<WeightsSnapshot>,
    version: VersionCounter,
    checkpoints: Mutex<CheckpointStore>,
    placements: Mutex<Vec<PlacementResult>>,
}

impl ModelStore {
    /// Create a store holding the given initial weights.
    pub fn new(initial: WeightsSnapshot, checkpoints: CheckpointStore) -> Self {
        let version = VersionCounter::new();
        version.reset_to(initial.version);
        Self {
            current: RwLock::new(initial),
            version,
            checkpoints: Mutex::new(checkpoints),
            placements: Mutex::new(Vec::new()),
        }
    }

    /// The authoritative snapshot, by value.
    pub fn current(&self) -> WeightsSnapshot {
        self.current.read().clone()
    }

    /// Current publish version.
    pub fn version(&self) -> u64 {
        self.version.current()
    }

    /// Atomically replace the authoritative snapshot.
    ///
    /// Called once per completed training step. The snapshot is stamped
    /// with the new version; returns that version.
    pub fn publish(&self, mut snapshot: WeightsSnapshot) -> u64 {
        let version = self.version.increment();
        snapshot.version = version;
        *self.current.write() = snapshot;
        version
    }

    /// Persist the current snapshot under the given step key.
    pub fn checkpoint(&self, step: u64) -> Result<PathBuf, CheckpointError> {
        let snapshot = self.current();
        self.checkpoints.lock().save(&snapshot, step)
    }

    /// Replace the current snapshot with the newest checkpoint on disk.
    ///
    /// Returns the restored training step, or `None` when no checkpoint
    /// exists (meaning: keep the fresh weights the store was created with).
    pub fn restore_latest(&self) -> Result<Option<u64>, CheckpointError> {
        match self.checkpoints.lock().load_latest()? {
            Some((snapshot, step)) => {
                self.version.reset_to(snapshot.version);
                *self.current.write() = snapshot;
                Ok(Some(step))
            }
            None => Ok(None),
        }
    }

    /// Append an evaluation game's placements.
    pub fn record_placements(&self, result: PlacementResult) {
        self.placements.lock().push(result);
    }

    /// All recorded placements, oldest first.
    pub fn placements(&self) -> Vec<PlacementResult> {
        self.placements.lock().clone()
    }
}

/// Thread-safe shared model store.
pub type SharedModelStore = Arc<ModelStore>;

/// Create a new shared model store.
pub fn model_store(initial: WeightsSnapshot, checkpoints: CheckpointStore) -> SharedModelStore {
    Arc::new(ModelStore::new(initial, checkpoints))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::checkpoint::CheckpointConfig;
    use tempfile::tempdir;

    fn store_in(dir: &std::path::Path) -> ModelStore {
        let checkpoints = CheckpointStore::new(CheckpointConfig::new(dir)).unwrap();
        ModelStore::new(WeightsSnapshot::fresh(vec![0.0; 4]), checkpoints)
    }

    #[test]
    fn test_starts_at_version_zero() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        assert_eq!(store.version(), 0);
        assert_eq!(store.current().version, 0);
    }

    #[test]
    fn test_publish_bumps_version_and_replaces() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        let version = store.publish(WeightsSnapshot::fresh(vec![1.0; 4]));
        assert_eq!(version, 1);

        let current = store.current();
        assert_eq!(current.version, 1);
        assert_eq!(current.parameters, vec![1.0; 4]);

        store.publish(WeightsSnapshot::fresh(vec![2.0; 4]));
        assert_eq!(store.version(), 2);
        assert_eq!(store.current().parameters, vec![2.0; 4]);
    }

    #[test]
    fn test_checkpoint_and_restore() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        store.publish(WeightsSnapshot::fresh(vec![3.0; 4]));
        store.checkpoint(500).unwrap();
        store.publish(WeightsSnapshot::fresh(vec![9.0; 4]));

        let step = store.restore_latest().unwrap();
        assert_eq!(step, Some(500));
        assert_eq!(store.current().parameters, vec![3.0; 4]);
        assert_eq!(store.version(), 1);
    }

    #[test]
    fn test_restore_without_checkpoints_keeps_fresh_weights() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        assert_eq!(store.restore_latest().unwrap(), None);
        assert_eq!(store.current().parameters, vec![0.0; 4]);
    }

    #[test]
    fn test_placement_side_channel_is_append_only() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        let mut first = PlacementResult::default();
        first.placements.insert("player_2".to_string(), 0);
        store.record_placements(first);

        let mut second = PlacementResult::default();
        second.placements.insert("player_5".to_string(), 0);
        store.record_placements(second);

        let recorded = store.placements();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].winner(), Some(&"player_2".to_string()));
        assert_eq!(recorded[1].winner(), Some(&"player_5".to_string()));
    }

    #[test]
    fn test_reader_sees_whole_snapshots_under_concurrency() {
        let dir = tempdir().unwrap();
        let store = Arc::new(store_in(dir.path()));

        let writer = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for i in 1..=100u64 {
                    store.publish(WeightsSnapshot::fresh(vec![i as f32; 8]));
                }
            })
        };

        let reader = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for _ in 0..100 {
                    let snapshot = store.current();
                    // All parameters come from the same publish
                    assert!(snapshot
                        .parameters
                        .windows(2)
                        .all(|pair| pair[0] == pair[1]));
                }
            })
        };

        writer.join().unwrap();
        reader.join().unwrap();
    }
}
