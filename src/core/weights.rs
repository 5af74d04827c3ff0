//! Versioned model weights exchanged between the store, workers and trainer.
//!
//! The pipeline never interprets parameters; it moves them by value. A
//! worker keeps the snapshot it started a game with for the whole game, so
//! staleness is bounded by one game's duration.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A serializable copy of model parameters plus the publish version that
/// produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightsSnapshot {
    /// Store version at publish time; 0 for fresh, never-published weights.
    pub version: u64,
    /// Opaque flat parameter blob.
    pub parameters: Vec<f32>,
}

impl WeightsSnapshot {
    /// Fresh, never-published weights.
    pub fn fresh(parameters: Vec<f32>) -> Self {
        Self {
            version: 0,
            parameters,
        }
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    /// Check if the snapshot carries no parameters.
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// How many publishes behind the given store version this copy is.
    pub fn lag(&self, current_version: u64) -> u64 {
        current_version.saturating_sub(self.version)
    }
}

impl Default for WeightsSnapshot {
    fn default() -> Self {
        Self::fresh(Vec::new())
    }
}

/// Atomic publish counter for the model store.
///
/// Incremented once per completed training step when the refreshed weights
/// are published.
#[derive(Debug, Default)]
pub struct VersionCounter {
    version: AtomicU64,
}

impl VersionCounter {
    /// Counter starting at 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bump the version and return the new value.
    pub fn increment(&self) -> u64 {
        self.version.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Read the version without bumping it.
    pub fn current(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Jump to a specific version (used when restoring from a checkpoint).
    pub fn reset_to(&self, version: u64) {
        self.version.store(version, Ordering::SeqCst);
    }
}

/// Thread-safe shared version counter.
pub type SharedVersionCounter = Arc<VersionCounter>;
