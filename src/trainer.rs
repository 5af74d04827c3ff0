//! Trainer seam: the black-box training step.
//!
//! The network architecture and loss computation live behind this trait.
//! The coordinator hands it batches and publishes whatever weights it
//! exposes after each step.

use crate::core::sequence::SequenceBatch;
use crate::core::weights::WeightsSnapshot;

/// Losses reported by one training step.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrainStats {
    /// Combined loss.
    pub total_loss: f32,
    /// Value head loss.
    pub value_loss: f32,
    /// Policy head loss.
    pub policy_loss: f32,
    /// Reward head loss.
    pub reward_loss: f32,
}

/// One synchronous gradient step over a sampled batch.
///
/// Implementations own the live model; `weights` returns a snapshot of the
/// parameters as of the most recent step, which the coordinator publishes
/// to the model store.
pub trait Trainer: Send {
    /// Consume a batch and update the model.
    fn train_step(&mut self, batch: SequenceBatch, step: u64) -> TrainStats;

    /// Snapshot of the current parameters.
    fn weights(&self) -> WeightsSnapshot;
}
