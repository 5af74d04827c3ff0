//! Fixed-length training sequences and their policy targets.
//!
//! A [`TrainingSequence`] is one unroll window extracted from a finished
//! trajectory: `U + 1` consecutive positions, each carrying an action, value
//! and reward targets, a policy target split by action type, and masks that
//! zero out positions past the end of the game.

use crate::core::action::{Action, NUM_ACTION_TYPES};

/// A policy target split into per-action-type sub-distributions.
///
/// The planner's policy ranges over a flat set of sampled legal actions;
/// the loss heads are per action type. Splitting partitions the sample set
/// by type discriminant, keeping sample order and the aligned policy mass
/// within each bucket. Buckets for types absent from the sample set stay
/// empty.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitPolicy {
    /// Sampled legal actions, bucketed by action type.
    pub samples: Vec<Vec<Action>>,
    /// Policy mass aligned with `samples`, bucket by bucket.
    pub probs: Vec<Vec<f32>>,
}

impl SplitPolicy {
    /// Split a flat (samples, policy) pair by action type.
    pub fn split(samples: &[Action], policy: &[f32]) -> Self {
        debug_assert_eq!(samples.len(), policy.len());
        let mut out = Self::empty();
        for (action, &mass) in samples.iter().zip(policy) {
            let bucket = action.type_id() as usize;
            out.samples[bucket].push(*action);
            out.probs[bucket].push(mass);
        }
        out
    }

    /// All buckets empty.
    pub fn empty() -> Self {
        Self {
            samples: vec![Vec::new(); NUM_ACTION_TYPES],
            probs: vec![Vec::new(); NUM_ACTION_TYPES],
        }
    }

    /// Total number of sampled actions across buckets.
    pub fn sample_count(&self) -> usize {
        self.samples.iter().map(|b| b.len()).sum()
    }

    /// Total policy mass across buckets.
    pub fn total_mass(&self) -> f32 {
        self.probs.iter().flatten().sum()
    }
}

/// One unroll window over a finished trajectory, ready for training.
///
/// All per-step vectors have exactly `unroll_steps + 1` entries. Masks are
/// 1.0 for positions inside the game (including the exact terminal
/// position) and 0.0 for absorbing padding past the end.
#[derive(Debug, Clone)]
pub struct TrainingSequence {
    /// Observation at the window's start position.
    pub observation: Vec<f32>,
    /// Action tuple per position; the window head and absorbing positions
    /// hold the no-op sentinel.
    pub actions: Vec<[u8; 4]>,
    /// Value target per position.
    pub value_targets: Vec<f32>,
    /// Reward target per position.
    pub reward_targets: Vec<f32>,
    /// Policy target per position, split by action type.
    pub policy_targets: Vec<SplitPolicy>,
    /// 1.0 where the value target is real, 0.0 on absorbing positions.
    pub value_masks: Vec<f32>,
    /// 1.0 where the reward target is real, 0.0 on absorbing positions.
    pub reward_masks: Vec<f32>,
    /// 1.0 where the policy target is real, 0.0 on absorbing positions.
    pub policy_masks: Vec<f32>,
}

impl TrainingSequence {
    /// Number of positions in the window (`unroll_steps + 1`).
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Check if the sequence has no positions.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// All per-step vectors share the same length.
    pub fn is_consistent(&self) -> bool {
        let n = self.actions.len();
        self.value_targets.len() == n
            && self.reward_targets.len() == n
            && self.policy_targets.len() == n
            && self.value_masks.len() == n
            && self.reward_masks.len() == n
            && self.policy_masks.len() == n
    }
}

/// A fixed-size multiset of sequences drawn from the aggregator for one
/// training step. Ownership moves to the trainer; dropped after use.
#[derive(Debug, Default)]
pub struct SequenceBatch {
    /// The sampled sequences, in no particular order.
    pub sequences: Vec<TrainingSequence>,
}

impl SequenceBatch {
    /// Number of sequences in the batch.
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    /// Check if the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Window length shared by every sequence, if the batch is non-empty.
    pub fn sequence_len(&self) -> Option<usize> {
        self.sequences.first().map(|s| s.len())
    }

    /// Stack all start observations for batched inference.
    pub fn observations(&self) -> Vec<&[f32]> {
        self.sequences.iter().map(|s| s.observation.as_slice()).collect()
    }
}
