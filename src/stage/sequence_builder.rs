//! Converts finished trajectories into fixed-length training sequences.
//!
//! For a trajectory of length `L` and unroll length `U`, the builder draws
//! `min(samples_per_player, L - U)` distinct start indices from `[0, L-U)`
//! and extracts one `U + 1`-position window per start. Trajectories with
//! `L <= U` produce nothing.
//!
//! Value targets model a sparse, end-of-episode reward: the terminal
//! (placement) reward is broadcast to every position, discounted by the
//! position's progress through the nominal horizon `E` rather than by step
//! count (`final * discount^(E - p*E/L)`). The exact terminal position gets
//! the raw reward. Positions past the end of the game are absorbing: no-op
//! action, zero targets, all masks zero, and the first step's policy as a
//! masked-out placeholder.

use crate::config::PipelineConfig;
use crate::core::action::NOOP_ACTION;
use crate::core::sequence::{SplitPolicy, TrainingSequence};
use crate::core::transition::Trajectory;
use rand::Rng;

/// Stateless trajectory-to-sequence transformation.
#[derive(Debug, Clone)]
pub struct SequenceBuilder {
    unroll_steps: usize,
    samples_per_player: usize,
    discount: f32,
    nominal_horizon: f32,
}

impl SequenceBuilder {
    /// Create a builder with explicit parameters.
    pub fn new(
        unroll_steps: usize,
        samples_per_player: usize,
        discount: f32,
        nominal_horizon: usize,
    ) -> Self {
        assert!(unroll_steps > 0, "unroll_steps must be > 0");
        Self {
            unroll_steps,
            samples_per_player,
            discount,
            nominal_horizon: nominal_horizon as f32,
        }
    }

    /// Create a builder from the pipeline configuration.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.unroll_steps,
            config.samples_per_player,
            config.discount,
            config.nominal_horizon,
        )
    }

    /// Unroll length `U`.
    pub fn unroll_steps(&self) -> usize {
        self.unroll_steps
    }

    /// Extract sequences from a finished trajectory.
    pub fn build(&self, trajectory: &Trajectory) -> Vec<TrainingSequence> {
        self.build_with_rng(trajectory, &mut rand::thread_rng())
    }

    /// Extract sequences using the given RNG for start-index draws.
    pub fn build_with_rng<R: Rng>(
        &self,
        trajectory: &Trajectory,
        rng: &mut R,
    ) -> Vec<TrainingSequence> {
        let length = trajectory.len();
        if length <= self.unroll_steps {
            return Vec::new();
        }
        let windows = length - self.unroll_steps;
        let draws = self.samples_per_player.min(windows);
        rand::seq::index::sample(rng, windows, draws)
            .into_iter()
            .map(|start| self.sequence_at(trajectory, start))
            .collect()
    }

    /// Build the window starting at `start`.
    ///
    /// The window may overflow past the end of the trajectory; overflow
    /// positions become absorbing steps.
    pub fn sequence_at(&self, trajectory: &Trajectory, start: usize) -> TrainingSequence {
        let length = trajectory.len();
        assert!(start < length, "start index {} outside trajectory of length {}", start, length);

        let steps = self.unroll_steps + 1;
        let final_reward = trajectory.final_reward();
        let ratio = self.nominal_horizon / length as f32;

        let mut sequence = TrainingSequence {
            observation: trajectory.get(start).map(|t| t.observation.clone()).unwrap_or_default(),
            actions: Vec::with_capacity(steps),
            value_targets: Vec::with_capacity(steps),
            reward_targets: Vec::with_capacity(steps),
            policy_targets: Vec::with_capacity(steps),
            value_masks: Vec::with_capacity(steps),
            reward_masks: Vec::with_capacity(steps),
            policy_masks: Vec::with_capacity(steps),
        };

        for position in start..start + steps {
            if position < length {
                let transition = trajectory.get(position).expect("position inside trajectory");
                // The window head is not an action-conditioned prediction
                // target, so it stores the no-op sentinel.
                sequence.actions.push(if position == start {
                    NOOP_ACTION
                } else {
                    transition.action
                });
                let exponent = self.nominal_horizon - position as f32 * ratio;
                sequence.value_targets.push(final_reward * self.discount.powf(exponent));
                sequence.reward_targets.push(0.0);
                sequence
                    .policy_targets
                    .push(SplitPolicy::split(&transition.legal_samples, &transition.policy));
                sequence.value_masks.push(1.0);
                sequence.reward_masks.push(1.0);
                sequence.policy_masks.push(1.0);
            } else if position == length {
                // Exact terminal position: the raw placement reward is the
                // target, undiscounted. No action was recorded here; the
                // policy of the last real step stands in.
                let last = trajectory.get(length - 1).expect("trajectory is non-empty");
                sequence.actions.push(NOOP_ACTION);
                sequence.value_targets.push(final_reward);
                sequence.reward_targets.push(0.0);
                sequence
                    .policy_targets
                    .push(SplitPolicy::split(&last.legal_samples, &last.policy));
                sequence.value_masks.push(1.0);
                sequence.reward_masks.push(1.0);
                sequence.policy_masks.push(1.0);
            } else {
                // Absorbing state past the end of the game. The first
                // step's policy is a placeholder; masks keep it out of the
                // loss.
                let first = trajectory.get(0).expect("trajectory is non-empty");
                sequence.actions.push(NOOP_ACTION);
                sequence.value_targets.push(0.0);
                sequence.reward_targets.push(0.0);
                sequence
                    .policy_targets
                    .push(SplitPolicy::split(&first.legal_samples, &first.policy));
                sequence.value_masks.push(0.0);
                sequence.reward_masks.push(0.0);
                sequence.policy_masks.push(0.0);
            }
        }

        debug_assert!(sequence.is_consistent());
        sequence
    }
}
