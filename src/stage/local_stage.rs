//! Per-worker staging area for one game's experience.
//!
//! The stage grows one trajectory per live agent while the game runs. When
//! the game ends it converts every trajectory into training sequences,
//! submits them to the shared aggregator together with any buffered combat
//! records, and returns to the empty state for the next game.

use crate::aggregator::SharedAggregator;
use crate::core::transition::{AgentId, CombatRecord, Trajectory, Transition};
use crate::stage::sequence_builder::SequenceBuilder;
use rand::Rng;
use std::collections::HashMap;

/// What one flush produced.
#[derive(Debug, Clone, Default)]
pub struct FlushSummary {
    /// Sequences submitted to the aggregator.
    pub sequences: usize,
    /// Agents whose trajectories were flushed (including too-short ones).
    pub agents: usize,
    /// Terminal reward of each flushed trajectory.
    pub final_rewards: Vec<f32>,
}

/// One worker's private staging area.
///
/// Not shared: each worker owns exactly one stage, so recording needs no
/// synchronization. Only the flush touches the shared aggregator.
pub struct LocalStage {
    builder: SequenceBuilder,
    aggregator: SharedAggregator,
    trajectories: HashMap<AgentId, Trajectory>,
    combats: Vec<CombatRecord>,
}

impl LocalStage {
    /// Create an empty stage.
    pub fn new(builder: SequenceBuilder, aggregator: SharedAggregator) -> Self {
        Self {
            builder,
            aggregator,
            trajectories: HashMap::new(),
            combats: Vec::new(),
        }
    }

    /// Record one step for one agent.
    pub fn record(&mut self, agent: &str, transition: Transition) {
        self.trajectories
            .entry(agent.to_string())
            .or_default()
            .push(transition);
    }

    /// Buffer a combat side record.
    pub fn record_combat(&mut self, record: CombatRecord) {
        self.combats.push(record);
    }

    /// Tuple of the agent's most recent recorded action, if any.
    pub fn last_action(&self, agent: &str) -> Option<[u8; 4]> {
        self.trajectories.get(agent).and_then(|t| t.last_action())
    }

    /// Number of steps recorded for the agent so far.
    pub fn trajectory_len(&self, agent: &str) -> usize {
        self.trajectories.get(agent).map(|t| t.len()).unwrap_or(0)
    }

    /// The agent's recorded rewards, in step order.
    pub fn rewards(&self, agent: &str) -> Option<Vec<f32>> {
        self.trajectories.get(agent).map(|t| t.rewards())
    }

    /// Rewrite the agent's recorded rewards (post-hoc correction).
    pub fn set_rewards(&mut self, agent: &str, rewards: &[f32]) {
        if let Some(trajectory) = self.trajectories.get_mut(agent) {
            trajectory.set_rewards(rewards);
        }
    }

    /// Number of agents with recorded steps.
    pub fn agent_count(&self) -> usize {
        self.trajectories.len()
    }

    /// Convert all trajectories to sequences, submit everything, and reset.
    pub fn flush(&mut self) -> FlushSummary {
        self.flush_with_rng(&mut rand::thread_rng())
    }

    /// Flush using the given RNG for start-index draws.
    pub fn flush_with_rng<R: Rng>(&mut self, rng: &mut R) -> FlushSummary {
        let mut summary = FlushSummary::default();

        for (_, trajectory) in self.trajectories.drain() {
            summary.agents += 1;
            summary.final_rewards.push(trajectory.final_reward());

            let sequences = self.builder.build_with_rng(&trajectory, rng);
            summary.sequences += sequences.len();
            self.aggregator.submit_all(sequences);
        }

        self.aggregator.submit_combats(std::mem::take(&mut self.combats));
        summary
    }
}
