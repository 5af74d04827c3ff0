//! Per-step trajectory records produced during self-play.
//!
//! A [`Transition`] is one recorded timestep for one agent; a [`Trajectory`]
//! is the ordered per-game record for one agent, owned by the worker's local
//! stage until it is converted into training sequences and dropped.

use crate::core::action::Action;

/// Identity of one agent inside a game ("player_0", "player_1", ...).
pub type AgentId = String;

/// One recorded timestep of one agent's game.
///
/// Immutable once recorded. The policy distribution and the legal-action
/// sample set are aligned index-for-index: `policy[i]` is the prior mass the
/// planner assigned to `legal_samples[i]`.
#[derive(Debug, Clone)]
pub struct Transition {
    /// Observation tensor the planner acted on.
    pub observation: Vec<f32>,
    /// Action taken, as the fixed 4-slot tuple.
    pub action: [u8; 4],
    /// Scalar reward reported by the environment at this step.
    pub reward: f32,
    /// Policy distribution over the sampled legal actions.
    pub policy: Vec<f32>,
    /// Legal actions the policy distribution ranges over.
    pub legal_samples: Vec<Action>,
}

/// Opaque per-combat side record buffered alongside a trajectory.
///
/// Forwarded to the aggregator's side channel at flush; the pipeline never
/// inspects the payload.
#[derive(Debug, Clone)]
pub struct CombatRecord {
    /// Agent the combat belongs to.
    pub agent: AgentId,
    /// Raw combat features.
    pub payload: Vec<f32>,
}

/// Ordered sequence of transitions for one agent in one game.
#[derive(Debug, Clone, Default)]
pub struct Trajectory {
    transitions: Vec<Transition>,
}

impl Trajectory {
    /// Create a new empty trajectory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a trajectory with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            transitions: Vec::with_capacity(capacity),
        }
    }

    /// Append a transition.
    pub fn push(&mut self, transition: Transition) {
        self.transitions.push(transition);
    }

    /// Number of recorded steps.
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    /// Check if the trajectory is empty.
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Access a recorded step.
    pub fn get(&self, index: usize) -> Option<&Transition> {
        self.transitions.get(index)
    }

    /// The terminal (placement) reward: the last recorded reward.
    ///
    /// Zero for an empty trajectory.
    pub fn final_reward(&self) -> f32 {
        self.transitions.last().map(|t| t.reward).unwrap_or(0.0)
    }

    /// Tuple of the most recent action, if any step was recorded.
    pub fn last_action(&self) -> Option<[u8; 4]> {
        self.transitions.last().map(|t| t.action)
    }

    /// Rewards in step order.
    pub fn rewards(&self) -> Vec<f32> {
        self.transitions.iter().map(|t| t.reward).collect()
    }

    /// Overwrite the reward at every step, in step order.
    ///
    /// Used by the environment side for post-hoc reward correction; the
    /// replacement must cover every recorded step.
    pub fn set_rewards(&mut self, rewards: &[f32]) {
        assert_eq!(
            rewards.len(),
            self.transitions.len(),
            "reward rewrite must cover the whole trajectory"
        );
        for (t, &r) in self.transitions.iter_mut().zip(rewards) {
            t.reward = r;
        }
    }

    /// Iterate over recorded steps.
    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.iter()
    }
}
