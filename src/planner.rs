//! Planner seam: the decision procedure that turns observations into
//! actions and policy priors.
//!
//! The planner (search, learned policy, or anything else) is a black box to
//! the pipeline. Its outputs are positional: entry `i` of every field
//! belongs to the `i`-th observation in the query batch.

use crate::core::action::Action;
use crate::env::AgentObservation;
use std::fmt;

/// Batched planner decision for one environment tick.
#[derive(Debug, Clone, Default)]
pub struct PlannerOutput {
    /// Chosen action per queried agent.
    pub actions: Vec<Action>,
    /// Policy distribution over the sampled legal actions, per agent.
    pub policies: Vec<Vec<f32>>,
    /// The sampled legal actions each policy ranges over, per agent.
    pub legal_samples: Vec<Vec<Action>>,
    /// Auxiliary board placement map per agent, consumed by the environment.
    pub board_maps: Vec<Vec<u8>>,
    /// Directive value per agent, consumed by the environment.
    pub directives: Vec<u8>,
}

impl PlannerOutput {
    /// Number of agents this output covers.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Check if the output covers no agents.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// All positional fields cover the same number of agents, and each
    /// policy is aligned with its sample set.
    pub fn is_consistent(&self) -> bool {
        let n = self.actions.len();
        self.policies.len() == n
            && self.legal_samples.len() == n
            && self.board_maps.len() == n
            && self.directives.len() == n
            && self
                .policies
                .iter()
                .zip(&self.legal_samples)
                .all(|(p, s)| p.len() == s.len())
    }
}

/// Error reported by the planner; aborts the current game.
#[derive(Debug, Clone)]
pub struct PlannerError {
    message: String,
}

impl PlannerError {
    /// Wrap a planner failure description.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for PlannerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "planner error: {}", self.message)
    }
}

impl std::error::Error for PlannerError {}

/// Decision procedure queried once per environment tick with the
/// observations of every live agent.
pub trait Planner: Send {
    /// Produce actions and policy priors for the given observation batch.
    fn policy(&mut self, observations: &[AgentObservation]) -> Result<PlannerOutput, PlannerError>;
}
