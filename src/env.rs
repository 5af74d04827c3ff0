//! Environment seam for the self-play pipeline.
//!
//! The game itself is an external collaborator consumed through a
//! parallel multi-agent API: one `reset`, then repeated `step` calls with
//! per-agent actions until every agent is terminated. The pipeline never
//! looks inside observations; it only routes them between the environment,
//! the planner and the local stage.

use crate::core::action::Action;
use crate::core::transition::AgentId;
use std::collections::HashMap;
use std::fmt;

/// Observation handed to the planner for one agent.
#[derive(Debug, Clone, Default)]
pub struct AgentObservation {
    /// Flat observation tensor.
    pub tensor: Vec<f32>,
    /// Legality mask over the planner's action space.
    pub action_mask: Vec<bool>,
}

/// Per-agent observations keyed by agent identity.
pub type Observations = HashMap<AgentId, AgentObservation>;

/// Environment-executable action for one agent: the decoded action plus the
/// planner's auxiliary outputs the simulator consumes alongside it.
#[derive(Debug, Clone)]
pub struct EnvAction {
    /// The action to execute.
    pub action: Action,
    /// Auxiliary board placement map produced by the planner.
    pub board_map: Vec<u8>,
    /// Planner directive accompanying the action.
    pub directive: u8,
}

/// Per-agent step metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct AgentInfo {
    /// True when this step must not be recorded for training.
    pub state_empty: bool,
}

/// Result of stepping the environment once.
#[derive(Debug, Default)]
pub struct StepOutcome {
    /// Next observations per agent.
    pub observations: Observations,
    /// Rewards per agent.
    pub rewards: HashMap<AgentId, f32>,
    /// Termination flags per agent.
    pub terminated: HashMap<AgentId, bool>,
    /// Truncation flags per agent.
    pub truncated: HashMap<AgentId, bool>,
    /// Step metadata per agent.
    pub infos: HashMap<AgentId, AgentInfo>,
}

impl StepOutcome {
    /// True when every agent has terminated.
    pub fn all_terminated(&self) -> bool {
        !self.terminated.is_empty() && self.terminated.values().all(|&t| t)
    }
}

/// Error reported by the environment; aborts the current game.
#[derive(Debug, Clone)]
pub struct EnvError {
    message: String,
}

impl EnvError {
    /// Wrap an environment failure description.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "environment error: {}", self.message)
    }
}

impl std::error::Error for EnvError {}

/// Parallel multi-agent game environment.
///
/// Implementations wrap the actual simulator. `step` takes actions for the
/// non-terminated agents only and reports outcomes for every agent it still
/// tracks.
pub trait Environment: Send {
    /// All agent identities that can take part in a game.
    fn agent_ids(&self) -> Vec<AgentId>;

    /// Start a new game and return the initial observations.
    fn reset(&mut self) -> Result<Observations, EnvError>;

    /// Advance the game by one tick.
    fn step(&mut self, actions: &HashMap<AgentId, EnvAction>) -> Result<StepOutcome, EnvError>;
}
