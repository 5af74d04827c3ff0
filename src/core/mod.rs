//! Core data types of the self-play pipeline.

pub mod action;
pub mod sequence;
pub mod transition;
pub mod weights;

pub use action::{Action, ActionCodeError, NOOP_ACTION, NUM_ACTION_TYPES};
pub use sequence::{SequenceBatch, SplitPolicy, TrainingSequence};
pub use transition::{AgentId, CombatRecord, Trajectory, Transition};
pub use weights::{SharedVersionCounter, VersionCounter, WeightsSnapshot};
