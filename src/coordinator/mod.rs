//! Coordinator loop and its pause gate.

pub mod coordinator;
pub mod gate;

pub use coordinator::Coordinator;
pub use gate::{AlwaysRun, PauseGate, RunFlagFile};
