//! Worker-to-coordinator messages.
//!
//! Workers are fire-and-forget: the only message a worker sends is its
//! end-of-game [`WorkerReport`] on the shared completion channel.

pub mod report;
pub mod stats;

pub use report::{FinishReason, WorkerReport};
pub use stats::WorkerStats;
