//! Self-play game workers.
//!
//! - `Worker`: runs one game end-to-end against the environment and planner
//! - `WorkerPool` / `spawn_game`: slot table and thread spawning

pub mod pool;
pub mod worker;

pub use pool::{spawn_game, WorkerHandle, WorkerPool};
pub use worker::{GameError, Worker};
