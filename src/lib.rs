//! # Asynchronous self-play training pipeline
//!
//! Collects self-play game trajectories from a fixed pool of concurrent
//! workers, converts each finished game into fixed-length training
//! sequences with value/reward/policy targets, pools them in a shared
//! aggregator, and feeds a single training loop that continually refreshes
//! the weights the workers play with.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │  Thread 1          Thread 2          Thread N                  │
//! │  ┌─────────┐       ┌─────────┐       ┌─────────┐              │
//! │  │Worker 0 │       │Worker 1 │       │Worker N │              │
//! │  │ env     │       │ env     │       │ env     │              │
//! │  │ planner │       │ planner │       │ planner │              │
//! │  │ stage   │       │ stage   │       │ stage   │              │
//! │  └────┬────┘       └────┬────┘       └────┬────┘              │
//! │       │  sequences      │                 │                    │
//! │       └─────────────────┼─────────────────┘                    │
//! │                         ▼                                      │
//! │               ┌──────────────────┐     ┌──────────────┐       │
//! │               │    Aggregator    │     │  ModelStore  │       │
//! │               │ (shared pool +   │     │ (weights +   │       │
//! │               │  batch sampling) │     │  checkpoints)│       │
//! │               └────────┬─────────┘     └──────▲───────┘       │
//! │                        ▼                      │ publish       │
//! │               ┌──────────────────┐            │               │
//! │               │ Coordinator loop │────────────┘               │
//! │               │ (drain + train)  │                            │
//! │               └──────────────────┘                            │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Workers never talk to each other; the aggregator and the model store
//! are the only shared mutable state, each internally synchronized. A
//! worker keeps the weights it started a game with for the entire game.
//!
//! The planner, the game environment, and the network trainer are
//! external collaborators behind the [`Planner`], [`Environment`] and
//! [`Trainer`] traits.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use autobattler_rl::{
//!     aggregator, model_store, CheckpointConfig, CheckpointStore,
//!     Coordinator, PipelineConfig, RunFlagFile, WeightsSnapshot,
//! };
//!
//! let config = PipelineConfig::new()
//!     .with_num_workers(10)
//!     .with_unroll_steps(5)
//!     .with_batch_size(512);
//!
//! let pool = aggregator(config.batch_size);
//! let checkpoints = CheckpointStore::new(CheckpointConfig::new("./checkpoints"))?;
//! let store = model_store(WeightsSnapshot::default(), checkpoints);
//! store.restore_latest()?;
//!
//! let mut coordinator = Coordinator::new(config, pool, store, my_trainer)
//!     .with_gate(RunFlagFile::new("run.txt"));
//! coordinator.run(make_env, make_planner);
//! ```

pub mod aggregator;
pub mod config;
pub mod coordinator;
pub mod core;
pub mod env;
pub mod messages;
pub mod metrics;
pub mod planner;
pub mod stage;
pub mod store;
pub mod trainer;
pub mod worker;

// Re-export commonly used types
pub use crate::core::action::{Action, ActionCodeError, NOOP_ACTION, NUM_ACTION_TYPES};
pub use crate::core::sequence::{SequenceBatch, SplitPolicy, TrainingSequence};
pub use crate::core::transition::{AgentId, CombatRecord, Trajectory, Transition};
pub use crate::core::weights::{VersionCounter, WeightsSnapshot};

pub use aggregator::{aggregator, Aggregator, SharedAggregator};
pub use config::PipelineConfig;
pub use coordinator::{AlwaysRun, Coordinator, PauseGate, RunFlagFile};
pub use env::{AgentInfo, AgentObservation, EnvAction, EnvError, Environment, Observations, StepOutcome};
pub use messages::{FinishReason, WorkerReport, WorkerStats};
pub use metrics::{CSVLogger, ConsoleLogger, MetricsLogger, MultiLogger, TrainingSnapshot};
pub use planner::{Planner, PlannerError, PlannerOutput};
pub use stage::{FlushSummary, LocalStage, SequenceBuilder};
pub use store::{
    model_store, CheckpointConfig, CheckpointError, CheckpointInfo, CheckpointStore, ModelStore,
    PlacementResult, SharedModelStore,
};
pub use trainer::{TrainStats, Trainer};
pub use worker::{spawn_game, GameError, Worker, WorkerHandle, WorkerPool};
