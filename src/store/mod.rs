//! Model weight distribution and checkpoint persistence.
//!
//! - `ModelStore`: authoritative current snapshot, publish/read by value
//! - `CheckpointStore`: step-keyed on-disk snapshot persistence

pub mod checkpoint;
pub mod model_store;

pub use checkpoint::{CheckpointConfig, CheckpointError, CheckpointInfo, CheckpointStore};
pub use model_store::{model_store, ModelStore, PlacementResult, SharedModelStore};
