//! Per-worker trajectory staging and sequence construction.
//!
//! - `SequenceBuilder`: pure trajectory-to-sequence transformation
//! - `LocalStage`: one worker's holding area for one game's experience

pub mod local_stage;
pub mod sequence_builder;

pub use local_stage::{FlushSummary, LocalStage};
pub use sequence_builder::SequenceBuilder;
