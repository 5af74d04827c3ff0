//! Training metrics and logging.
//!
//! - [`ConsoleLogger`]: tabular console output
//! - [`CSVLogger`]: CSV file logging for analysis
//! - [`MultiLogger`]: combine multiple loggers

pub mod logger;

pub use logger::{CSVLogger, ConsoleLogger, MetricsLogger, MultiLogger, TrainingSnapshot};
