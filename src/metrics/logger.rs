//! Training loggers.
//!
//! The coordinator emits one [`TrainingSnapshot`] per training step and
//! hands it to whatever [`MetricsLogger`] it was configured with.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

/// State of the pipeline after one training step.
#[derive(Debug, Clone)]
pub struct TrainingSnapshot {
    /// Cumulative training step.
    pub step: u64,
    /// Games completed so far.
    pub games: usize,
    /// Sequences left in the aggregator after sampling.
    pub pool_size: usize,
    /// Mean final (placement) reward over recent trajectories.
    pub avg_final_reward: f32,
    /// Combined loss of this step.
    pub total_loss: f32,
    /// Value head loss of this step.
    pub value_loss: f32,
    /// Policy head loss of this step.
    pub policy_loss: f32,
    /// Model version after publishing this step's weights.
    pub model_version: u64,
}

impl TrainingSnapshot {
    /// Snapshot with zeroed losses.
    pub fn new(step: u64, games: usize, pool_size: usize, avg_final_reward: f32) -> Self {
        Self {
            step,
            games,
            pool_size,
            avg_final_reward,
            total_loss: 0.0,
            value_loss: 0.0,
            policy_loss: 0.0,
            model_version: 0,
        }
    }

    /// Attach this step's losses.
    pub fn with_losses(mut self, total: f32, value: f32, policy: f32) -> Self {
        self.total_loss = total;
        self.value_loss = value;
        self.policy_loss = policy;
        self
    }

    /// Attach the published model version.
    pub fn with_model_version(mut self, version: u64) -> Self {
        self.model_version = version;
        self
    }
}

/// Sink for per-step training snapshots.
pub trait MetricsLogger: Send {
    /// Consume one snapshot.
    fn log(&mut self, snapshot: &TrainingSnapshot);

    /// Flush buffered output, if any.
    fn flush(&mut self);
}

/// Tabular stdout logger, one row every `every` steps.
pub struct ConsoleLogger {
    every: u64,
    next_at: u64,
    started: Instant,
    header_printed: bool,
}

impl ConsoleLogger {
    /// Print a row every `every` training steps.
    pub fn new(every: u64) -> Self {
        Self {
            every,
            next_at: every.max(1),
            started: Instant::now(),
            header_printed: false,
        }
    }

    fn row(&self, s: &TrainingSnapshot) -> String {
        let elapsed = self.started.elapsed().as_secs_f32().max(f32::EPSILON);
        format!(
            "{:>8} {:>8} {:>8} {:>10.2} {:>10.4} {:>10.4} {:>10.4} {:>8.1}",
            s.step,
            s.games,
            s.pool_size,
            s.avg_final_reward,
            s.total_loss,
            s.value_loss,
            s.policy_loss,
            s.step as f32 / elapsed
        )
    }
}

impl MetricsLogger for ConsoleLogger {
    fn log(&mut self, snapshot: &TrainingSnapshot) {
        if snapshot.step < self.next_at {
            return;
        }
        if !self.header_printed {
            println!(
                "{:>8} {:>8} {:>8} {:>10} {:>10} {:>10} {:>10} {:>8}",
                "Step", "Games", "Pool", "Reward", "Total", "Value", "Policy", "SPS"
            );
            println!("{}", "-".repeat(80));
            self.header_printed = true;
        }
        println!("{}", self.row(snapshot));
        self.next_at = snapshot.step + self.every.max(1);
    }

    fn flush(&mut self) {}
}

/// CSV file logger for offline analysis.
pub struct CSVLogger {
    out: BufWriter<File>,
    started: Instant,
}

impl CSVLogger {
    const HEADER: &'static str = "step,games,pool_size,avg_final_reward,total_loss,value_loss,policy_loss,model_version,elapsed_secs";

    /// Create (truncating) the CSV file and write the header row.
    pub fn new(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let mut out = BufWriter::new(File::create(path)?);
        writeln!(out, "{}", Self::HEADER)?;
        Ok(Self {
            out,
            started: Instant::now(),
        })
    }
}

impl MetricsLogger for CSVLogger {
    fn log(&mut self, s: &TrainingSnapshot) {
        let _ = writeln!(
            self.out,
            "{},{},{},{:.4},{:.6},{:.6},{:.6},{},{:.2}",
            s.step,
            s.games,
            s.pool_size,
            s.avg_final_reward,
            s.total_loss,
            s.value_loss,
            s.policy_loss,
            s.model_version,
            self.started.elapsed().as_secs_f32()
        );
    }

    fn flush(&mut self) {
        let _ = self.out.flush();
    }
}

impl Drop for CSVLogger {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Fan-out to several backends.
#[derive(Default)]
pub struct MultiLogger {
    backends: Vec<Box<dyn MetricsLogger>>,
}

impl MultiLogger {
    /// Empty fan-out.
    pub fn new() -> Self {
        Self::default()
    }

    /// Chain another backend.
    pub fn add<L: MetricsLogger + 'static>(mut self, logger: L) -> Self {
        self.backends.push(Box::new(logger));
        self
    }
}

impl MetricsLogger for MultiLogger {
    fn log(&mut self, snapshot: &TrainingSnapshot) {
        for backend in &mut self.backends {
            backend.log(snapshot);
        }
    }

    fn flush(&mut self) {
        for backend in &mut self.backends {
            backend.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_builder() {
        let snapshot = TrainingSnapshot::new(100, 12, 4096, -8.5)
            .with_losses(0.9, 0.5, 0.4)
            .with_model_version(100);

        assert_eq!(snapshot.step, 100);
        assert_eq!(snapshot.games, 12);
        assert_eq!(snapshot.pool_size, 4096);
        assert!((snapshot.avg_final_reward - -8.5).abs() < 1e-6);
        assert!((snapshot.total_loss - 0.9).abs() < 1e-6);
        assert_eq!(snapshot.model_version, 100);
    }

    #[test]
    fn test_console_logger_respects_interval() {
        let mut logger = ConsoleLogger::new(10);
        logger.log(&TrainingSnapshot::new(5, 0, 0, 0.0));
        assert!(!logger.header_printed);

        logger.log(&TrainingSnapshot::new(10, 0, 0, 0.0));
        assert!(logger.header_printed);
        assert_eq!(logger.next_at, 20);
    }

    #[test]
    fn test_csv_logger_writes_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.csv");
        {
            let mut logger = CSVLogger::new(&path).unwrap();
            logger.log(&TrainingSnapshot::new(1, 1, 10, 0.0));
            logger.log(&TrainingSnapshot::new(2, 1, 5, 0.0));
        }
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 3);
        assert!(contents.starts_with("step,games,"));
    }

    #[test]
    fn test_multi_logger_fans_out() {
        let mut multi = MultiLogger::new().add(ConsoleLogger::new(10));
        multi.log(&TrainingSnapshot::new(10, 2, 100, 1.0));
        multi.flush();
    }
}
