//! Step-keyed persistence for weight snapshots.
//!
//! Checkpoints are written as `checkpoint_{step:08}.bin` under a fixed
//! directory and never mutated after write. Loading a step that was never
//! saved is not an error; it signals "start from fresh weights".

use crate::core::weights::WeightsSnapshot;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Configuration for the checkpoint store.
#[derive(Debug, Clone)]
pub struct CheckpointConfig {
    /// Directory checkpoints are written to.
    pub dir: PathBuf,
    /// Recent checkpoints to keep on disk (0 = keep all).
    pub keep_last_n: usize,
}

impl CheckpointConfig {
    /// Config writing to the given directory, keeping every checkpoint.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            keep_last_n: 0,
        }
    }

    /// Keep only the newest `n` checkpoints on disk.
    pub fn with_keep_last_n(mut self, n: usize) -> Self {
        self.keep_last_n = n;
        self
    }
}

/// Failure while persisting or reading a snapshot.
#[derive(Debug)]
pub enum CheckpointError {
    /// Filesystem failure while reading or writing a checkpoint.
    Io(io::Error),
    /// Snapshot (de)serialization failure.
    Codec(String),
}

impl std::fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckpointError::Io(e) => write!(f, "checkpoint io: {}", e),
            CheckpointError::Codec(e) => write!(f, "checkpoint codec: {}", e),
        }
    }
}

impl std::error::Error for CheckpointError {}

impl From<io::Error> for CheckpointError {
    fn from(e: io::Error) -> Self {
        CheckpointError::Io(e)
    }
}

/// One checkpoint on disk.
#[derive(Debug, Clone)]
pub struct CheckpointInfo {
    /// Where the snapshot file lives.
    pub path: PathBuf,
    /// Training step the checkpoint was saved at.
    pub step: u64,
}

fn step_of(file_name: &str) -> Option<u64> {
    file_name
        .strip_prefix("checkpoint_")?
        .strip_suffix(".bin")?
        .parse()
        .ok()
}

/// On-disk checkpoint store.
pub struct CheckpointStore {
    config: CheckpointConfig,
    saved: Vec<CheckpointInfo>,
}

impl CheckpointStore {
    /// Create a store, creating the checkpoint directory if needed.
    pub fn new(config: CheckpointConfig) -> Result<Self, CheckpointError> {
        fs::create_dir_all(&config.dir)?;
        Ok(Self {
            config,
            saved: Vec::new(),
        })
    }

    /// The checkpoint directory.
    pub fn dir(&self) -> &Path {
        &self.config.dir
    }

    fn path_for(&self, step: u64) -> PathBuf {
        self.config.dir.join(format!("checkpoint_{:08}.bin", step))
    }

    /// Persist a snapshot under the given step key.
    pub fn save(
        &mut self,
        snapshot: &WeightsSnapshot,
        step: u64,
    ) -> Result<PathBuf, CheckpointError> {
        let path = self.path_for(step);
        let bytes =
            bincode::serialize(snapshot).map_err(|e| CheckpointError::Codec(e.to_string()))?;
        fs::write(&path, bytes)?;

        self.saved.push(CheckpointInfo {
            path: path.clone(),
            step,
        });
        self.prune()?;

        Ok(path)
    }

    /// Load the snapshot saved at the given step, if any.
    pub fn load(&self, step: u64) -> Result<Option<WeightsSnapshot>, CheckpointError> {
        let path = self.path_for(step);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path)?;
        let snapshot =
            bincode::deserialize(&bytes).map_err(|e| CheckpointError::Codec(e.to_string()))?;
        Ok(Some(snapshot))
    }

    /// Load the newest checkpoint on disk, if any, with its step.
    pub fn load_latest(&self) -> Result<Option<(WeightsSnapshot, u64)>, CheckpointError> {
        let latest = self.list()?.pop();
        match latest {
            Some(info) => Ok(self.load(info.step)?.map(|s| (s, info.step))),
            None => Ok(None),
        }
    }

    /// All checkpoints on disk, sorted by step.
    pub fn list(&self) -> Result<Vec<CheckpointInfo>, CheckpointError> {
        let mut found = Vec::new();
        for entry in fs::read_dir(&self.config.dir)? {
            let path = entry?.path();
            let step = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(step_of);
            if let Some(step) = step {
                found.push(CheckpointInfo { path, step });
            }
        }
        found.sort_by_key(|c| c.step);
        Ok(found)
    }

    fn prune(&mut self) -> Result<(), CheckpointError> {
        if self.config.keep_last_n == 0 {
            return Ok(());
        }
        while self.saved.len() > self.config.keep_last_n {
            let old = self.saved.remove(0);
            let _ = fs::remove_file(&old.path);
        }
        Ok(())
    }
}
