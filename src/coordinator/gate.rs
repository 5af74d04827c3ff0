//! Cooperative pause gate for the coordinator loop.
//!
//! An operator can halt further training-step submission without killing
//! in-flight games. The gate is polled at the top of every coordinator
//! cycle; it is a coarse gate, not a pause/resume of running workers.

use std::fs;
use std::path::PathBuf;

/// Polled "should the coordinator keep going?" check.
pub trait PauseGate: Send {
    /// True to proceed, false to hold the loop.
    fn should_run(&self) -> bool;
}

/// Gate that never pauses.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysRun;

impl PauseGate for AlwaysRun {
    fn should_run(&self) -> bool {
        true
    }
}

/// File-backed gate: a leading `'0'` in the flag file pauses the loop,
/// anything else (including a missing file) lets it proceed.
#[derive(Debug, Clone)]
pub struct RunFlagFile {
    path: PathBuf,
}

impl RunFlagFile {
    /// Gate reading the given flag file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PauseGate for RunFlagFile {
    fn should_run(&self) -> bool {
        match fs::read(&self.path) {
            Ok(bytes) => bytes.first() != Some(&b'0'),
            Err(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_always_run() {
        assert!(AlwaysRun.should_run());
    }

    #[test]
    fn test_flag_file_zero_pauses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.txt");

        std::fs::write(&path, "0").unwrap();
        assert!(!RunFlagFile::new(&path).should_run());

        std::fs::write(&path, "1").unwrap();
        assert!(RunFlagFile::new(&path).should_run());

        std::fs::write(&path, "0 but with trailing text").unwrap();
        assert!(!RunFlagFile::new(&path).should_run());
    }

    #[test]
    fn test_missing_flag_file_proceeds() {
        let dir = tempfile::tempdir().unwrap();
        let gate = RunFlagFile::new(dir.path().join("absent.txt"));
        assert!(gate.should_run());
    }
}
