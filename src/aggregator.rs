//! Process-wide pool of ready-to-train sequences.
//!
//! Workers submit completed sequences lock-free; the coordinator drains the
//! pool one batch at a time while enough sequences are available.
//!
//! # Data Flow
//!
//! ```text
//! Worker 0 ─┐
//! Worker 1 ─┼──> Injector (lock-free) ──> Pool ──> sample_batch()
//! Worker N ─┘                                          │
//!                                                      v
//!                                                  Trainer
//! ```
//!
//! The pool is a multiset, not a ring buffer: sampling removes sequences,
//! so no sequence is ever handed to two training steps, and nothing else
//! evicts. Growth is unbounded when submission outpaces draining.

use crate::core::sequence::{SequenceBatch, TrainingSequence};
use crate::core::transition::CombatRecord;
use crossbeam_deque::{Injector, Steal};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared aggregation buffer with an availability gate.
pub struct Aggregator {
    batch_size: usize,
    /// Workers push here (lock-free, many producers).
    injector: Injector<TrainingSequence>,
    /// Consolidated storage batches are sampled from.
    pool: RwLock<Vec<TrainingSequence>>,
    /// Consolidated pool size, readable without the lock.
    size: AtomicUsize,
    /// Approximate count of not-yet-consolidated submissions.
    pending: AtomicUsize,
    /// Side channel for combat records; append-only until taken.
    combats: Mutex<Vec<CombatRecord>>,
}

impl Aggregator {
    /// Create an aggregator that gates on the given batch size.
    pub fn new(batch_size: usize) -> Self {
        assert!(batch_size > 0, "batch_size must be > 0");
        Self {
            batch_size,
            injector: Injector::new(),
            pool: RwLock::new(Vec::new()),
            size: AtomicUsize::new(0),
            pending: AtomicUsize::new(0),
            combats: Mutex::new(Vec::new()),
        }
    }

    /// Batch size the availability gate is tuned to.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Submit one sequence (non-blocking, any thread).
    pub fn submit(&self, sequence: TrainingSequence) {
        self.injector.push(sequence);
        self.pending.fetch_add(1, Ordering::Relaxed);
    }

    /// Submit a burst of sequences (non-blocking, any thread).
    pub fn submit_all(&self, sequences: Vec<TrainingSequence>) {
        let count = sequences.len();
        for sequence in sequences {
            self.injector.push(sequence);
        }
        self.pending.fetch_add(count, Ordering::Relaxed);
    }

    /// Append combat records to the side channel.
    pub fn submit_combats(&self, records: Vec<CombatRecord>) {
        if !records.is_empty() {
            self.combats.lock().extend(records);
        }
    }

    /// True iff a full batch can be sampled right now.
    pub fn available(&self) -> bool {
        self.total_len() >= self.batch_size
    }

    /// Move pending submissions into the consolidated pool.
    pub fn consolidate(&self) {
        let mut pool = self.pool.write();
        let mut moved = 0;
        loop {
            match self.injector.steal() {
                Steal::Success(sequence) => {
                    pool.push(sequence);
                    moved += 1;
                }
                Steal::Empty => break,
                Steal::Retry => continue,
            }
        }
        if moved > 0 {
            self.pending.fetch_sub(moved, Ordering::Relaxed);
        }
        self.size.store(pool.len(), Ordering::Relaxed);
    }

    /// Remove and return one uniformly sampled batch.
    ///
    /// Returns `None` when fewer than `batch_size` sequences are pooled;
    /// callers are expected to check [`Aggregator::available`] first.
    pub fn sample_batch(&self) -> Option<SequenceBatch> {
        self.consolidate();

        let mut pool = self.pool.write();
        if pool.len() < self.batch_size {
            return None;
        }

        let mut rng = fastrand::Rng::new();
        let mut sequences = Vec::with_capacity(self.batch_size);
        for _ in 0..self.batch_size {
            let idx = rng.usize(0..pool.len());
            sequences.push(pool.swap_remove(idx));
        }
        self.size.store(pool.len(), Ordering::Relaxed);

        Some(SequenceBatch { sequences })
    }

    /// Consolidated pool size.
    pub fn len(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }

    /// Approximate count of submissions awaiting consolidation.
    pub fn pending_len(&self) -> usize {
        self.pending.load(Ordering::Relaxed)
    }

    /// Pool size including pending submissions.
    pub fn total_len(&self) -> usize {
        self.len() + self.pending_len()
    }

    /// Check if nothing is pooled or pending.
    pub fn is_empty(&self) -> bool {
        self.total_len() == 0
    }

    /// Drain the combat side channel.
    pub fn take_combats(&self) -> Vec<CombatRecord> {
        std::mem::take(&mut *self.combats.lock())
    }
}

/// Thread-safe shared aggregator.
pub type SharedAggregator = Arc<Aggregator>;

/// Create a new shared aggregator.
pub fn aggregator(batch_size: usize) -> SharedAggregator {
    Arc::new(Aggregator::new(batch_size))
}
