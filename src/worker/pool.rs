//! Worker slot table and game spawning.
//!
//! The coordinator keeps one slot per concurrent game. Each spawned game
//! runs on its own named OS thread, builds its planner from the weights it
//! was handed, and reports its slot id on the shared completion channel
//! when the game ends, so the coordinator can respawn exactly that slot.

use crate::aggregator::SharedAggregator;
use crate::core::weights::WeightsSnapshot;
use crate::env::Environment;
use crate::messages::{FinishReason, WorkerReport};
use crate::planner::Planner;
use crate::stage::{LocalStage, SequenceBuilder};
use crate::worker::worker::Worker;
use crossbeam_channel::Sender;
use std::sync::Arc;

/// Handle to one in-flight game.
pub struct WorkerHandle {
    /// Slot this game occupies.
    pub worker_id: usize,
    /// The game thread.
    pub thread: std::thread::JoinHandle<()>,
}

impl WorkerHandle {
    /// Check if the game thread has exited.
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the game thread to exit.
    pub fn join(self) -> std::thread::Result<()> {
        self.thread.join()
    }
}

/// Fixed-size table of worker slots.
pub struct WorkerPool {
    slots: Vec<Option<WorkerHandle>>,
}

impl WorkerPool {
    /// Create a pool with `num_workers` empty slots.
    pub fn new(num_workers: usize) -> Self {
        Self {
            slots: (0..num_workers).map(|_| None).collect(),
        }
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if the pool has no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Put a handle into its slot.
    ///
    /// The slot must be free; the coordinator takes a finished handle out
    /// before respawning it.
    pub fn install(&mut self, handle: WorkerHandle) {
        let slot = handle.worker_id;
        debug_assert!(self.slots[slot].is_none(), "slot {} already occupied", slot);
        self.slots[slot] = Some(handle);
    }

    /// Remove and return the handle occupying a slot.
    pub fn take(&mut self, worker_id: usize) -> Option<WorkerHandle> {
        self.slots.get_mut(worker_id).and_then(|s| s.take())
    }

    /// Number of occupied slots.
    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Join every in-flight game, emptying the pool.
    pub fn join_all(&mut self) {
        for slot in &mut self.slots {
            if let Some(handle) = slot.take() {
                let _ = handle.join();
            }
        }
    }
}

/// Spawn one game into a worker slot.
///
/// The environment and planner factories run on the new thread; the
/// planner factory receives the weights the game will use throughout,
/// regardless of store updates happening meanwhile.
pub fn spawn_game<E, P, EF, PF>(
    worker_id: usize,
    weights: WeightsSnapshot,
    env_factory: Arc<EF>,
    planner_factory: Arc<PF>,
    builder: SequenceBuilder,
    aggregator: SharedAggregator,
    report_tx: Sender<WorkerReport>,
) -> WorkerHandle
where
    E: Environment + 'static,
    P: Planner + 'static,
    EF: Fn() -> E + Send + Sync + 'static,
    PF: Fn(WeightsSnapshot) -> P + Send + Sync + 'static,
{
    let thread = std::thread::Builder::new()
        .name(format!("selfplay-worker-{}", worker_id))
        .spawn(move || {
            let mut env = env_factory();
            let mut planner = planner_factory(weights);
            let mut worker = Worker::new(worker_id, LocalStage::new(builder, aggregator));

            let reason = match worker.run(&mut env, &mut planner) {
                Ok(_) => FinishReason::Completed,
                Err(e) => FinishReason::Aborted(e.to_string()),
            };

            let _ = report_tx.send(WorkerReport {
                worker_id,
                reason,
                stats: worker.into_stats(),
            });
        })
        .expect("failed to spawn worker thread");

    WorkerHandle { worker_id, thread }
}
