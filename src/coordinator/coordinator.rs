//! The pipeline's only long-lived control loop.
//!
//! The coordinator launches the worker pool, then cycles through:
//!
//! ```text
//! AWAIT_COMPLETION -> DRAIN_AND_TRAIN -> PUBLISH -> (CHECKPOINT?) -> RESPAWN
//! ```
//!
//! It blocks until any worker finishes a game (first-completed-wins over
//! the shared report channel), trains on every full batch the aggregator
//! can supply, publishes refreshed weights to the model store after every
//! step so a mid-drain respawn sees them, checkpoints on the configured
//! cadence, and respawns exactly the finished slot with the store's
//! current weights. There is no terminal state; the loop runs until the
//! stop flag is raised or the configured step limit is hit.

use crate::aggregator::SharedAggregator;
use crate::config::PipelineConfig;
use crate::coordinator::gate::{AlwaysRun, PauseGate};
use crate::core::weights::WeightsSnapshot;
use crate::env::Environment;
use crate::messages::{FinishReason, WorkerReport};
use crate::metrics::{ConsoleLogger, MetricsLogger, TrainingSnapshot};
use crate::planner::Planner;
use crate::stage::SequenceBuilder;
use crate::store::SharedModelStore;
use crate::trainer::Trainer;
use crate::worker::{spawn_game, WorkerPool};
use crossbeam_channel::RecvTimeoutError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// The training-side control loop.
pub struct Coordinator<T: Trainer> {
    config: PipelineConfig,
    aggregator: SharedAggregator,
    store: SharedModelStore,
    trainer: T,
    logger: Box<dyn MetricsLogger>,
    gate: Box<dyn PauseGate>,
    stop: Arc<AtomicBool>,
    train_step: u64,
    games: usize,
    aborted_games: usize,
    avg_final_reward: f32,
    scored_games: usize,
}

impl<T: Trainer> Coordinator<T> {
    /// Create a coordinator over the shared aggregator and model store.
    pub fn new(
        config: PipelineConfig,
        aggregator: SharedAggregator,
        store: SharedModelStore,
        trainer: T,
    ) -> Self {
        Self {
            config,
            aggregator,
            store,
            trainer,
            logger: Box::new(ConsoleLogger::new(1)),
            gate: Box::new(AlwaysRun),
            stop: Arc::new(AtomicBool::new(false)),
            train_step: 0,
            games: 0,
            aborted_games: 0,
            avg_final_reward: 0.0,
            scored_games: 0,
        }
    }

    /// Replace the metrics logger.
    pub fn with_logger<L: MetricsLogger + 'static>(mut self, logger: L) -> Self {
        self.logger = Box::new(logger);
        self
    }

    /// Replace the pause gate.
    pub fn with_gate<G: PauseGate + 'static>(mut self, gate: G) -> Self {
        self.gate = Box::new(gate);
        self
    }

    /// Flag that stops the loop when set; clone it to stop from outside.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Cumulative training steps performed.
    pub fn train_step(&self) -> u64 {
        self.train_step
    }

    /// Games completed across all workers.
    pub fn games(&self) -> usize {
        self.games
    }

    /// Games aborted by environment or planner failures.
    pub fn aborted_games(&self) -> usize {
        self.aborted_games
    }

    /// The trainer, for inspection.
    pub fn trainer(&self) -> &T {
        &self.trainer
    }

    /// Run the loop until stopped.
    ///
    /// Launches the full worker pool with the store's current weights,
    /// then cycles completion -> drain/train/publish -> respawn. On exit,
    /// in-flight games run to completion before this returns; nothing is
    /// cancelled mid-game.
    pub fn run<E, P, EF, PF>(&mut self, env_factory: EF, planner_factory: PF)
    where
        E: Environment + 'static,
        P: Planner + 'static,
        EF: Fn() -> E + Send + Sync + 'static,
        PF: Fn(WeightsSnapshot) -> P + Send + Sync + 'static,
    {
        let env_factory = Arc::new(env_factory);
        let planner_factory = Arc::new(planner_factory);
        let builder = SequenceBuilder::from_config(&self.config);
        let (report_tx, report_rx) = crossbeam_channel::unbounded::<WorkerReport>();

        let mut pool = WorkerPool::new(self.config.num_workers);
        for worker_id in 0..self.config.num_workers {
            pool.install(spawn_game(
                worker_id,
                self.store.current(),
                Arc::clone(&env_factory),
                Arc::clone(&planner_factory),
                builder.clone(),
                Arc::clone(&self.aggregator),
                report_tx.clone(),
            ));
        }

        while !self.stop.load(Ordering::Relaxed) {
            // Pause gate: hold the whole cycle. In-flight games keep
            // running and their reports queue until the gate reopens.
            if !self.gate.should_run() {
                std::thread::sleep(POLL_INTERVAL);
                continue;
            }

            // AWAIT_COMPLETION: first finished worker wins.
            let report = match report_rx.recv_timeout(POLL_INTERVAL) {
                Ok(report) => report,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            };
            if let Some(handle) = pool.take(report.worker_id) {
                let _ = handle.join();
            }
            self.absorb_report(&report);

            self.drain_and_train();

            if self.stop.load(Ordering::Relaxed) {
                break;
            }

            // RESPAWN exactly the finished slot with fresh weights.
            pool.install(spawn_game(
                report.worker_id,
                self.store.current(),
                Arc::clone(&env_factory),
                Arc::clone(&planner_factory),
                builder.clone(),
                Arc::clone(&self.aggregator),
                report_tx.clone(),
            ));
        }

        pool.join_all();
        self.logger.flush();
    }

    /// DRAIN_AND_TRAIN: one training step per available batch, publishing
    /// after every step so a worker respawned mid-drain reads the newest
    /// weights.
    fn drain_and_train(&mut self) {
        while self.aggregator.available() {
            let batch = match self.aggregator.sample_batch() {
                Some(batch) => batch,
                None => break,
            };

            self.train_step += 1;
            let step = self.train_step;
            let stats = self.trainer.train_step(batch, step);
            let version = self.store.publish(self.trainer.weights());

            let snapshot = TrainingSnapshot::new(
                step,
                self.games,
                self.aggregator.total_len(),
                self.avg_final_reward,
            )
            .with_losses(stats.total_loss, stats.value_loss, stats.policy_loss)
            .with_model_version(version);
            self.logger.log(&snapshot);

            if step % self.config.checkpoint_interval == 0 {
                if let Err(e) = self.store.checkpoint(step) {
                    eprintln!("checkpoint at step {} failed: {}", step, e);
                }
            }

            if self.config.max_train_steps > 0 && step >= self.config.max_train_steps {
                self.stop.store(true, Ordering::Relaxed);
                break;
            }
        }
    }

    fn absorb_report(&mut self, report: &WorkerReport) {
        match &report.reason {
            FinishReason::Completed => {
                self.games += 1;
                if report.stats.valid_trajectories > 0 {
                    self.scored_games += 1;
                    let delta = report.stats.avg_final_reward - self.avg_final_reward;
                    self.avg_final_reward += delta / self.scored_games as f32;
                }
            }
            FinishReason::Aborted(why) => {
                self.aborted_games += 1;
                eprintln!("worker {} aborted its game: {}", report.worker_id, why);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::aggregator;
    use crate::core::action::Action;
    use crate::core::transition::AgentId;
    use crate::env::{
        AgentInfo, AgentObservation, EnvAction, EnvError, Observations, StepOutcome,
    };
    use crate::planner::{PlannerError, PlannerOutput};
    use crate::store::{model_store, CheckpointConfig, CheckpointStore, SharedModelStore};
    use crate::trainer::TrainStats;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, AtomicUsize};

    struct ScriptedEnv {
        players: usize,
        length: usize,
        tick: usize,
        fail: bool,
    }

    impl ScriptedEnv {
        fn new(players: usize, length: usize) -> Self {
            Self {
                players,
                length,
                tick: 0,
                fail: false,
            }
        }

        fn observations(&self) -> Observations {
            self.agent_ids()
                .into_iter()
                .map(|a| {
                    (
                        a,
                        AgentObservation {
                            tensor: vec![self.tick as f32; 4],
                            action_mask: vec![true; 2],
                        },
                    )
                })
                .collect()
        }
    }

    impl Environment for ScriptedEnv {
        fn agent_ids(&self) -> Vec<AgentId> {
            (0..self.players).map(|i| format!("player_{}", i)).collect()
        }

        fn reset(&mut self) -> Result<Observations, EnvError> {
            self.tick = 0;
            Ok(self.observations())
        }

        fn step(
            &mut self,
            actions: &HashMap<AgentId, EnvAction>,
        ) -> Result<StepOutcome, EnvError> {
            if self.fail {
                return Err(EnvError::new("scripted failure"));
            }
            self.tick += 1;
            let over = self.tick >= self.length;

            let mut outcome = StepOutcome::default();
            for agent in actions.keys() {
                outcome
                    .rewards
                    .insert(agent.clone(), if over { 10.0 } else { 0.0 });
                outcome.terminated.insert(agent.clone(), over);
                outcome.truncated.insert(agent.clone(), false);
                outcome
                    .infos
                    .insert(agent.clone(), AgentInfo { state_empty: false });
            }
            outcome.observations = self.observations();
            Ok(outcome)
        }
    }

    struct PassPlanner;

    impl Planner for PassPlanner {
        fn policy(
            &mut self,
            observations: &[AgentObservation],
        ) -> Result<PlannerOutput, PlannerError> {
            let n = observations.len();
            Ok(PlannerOutput {
                actions: vec![Action::Pass; n],
                policies: vec![vec![1.0]; n],
                legal_samples: vec![vec![Action::Pass]; n],
                board_maps: vec![Vec::new(); n],
                directives: vec![0; n],
            })
        }
    }

    struct CountingTrainer {
        steps: Arc<AtomicU64>,
    }

    impl Trainer for CountingTrainer {
        fn train_step(
            &mut self,
            batch: crate::core::sequence::SequenceBatch,
            _step: u64,
        ) -> TrainStats {
            assert!(!batch.is_empty());
            self.steps.fetch_add(1, Ordering::SeqCst);
            TrainStats {
                total_loss: 0.5,
                value_loss: 0.3,
                policy_loss: 0.2,
                reward_loss: 0.0,
            }
        }

        fn weights(&self) -> WeightsSnapshot {
            WeightsSnapshot::fresh(vec![self.steps.load(Ordering::SeqCst) as f32; 2])
        }
    }

    /// Silent logger for tests.
    struct NullLogger;

    impl MetricsLogger for NullLogger {
        fn log(&mut self, _snapshot: &TrainingSnapshot) {}
        fn flush(&mut self) {}
    }

    fn test_config() -> PipelineConfig {
        PipelineConfig::new()
            .with_num_workers(2)
            .with_num_players(2)
            .with_unroll_steps(2)
            .with_samples_per_player(4)
            .with_batch_size(4)
            .with_checkpoint_interval(2)
    }

    fn store_in(dir: &std::path::Path) -> SharedModelStore {
        let checkpoints = CheckpointStore::new(CheckpointConfig::new(dir)).unwrap();
        model_store(WeightsSnapshot::fresh(vec![0.0; 2]), checkpoints)
    }

    #[test]
    fn test_trains_publishes_and_checkpoints() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config().with_max_train_steps(4);
        let agg = aggregator(config.batch_size);
        let store = store_in(dir.path());
        let steps = Arc::new(AtomicU64::new(0));

        let mut coordinator = Coordinator::new(
            config,
            agg,
            Arc::clone(&store),
            CountingTrainer {
                steps: Arc::clone(&steps),
            },
        )
        .with_logger(NullLogger);

        coordinator.run(|| ScriptedEnv::new(2, 8), |_weights| PassPlanner);

        assert_eq!(coordinator.train_step(), 4);
        assert_eq!(steps.load(Ordering::SeqCst), 4);
        assert!(coordinator.games() >= 1);

        // Weights were published after every step
        assert_eq!(store.version(), 4);
        assert_eq!(store.current().parameters, vec![4.0; 2]);

        // Checkpoint cadence of 2 over 4 steps
        let mut saved: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        saved.sort();
        assert_eq!(
            saved,
            vec!["checkpoint_00000002.bin", "checkpoint_00000004.bin"]
        );
    }

    #[test]
    fn test_respawned_workers_read_published_weights() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config().with_max_train_steps(6);
        let agg = aggregator(config.batch_size);
        let store = store_in(dir.path());
        let seen_versions: Arc<Mutex<Vec<u64>>> = Arc::new(Mutex::new(Vec::new()));

        let mut coordinator = Coordinator::new(
            config,
            agg,
            store,
            CountingTrainer {
                steps: Arc::new(AtomicU64::new(0)),
            },
        )
        .with_logger(NullLogger);

        let versions = Arc::clone(&seen_versions);
        coordinator.run(
            || ScriptedEnv::new(2, 8),
            move |weights| {
                versions.lock().push(weights.version);
                PassPlanner
            },
        );

        let seen = seen_versions.lock();
        // The initial pool started from fresh weights...
        assert!(seen.iter().filter(|&&v| v == 0).count() >= 2);
        // ...and at least one respawn read post-training weights.
        assert!(
            seen.iter().any(|&v| v >= 1),
            "no respawn saw published weights: {:?}",
            seen
        );
    }

    #[test]
    fn test_pause_gate_halts_training() {
        struct SharedGate(Arc<AtomicBool>);
        impl PauseGate for SharedGate {
            fn should_run(&self) -> bool {
                self.0.load(Ordering::Relaxed)
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let config = test_config().with_max_train_steps(2);
        let agg = aggregator(config.batch_size);
        let store = store_in(dir.path());
        let steps = Arc::new(AtomicU64::new(0));
        let open = Arc::new(AtomicBool::new(false));

        let mut coordinator = Coordinator::new(
            config,
            Arc::clone(&agg),
            store,
            CountingTrainer {
                steps: Arc::clone(&steps),
            },
        )
        .with_logger(NullLogger)
        .with_gate(SharedGate(Arc::clone(&open)));

        let runner = std::thread::spawn(move || {
            coordinator.run(|| ScriptedEnv::new(2, 8), |_weights| PassPlanner);
            coordinator
        });

        // Workers finish games while the gate is closed; nothing trains.
        std::thread::sleep(Duration::from_millis(400));
        assert_eq!(steps.load(Ordering::SeqCst), 0);
        assert!(agg.available(), "workers should have filled the pool");

        open.store(true, Ordering::Relaxed);
        let coordinator = runner.join().unwrap();
        assert_eq!(coordinator.train_step(), 2);
    }

    #[test]
    fn test_aborted_games_are_respawned() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config();
        let agg = aggregator(config.batch_size);
        let store = store_in(dir.path());
        let spawned = Arc::new(AtomicUsize::new(0));

        let mut coordinator = Coordinator::new(
            config,
            agg,
            store,
            CountingTrainer {
                steps: Arc::new(AtomicU64::new(0)),
            },
        )
        .with_logger(NullLogger);

        let stop = coordinator.stop_handle();
        let spawn_count = Arc::clone(&spawned);

        let runner = std::thread::spawn(move || {
            coordinator.run(
                move || {
                    spawn_count.fetch_add(1, Ordering::SeqCst);
                    let mut env = ScriptedEnv::new(2, 8);
                    env.fail = true;
                    env
                },
                |_weights| PassPlanner,
            );
            coordinator
        });

        std::thread::sleep(Duration::from_millis(400));
        stop.store(true, Ordering::Relaxed);
        let coordinator = runner.join().unwrap();

        // Failed slots kept being relaunched past the initial pool of 2
        assert!(spawned.load(Ordering::SeqCst) > 2);
        assert!(coordinator.aborted_games() > 0);
        assert_eq!(coordinator.train_step(), 0);
    }
}
