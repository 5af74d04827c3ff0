//! Game worker: plays one self-play game end-to-end.
//!
//! A worker owns a private planner (built from the weights it was spawned
//! with), steps the environment until every agent is terminated, records
//! transitions into its local stage, and flushes the stage when the game
//! ends. It never touches shared state except through the stage's
//! aggregator handle.

use crate::core::transition::{AgentId, Transition};
use crate::env::{AgentObservation, EnvAction, EnvError, Environment};
use crate::messages::WorkerStats;
use crate::planner::{Planner, PlannerError};
use crate::stage::{FlushSummary, LocalStage};
use std::collections::HashMap;
use std::fmt;

/// Why a game could not be finished.
#[derive(Debug)]
pub enum GameError {
    /// The environment failed mid-game.
    Environment(EnvError),
    /// The planner failed or returned misaligned output.
    Planner(PlannerError),
}

impl fmt::Display for GameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameError::Environment(e) => write!(f, "{}", e),
            GameError::Planner(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for GameError {}

impl From<EnvError> for GameError {
    fn from(e: EnvError) -> Self {
        GameError::Environment(e)
    }
}

impl From<PlannerError> for GameError {
    fn from(e: PlannerError) -> Self {
        GameError::Planner(e)
    }
}

/// One self-play game runner.
pub struct Worker {
    worker_id: usize,
    stage: LocalStage,
    stats: WorkerStats,
}

impl Worker {
    /// Create a worker for the given slot with an empty stage.
    pub fn new(worker_id: usize, stage: LocalStage) -> Self {
        Self {
            worker_id,
            stage,
            stats: WorkerStats::new(worker_id),
        }
    }

    /// This worker's slot id.
    pub fn worker_id(&self) -> usize {
        self.worker_id
    }

    /// Statistics accumulated so far.
    pub fn stats(&self) -> &WorkerStats {
        &self.stats
    }

    /// Consume the worker, yielding its statistics for the report.
    pub fn into_stats(self) -> WorkerStats {
        self.stats
    }

    /// Play one game to completion and flush the stage.
    ///
    /// On error the game is abandoned; recorded steps are discarded with
    /// the stage when the worker is dropped.
    pub fn run<E, P>(&mut self, env: &mut E, planner: &mut P) -> Result<FlushSummary, GameError>
    where
        E: Environment,
        P: Planner,
    {
        let agent_ids = env.agent_ids();
        let mut observations = env.reset()?;
        let mut terminated: HashMap<AgentId, bool> =
            agent_ids.iter().map(|a| (a.clone(), false)).collect();

        while terminated.values().any(|&t| !t) {
            let live: Vec<AgentId> = agent_ids
                .iter()
                .filter(|a| !terminated.get(*a).copied().unwrap_or(true))
                .cloned()
                .collect();

            let batch: Vec<AgentObservation> = live
                .iter()
                .map(|a| observations.get(a).cloned().unwrap_or_default())
                .collect();

            let output = planner.policy(&batch)?;
            if output.len() != live.len() || !output.is_consistent() {
                return Err(PlannerError::new(format!(
                    "planner covered {} of {} live agents",
                    output.len(),
                    live.len()
                ))
                .into());
            }

            let step_actions: HashMap<AgentId, EnvAction> = live
                .iter()
                .enumerate()
                .map(|(i, agent)| {
                    (
                        agent.clone(),
                        EnvAction {
                            action: output.actions[i],
                            board_map: output.board_maps[i].clone(),
                            directive: output.directives[i],
                        },
                    )
                })
                .collect();

            let outcome = env.step(&step_actions)?;

            for (i, agent) in live.iter().enumerate() {
                let state_empty = outcome
                    .infos
                    .get(agent)
                    .map(|info| info.state_empty)
                    .unwrap_or(false);
                if state_empty {
                    continue;
                }
                self.stage.record(
                    agent,
                    Transition {
                        observation: batch[i].tensor.clone(),
                        action: output.actions[i].to_tuple(),
                        reward: outcome.rewards.get(agent).copied().unwrap_or(0.0),
                        policy: output.policies[i].clone(),
                        legal_samples: output.legal_samples[i].clone(),
                    },
                );
            }

            for (agent, &done) in &outcome.terminated {
                if done {
                    terminated.insert(agent.clone(), true);
                }
            }
            observations = outcome.observations;
            self.stats.add_steps(1);
        }

        let summary = self.stage.flush();
        self.stats.record_game();
        self.stats.add_sequences(summary.sequences);
        for &reward in &summary.final_rewards {
            self.stats.record_final_reward(reward);
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::aggregator;
    use crate::core::action::Action;
    use crate::env::{AgentInfo, Observations, StepOutcome};
    use crate::planner::PlannerOutput;
    use crate::stage::SequenceBuilder;

    /// Scripted game: every agent survives `length` ticks, then all
    /// terminate together with a placement reward.
    struct ScriptedEnv {
        players: usize,
        length: usize,
        tick: usize,
        fail_at: Option<usize>,
    }

    impl ScriptedEnv {
        fn new(players: usize, length: usize) -> Self {
            Self {
                players,
                length,
                tick: 0,
                fail_at: None,
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
            if Some(self.tick) == self.fail_at {
                return Err(EnvError::new("scripted failure"));
            }
            self.tick += 1;
            let over = self.tick >= self.length;

            let mut outcome = StepOutcome::default();
            for agent in actions.keys() {
                let reward = if over { 10.0 } else { 0.0 };
                outcome.rewards.insert(agent.clone(), reward);
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

    /// Always passes, with a single-sample policy.
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
                board_maps: vec![vec![0; 4]; n],
                directives: vec![0; n],
            })
        }
    }

    fn worker(unroll: usize, samples: usize, batch: usize) -> (Worker, crate::aggregator::SharedAggregator) {
        let agg = aggregator(batch);
        let builder = SequenceBuilder::new(unroll, samples, 1.0, 200);
        let stage = LocalStage::new(builder, agg.clone());
        (Worker::new(0, stage), agg)
    }

    #[test]
    fn test_full_game_submits_sequences() {
        let (mut w, agg) = worker(2, 4, 4);
        let mut env = ScriptedEnv::new(2, 8);
        let mut planner = PassPlanner;

        let summary = w.run(&mut env, &mut planner).unwrap();

        // Two agents, L=8, U=2: min(4, 6) sequences each
        assert_eq!(summary.agents, 2);
        assert_eq!(summary.sequences, 8);
        assert_eq!(agg.total_len(), 8);
        assert_eq!(w.stats().games, 1);
        assert_eq!(w.stats().steps, 8);
        assert_eq!(w.stats().sequences, 8);
        assert!((w.stats().avg_final_reward - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_short_game_submits_nothing() {
        let (mut w, agg) = worker(5, 4, 4);
        let mut env = ScriptedEnv::new(2, 3);
        let mut planner = PassPlanner;

        let summary = w.run(&mut env, &mut planner).unwrap();
        assert_eq!(summary.sequences, 0);
        assert!(agg.is_empty());
    }

    #[test]
    fn test_environment_failure_aborts_game() {
        let (mut w, agg) = worker(2, 4, 4);
        let mut env = ScriptedEnv::new(2, 8);
        env.fail_at = Some(4);
        let mut planner = PassPlanner;

        let err = w.run(&mut env, &mut planner).unwrap_err();
        assert!(matches!(err, GameError::Environment(_)));
        assert!(agg.is_empty());
        assert_eq!(w.stats().games, 0);
    }

    #[test]
    fn test_state_empty_steps_are_not_recorded() {
        struct EmptyInfoEnv(ScriptedEnv);

        impl Environment for EmptyInfoEnv {
            fn agent_ids(&self) -> Vec<AgentId> {
                self.0.agent_ids()
            }
            fn reset(&mut self) -> Result<Observations, EnvError> {
                self.0.reset()
            }
            fn step(
                &mut self,
                actions: &HashMap<AgentId, EnvAction>,
            ) -> Result<StepOutcome, EnvError> {
                let mut outcome = self.0.step(actions)?;
                for info in outcome.infos.values_mut() {
                    info.state_empty = true;
                }
                Ok(outcome)
            }
        }

        let (mut w, agg) = worker(2, 4, 4);
        let mut env = EmptyInfoEnv(ScriptedEnv::new(2, 8));
        let mut planner = PassPlanner;

        let summary = w.run(&mut env, &mut planner).unwrap();
        // Every step was excluded, so there was nothing to flush
        assert_eq!(summary.agents, 0);
        assert_eq!(summary.sequences, 0);
        assert!(agg.is_empty());
    }

    #[test]
    fn test_misaligned_planner_output_is_an_error() {
        struct BrokenPlanner;
        impl Planner for BrokenPlanner {
            fn policy(
                &mut self,
                _observations: &[AgentObservation],
            ) -> Result<PlannerOutput, PlannerError> {
                Ok(PlannerOutput::default())
            }
        }

        let (mut w, _agg) = worker(2, 4, 4);
        let mut env = ScriptedEnv::new(2, 8);
        let mut planner = BrokenPlanner;

        let err = w.run(&mut env, &mut planner).unwrap_err();
        assert!(matches!(err, GameError::Planner(_)));
    }
}
