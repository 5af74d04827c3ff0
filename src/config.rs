//! Pipeline-wide configuration.

/// Configuration shared by the sequence builder, aggregator, workers and
/// coordinator.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of concurrently running game workers.
    pub num_workers: usize,
    /// Agents per game.
    pub num_players: usize,
    /// Unroll length `U`; every training sequence spans `U + 1` positions.
    pub unroll_steps: usize,
    /// Maximum sequences sampled from one agent's finished trajectory.
    pub samples_per_player: usize,
    /// Sequences per training batch.
    pub batch_size: usize,
    /// Discount applied to the terminal reward by relative episode position.
    pub discount: f32,
    /// Nominal episode horizon used to scale the discount exponent.
    pub nominal_horizon: usize,
    /// Training steps between checkpoints.
    pub checkpoint_interval: u64,
    /// Stop after this many training steps; 0 runs until stopped.
    pub max_train_steps: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            num_workers: 10,
            num_players: 8,
            unroll_steps: 5,
            samples_per_player: 128,
            batch_size: 512,
            discount: 1.0,
            nominal_horizon: 200,
            checkpoint_interval: 500,
            max_train_steps: 0,
        }
    }
}

impl PipelineConfig {
    /// Config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of concurrent workers.
    pub fn with_num_workers(mut self, n: usize) -> Self {
        self.num_workers = n;
        self
    }

    /// Set the number of agents per game.
    pub fn with_num_players(mut self, n: usize) -> Self {
        self.num_players = n;
        self
    }

    /// Set the unroll length.
    pub fn with_unroll_steps(mut self, steps: usize) -> Self {
        self.unroll_steps = steps;
        self
    }

    /// Set the per-trajectory sample budget.
    pub fn with_samples_per_player(mut self, samples: usize) -> Self {
        self.samples_per_player = samples;
        self
    }

    /// Set the training batch size.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Set the terminal-reward discount.
    pub fn with_discount(mut self, discount: f32) -> Self {
        self.discount = discount;
        self
    }

    /// Set the nominal episode horizon.
    pub fn with_nominal_horizon(mut self, horizon: usize) -> Self {
        self.nominal_horizon = horizon;
        self
    }

    /// Set the checkpoint cadence (in training steps).
    pub fn with_checkpoint_interval(mut self, interval: u64) -> Self {
        self.checkpoint_interval = interval;
        self
    }

    /// Set a training-step limit (0 = unlimited).
    pub fn with_max_train_steps(mut self, steps: u64) -> Self {
        self.max_train_steps = steps;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.num_workers == 0 {
            return Err("num_workers must be > 0");
        }
        if self.num_players == 0 {
            return Err("num_players must be > 0");
        }
        if self.unroll_steps == 0 {
            return Err("unroll_steps must be > 0");
        }
        if self.batch_size == 0 {
            return Err("batch_size must be > 0");
        }
        if self.nominal_horizon == 0 {
            return Err("nominal_horizon must be > 0");
        }
        if self.checkpoint_interval == 0 {
            return Err("checkpoint_interval must be > 0");
        }
        if !(0.0..=1.0).contains(&self.discount) {
            return Err("discount must be in [0, 1]");
        }
        Ok(())
    }
}
