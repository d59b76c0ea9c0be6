//! MCTS configuration parameters.

use serde::{Deserialize, Serialize};

use crate::core::AlgorithmConfig;

/// MCTS configuration parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MCTSConfig {
    /// Lifecycle options (threads, timeout, watchdog margins).
    pub algorithm: AlgorithmConfig,

    /// Maximize path values (true) or minimize them (false).
    pub maximize: bool,

    /// Random seed for the default policy.
    /// Same seed produces deterministic searches.
    pub seed: u64,

    /// UCB1 exploration constant (default: sqrt(2) = 1.414).
    /// Higher values favor exploration over exploitation.
    pub exploration_constant: f64,

    /// Value recorded in place of a path score when evaluation fails, and
    /// for playouts that end in a dead end.
    pub evaluation_failure_penalty: f64,

    /// Never submit the same path to the evaluator twice.
    /// Fully explored subtrees are then excluded from selection.
    pub forbid_double_paths: bool,
}

impl Default for MCTSConfig {
    fn default() -> Self {
        Self {
            algorithm: AlgorithmConfig::default(),
            maximize: true,
            seed: 42,
            exploration_constant: std::f64::consts::SQRT_2,
            evaluation_failure_penalty: 0.0,
            forbid_double_paths: true,
        }
    }
}

impl MCTSConfig {
    /// Set the lifecycle options.
    pub fn with_algorithm(mut self, algorithm: AlgorithmConfig) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the overall timeout in milliseconds (non-positive disables it).
    pub fn with_timeout_ms(mut self, timeout_ms: i64) -> Self {
        self.algorithm = self.algorithm.with_timeout_ms(timeout_ms);
        self
    }

    /// Switch to minimization.
    pub fn minimizing(mut self) -> Self {
        self.maximize = false;
        self
    }

    /// Create a new config with custom seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Create a new config with custom exploration constant.
    pub fn with_exploration(mut self, c: f64) -> Self {
        self.exploration_constant = c;
        self
    }

    /// Set the value recorded when path evaluation fails.
    pub fn with_penalty(mut self, penalty: f64) -> Self {
        self.evaluation_failure_penalty = penalty;
        self
    }

    /// Enable or disable duplicate-path avoidance.
    pub fn with_forbid_double_paths(mut self, forbid: bool) -> Self {
        self.forbid_double_paths = forbid;
        self
    }
}
