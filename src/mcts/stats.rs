//! MCTS search statistics for diagnostics and tuning.

use serde::{Deserialize, Serialize};

/// Statistics collected during MCTS search.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    /// Driver steps that completed a playout.
    pub iterations: u32,

    /// Playouts computed, including ones whose path was already cached.
    pub playouts: u32,

    /// Playouts restarted from the root after running into explored ground.
    pub restarts: u32,

    /// Nodes expanded (successor generation calls that succeeded).
    pub expansions: u32,

    /// Paths submitted to the evaluator.
    pub evaluations: u32,

    /// Evaluations that failed and were replaced by the penalty.
    pub evaluation_failures: u32,

    /// Playouts whose value came from the score cache.
    pub cache_hits: u32,

    /// Playouts that ended in a dead end instead of a goal.
    pub dead_end_playouts: u32,

    /// Distinct solutions surfaced.
    pub solutions: u32,

    /// Maximum playout depth reached.
    pub max_depth: u32,

    /// Total time spent searching (microseconds).
    pub time_us: u64,
}

impl SearchStats {
    /// Create new empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all statistics to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Calculate iterations per second.
    #[must_use]
    pub fn iterations_per_second(&self) -> f64 {
        if self.time_us == 0 {
            0.0
        } else {
            self.iterations as f64 / (self.time_us as f64 / 1_000_000.0)
        }
    }

    /// Calculate evaluations per second.
    #[must_use]
    pub fn evaluations_per_second(&self) -> f64 {
        if self.time_us == 0 {
            0.0
        } else {
            self.evaluations as f64 / (self.time_us as f64 / 1_000_000.0)
        }
    }

    /// Fraction of playouts answered from the score cache.
    #[must_use]
    pub fn cache_hit_rate(&self) -> f64 {
        if self.playouts == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.playouts as f64
        }
    }

    /// Average number of expansions per iteration.
    #[must_use]
    pub fn avg_expansions_per_iteration(&self) -> f64 {
        if self.iterations == 0 {
            0.0
        } else {
            self.expansions as f64 / self.iterations as f64
        }
    }
}
