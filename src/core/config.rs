//! Algorithm-level configuration shared by every anytime algorithm.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timing and threading options for an algorithm lifecycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlgorithmConfig {
    /// Number of worker threads the algorithm may use (at least 1).
    pub threads: usize,

    /// Overall timeout in milliseconds. Non-positive means unbounded.
    pub timeout_ms: i64,

    /// Safety margin subtracted from the remaining time when scheduling
    /// the watchdog, to absorb scheduling jitter.
    pub precaution_offset_ms: u64,

    /// Smallest watchdog delay for which a blocking task is still started.
    /// Below this the worker sleeps out the remaining time instead.
    pub min_task_budget_ms: u64,
}

impl Default for AlgorithmConfig {
    fn default() -> Self {
        Self {
            threads: 1,
            timeout_ms: -1,
            precaution_offset_ms: 100,
            min_task_budget_ms: 50,
        }
    }
}

impl AlgorithmConfig {
    /// Set the overall timeout in milliseconds (non-positive disables it).
    pub fn with_timeout_ms(mut self, timeout_ms: i64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set the number of worker threads (clamped to at least 1).
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Set the watchdog safety margin.
    pub fn with_precaution_offset_ms(mut self, offset_ms: u64) -> Self {
        self.precaution_offset_ms = offset_ms;
        self
    }

    /// Set the minimum budget for starting a blocking task.
    pub fn with_min_task_budget_ms(mut self, budget_ms: u64) -> Self {
        self.min_task_budget_ms = budget_ms;
        self
    }

    /// The timeout as a duration, `None` when unbounded.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        u64::try_from(self.timeout_ms)
            .ok()
            .filter(|&ms| ms > 0)
            .map(Duration::from_millis)
    }

    #[must_use]
    pub fn precaution_offset(&self) -> Duration {
        Duration::from_millis(self.precaution_offset_ms)
    }

    #[must_use]
    pub fn min_task_budget(&self) -> Duration {
        Duration::from_millis(self.min_task_budget_ms)
    }
}
