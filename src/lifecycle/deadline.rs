//! Timeout-aware execution of blocking sub-computations.
//!
//! Blocking calls (successor generation, path evaluation) run under a
//! watchdog that interrupts the worker a safety margin before the deadline.
//! Whatever happens inside the call, it never returns silently late: either
//! the result comes back, or the clock is run out so the next checkpoint
//! deterministically observes the deadline.

use std::sync::atomic::Ordering;
use std::time::Instant;

use tracing::{debug, trace};

use crate::core::{Result, SearchError, TaskError, Termination};

use super::algorithm::Lifecycle;
use super::interrupt::Interrupt;
use super::watchdog::Watchdog;

impl Lifecycle {
    /// Run `task` on the calling thread, bounded by the lifecycle deadline.
    ///
    /// The task receives the worker's [`Interrupt`] and is expected to poll
    /// it. Interruptions are classified into timeout, cancellation or
    /// external interruption; task failures come back as
    /// [`SearchError::Task`].
    pub fn compute_timeout_aware<T, F>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&Interrupt) -> std::result::Result<T, TaskError>,
    {
        let interrupt = Interrupt::current();

        let Some(deadline) = self.deadline() else {
            let outcome = {
                let _worker = self.register_worker(&interrupt);
                task(&interrupt)
            };
            return match outcome {
                Ok(value) => Ok(value),
                Err(TaskError::Interrupted) => Err(self.classify_interruption(&interrupt)),
                Err(TaskError::Failed(err)) => Err(SearchError::Task(err)),
            };
        };

        let remaining = deadline.saturating_duration_since(Instant::now());
        let watchdog_delay = remaining.saturating_sub(self.config().precaution_offset());
        if watchdog_delay < self.config().min_task_budget() {
            debug!(
                remaining_ms = remaining.as_millis() as u64,
                "not enough time left for task, running out the clock"
            );
            return Err(self.run_out_clock(deadline, &interrupt));
        }

        trace!(
            delay_ms = watchdog_delay.as_millis() as u64,
            "scheduling watchdog"
        );
        let watchdog = Watchdog::schedule(watchdog_delay, interrupt.clone())?;
        let fired = watchdog.fired_flag();
        self.install_watchdog(watchdog);

        let outcome = {
            let _worker = self.register_worker(&interrupt);
            task(&interrupt)
        };
        self.cancel_watchdog();
        let watchdog_fired = fired.load(Ordering::SeqCst);

        match outcome {
            Ok(value) => {
                if watchdog_fired {
                    // The task finished anyway; drop the stray flag.
                    interrupt.clear();
                }
                Ok(value)
            }
            Err(TaskError::Interrupted) if watchdog_fired => {
                debug!("task interrupted by watchdog");
                interrupt.clear();
                Err(self.run_out_clock(deadline, &interrupt))
            }
            Err(TaskError::Interrupted) => Err(self.classify_interruption(&interrupt)),
            Err(TaskError::Failed(err)) => {
                if watchdog_fired {
                    interrupt.clear();
                }
                Err(SearchError::Task(err))
            }
        }
    }

    /// Sleep until the deadline, then raise the termination signal.
    fn run_out_clock(&self, deadline: Instant, interrupt: &Interrupt) -> SearchError {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let slept = {
            let _worker = self.register_worker(interrupt);
            interrupt.sleep(remaining)
        };
        if slept.is_err() {
            return self.classify_interruption(interrupt);
        }
        match self.check_and_conduct_termination() {
            Err(termination) => termination.into(),
            Ok(()) => Termination::Timeout.into(),
        }
    }

    /// Decide whether an interruption came from our own shutdown or from
    /// outside, and raise the matching signal.
    fn classify_interruption(&self, interrupt: &Interrupt) -> SearchError {
        if self.take_shutdown_interrupt(interrupt) {
            interrupt.clear();
        }
        match self.check_and_conduct_termination() {
            Err(termination) => termination.into(),
            Ok(()) => Termination::Interrupted.into(),
        }
    }
}
