//! Algorithm lifecycle: state, deadline, cancellation and shutdown.
//!
//! A [`Lifecycle`] is owned by the worker that drives the algorithm. The only
//! state shared with other threads (the shutdown guard, the cancellation
//! timestamp, the registry of workers inside blocking calls, the set of
//! workers interrupted by shutdown and the pending watchdog) lives behind one
//! mutex in [`Registry`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::ThreadId;
use std::time::{Duration, Instant};

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{AlgorithmConfig, Result, SearchError, Termination};

use super::interrupt::Interrupt;
use super::watchdog::Watchdog;

/// Tri-state lifecycle of an algorithm.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlgorithmState {
    /// Constructed, not yet activated.
    Created,
    /// Activated and producing events.
    Active,
    /// Finished; no further events.
    Inactive,
}

#[derive(Debug, Default)]
struct Registry {
    cancelled_at: Option<Instant>,
    shut_down_at: Option<Instant>,
    /// Workers currently inside a blocking call, with their nesting depth.
    active_workers: FxHashMap<ThreadId, (Interrupt, usize)>,
    /// Workers whose interrupt flag was raised by `shutdown` itself.
    interrupted_by_shutdown: FxHashSet<ThreadId>,
    watchdog: Option<Watchdog>,
}

#[derive(Debug, Default)]
struct Shared {
    registry: Mutex<Registry>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cancel(&self) -> bool {
        let first = {
            let mut registry = self.lock();
            if registry.cancelled_at.is_some() {
                false
            } else {
                registry.cancelled_at = Some(Instant::now());
                true
            }
        };
        if first {
            debug!("cancellation requested");
            self.shutdown();
        }
        first
    }

    fn is_cancelled(&self) -> bool {
        self.lock().cancelled_at.is_some()
    }

    fn shutdown(&self) -> bool {
        let watchdog = {
            let mut guard = self.lock();
            let registry = &mut *guard;
            if registry.shut_down_at.is_some() {
                return false;
            }
            registry.shut_down_at = Some(Instant::now());
            for (id, (interrupt, _)) in &registry.active_workers {
                interrupt.interrupt();
                registry.interrupted_by_shutdown.insert(*id);
            }
            debug!(
                interrupted = registry.active_workers.len(),
                "lifecycle shut down"
            );
            registry.watchdog.take()
        };
        // Joined outside the lock; the watchdog thread never takes it.
        if let Some(watchdog) = watchdog {
            watchdog.cancel();
        }
        true
    }
}

/// Thread-safe handle for cancelling a running algorithm from elsewhere.
#[derive(Clone, Debug)]
pub struct CancelHandle {
    shared: Arc<Shared>,
}

impl CancelHandle {
    /// Request cancellation. Returns `true` for the first request only;
    /// later calls have no effect.
    pub fn cancel(&self) -> bool {
        self.shared.cancel()
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.shared.is_cancelled()
    }
}

/// Removes the current worker from the active registry when dropped.
#[must_use = "the worker is unregistered when the guard is dropped"]
pub(crate) struct WorkerGuard<'a> {
    lifecycle: &'a Lifecycle,
    thread: ThreadId,
}

impl Drop for WorkerGuard<'_> {
    fn drop(&mut self) {
        let mut registry = self.lifecycle.shared.lock();
        if let Some((_, depth)) = registry.active_workers.get_mut(&self.thread) {
            *depth -= 1;
            if *depth == 0 {
                registry.active_workers.remove(&self.thread);
            }
        }
    }
}

/// Lifecycle of one anytime algorithm instance.
#[derive(Debug)]
pub struct Lifecycle {
    config: AlgorithmConfig,
    state: AlgorithmState,
    activated_at: Option<Instant>,
    deadline: Option<Instant>,
    shared: Arc<Shared>,
}

impl Lifecycle {
    pub fn new(config: AlgorithmConfig) -> Self {
        Self {
            config,
            state: AlgorithmState::Created,
            activated_at: None,
            deadline: None,
            shared: Arc::default(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AlgorithmConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> AlgorithmState {
        self.state
    }

    /// Created → Active. Records the activation time and computes the
    /// absolute deadline from the configured timeout.
    pub fn activate(&mut self) -> Result<()> {
        if self.state != AlgorithmState::Created {
            return Err(SearchError::IllegalState {
                expected: AlgorithmState::Created,
                actual: self.state,
            });
        }
        let now = Instant::now();
        self.activated_at = Some(now);
        self.deadline = self.config.timeout().map(|timeout| now + timeout);
        self.state = AlgorithmState::Active;
        debug!(timeout_ms = self.config.timeout_ms, "lifecycle activated");
        Ok(())
    }

    /// Active → Inactive, then shut down. Returns `true` if this call
    /// performed the transition.
    pub fn terminate(&mut self) -> bool {
        let transitioned = self.state == AlgorithmState::Active;
        if transitioned {
            self.state = AlgorithmState::Inactive;
            debug!("lifecycle terminated");
        }
        self.shutdown();
        transitioned
    }

    /// Request cancellation. The first call records the timestamp and
    /// shuts down; later calls are no-ops.
    pub fn cancel(&self) -> bool {
        self.shared.cancel()
    }

    /// Handle that can cancel this lifecycle from another thread.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Interrupt every registered worker and cancel the pending watchdog.
    /// Runs its side effects at most once; returns `true` on that call.
    pub fn shutdown(&self) -> bool {
        self.shared.shutdown()
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.shared.is_cancelled()
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shared.lock().shut_down_at.is_some()
    }

    #[must_use]
    pub fn cancelled_at(&self) -> Option<Instant> {
        self.shared.lock().cancelled_at
    }

    #[must_use]
    pub fn shut_down_at(&self) -> Option<Instant> {
        self.shared.lock().shut_down_at
    }

    #[must_use]
    pub fn activated_at(&self) -> Option<Instant> {
        self.activated_at
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left until the deadline, `None` when unbounded.
    #[must_use]
    pub fn remaining_time(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    #[must_use]
    pub fn is_timed_out(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Checkpoint called from inside the algorithm loop.
    ///
    /// In order: an exceeded deadline raises `Timeout`; a cancellation
    /// raises `Cancelled` (lowering any flag raised by that shutdown); an
    /// interrupted worker raises `Interrupted` and keeps its flag raised.
    /// Each signal is raised only after shutdown has run.
    pub fn check_and_conduct_termination(&self) -> std::result::Result<(), Termination> {
        if self.is_timed_out() {
            debug!("deadline exceeded");
            self.shutdown();
            return Err(Termination::Timeout);
        }

        let current = Interrupt::current();
        if self.is_cancelled() {
            self.shutdown();
            if self.take_shutdown_interrupt(&current) {
                current.clear();
            }
            return Err(Termination::Cancelled);
        }

        if current.clear() {
            debug!("worker interrupted externally");
            self.shutdown();
            current.interrupt();
            return Err(Termination::Interrupted);
        }

        Ok(())
    }

    /// Register the calling thread as a worker inside a blocking call.
    /// Registration nests: the worker stays registered until every guard
    /// has been dropped.
    pub(crate) fn register_worker(&self, interrupt: &Interrupt) -> WorkerGuard<'_> {
        let thread = interrupt.thread_id();
        let mut registry = self.shared.lock();
        registry
            .active_workers
            .entry(thread)
            .or_insert_with(|| (interrupt.clone(), 0))
            .1 += 1;
        WorkerGuard {
            lifecycle: self,
            thread,
        }
    }

    /// Whether `interrupt`'s thread was interrupted by shutdown; forgets the
    /// record so it is consumed at most once.
    pub(crate) fn take_shutdown_interrupt(&self, interrupt: &Interrupt) -> bool {
        self.shared
            .lock()
            .interrupted_by_shutdown
            .remove(&interrupt.thread_id())
    }

    /// Park a watchdog where `shutdown` can cancel it. If the lifecycle is
    /// already shut down the watchdog is cancelled immediately.
    pub(crate) fn install_watchdog(&self, watchdog: Watchdog) {
        let rejected = {
            let mut registry = self.shared.lock();
            if registry.shut_down_at.is_some() {
                Some(watchdog)
            } else {
                registry.watchdog = Some(watchdog);
                None
            }
        };
        if let Some(watchdog) = rejected {
            watchdog.cancel();
        }
    }

    /// Cancel the pending watchdog, if `shutdown` has not already done so.
    pub(crate) fn cancel_watchdog(&self) {
        let watchdog = self.shared.lock().watchdog.take();
        if let Some(watchdog) = watchdog {
            watchdog.cancel();
        }
    }

    #[cfg(test)]
    pub(crate) fn active_worker_count(&self) -> usize {
        self.shared.lock().active_workers.len()
    }
}
