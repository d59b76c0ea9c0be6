//! Error taxonomy for the search engine.
//!
//! Termination signals are not failures of the algorithm: they report that
//! execution stopped before completion and are always raised from a
//! checkpoint, after the lifecycle has shut down.

use thiserror::Error;

use crate::lifecycle::AlgorithmState;

/// Boxed error produced by caller-supplied code.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Why an algorithm stopped before completing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum Termination {
    /// The configured deadline passed.
    #[error("algorithm timed out")]
    Timeout,

    /// `cancel()` was called on the algorithm.
    #[error("algorithm execution was cancelled")]
    Cancelled,

    /// The worker thread was interrupted by someone other than the algorithm.
    #[error("worker thread was interrupted")]
    Interrupted,
}

/// Marker error for a cooperative interruption observed by a task.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Error)]
#[error("interrupted")]
pub struct Interrupted;

/// Outcome of a failed external call (successor generation, evaluation).
#[derive(Debug, Error)]
pub enum TaskError {
    /// The call observed the interrupt flag and gave up.
    #[error("task interrupted")]
    Interrupted,

    /// The call failed for a reason of its own.
    #[error("task failed: {0}")]
    Failed(#[source] BoxError),
}

impl TaskError {
    /// Wrap any error as a task failure.
    pub fn failed<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        TaskError::Failed(err.into())
    }
}

impl From<Interrupted> for TaskError {
    fn from(_: Interrupted) -> Self {
        TaskError::Interrupted
    }
}

/// Errors surfaced by the search engine.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Execution stopped early (timeout, cancellation, interruption).
    #[error(transparent)]
    Terminated(#[from] Termination),

    /// A policy could not choose an action.
    #[error("action selection failed: {0}")]
    ActionSelection(String),

    /// An external call (successor generation, evaluation) failed.
    #[error("external call failed: {0}")]
    Task(#[source] BoxError),

    /// A caller contract or engine invariant was violated.
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// An operation was called in the wrong lifecycle state.
    #[error("illegal state: expected {expected:?}, found {actual:?}")]
    IllegalState {
        expected: AlgorithmState,
        actual: AlgorithmState,
    },

    /// The algorithm has no further events to produce.
    #[error("no more elements")]
    NoSuchElement,

    /// The watchdog thread could not be spawned.
    #[error("failed to start watchdog: {0}")]
    Watchdog(#[from] std::io::Error),
}

impl SearchError {
    /// The termination signal carried by this error, if any.
    #[must_use]
    pub fn termination(&self) -> Option<Termination> {
        match self {
            SearchError::Terminated(t) => Some(*t),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;
