//! Lifecycle framework for anytime, deadline-bounded algorithms.
//!
//! ## Overview
//!
//! - [`Lifecycle`]: tri-state machine (`Created → Active → Inactive`) that
//!   owns the deadline, the cancellation flag and an idempotent shutdown
//! - [`CancelHandle`]: cancels a lifecycle from another thread
//! - [`Interrupt`]: cooperative, per-thread interruption flag handed to every
//!   blocking call
//! - [`Lifecycle::compute_timeout_aware`]: runs a blocking call under a
//!   [`Watchdog`] so the algorithm never overruns its budget
//!
//! ## Checkpoints
//!
//! Algorithms call [`Lifecycle::check_and_conduct_termination`] between units
//! of work. It raises at most one [`Termination`](crate::core::Termination)
//! signal per call, always after shutdown has run.
//!
//! ```
//! use anytime_mcts::core::{AlgorithmConfig, Termination};
//! use anytime_mcts::lifecycle::Lifecycle;
//!
//! let mut lifecycle = Lifecycle::new(AlgorithmConfig::default());
//! lifecycle.activate().unwrap();
//! assert!(lifecycle.check_and_conduct_termination().is_ok());
//!
//! lifecycle.cancel();
//! assert_eq!(
//!     lifecycle.check_and_conduct_termination(),
//!     Err(Termination::Cancelled)
//! );
//! ```

mod algorithm;
mod deadline;
mod interrupt;
mod watchdog;

pub use algorithm::{AlgorithmState, CancelHandle, Lifecycle};
pub use interrupt::Interrupt;
pub use watchdog::Watchdog;
