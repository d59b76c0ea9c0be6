//! # anytime-mcts
//!
//! An anytime, deadline-bounded, cancellable Monte Carlo Tree Search engine
//! for finding and scoring goal paths in caller-defined graphs.
//!
//! ## Design Principles
//!
//! 1. **Anytime**: The search advances one step at a time and can be stopped
//!    after any step; the best solution so far is always available.
//!
//! 2. **Never Silently Late**: Every blocking call (successor generation,
//!    path evaluation) runs under a watchdog. A run with a timeout returns
//!    within the timeout plus a small safety margin.
//!
//! 3. **Cooperative Cancellation**: Cancellation and timeouts are observed at
//!    checkpoints and through an [`Interrupt`](lifecycle::Interrupt) flag
//!    handed to every external call. Shutdown happens exactly once.
//!
//! ## Architecture
//!
//! - **Arena Graph**: Nodes are stored once and referenced by `NodeId`;
//!   bookkeeping sets and the score cache never clone caller values.
//!
//! - **Single-Owner State**: The search loop owns everything except the
//!   lifecycle registry, the only state shared with the watchdog and with
//!   cancel handles.
//!
//! ## Modules
//!
//! - `core`: Errors, configuration, events, paths, RNG
//! - `lifecycle`: Algorithm state machine, deadlines, interruption, watchdog
//! - `problem`: Traits callers implement to describe a search
//! - `mcts`: Exploration graph, policies and the search engine
//! - `problems`: Ready-made problems for tests and benchmarks

pub mod core;
pub mod lifecycle;
pub mod mcts;
pub mod problem;
pub mod problems;

// Re-export commonly used types
pub use crate::core::{
    AlgorithmConfig, AlgorithmEvent, FinishReason, NodeState, Observer, Score, SearchError,
    SearchPath, SearchRng, Solution, TaskError, Termination,
};

pub use crate::lifecycle::{AlgorithmState, CancelHandle, Interrupt, Lifecycle};

pub use crate::problem::{FnEvaluator, PathEvaluator, SearchProblem};

pub use crate::mcts::{
    DefaultPolicy, ExplorationGraph, MCTSConfig, MCTSSearch, NodeId, NodeLabel, SearchStats,
    TreePolicy, UniformRandom, UCB1,
};
