//! Core engine types: errors, configuration, events, paths, RNG.
//!
//! This module contains the building blocks that are independent of any
//! particular search algorithm.

pub mod config;
pub mod error;
pub mod event;
pub mod path;
pub mod rng;

pub use config::AlgorithmConfig;
pub use error::{BoxError, Interrupted, Result, SearchError, TaskError, Termination};
pub use event::{AlgorithmEvent, FinishReason, NodeState, Observer, ObserverList};
pub use path::{Score, SearchPath, Solution};
pub use rng::SearchRng;
