//! Monte Carlo Tree Search over caller-defined graphs.
//!
//! ## Overview
//!
//! This module implements an anytime MCTS that searches for goal paths and
//! scores them with an external evaluator. Key features:
//!
//! - **Anytime**: Driven one step at a time, solutions are available as soon
//!   as they are found
//! - **Deadline-bounded**: Blocking generator and evaluator calls run under
//!   the lifecycle's watchdog
//! - **Exhaustive bookkeeping**: Dead ends and fully explored subtrees are
//!   pruned; with duplicate-path avoidance no path is ever scored twice
//! - **Configurable Policies**: Tree policy (UCB1) and default policy
//!   (uniform random, seeded)
//!
//! ## Usage
//!
//! ```rust
//! use anytime_mcts::mcts::{MCTSConfig, MCTSSearch};
//! use anytime_mcts::problems::{TableEvaluator, TableProblem};
//!
//! let problem = TableProblem::builder("root")
//!     .edge("root", "left", "a")
//!     .edge("root", "right", "b")
//!     .goal("a", 0.9)
//!     .goal("b", 0.1)
//!     .build();
//! let evaluator = TableEvaluator::from(&problem);
//!
//! let mut search = MCTSSearch::new(problem, evaluator, MCTSConfig::default());
//! let best = search.call().unwrap().unwrap();
//!
//! assert_eq!(best.path.head(), &"a");
//! assert_eq!(search.recommended_action(), Some(&"left"));
//! ```
//!
//! ## Custom Policies
//!
//! ```rust,ignore
//! use anytime_mcts::mcts::{FirstChild, MCTSSearch, UCB1};
//!
//! let search = MCTSSearch::new(problem, evaluator, config)
//!     .with_tree_policy(UCB1::new(true, 0.5))
//!     .with_default_policy(FirstChild);
//! ```

pub mod config;
pub mod graph;
pub mod node;
mod playout;
pub mod policy;
pub mod search;
pub mod stats;

// Re-export main types
pub use config::MCTSConfig;
pub use graph::{ExplorationGraph, GraphStats};
pub use node::{Edge, GraphNode, NodeId, NodeLabel};
pub use policy::{DefaultPolicy, FirstChild, TreePolicy, UniformRandom, UCB1};
pub use search::{MCTSSearch, SearchEvent, SearchSolution, ValueOf};
pub use stats::SearchStats;
