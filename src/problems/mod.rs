//! Ready-made search problems.
//!
//! Small problems for exercising the engine:
//! - [`TableProblem`]: an explicit graph given as an adjacency table, with
//!   goal values scored by [`TableEvaluator`]
//! - [`BranchingProblem`]: an effectively infinite tree with a fixed
//!   branching factor and optional per-call latency, for timing and
//!   cancellation tests
//!
//! Both can simulate slow successor generation; the delay honours the
//! interrupt, like any well-behaved external call.

mod branching;
mod table;

pub use branching::{BranchNode, BranchingProblem, DepthEvaluator};
pub use table::{TableEvaluator, TableProblem, TableProblemBuilder};
