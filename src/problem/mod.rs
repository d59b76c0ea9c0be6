//! Caller-supplied search problems.
//!
//! Problems implement [`SearchProblem`] to describe the graph being searched:
//! - Which node the search starts from (root generation)
//! - Which `(action, node)` pairs are reachable from a node (successor generation)
//! - Which nodes are accepting (goal testing)
//!
//! Complete paths are scored by a separate [`PathEvaluator`].
//!
//! ## Implementation Notes
//!
//! - `generate_successors` may block; it is always called through the
//!   lifecycle's timeout-aware wrapper and should poll the [`Interrupt`] it
//!   is given, returning [`TaskError::Interrupted`] once it is raised
//! - Action labels leaving one node must be unique
//! - Node values may be reachable along several paths; the engine records
//!   every occurrence separately and explores the graph as a tree. Cycles
//!   therefore unfold without end, like any infinite tree
//! - Every new playout path is evaluated, including paths that end in a
//!   node without successors
//! - `evaluate` failures are not fatal: the engine substitutes a penalty

use std::fmt::Debug;
use std::hash::Hash;

use crate::core::{Score, SearchPath, TaskError};
use crate::lifecycle::Interrupt;

/// Bounds required of node types.
pub trait NodeType: Clone + Eq + Hash + Debug + Send + 'static {}

impl<T> NodeType for T where T: Clone + Eq + Hash + Debug + Send + 'static {}

/// Bounds required of action types.
pub trait ActionType: Clone + Eq + Hash + Debug + Send + 'static {}

impl<T> ActionType for T where T: Clone + Eq + Hash + Debug + Send + 'static {}

/// Search problem trait.
///
/// The engine only needs equality and hashing on nodes and actions; it never
/// inspects them otherwise.
pub trait SearchProblem: Send {
    type Node: NodeType;
    type Action: ActionType;

    /// Produce the unique start node.
    fn generate_root(&self) -> Self::Node;

    /// Produce the `(action, successor)` pairs reachable from `node`.
    ///
    /// Returns an empty vec for nodes without successors.
    fn generate_successors(
        &self,
        node: &Self::Node,
        interrupt: &Interrupt,
    ) -> Result<Vec<(Self::Action, Self::Node)>, TaskError>;

    /// Is `node` an accepting node?
    fn is_goal(&self, node: &Self::Node) -> bool;
}

/// Scores complete paths.
pub trait PathEvaluator<N, A>: Send {
    type Value: Score;

    /// Evaluate a path from the root to a goal node, or to a node without
    /// successors.
    fn evaluate(
        &self,
        path: &SearchPath<N, A>,
        interrupt: &Interrupt,
    ) -> Result<Self::Value, TaskError>;
}

/// Adapter turning a closure into a [`PathEvaluator`].
///
/// ```
/// use anytime_mcts::core::{SearchPath, TaskError};
/// use anytime_mcts::lifecycle::Interrupt;
/// use anytime_mcts::problem::{FnEvaluator, PathEvaluator};
///
/// let length = FnEvaluator::new(|path: &SearchPath<u32, u32>, _: &Interrupt| {
///     Ok::<_, TaskError>(path.len() as f64)
/// });
/// let mut path = SearchPath::root(0);
/// path.extend(1, 1);
/// assert_eq!(length.evaluate(&path, &Interrupt::current()).unwrap(), 1.0);
/// ```
pub struct FnEvaluator<F> {
    f: F,
}

impl<F> FnEvaluator<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<N, A, V, F> PathEvaluator<N, A> for FnEvaluator<F>
where
    V: Score,
    F: Fn(&SearchPath<N, A>, &Interrupt) -> Result<V, TaskError> + Send,
{
    type Value = V;

    fn evaluate(&self, path: &SearchPath<N, A>, interrupt: &Interrupt) -> Result<V, TaskError> {
        (self.f)(path, interrupt)
    }
}
