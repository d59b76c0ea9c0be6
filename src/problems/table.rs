//! Explicit adjacency-table problem.

use std::time::Duration;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::core::{SearchPath, TaskError};
use crate::lifecycle::Interrupt;
use crate::problem::{ActionType, NodeType, PathEvaluator, SearchProblem};

/// Search problem backed by an adjacency table.
///
/// Nodes without table entries have no successors. Goal nodes carry the
/// value [`TableEvaluator`] reports for paths ending in them.
#[derive(Clone, Debug)]
pub struct TableProblem<N, A> {
    root: N,
    edges: FxHashMap<N, Vec<(A, N)>>,
    goals: FxHashMap<N, f64>,
    failing: FxHashSet<N>,
    latency: Option<Duration>,
}

/// Builder for creating a TableProblem.
#[derive(Clone, Debug)]
pub struct TableProblemBuilder<N, A> {
    problem: TableProblem<N, A>,
}

impl<N: NodeType, A: ActionType> TableProblem<N, A> {
    pub fn builder(root: N) -> TableProblemBuilder<N, A> {
        TableProblemBuilder {
            problem: TableProblem {
                root,
                edges: FxHashMap::default(),
                goals: FxHashMap::default(),
                failing: FxHashSet::default(),
                latency: None,
            },
        }
    }

    /// Value of a goal node.
    #[must_use]
    pub fn goal_value(&self, node: &N) -> Option<f64> {
        self.goals.get(node).copied()
    }

    /// Number of goal nodes.
    #[must_use]
    pub fn goal_count(&self) -> usize {
        self.goals.len()
    }
}

impl<N: NodeType, A: ActionType> TableProblemBuilder<N, A> {
    /// Add an edge. Edges leaving a node keep their insertion order.
    pub fn edge(mut self, from: N, action: A, to: N) -> Self {
        self.problem.edges.entry(from).or_default().push((action, to));
        self
    }

    /// Mark a node as a goal with the given value.
    pub fn goal(mut self, node: N, value: f64) -> Self {
        self.problem.goals.insert(node, value);
        self
    }

    /// Make successor generation fail for a node.
    pub fn failing(mut self, node: N) -> Self {
        self.problem.failing.insert(node);
        self
    }

    /// Delay every successor generation call.
    pub fn latency(mut self, latency: Duration) -> Self {
        self.problem.latency = Some(latency);
        self
    }

    pub fn build(self) -> TableProblem<N, A> {
        self.problem
    }
}

impl<N: NodeType, A: ActionType> SearchProblem for TableProblem<N, A> {
    type Node = N;
    type Action = A;

    fn generate_root(&self) -> N {
        self.root.clone()
    }

    fn generate_successors(
        &self,
        node: &N,
        interrupt: &Interrupt,
    ) -> Result<Vec<(A, N)>, TaskError> {
        if let Some(latency) = self.latency {
            interrupt.sleep(latency)?;
        }
        interrupt.check()?;
        if self.failing.contains(node) {
            return Err(TaskError::failed(format!("no successors for {node:?}")));
        }
        Ok(self.edges.get(node).cloned().unwrap_or_default())
    }

    fn is_goal(&self, node: &N) -> bool {
        self.goals.contains_key(node)
    }
}

/// Scores a path by the value of its goal node.
///
/// Fails for paths ending anywhere else, and for goals registered with
/// [`TableEvaluator::failing`].
#[derive(Clone, Debug)]
pub struct TableEvaluator<N> {
    values: FxHashMap<N, f64>,
    failing: FxHashSet<N>,
}

impl<N: NodeType> TableEvaluator<N> {
    pub fn new(values: FxHashMap<N, f64>) -> Self {
        Self {
            values,
            failing: FxHashSet::default(),
        }
    }

    /// Make evaluation fail for paths ending in `node`.
    pub fn failing(mut self, node: N) -> Self {
        self.failing.insert(node);
        self
    }
}

impl<N: NodeType, A: ActionType> From<&TableProblem<N, A>> for TableEvaluator<N> {
    fn from(problem: &TableProblem<N, A>) -> Self {
        Self::new(problem.goals.clone())
    }
}

impl<N: NodeType, A> PathEvaluator<N, A> for TableEvaluator<N> {
    type Value = f64;

    fn evaluate(&self, path: &SearchPath<N, A>, interrupt: &Interrupt) -> Result<f64, TaskError> {
        interrupt.check()?;
        let head = path.head();
        if self.failing.contains(head) {
            return Err(TaskError::failed(format!("cannot score path to {head:?}")));
        }
        self.values
            .get(head)
            .copied()
            .ok_or_else(|| TaskError::failed(format!("{head:?} has no value")))
    }
}
