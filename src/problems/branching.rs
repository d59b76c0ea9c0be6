//! Effectively infinite tree with a fixed branching factor.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{SearchPath, TaskError};
use crate::lifecycle::Interrupt;
use crate::problem::{PathEvaluator, SearchProblem};

/// Node of a [`BranchingProblem`].
///
/// Ids are handed out by the problem, so every generated node is distinct.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BranchNode {
    pub id: u64,
    pub depth: u32,
}

/// Tree where every node has `branching` children.
///
/// Without a goal depth the tree never ends, so a search over it only stops
/// through timeout or cancellation.
#[derive(Debug)]
pub struct BranchingProblem {
    branching: u32,
    goal_depth: Option<u32>,
    latency: Option<Duration>,
    next_id: AtomicU64,
    calls: AtomicUsize,
}

impl BranchingProblem {
    /// Create an endless tree with the given branching factor (at least 1).
    pub fn new(branching: u32) -> Self {
        Self {
            branching: branching.max(1),
            goal_depth: None,
            latency: None,
            next_id: AtomicU64::new(1),
            calls: AtomicUsize::new(0),
        }
    }

    /// Make every node at `depth` a goal (and a leaf).
    pub fn with_goal_depth(mut self, depth: u32) -> Self {
        self.goal_depth = Some(depth);
        self
    }

    /// Delay every successor generation call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of successor generation calls started so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl SearchProblem for BranchingProblem {
    type Node = BranchNode;
    type Action = u32;

    fn generate_root(&self) -> BranchNode {
        BranchNode { id: 0, depth: 0 }
    }

    fn generate_successors(
        &self,
        node: &BranchNode,
        interrupt: &Interrupt,
    ) -> Result<Vec<(u32, BranchNode)>, TaskError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if let Some(latency) = self.latency {
            interrupt.sleep(latency)?;
        }
        interrupt.check()?;

        if self.goal_depth.is_some_and(|depth| node.depth >= depth) {
            return Ok(vec![]);
        }
        let first = self
            .next_id
            .fetch_add(u64::from(self.branching), Ordering::Relaxed);
        Ok((0..self.branching)
            .map(|i| {
                let child = BranchNode {
                    id: first + u64::from(i),
                    depth: node.depth + 1,
                };
                (i, child)
            })
            .collect())
    }

    fn is_goal(&self, node: &BranchNode) -> bool {
        self.goal_depth == Some(node.depth)
    }
}

/// Scores a path by the actions taken, read as digits: paths that keep
/// choosing higher-numbered children score higher.
#[derive(Clone, Copy, Debug, Default)]
pub struct DepthEvaluator;

impl PathEvaluator<BranchNode, u32> for DepthEvaluator {
    type Value = f64;

    fn evaluate(
        &self,
        path: &SearchPath<BranchNode, u32>,
        interrupt: &Interrupt,
    ) -> Result<f64, TaskError> {
        interrupt.check()?;
        let mut scale = 1.0;
        let mut value = 0.0;
        for &action in path.actions() {
            scale /= 10.0;
            value += f64::from(action) * scale;
        }
        Ok(value)
    }
}
