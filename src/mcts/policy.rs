//! MCTS policies for selection and simulation.
//!
//! Policies are trait-based to allow customization:
//! - `TreePolicy`: How to choose among visited successors during selection,
//!   and how to learn from finished playouts (UCB1)
//! - `DefaultPolicy`: How to pick successors while expanding and simulating
//!   (uniform random)
//!
//! Both receive the parent node and its candidate children in generation
//! order and return an index into that slice. The engine rejects indices
//! that are out of range.

use rustc_hash::FxHashMap;

use crate::core::{BoxError, SearchRng};

use super::node::{NodeId, NodeLabel};

// =============================================================================
// Tree Policy
// =============================================================================

/// Policy used while descending through already visited nodes.
pub trait TreePolicy: Send {
    /// Choose one of `children` (all successors of `parent`).
    ///
    /// Returns an index into `children`.
    fn select(&mut self, parent: NodeId, children: &[NodeId]) -> Result<usize, BoxError>;

    /// Fold a playout value into every node of `path`.
    fn update_path(&mut self, path: &[NodeId], value: f64);

    /// Statistics recorded for `node`, if the policy keeps any.
    fn label(&self, _node: NodeId) -> Option<&NodeLabel> {
        None
    }
}

/// UCB1 (Upper Confidence Bound) tree policy.
///
/// Balances exploitation (high mean) with exploration (low visits).
/// Formula: mean(n) + sign * c * sqrt(ln(N) / n), with `sign = -1` when
/// minimizing, where the best score is then the lowest.
///
/// Children that were never labeled are tried first. Ties go to the child
/// generated first.
#[derive(Clone, Debug)]
pub struct UCB1 {
    maximize: bool,
    exploration: f64,
    labels: FxHashMap<NodeId, NodeLabel>,
}

impl UCB1 {
    pub fn new(maximize: bool, exploration: f64) -> Self {
        Self {
            maximize,
            exploration,
            labels: FxHashMap::default(),
        }
    }

    /// Number of labeled nodes.
    #[must_use]
    pub fn labeled_count(&self) -> usize {
        self.labels.len()
    }

    fn score(&self, label: &NodeLabel, ln_parent: f64) -> f64 {
        let bonus = self.exploration * (ln_parent / label.visits as f64).sqrt();
        if self.maximize {
            label.mean() + bonus
        } else {
            label.mean() - bonus
        }
    }

    fn better(&self, candidate: f64, best: f64) -> bool {
        if self.maximize {
            candidate > best
        } else {
            candidate < best
        }
    }
}

impl TreePolicy for UCB1 {
    fn select(&mut self, parent: NodeId, children: &[NodeId]) -> Result<usize, BoxError> {
        if children.is_empty() {
            return Err(format!("no successors offered at {parent}").into());
        }

        let mut labels = Vec::with_capacity(children.len());
        for (i, child) in children.iter().enumerate() {
            match self.labels.get(child) {
                Some(label) if label.visits > 0 => labels.push(label),
                _ => return Ok(i),
            }
        }

        let parent_visits = match self.labels.get(&parent) {
            Some(label) => label.visits,
            None => labels.iter().map(|l| l.visits).sum(),
        };
        let ln_parent = (parent_visits.max(1) as f64).ln();

        let mut best = 0;
        let mut best_score = self.score(labels[0], ln_parent);
        for (i, label) in labels.iter().enumerate().skip(1) {
            let score = self.score(label, ln_parent);
            if best_score.is_nan() || self.better(score, best_score) {
                best = i;
                best_score = score;
            }
        }
        Ok(best)
    }

    fn update_path(&mut self, path: &[NodeId], value: f64) {
        for &node in path {
            self.labels.entry(node).or_default().record(value);
        }
    }

    fn label(&self, node: NodeId) -> Option<&NodeLabel> {
        self.labels.get(&node)
    }
}

// =============================================================================
// Default Policy
// =============================================================================

/// Policy used while expanding and simulating.
pub trait DefaultPolicy: Send {
    /// Choose one of `children` (successors of `parent`).
    ///
    /// Returns an index into `children`.
    fn select(&mut self, parent: NodeId, children: &[NodeId]) -> Result<usize, BoxError>;
}

/// Uniform random default policy.
///
/// Same seed produces the same sequence of choices.
#[derive(Clone, Debug)]
pub struct UniformRandom {
    rng: SearchRng,
}

impl UniformRandom {
    pub fn new(rng: SearchRng) -> Self {
        Self { rng }
    }

    /// Create a policy from a seed.
    pub fn seeded(seed: u64) -> Self {
        Self::new(SearchRng::new(seed).for_context("default-policy"))
    }
}

impl DefaultPolicy for UniformRandom {
    fn select(&mut self, parent: NodeId, children: &[NodeId]) -> Result<usize, BoxError> {
        if children.is_empty() {
            return Err(format!("no successors offered at {parent}").into());
        }
        Ok(self.rng.gen_range_usize(0..children.len()))
    }
}

/// Default policy that always takes the first offered successor.
///
/// Useful for deterministic depth-first style searches.
#[derive(Clone, Copy, Debug, Default)]
pub struct FirstChild;

impl DefaultPolicy for FirstChild {
    fn select(&mut self, parent: NodeId, children: &[NodeId]) -> Result<usize, BoxError> {
        if children.is_empty() {
            return Err(format!("no successors offered at {parent}").into());
        }
        Ok(0)
    }
}
