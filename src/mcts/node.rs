//! Exploration graph nodes, edges and per-node policy labels.
//!
//! Uses arena-based allocation with index references (NodeId) so the engine's
//! bookkeeping sets and caches never clone caller node values.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Index into the exploration graph's node arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Sentinel value representing no node.
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Create a new node ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Check if this is the NONE sentinel.
    #[inline]
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }

    /// Get the raw index value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_none() {
            write!(f, "NodeId(NONE)")
        } else {
            write!(f, "NodeId({})", self.0)
        }
    }
}

/// Labeled edge to a child node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Edge<A> {
    /// The action this edge represents.
    pub action: A,

    /// Node reached by the action.
    pub child: NodeId,
}

/// A node of the exploration graph.
#[derive(Clone, Debug)]
pub struct GraphNode<N, A> {
    /// Caller-defined node value.
    pub state: N,

    /// Parent node (NONE for root).
    pub parent: NodeId,

    /// Depth in graph (root = 0).
    pub depth: u32,

    /// Whether successor generation has run for this node.
    pub expanded: bool,

    /// Outgoing edges in generation order.
    /// SmallVec optimizes for typical branching factor < 8.
    pub edges: SmallVec<[Edge<A>; 8]>,
}

impl<N, A> GraphNode<N, A> {
    /// Create a new, unexpanded node.
    pub fn new(state: N, parent: NodeId, depth: u32) -> Self {
        Self {
            state,
            parent,
            depth,
            expanded: false,
            edges: SmallVec::new(),
        }
    }

    /// Create a root node.
    pub fn root(state: N) -> Self {
        Self::new(state, NodeId::NONE, 0)
    }

    /// Child ids in generation order.
    pub fn children(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.edges.iter().map(|e| e.child)
    }
}

/// Visit statistics a tree policy keeps for one node.
///
/// Created on first visit, updated on every later visit, never deleted.
/// Uses Welford's algorithm for a numerically stable variance.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeLabel {
    /// Number of playouts through this node.
    pub visits: u32,

    /// Sum of all values folded in.
    pub total: f64,

    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl NodeLabel {
    /// Fold one playout value into the statistics.
    pub fn record(&mut self, value: f64) {
        self.visits += 1;
        self.total += value;
        if self.visits == 1 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        let delta = value - self.mean;
        self.mean += delta / self.visits as f64;
        self.m2 += delta * (value - self.mean);
    }

    /// Mean value (0 when unvisited).
    #[must_use]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample variance (0 with fewer than two visits).
    #[must_use]
    pub fn variance(&self) -> f64 {
        if self.visits < 2 {
            0.0
        } else {
            self.m2 / (self.visits - 1) as f64
        }
    }

    /// Smallest value seen, `None` when unvisited.
    #[must_use]
    pub fn min(&self) -> Option<f64> {
        (self.visits > 0).then_some(self.min)
    }

    /// Largest value seen, `None` when unvisited.
    #[must_use]
    pub fn max(&self) -> Option<f64> {
        (self.visits > 0).then_some(self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id() {
        let id = NodeId::new(5);
        assert_eq!(id.raw(), 5);
        assert!(!id.is_none());
        assert_eq!(format!("{}", id), "NodeId(5)");

        assert!(NodeId::NONE.is_none());
        assert_eq!(format!("{}", NodeId::NONE), "NodeId(NONE)");
    }

    #[test]
    fn test_node_root() {
        let node: GraphNode<&str, u8> = GraphNode::root("start");

        assert!(node.parent.is_none());
        assert_eq!(node.depth, 0);
        assert!(!node.expanded);
        assert!(node.edges.is_empty());
    }

    #[test]
    fn test_children_in_generation_order() {
        let mut node: GraphNode<&str, char> = GraphNode::root("start");
        node.edges.push(Edge { action: 'b', child: NodeId::new(2) });
        node.edges.push(Edge { action: 'a', child: NodeId::new(1) });

        let children: Vec<_> = node.children().collect();
        assert_eq!(children, vec![NodeId::new(2), NodeId::new(1)]);
    }

    #[test]
    fn test_label_statistics() {
        let mut label = NodeLabel::default();
        assert_eq!(label.mean(), 0.0);
        assert_eq!(label.min(), None);

        for value in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            label.record(value);
        }

        assert_eq!(label.visits, 8);
        assert_eq!(label.total, 40.0);
        assert!((label.mean() - 5.0).abs() < 1e-12);
        assert!((label.variance() - 32.0 / 7.0).abs() < 1e-12);
        assert_eq!(label.min(), Some(2.0));
        assert_eq!(label.max(), Some(9.0));
    }

    #[test]
    fn test_label_serialization() {
        let mut label = NodeLabel::default();
        label.record(0.25);

        let json = serde_json::to_string(&label).unwrap();
        let deserialized: NodeLabel = serde_json::from_str(&json).unwrap();

        assert_eq!(label, deserialized);
    }
}
