//! Arena-based exploration graph.
//!
//! Nodes live in a flat `Vec<GraphNode>` referenced by `NodeId` indices, with
//! a hash index from caller node values back to the id of their first
//! occurrence. The graph is grown only by expansion, which records all edges
//! of a node in one step, and it stays a tree: every node except the root
//! has exactly one parent.
//!
//! The problem graph itself need not be a tree. A value reached again from
//! another parent (or along another edge) is recorded as a new occurrence
//! with its own id, so occurrences are told apart by id, never by value.

use std::hash::Hash;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::node::{Edge, GraphNode, NodeId};
use crate::core::{Result, SearchError, SearchPath};

/// Arena-based exploration graph.
#[derive(Clone, Debug)]
pub struct ExplorationGraph<N, A> {
    /// All nodes in discovery order.
    nodes: Vec<GraphNode<N, A>>,

    /// Reverse index from node value to the id of its first occurrence.
    index: FxHashMap<N, NodeId>,
}

impl<N, A> Default for ExplorationGraph<N, A> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            index: FxHashMap::default(),
        }
    }
}

impl<N, A> ExplorationGraph<N, A>
where
    N: Clone + Eq + Hash + std::fmt::Debug,
    A: Clone + Eq + std::fmt::Debug,
{
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a graph with custom initial capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// The root node ID, `None` while the graph is empty.
    #[inline]
    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        (!self.nodes.is_empty()).then_some(NodeId::new(0))
    }

    /// Record a parentless node, returning its ID.
    ///
    /// The first node added becomes the root. Adding a value that is already
    /// present returns the existing ID.
    pub fn add_node(&mut self, state: N) -> NodeId {
        if let Some(&id) = self.index.get(&state) {
            return id;
        }
        self.alloc(GraphNode::root(state))
    }

    fn alloc(&mut self, node: GraphNode<N, A>) -> NodeId {
        let id = NodeId::new(self.nodes.len() as u32);
        self.index.entry(node.state.clone()).or_insert(id);
        self.nodes.push(node);
        id
    }

    /// Record a single edge `from --action--> to`, creating a new
    /// occurrence of `to`.
    ///
    /// Fails if `from` already has an edge labeled `action`.
    pub fn add_edge(&mut self, from: NodeId, action: A, to: N) -> Result<NodeId> {
        self.check_action(from, &action)?;
        Ok(self.push_edge(from, action, to))
    }

    fn check_action(&self, from: NodeId, action: &A) -> Result<()> {
        if self.get(from).edges.iter().any(|e| &e.action == action) {
            return Err(SearchError::Invariant(format!(
                "action {action:?} generated twice from {from}"
            )));
        }
        Ok(())
    }

    fn push_edge(&mut self, from: NodeId, action: A, to: N) -> NodeId {
        let depth = self.get(from).depth + 1;
        let child = self.alloc(GraphNode::new(to, from, depth));
        self.get_mut(from).edges.push(Edge { action, child });
        child
    }

    /// Record the complete successor set of an unexpanded node.
    ///
    /// All successors are validated before anything is recorded, so on
    /// error the graph is left unchanged and the node stays unexpanded.
    /// Returns the new child ids in generation order.
    pub fn expand(&mut self, from: NodeId, successors: Vec<(A, N)>) -> Result<Vec<NodeId>> {
        if self.get(from).expanded {
            return Err(SearchError::Invariant(format!("{from} expanded twice")));
        }
        for (i, (action, _)) in successors.iter().enumerate() {
            self.check_action(from, action)?;
            if successors[..i].iter().any(|(a, _)| a == action) {
                return Err(SearchError::Invariant(format!(
                    "action {action:?} generated twice from {from}"
                )));
            }
        }

        let children = successors
            .into_iter()
            .map(|(action, to)| self.push_edge(from, action, to))
            .collect();
        self.get_mut(from).expanded = true;
        Ok(children)
    }

    /// Outgoing edges of `id`, `None` while it is unexpanded.
    #[must_use]
    pub fn successors_of(&self, id: NodeId) -> Option<&[Edge<A>]> {
        let node = self.get(id);
        node.expanded.then_some(node.edges.as_slice())
    }

    /// Child ids of `id` in generation order (empty while unexpanded).
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.get(id).children()
    }

    /// Label of the edge `from -> to`, if it exists.
    #[must_use]
    pub fn edge_label(&self, from: NodeId, to: NodeId) -> Option<&A> {
        self.get(from)
            .edges
            .iter()
            .find(|e| e.child == to)
            .map(|e| &e.action)
    }

    /// Unique parent of `id`, `None` for the root.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.get(id).parent;
        (!parent.is_none()).then_some(parent)
    }

    /// Get a node by ID.
    #[inline]
    #[must_use]
    pub fn get(&self, id: NodeId) -> &GraphNode<N, A> {
        &self.nodes[id.0 as usize]
    }

    #[inline]
    fn get_mut(&mut self, id: NodeId) -> &mut GraphNode<N, A> {
        &mut self.nodes[id.0 as usize]
    }

    /// The caller value stored at `id`.
    #[inline]
    #[must_use]
    pub fn state(&self, id: NodeId) -> &N {
        &self.get(id).state
    }

    /// Look up the ID of the first occurrence of a node value.
    #[must_use]
    pub fn id_of(&self, state: &N) -> Option<NodeId> {
        self.index.get(state).copied()
    }

    /// Has successor generation run for `id`?
    #[must_use]
    pub fn is_expanded(&self, id: NodeId) -> bool {
        self.get(id).expanded
    }

    /// Rebuild the labeled path for a sequence of node ids starting at the root.
    #[must_use]
    pub fn path_of(&self, ids: &[NodeId]) -> Option<SearchPath<N, A>> {
        let (&first, rest) = ids.split_first()?;
        let mut path = SearchPath::root(self.state(first).clone());
        let mut prev = first;
        for &id in rest {
            let action = self.edge_label(prev, id)?;
            path.extend(action.clone(), self.state(id).clone());
            prev = id;
        }
        Some(path)
    }

    /// Node ids from the root down to `id`.
    #[must_use]
    pub fn ids_to(&self, id: NodeId) -> Vec<NodeId> {
        let mut ids = vec![id];
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            ids.push(parent);
            current = parent;
        }
        ids.reverse();
        ids
    }

    /// Number of nodes in the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the graph is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over all nodes.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &GraphNode<N, A>)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId::new(i as u32), n))
    }

    /// Get statistics about the graph.
    #[must_use]
    pub fn stats(&self) -> GraphStats {
        let max_depth = self.nodes.iter().map(|n| n.depth).max().unwrap_or(0);
        let expanded_count = self.nodes.iter().filter(|n| n.expanded).count();
        let leaf_count = self
            .nodes
            .iter()
            .filter(|n| n.expanded && n.edges.is_empty())
            .count();
        let edge_count: usize = self.nodes.iter().map(|n| n.edges.len()).sum();

        GraphStats {
            node_count: self.nodes.len(),
            edge_count,
            expanded_count,
            leaf_count,
            max_depth,
        }
    }
}

/// Statistics about the exploration graph.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    /// Total number of nodes.
    pub node_count: usize,

    /// Total number of edges.
    pub edge_count: usize,

    /// Nodes whose successors have been generated.
    pub expanded_count: usize,

    /// Expanded nodes without successors.
    pub leaf_count: usize,

    /// Maximum depth reached.
    pub max_depth: u32,
}

impl GraphStats {
    /// Average number of successors per expanded node.
    #[must_use]
    pub fn branching_factor(&self) -> f64 {
        if self.expanded_count == 0 {
            0.0
        } else {
            self.edge_count as f64 / self.expanded_count as f64
        }
    }

    /// Fraction of nodes that have been expanded.
    #[must_use]
    pub fn expansion_ratio(&self) -> f64 {
        if self.node_count == 0 {
            0.0
        } else {
            self.expanded_count as f64 / self.node_count as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> (ExplorationGraph<&'static str, char>, NodeId) {
        let mut graph = ExplorationGraph::new();
        let root = graph.add_node("root");
        (graph, root)
    }

    #[test]
    fn test_graph_new() {
        let graph: ExplorationGraph<u32, u32> = ExplorationGraph::new();
        assert!(graph.is_empty());
        assert_eq!(graph.root(), None);

        let (graph, root) = seeded();
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.root(), Some(root));
        assert_eq!(graph.parent(root), None);
        assert_eq!(graph.successors_of(root), None);
    }

    #[test]
    fn test_add_node_is_idempotent() {
        let (mut graph, root) = seeded();
        assert_eq!(graph.add_node("root"), root);
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_expand_records_edges() {
        let (mut graph, root) = seeded();
        let children = graph.expand(root, vec![('a', "x"), ('b', "y")]).unwrap();

        assert_eq!(children.len(), 2);
        assert!(graph.is_expanded(root));
        assert_eq!(graph.successors_of(root).map(<[_]>::len), Some(2));
        assert_eq!(graph.edge_label(root, children[1]), Some(&'b'));
        assert_eq!(graph.parent(children[0]), Some(root));
        assert_eq!(graph.get(children[0]).depth, 1);
        assert_eq!(graph.id_of(&"y"), Some(children[1]));
        assert_eq!(graph.children(root).collect::<Vec<_>>(), children);
    }

    #[test]
    fn test_expand_without_successors() {
        let (mut graph, root) = seeded();
        assert!(graph.expand(root, vec![]).unwrap().is_empty());
        assert_eq!(graph.successors_of(root), Some(&[][..]));
    }

    #[test]
    fn test_duplicate_action_rejected_atomically() {
        let (mut graph, root) = seeded();
        let err = graph
            .expand(root, vec![('a', "x"), ('a', "y")])
            .unwrap_err();

        assert!(matches!(err, SearchError::Invariant(_)));
        assert_eq!(graph.len(), 1);
        assert!(!graph.is_expanded(root));
    }

    #[test]
    fn test_shared_successor_gets_own_id() {
        // root -a-> x -c-> z, root -b-> y -d-> z
        let (mut graph, root) = seeded();
        let children = graph.expand(root, vec![('a', "x"), ('b', "y")]).unwrap();
        let first = graph.expand(children[0], vec![('c', "z")]).unwrap()[0];
        let second = graph.expand(children[1], vec![('d', "z")]).unwrap()[0];

        assert_ne!(first, second);
        assert_eq!(graph.state(first), graph.state(second));
        assert_eq!(graph.parent(first), Some(children[0]));
        assert_eq!(graph.parent(second), Some(children[1]));
        assert_eq!(graph.id_of(&"z"), Some(first));

        let path = graph.path_of(&graph.ids_to(second)).unwrap();
        assert_eq!(path.actions(), &['b', 'd']);
    }

    #[test]
    fn test_parallel_edges_and_cycles() {
        let (mut graph, root) = seeded();
        let children = graph.expand(root, vec![('a', "x"), ('b', "x")]).unwrap();
        assert_ne!(children[0], children[1]);
        assert_eq!(graph.edge_label(root, children[1]), Some(&'b'));

        // Returning to the root value creates a fresh occurrence below x.
        let back = graph.add_edge(children[0], 'r', "root").unwrap();
        assert_ne!(back, root);
        assert_eq!(graph.get(back).depth, 2);
        assert_eq!(graph.id_of(&"root"), Some(root));
        assert_eq!(graph.add_node("root"), root);
    }

    #[test]
    fn test_expand_twice_rejected() {
        let (mut graph, root) = seeded();
        graph.expand(root, vec![('a', "x")]).unwrap();
        assert!(graph.expand(root, vec![('b', "y")]).is_err());
    }

    #[test]
    fn test_add_edge() {
        let (mut graph, root) = seeded();
        let x = graph.add_edge(root, 'a', "x").unwrap();
        assert_eq!(graph.edge_label(root, x), Some(&'a'));
        assert!(graph.add_edge(root, 'a', "z").is_err());
    }

    #[test]
    fn test_paths() {
        let (mut graph, root) = seeded();
        let x = graph.expand(root, vec![('a', "x")]).unwrap()[0];
        let y = graph.expand(x, vec![('b', "y")]).unwrap()[0];

        let ids = graph.ids_to(y);
        assert_eq!(ids, vec![root, x, y]);

        let path = graph.path_of(&ids).unwrap();
        assert_eq!(path.nodes(), &["root", "x", "y"]);
        assert_eq!(path.actions(), &['a', 'b']);

        // Not a chain of edges.
        assert!(graph.path_of(&[root, y]).is_none());
        assert!(graph.path_of(&[]).is_none());
    }

    #[test]
    fn test_graph_stats() {
        let (mut graph, root) = seeded();
        let children = graph.expand(root, vec![('a', "x"), ('b', "y")]).unwrap();
        graph.expand(children[0], vec![]).unwrap();

        let stats = graph.stats();
        assert_eq!(stats.node_count, 3);
        assert_eq!(stats.edge_count, 2);
        assert_eq!(stats.expanded_count, 2);
        assert_eq!(stats.leaf_count, 1);
        assert_eq!(stats.max_depth, 1);
        assert_eq!(stats.branching_factor(), 1.0);

        let json = serde_json::to_string(&stats).unwrap();
        let deserialized: GraphStats = serde_json::from_str(&json).unwrap();
        assert_eq!(stats, deserialized);
    }
}
