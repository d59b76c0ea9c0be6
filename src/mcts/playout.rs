//! One MCTS playout: selection, expansion, simulation.
//!
//! Also owns the node classification bookkeeping. A node moves out of
//! `unexpanded` exactly once, when its successors are recorded. The
//! `dead_ends` and `fully_explored` sets only ever grow:
//!
//! - a node is a dead end once it is expanded and every successor is a dead
//!   end (so a node without successors is one immediately)
//! - a node is fully explored once it is expanded and every successor is
//!   fully explored or a dead end; reached goals are fully explored
//!
//! Both properties are propagated towards the root as soon as they change.

use tracing::trace;

use crate::core::{AlgorithmEvent, NodeState, Result, SearchError};
use crate::problem::{PathEvaluator, SearchProblem};

use super::node::NodeId;
use super::search::MCTSSearch;

/// Outcome of a single playout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) enum Playout {
    /// A path from the root to a goal (or to a dead end when `goal` is false).
    Complete { path: Vec<NodeId>, goal: bool },

    /// Nothing selectable is left below the root.
    Exhausted,
}

impl<P, E> MCTSSearch<P, E>
where
    P: SearchProblem,
    E: PathEvaluator<P::Node, P::Action>,
{
    /// Compute one playout.
    ///
    /// Restarts from the root whenever it runs into ground that turned out
    /// to be explored; every restart is preceded by new closed nodes, so the
    /// loop makes progress. Termination checkpoints run before each pass and
    /// at every simulation step; a terminated playout leaves no trace in the
    /// score cache.
    pub(super) fn playout(&mut self) -> Result<Playout> {
        let root = self.root;
        if self.is_goal(root) {
            self.reach_goal(root);
            return Ok(Playout::Complete {
                path: vec![root],
                goal: true,
            });
        }

        'playout: loop {
            self.lifecycle.check_and_conduct_termination()?;
            let mut path = vec![root];
            let mut current = root;

            // === SELECTION ===
            while !self.unexpanded.contains(&current) {
                let viable = self.viable_children(current);
                if viable.is_empty() {
                    self.close(current);
                    path.pop();
                    match path.last() {
                        Some(&parent) => {
                            current = parent;
                            continue;
                        }
                        None => return Ok(Playout::Exhausted),
                    }
                }
                if viable.iter().any(|child| !self.visited.contains(child)) {
                    break;
                }

                let child = self.select_with_tree_policy(current, &viable)?;
                path.push(child);
                current = child;
                self.publish_node(child, NodeState::InRollout);
                if self.is_goal(child) {
                    return Ok(Playout::Complete { path, goal: true });
                }
            }

            // === EXPANSION ===
            if self.unexpanded.contains(&current) {
                self.expand(current)?;
            }
            let fresh: Vec<NodeId> = self
                .viable_children(current)
                .into_iter()
                .filter(|child| !self.visited.contains(child))
                .collect();
            if fresh.is_empty() {
                self.close(current);
                if current == root {
                    return Ok(Playout::Exhausted);
                }
                self.stats.restarts += 1;
                continue 'playout;
            }

            let child = self.select_with_default_policy(current, &fresh)?;
            self.visited.insert(child);
            path.push(child);
            current = child;
            self.publish_node(child, NodeState::InRollout);

            // === SIMULATION ===
            loop {
                self.lifecycle.check_and_conduct_termination()?;
                if self.is_goal(current) {
                    self.reach_goal(current);
                    return Ok(Playout::Complete { path, goal: true });
                }
                if self.unexpanded.contains(&current) {
                    self.expand(current)?;
                }

                let next = self.viable_children(current);
                if next.is_empty() {
                    if self.all_children_dead(current) {
                        self.mark_dead_end(current);
                        self.propagate_fully_explored(current);
                        return Ok(Playout::Complete { path, goal: false });
                    }
                    // Only explored successors left.
                    self.propagate_fully_explored(current);
                    self.stats.restarts += 1;
                    continue 'playout;
                }

                let child = self.select_with_default_policy(current, &next)?;
                path.push(child);
                current = child;
                self.publish_node(child, NodeState::InRollout);
            }
        }
    }

    /// Generate and record the successors of an unexpanded node.
    fn expand(&mut self, id: NodeId) -> Result<()> {
        let state = self.graph.state(id);
        let problem = &self.problem;
        let successors = self
            .lifecycle
            .compute_timeout_aware(|interrupt| problem.generate_successors(state, interrupt))?;

        let children = self.graph.expand(id, successors)?;
        self.unexpanded.remove(&id);
        self.unexpanded.extend(children.iter().copied());
        self.stats.expansions += 1;
        trace!(node = %id, successors = children.len(), "expanded");

        for child in children {
            self.publish_node(child, NodeState::Added);
        }
        Ok(())
    }

    /// Successors that may still be chosen: not dead ends, and not fully
    /// explored when duplicate paths are forbidden.
    fn viable_children(&self, id: NodeId) -> Vec<NodeId> {
        let forbid = self.config.forbid_double_paths;
        self.graph
            .children(id)
            .filter(|child| {
                !self.dead_ends.contains(child)
                    && !(forbid && self.fully_explored.contains(child))
            })
            .collect()
    }

    fn select_with_tree_policy(&mut self, parent: NodeId, children: &[NodeId]) -> Result<NodeId> {
        let choice = self
            .tree_policy
            .select(parent, children)
            .map_err(|err| SearchError::ActionSelection(err.to_string()))?;
        Self::chosen(parent, children, choice)
    }

    fn select_with_default_policy(
        &mut self,
        parent: NodeId,
        children: &[NodeId],
    ) -> Result<NodeId> {
        let choice = self
            .default_policy
            .select(parent, children)
            .map_err(|err| SearchError::ActionSelection(err.to_string()))?;
        Self::chosen(parent, children, choice)
    }

    fn chosen(parent: NodeId, children: &[NodeId], choice: usize) -> Result<NodeId> {
        children.get(choice).copied().ok_or_else(|| {
            SearchError::ActionSelection(format!(
                "policy chose index {choice} of {} successors at {parent}",
                children.len()
            ))
        })
    }

    fn is_goal(&self, id: NodeId) -> bool {
        self.problem.is_goal(self.graph.state(id))
    }

    fn is_closed(&self, id: NodeId) -> bool {
        self.dead_ends.contains(&id) || self.fully_explored.contains(&id)
    }

    fn all_children_dead(&self, id: NodeId) -> bool {
        self.graph.is_expanded(id)
            && self
                .graph
                .children(id)
                .all(|child| self.dead_ends.contains(&child))
    }

    /// Close a node that has nothing selectable left.
    fn close(&mut self, id: NodeId) {
        if self.all_children_dead(id) {
            self.mark_dead_end(id);
        }
        self.propagate_fully_explored(id);
    }

    /// Record a reached goal. Goals are never expanded.
    fn reach_goal(&mut self, id: NodeId) {
        self.unexpanded.remove(&id);
        self.fully_explored.insert(id);
        self.propagate_fully_explored(id);
    }

    /// Mark `id` dead, then every ancestor whose successors are all dead.
    fn mark_dead_end(&mut self, id: NodeId) {
        let mut next = Some(id);
        while let Some(current) = next {
            if !self.dead_ends.insert(current) {
                break;
            }
            trace!(node = %current, "dead end");
            self.publish_node(current, NodeState::Closed);
            next = self
                .graph
                .parent(current)
                .filter(|&parent| self.all_children_dead(parent));
        }
    }

    /// Walk up from `id`, marking nodes whose successors are all closed.
    fn propagate_fully_explored(&mut self, id: NodeId) {
        let mut next = Some(id);
        while let Some(current) = next {
            if !self.fully_explored.contains(&current) {
                let complete = self.graph.is_expanded(current)
                    && self
                        .graph
                        .children(current)
                        .all(|child| self.is_closed(child));
                if !complete {
                    break;
                }
                self.fully_explored.insert(current);
                self.publish_node(current, NodeState::Exhausted);
            }
            next = self.graph.parent(current);
        }
    }

    pub(super) fn publish_node(&mut self, id: NodeId, state: NodeState) {
        if self.observers.is_empty() {
            return;
        }
        let node = self.graph.state(id).clone();
        self.observers
            .publish(&AlgorithmEvent::NodeStateChanged { node, state });
    }
}
