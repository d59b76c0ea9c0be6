//! Anytime MCTS path search.
//!
//! [`MCTSSearch`] searches for goal paths in a graph described by a
//! [`SearchProblem`], scoring complete paths with a [`PathEvaluator`]. It is
//! driven one step at a time through [`MCTSSearch::next_event`]; each step
//! runs at most one playout and returns a tagged [`AlgorithmEvent`].
//!
//! ## Step Semantics
//!
//! - First step: activate the lifecycle, generate the root, `Initialized`
//! - Every later step: checkpoint, then either `Finished { Exhausted }` or
//!   one playout reported as `SolutionFound` / `RolloutCompleted`
//! - Once inactive: [`SearchError::NoSuchElement`]
//!
//! Termination signals (timeout, cancellation, interruption) come back as
//! errors after the lifecycle has shut down. Solutions found so far stay
//! available through [`MCTSSearch::best_solution`].

use std::time::Instant;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, info, trace, warn};

use crate::core::{
    AlgorithmEvent, FinishReason, NodeState, Observer, ObserverList, Result, Score, SearchError,
    SearchPath, Solution,
};
use crate::lifecycle::{AlgorithmState, CancelHandle, Lifecycle};
use crate::problem::{PathEvaluator, SearchProblem};

use super::config::MCTSConfig;
use super::graph::ExplorationGraph;
use super::node::{NodeId, NodeLabel};
use super::playout::Playout;
use super::policy::{DefaultPolicy, TreePolicy, UniformRandom, UCB1};
use super::stats::SearchStats;

/// Value type produced by the evaluator of a search.
pub type ValueOf<P, E> =
    <E as PathEvaluator<<P as SearchProblem>::Node, <P as SearchProblem>::Action>>::Value;

/// Event type produced by a search.
pub type SearchEvent<P, E> =
    AlgorithmEvent<<P as SearchProblem>::Node, <P as SearchProblem>::Action, ValueOf<P, E>>;

/// Solution type produced by a search.
pub type SearchSolution<P, E> =
    Solution<<P as SearchProblem>::Node, <P as SearchProblem>::Action, ValueOf<P, E>>;

/// Main MCTS search context.
///
/// Owns the exploration graph, the policies and all bookkeeping. Only the
/// lifecycle's cancellation state is shared with other threads.
pub struct MCTSSearch<P, E>
where
    P: SearchProblem,
    E: PathEvaluator<P::Node, P::Action>,
{
    /// The caller's search problem.
    pub(super) problem: P,

    /// Scores complete paths.
    evaluator: E,

    /// Search configuration.
    pub(super) config: MCTSConfig,

    /// Deadline, cancellation and shutdown.
    pub(super) lifecycle: Lifecycle,

    /// The explored part of the problem graph.
    pub(super) graph: ExplorationGraph<P::Node, P::Action>,

    /// Root node ID (NONE before initialization).
    pub(super) root: NodeId,

    /// Selection policy for visited nodes.
    pub(super) tree_policy: Box<dyn TreePolicy>,

    /// Expansion and simulation policy.
    pub(super) default_policy: Box<dyn DefaultPolicy>,

    /// Nodes whose successors have not been generated yet.
    pub(super) unexpanded: FxHashSet<NodeId>,

    /// Nodes picked by the default policy during expansion.
    pub(super) visited: FxHashSet<NodeId>,

    /// Nodes from which no goal can be reached.
    pub(super) dead_ends: FxHashSet<NodeId>,

    /// Nodes whose whole subtree has been explored.
    pub(super) fully_explored: FxHashSet<NodeId>,

    /// Values of every path scored so far, keyed by node ids.
    score_cache: FxHashMap<Vec<NodeId>, E::Value>,

    /// Solutions in the order they were found.
    solutions: Vec<SearchSolution<P, E>>,

    /// Index of the best solution.
    best: Option<usize>,

    /// Registered observers.
    pub(super) observers: ObserverList<SearchEvent<P, E>>,

    /// Search statistics.
    pub(super) stats: SearchStats,

    started: Option<Instant>,
}

impl<P, E> MCTSSearch<P, E>
where
    P: SearchProblem,
    E: PathEvaluator<P::Node, P::Action>,
{
    /// Create a new search with UCB1 selection and a seeded uniform random
    /// default policy.
    pub fn new(problem: P, evaluator: E, config: MCTSConfig) -> Self {
        let tree_policy = UCB1::new(config.maximize, config.exploration_constant);
        let default_policy = UniformRandom::seeded(config.seed);

        Self {
            problem,
            evaluator,
            lifecycle: Lifecycle::new(config.algorithm.clone()),
            config,
            graph: ExplorationGraph::with_capacity(1024),
            root: NodeId::NONE,
            tree_policy: Box::new(tree_policy),
            default_policy: Box::new(default_policy),
            unexpanded: FxHashSet::default(),
            visited: FxHashSet::default(),
            dead_ends: FxHashSet::default(),
            fully_explored: FxHashSet::default(),
            score_cache: FxHashMap::default(),
            solutions: Vec::new(),
            best: None,
            observers: ObserverList::new(),
            stats: SearchStats::default(),
            started: None,
        }
    }

    /// Set a custom tree policy.
    pub fn with_tree_policy<T: TreePolicy + 'static>(mut self, policy: T) -> Self {
        self.tree_policy = Box::new(policy);
        self
    }

    /// Set a custom default policy.
    pub fn with_default_policy<D: DefaultPolicy + 'static>(mut self, policy: D) -> Self {
        self.default_policy = Box::new(policy);
        self
    }

    /// Register an observer.
    pub fn with_observer<O: Observer<SearchEvent<P, E>> + 'static>(mut self, observer: O) -> Self {
        self.register_observer(observer);
        self
    }

    /// Register an observer. Observers see every event in order, including
    /// node state changes.
    pub fn register_observer<O: Observer<SearchEvent<P, E>> + 'static>(&mut self, observer: O) {
        self.observers.register(observer);
    }

    // =========================================================================
    // Driver
    // =========================================================================

    /// Advance the search by one step.
    pub fn next_event(&mut self) -> Result<SearchEvent<P, E>> {
        let outcome = match self.lifecycle.state() {
            AlgorithmState::Created => self.initialize(),
            AlgorithmState::Active => self.step(),
            AlgorithmState::Inactive => return Err(SearchError::NoSuchElement),
        };

        outcome.map_err(|err| {
            let reason = err
                .termination()
                .map_or(FinishReason::Failed, FinishReason::from);
            if reason == FinishReason::Failed {
                warn!(error = %err, "search failed");
            }
            self.finish(reason);
            err
        })
    }

    /// Run until the search finishes, returning the best solution found.
    ///
    /// Termination signals are returned as errors; the solutions found
    /// before them remain available.
    pub fn call(&mut self) -> Result<Option<SearchSolution<P, E>>> {
        loop {
            if self.next_event()?.is_finished() {
                break;
            }
        }
        Ok(self.best_solution().cloned())
    }

    fn initialize(&mut self) -> Result<SearchEvent<P, E>> {
        self.lifecycle.activate()?;
        self.started = Some(Instant::now());

        let root = self.graph.add_node(self.problem.generate_root());
        self.root = root;
        self.unexpanded.insert(root);
        debug!(timeout_ms = self.config.algorithm.timeout_ms, "search initialized");

        let event = self.emit(AlgorithmEvent::Initialized);
        self.publish_node(root, NodeState::Added);
        Ok(event)
    }

    fn step(&mut self) -> Result<SearchEvent<P, E>> {
        self.lifecycle.check_and_conduct_termination()?;
        if self.is_exhausted() {
            return Ok(self.finish(FinishReason::Exhausted));
        }

        let (ids, goal) = match self.playout()? {
            Playout::Complete { path, goal } => (path, goal),
            Playout::Exhausted => return Ok(self.finish(FinishReason::Exhausted)),
        };
        self.stats.playouts += 1;
        self.stats.max_depth = self.stats.max_depth.max(ids.len() as u32 - 1);

        let path = self.graph.path_of(&ids).ok_or_else(|| {
            SearchError::Invariant(format!("playout produced a broken path {ids:?}"))
        })?;

        let (value, fresh) = match self.score_cache.get(&ids) {
            Some(&value) => {
                if self.config.forbid_double_paths {
                    return Err(SearchError::Invariant(format!(
                        "path {:?} produced twice with duplicate-path avoidance enabled",
                        path.nodes()
                    )));
                }
                self.stats.cache_hits += 1;
                (value, false)
            }
            None => {
                if !goal {
                    self.stats.dead_end_playouts += 1;
                }
                let value = self.evaluate(&path)?;
                self.score_cache.insert(ids.clone(), value);
                (value, true)
            }
        };

        self.tree_policy.update_path(&ids, value.to_f64());
        self.stats.iterations += 1;
        trace!(depth = ids.len() - 1, goal, fresh, "playout completed");

        if goal && fresh {
            let solution = Solution { path, value };
            self.record_solution(solution.clone());
            if let Some(&head) = ids.last() {
                self.publish_node(head, NodeState::Solution);
            }
            return Ok(self.emit(AlgorithmEvent::SolutionFound(solution)));
        }
        Ok(self.emit(AlgorithmEvent::RolloutCompleted { path, value }))
    }

    fn evaluate(&mut self, path: &SearchPath<P::Node, P::Action>) -> Result<E::Value> {
        self.stats.evaluations += 1;
        let evaluator = &self.evaluator;
        match self
            .lifecycle
            .compute_timeout_aware(|interrupt| evaluator.evaluate(path, interrupt))
        {
            Ok(value) => Ok(value),
            Err(SearchError::Task(err)) => {
                warn!(error = %err, "path evaluation failed, recording penalty");
                self.stats.evaluation_failures += 1;
                Ok(self.penalty())
            }
            Err(err) => Err(err),
        }
    }

    fn penalty(&self) -> E::Value {
        E::Value::from_f64(self.config.evaluation_failure_penalty)
    }

    fn record_solution(&mut self, solution: SearchSolution<P, E>) {
        let improves = match self.best_solution() {
            None => true,
            Some(best) => self.is_better(solution.value, best.value),
        };
        self.solutions.push(solution);
        if improves {
            self.best = Some(self.solutions.len() - 1);
        }
        self.stats.solutions += 1;
    }

    fn is_better(&self, candidate: E::Value, incumbent: E::Value) -> bool {
        if self.config.maximize {
            candidate > incumbent
        } else {
            candidate < incumbent
        }
    }

    fn finish(&mut self, reason: FinishReason) -> SearchEvent<P, E> {
        if self.lifecycle.terminate() {
            if let Some(started) = self.started {
                self.stats.time_us = started.elapsed().as_micros() as u64;
            }
            info!(
                ?reason,
                iterations = self.stats.iterations,
                solutions = self.solutions.len(),
                nodes = self.graph.len(),
                "search finished"
            );
        }
        self.emit(AlgorithmEvent::Finished { reason })
    }

    fn emit(&mut self, event: SearchEvent<P, E>) -> SearchEvent<P, E> {
        self.observers.publish(&event);
        event
    }

    /// True once no further playout can reach unexplored ground.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        if self.root.is_none() {
            return false;
        }
        self.unexpanded.is_empty()
            || self.dead_ends.contains(&self.root)
            || (self.config.forbid_double_paths && self.fully_explored.contains(&self.root))
    }

    // =========================================================================
    // Cancellation
    // =========================================================================

    /// Request cancellation. Returns `true` on the first call only.
    pub fn cancel(&self) -> bool {
        self.lifecycle.cancel()
    }

    /// Handle that cancels this search from another thread.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.lifecycle.cancel_handle()
    }

    // =========================================================================
    // Results
    // =========================================================================

    /// Best solution found so far in the configured direction.
    #[must_use]
    pub fn best_solution(&self) -> Option<&SearchSolution<P, E>> {
        self.best.map(|i| &self.solutions[i])
    }

    /// All solutions in the order they were found.
    #[must_use]
    pub fn solutions(&self) -> &[SearchSolution<P, E>] {
        &self.solutions
    }

    /// The root action the search recommends.
    ///
    /// Picks the most visited root child; ties go to the better mean in the
    /// configured direction, then to generation order.
    #[must_use]
    pub fn recommended_action(&self) -> Option<&P::Action> {
        let root = self.graph.root()?;
        let mut best: Option<(&P::Action, &NodeLabel)> = None;

        for edge in self.graph.successors_of(root)? {
            let Some(label) = self.tree_policy.label(edge.child) else {
                continue;
            };
            if label.visits == 0 {
                continue;
            }
            let better = match best {
                None => true,
                Some((_, incumbent)) => {
                    label.visits > incumbent.visits
                        || (label.visits == incumbent.visits
                            && self.oriented(label.mean()) > self.oriented(incumbent.mean()))
                }
            };
            if better {
                best = Some((&edge.action, label));
            }
        }
        best.map(|(action, _)| action)
    }

    fn oriented(&self, mean: f64) -> f64 {
        if self.config.maximize {
            mean
        } else {
            -mean
        }
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Get the lifecycle state.
    #[must_use]
    pub fn state(&self) -> AlgorithmState {
        self.lifecycle.state()
    }

    /// Get the lifecycle.
    #[must_use]
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &MCTSConfig {
        &self.config
    }

    /// Get search statistics.
    #[must_use]
    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    /// Get the exploration graph.
    #[must_use]
    pub fn graph(&self) -> &ExplorationGraph<P::Node, P::Action> {
        &self.graph
    }

    /// Get the problem.
    pub fn problem(&self) -> &P {
        &self.problem
    }

    /// Tree policy statistics for the first occurrence of a node.
    #[must_use]
    pub fn label_of(&self, node: &P::Node) -> Option<&NodeLabel> {
        self.graph
            .id_of(node)
            .and_then(|id| self.tree_policy.label(id))
    }

    // Queries by value look at the first occurrence of that value; the
    // `_at` variants look at one occurrence by id.

    #[must_use]
    pub fn is_unexpanded(&self, node: &P::Node) -> bool {
        self.classified(node, &self.unexpanded)
    }

    #[must_use]
    pub fn is_visited(&self, node: &P::Node) -> bool {
        self.classified(node, &self.visited)
    }

    #[must_use]
    pub fn is_dead_end(&self, node: &P::Node) -> bool {
        self.classified(node, &self.dead_ends)
    }

    #[must_use]
    pub fn is_fully_explored(&self, node: &P::Node) -> bool {
        self.classified(node, &self.fully_explored)
    }

    #[must_use]
    pub fn is_unexpanded_at(&self, id: NodeId) -> bool {
        self.unexpanded.contains(&id)
    }

    #[must_use]
    pub fn is_dead_end_at(&self, id: NodeId) -> bool {
        self.dead_ends.contains(&id)
    }

    #[must_use]
    pub fn is_fully_explored_at(&self, id: NodeId) -> bool {
        self.fully_explored.contains(&id)
    }

    fn classified(&self, node: &P::Node, set: &FxHashSet<NodeId>) -> bool {
        self.graph.id_of(node).is_some_and(|id| set.contains(&id))
    }

    #[must_use]
    pub fn unexpanded_count(&self) -> usize {
        self.unexpanded.len()
    }

    #[must_use]
    pub fn dead_end_count(&self) -> usize {
        self.dead_ends.len()
    }

    #[must_use]
    pub fn fully_explored_count(&self) -> usize {
        self.fully_explored.len()
    }

    /// Number of distinct paths scored so far.
    #[must_use]
    pub fn cached_path_count(&self) -> usize {
        self.score_cache.len()
    }
}

impl<P, E> Iterator for MCTSSearch<P, E>
where
    P: SearchProblem,
    E: PathEvaluator<P::Node, P::Action>,
{
    type Item = Result<SearchEvent<P, E>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.lifecycle.state() == AlgorithmState::Inactive {
            return None;
        }
        Some(self.next_event())
    }
}

impl<P, E> std::fmt::Debug for MCTSSearch<P, E>
where
    P: SearchProblem,
    E: PathEvaluator<P::Node, P::Action>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MCTSSearch")
            .field("state", &self.lifecycle.state())
            .field("nodes", &self.graph.len())
            .field("unexpanded", &self.unexpanded.len())
            .field("solutions", &self.solutions.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BoxError, TaskError, Termination};
    use crate::lifecycle::Interrupt;
    use crate::problem::FnEvaluator;

    /// Complete binary tree of the given depth; leaves are goals.
    struct Binary {
        depth: u32,
    }

    impl SearchProblem for Binary {
        type Node = (u32, u32);
        type Action = bool;

        fn generate_root(&self) -> (u32, u32) {
            (0, 0)
        }

        fn generate_successors(
            &self,
            &(level, index): &(u32, u32),
            interrupt: &Interrupt,
        ) -> std::result::Result<Vec<(bool, (u32, u32))>, TaskError> {
            interrupt.check()?;
            if level == self.depth {
                return Ok(vec![]);
            }
            Ok(vec![
                (false, (level + 1, index * 2)),
                (true, (level + 1, index * 2 + 1)),
            ])
        }

        fn is_goal(&self, &(level, _): &(u32, u32)) -> bool {
            level == self.depth
        }
    }

    type LeafIndex = fn(&SearchPath<(u32, u32), bool>, &Interrupt) -> std::result::Result<f64, TaskError>;

    fn leaf_index(path: &SearchPath<(u32, u32), bool>, _: &Interrupt) -> std::result::Result<f64, TaskError> {
        Ok(path.head().1 as f64)
    }

    fn search(depth: u32, config: MCTSConfig) -> MCTSSearch<Binary, FnEvaluator<LeafIndex>> {
        Interrupt::current().clear();
        MCTSSearch::new(Binary { depth }, FnEvaluator::new(leaf_index as LeafIndex), config)
    }

    #[test]
    fn test_first_step_initializes() {
        let mut search = search(2, MCTSConfig::default());
        assert_eq!(search.state(), AlgorithmState::Created);

        let event = search.next_event().unwrap();
        assert_eq!(event, AlgorithmEvent::Initialized);
        assert_eq!(search.state(), AlgorithmState::Active);
        assert_eq!(search.graph().len(), 1);
        assert!(search.is_unexpanded(&(0, 0)));
    }

    #[test]
    fn test_search_finds_every_leaf() {
        let mut search = search(3, MCTSConfig::default());
        let best = search.call().unwrap().unwrap();

        assert_eq!(search.solutions().len(), 8);
        assert_eq!(best.value, 7.0);
        assert_eq!(best.path.actions(), &[true, true, true]);
        assert_eq!(search.state(), AlgorithmState::Inactive);
        assert_eq!(search.unexpanded_count(), 0);
        assert!(search.is_fully_explored(&(0, 0)));
        assert_eq!(search.stats().evaluations, 8);
        assert_eq!(search.stats().cache_hits, 0);
    }

    #[test]
    fn test_minimizing_picks_lowest() {
        let mut search = search(3, MCTSConfig::default().minimizing());
        let best = search.call().unwrap().unwrap();
        assert_eq!(best.value, 0.0);
    }

    #[test]
    fn test_search_deterministic() {
        let config = MCTSConfig::default().with_seed(12345);
        let order = |mut search: MCTSSearch<Binary, FnEvaluator<LeafIndex>>| {
            search.call().unwrap();
            search
                .solutions()
                .iter()
                .map(|s| s.value)
                .collect::<Vec<_>>()
        };

        assert_eq!(order(search(4, config.clone())), order(search(4, config)));
    }

    #[test]
    fn test_inactive_search_has_no_elements() {
        let mut search = search(1, MCTSConfig::default());
        search.call().unwrap();

        assert!(matches!(search.next_event(), Err(SearchError::NoSuchElement)));
        assert!(search.next().is_none());
    }

    #[test]
    fn test_iterator_ends_with_finished() {
        let search = search(2, MCTSConfig::default());
        let events: Vec<_> = search.map(|e| e.unwrap()).collect();

        assert_eq!(events.first(), Some(&AlgorithmEvent::Initialized));
        assert_eq!(
            events.last(),
            Some(&AlgorithmEvent::Finished {
                reason: FinishReason::Exhausted
            })
        );
    }

    #[test]
    fn test_cancel_before_step() {
        let mut search = search(10, MCTSConfig::default());
        search.next_event().unwrap();

        assert!(search.cancel());
        assert!(!search.cancel());

        let err = search.next_event().unwrap_err();
        assert_eq!(err.termination(), Some(Termination::Cancelled));
        assert_eq!(search.state(), AlgorithmState::Inactive);
        assert!(search.lifecycle().is_shut_down());
    }

    struct Refuse;

    impl TreePolicy for Refuse {
        fn select(&mut self, _: NodeId, _: &[NodeId]) -> std::result::Result<usize, BoxError> {
            Err("model unavailable".into())
        }

        fn update_path(&mut self, _: &[NodeId], _: f64) {}
    }

    #[test]
    fn test_policy_failure_is_propagated() {
        let mut search = search(3, MCTSConfig::default().with_forbid_double_paths(false))
            .with_tree_policy(Refuse);

        let err = search.call().unwrap_err();
        assert!(matches!(err, SearchError::ActionSelection(ref msg) if msg.contains("model unavailable")));
        assert_eq!(search.state(), AlgorithmState::Inactive);
    }

    struct OutOfRange;

    impl DefaultPolicy for OutOfRange {
        fn select(&mut self, _: NodeId, children: &[NodeId]) -> std::result::Result<usize, BoxError> {
            Ok(children.len())
        }
    }

    #[test]
    fn test_out_of_range_choice_is_rejected() {
        let mut search = search(2, MCTSConfig::default()).with_default_policy(OutOfRange);
        let err = search.call().unwrap_err();
        assert!(matches!(err, SearchError::ActionSelection(_)));
    }

    #[test]
    fn test_observers_see_events_in_order() {
        let (tx, rx) = std::sync::mpsc::channel();
        let mut search = search(1, MCTSConfig::default()).with_observer(tx);
        search.call().unwrap();
        drop(search);

        let events: Vec<_> = rx.iter().collect();
        assert_eq!(events.first(), Some(&AlgorithmEvent::Initialized));
        assert!(events.last().is_some_and(AlgorithmEvent::is_finished));

        let solutions = events
            .iter()
            .filter(|e| matches!(e, AlgorithmEvent::SolutionFound(_)))
            .count();
        assert_eq!(solutions, 2);

        let added = events
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    AlgorithmEvent::NodeStateChanged {
                        state: NodeState::Added,
                        ..
                    }
                )
            })
            .count();
        assert_eq!(added, 3);
    }

    #[test]
    fn test_recommended_action() {
        let mut search = search(1, MCTSConfig::default());
        assert_eq!(search.recommended_action(), None);

        search.call().unwrap();
        // Both leaves visited once; leaf 1 has the higher value.
        assert_eq!(search.recommended_action(), Some(&true));
        assert_eq!(search.label_of(&(1, 1)).map(|l| l.visits), Some(1));
    }
}
