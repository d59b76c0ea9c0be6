//! Randomized invariants over generated search graphs.
//!
//! Graphs are generated as one or two parent indices per node: node `i + 1`
//! hangs below nodes with smaller ids, so every graph is acyclic but nodes
//! may be shared between parents. The edge from a node's first parent is
//! labeled `2 * id`, the edge from its second parent `2 * id + 1`.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use anytime_mcts::core::{AlgorithmEvent, SearchPath, TaskError};
use anytime_mcts::lifecycle::Interrupt;
use anytime_mcts::mcts::{MCTSConfig, MCTSSearch, NodeId};
use anytime_mcts::problem::PathEvaluator;
use anytime_mcts::problems::{TableEvaluator, TableProblem};
use proptest::prelude::*;
use proptest::sample::Index;

type Layout = Vec<(Index, Option<Index>, Option<u8>)>;

/// Upper bound on explored occurrences, keeping exhaustive runs cheap.
const MAX_OCCURRENCES: u64 = 4000;

fn arb_layout() -> impl Strategy<Value = Layout> {
    prop::collection::vec(
        (
            any::<Index>(),
            prop::option::weighted(0.15, any::<Index>()),
            prop::option::weighted(0.3, 0u8..100),
        ),
        1..30,
    )
}

fn parents_of(layout: &Layout, node: u32) -> Vec<(u32, u32)> {
    let (first, second, _) = &layout[node as usize - 1];
    let mut parents = vec![(first.index(node as usize) as u32, 2 * node)];
    if let Some(second) = second {
        parents.push((second.index(node as usize) as u32, 2 * node + 1));
    }
    parents
}

fn is_goal(layout: &Layout, node: u32) -> bool {
    node != 0 && layout[node as usize - 1].2.is_some()
}

fn build(layout: &Layout) -> TableProblem<u32, u32> {
    let mut builder = TableProblem::builder(0u32);
    for node in 1..=layout.len() as u32 {
        for (parent, action) in parents_of(layout, node) {
            builder = builder.edge(parent, action, node);
        }
        if let Some(value) = layout[node as usize - 1].2 {
            builder = builder.goal(node, f64::from(value));
        }
    }
    builder.build()
}

/// Number of explored occurrences of each node: one per root path that
/// does not pass through a goal (goals are never expanded).
fn occurrences(layout: &Layout) -> Vec<u64> {
    let mut paths = vec![0u64; layout.len() + 1];
    paths[0] = 1;
    for node in 1..=layout.len() as u32 {
        paths[node as usize] = parents_of(layout, node)
            .into_iter()
            .filter(|&(parent, _)| !is_goal(layout, parent))
            .map(|(parent, _)| paths[parent as usize])
            .fold(0u64, u64::saturating_add);
    }
    paths
}

fn goal_paths(layout: &Layout) -> u64 {
    let paths = occurrences(layout);
    (1..=layout.len() as u32)
        .filter(|&node| is_goal(layout, node))
        .map(|node| paths[node as usize])
        .sum()
}

fn small_enough(layout: &Layout) -> bool {
    occurrences(layout)
        .into_iter()
        .fold(0u64, u64::saturating_add)
        <= MAX_OCCURRENCES
}

type PathKey = (Vec<u32>, Vec<u32>);

fn key(path: &SearchPath<u32, u32>) -> PathKey {
    (path.nodes().to_vec(), path.actions().to_vec())
}

/// Evaluator that counts submissions per path and never repeats a value.
#[derive(Clone, Default)]
struct Recording {
    submissions: Arc<Mutex<HashMap<PathKey, usize>>>,
}

impl PathEvaluator<u32, u32> for Recording {
    type Value = f64;

    fn evaluate(&self, path: &SearchPath<u32, u32>, _: &Interrupt) -> Result<f64, TaskError> {
        let mut submissions = self.submissions.lock().unwrap();
        *submissions.entry(key(path)).or_default() += 1;
        let total: usize = submissions.values().sum();
        Ok(total as f64 + f64::from(*path.head()) / 1000.0)
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_classification_is_monotonic(layout in arb_layout(), forbid in any::<bool>()) {
        prop_assume!(small_enough(&layout));
        let problem = build(&layout);
        let evaluator = TableEvaluator::from(&problem);
        let config = MCTSConfig::default().with_forbid_double_paths(forbid);
        let mut search = MCTSSearch::new(problem, evaluator, config);

        let mut dead = HashSet::new();
        let mut explored = HashSet::new();
        let mut left_unexpanded = HashSet::new();
        let mut known = 0;

        for _ in 0..50 * (layout.len() + 1) {
            match search.next() {
                Some(event) => {
                    prop_assert!(event.is_ok());
                }
                None => break,
            }

            let ids: Vec<NodeId> = search.graph().iter().map(|(id, _)| id).collect();
            prop_assert!(ids.len() >= known);
            known = ids.len();

            for id in ids {
                if dead.contains(&id) {
                    prop_assert!(search.is_dead_end_at(id));
                }
                if explored.contains(&id) {
                    prop_assert!(search.is_fully_explored_at(id));
                }
                if left_unexpanded.contains(&id) {
                    prop_assert!(!search.is_unexpanded_at(id));
                }
                if search.is_dead_end_at(id) {
                    dead.insert(id);
                }
                if search.is_fully_explored_at(id) {
                    explored.insert(id);
                }
                if !search.is_unexpanded_at(id) {
                    left_unexpanded.insert(id);
                }
            }

            // Fully explored nodes have nothing open below them.
            let graph = search.graph();
            for (id, _) in graph.iter() {
                if search.is_fully_explored_at(id) {
                    for child in graph.children(id) {
                        prop_assert!(
                            search.is_fully_explored_at(child) || search.is_dead_end_at(child)
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_no_path_scored_twice(layout in arb_layout()) {
        prop_assume!(small_enough(&layout));
        let problem = build(&layout);
        let evaluator = Recording::default();
        let submissions = Arc::clone(&evaluator.submissions);
        let mut search = MCTSSearch::new(problem, evaluator, MCTSConfig::default());

        search.call().unwrap();

        let submissions = submissions.lock().unwrap();
        prop_assert!(submissions.values().all(|&count| count == 1));
        let goal_submissions = submissions
            .keys()
            .filter(|(nodes, _)| nodes.last().is_some_and(|&head| is_goal(&layout, head)))
            .count() as u64;
        prop_assert_eq!(goal_submissions, goal_paths(&layout));
        prop_assert_eq!(search.solutions().len() as u64, goal_paths(&layout));
        prop_assert!(search.is_exhausted());
    }

    #[test]
    fn test_repeated_paths_reuse_cached_value(layout in arb_layout()) {
        prop_assume!(small_enough(&layout));
        let problem = build(&layout);
        let evaluator = Recording::default();
        let submissions = Arc::clone(&evaluator.submissions);
        let config = MCTSConfig::default().with_forbid_double_paths(false);
        let mut search = MCTSSearch::new(problem, evaluator, config);

        let mut scored: HashMap<PathKey, u64> = HashMap::new();
        for event in search.by_ref().take(200) {
            let (path, value) = match event.unwrap() {
                AlgorithmEvent::SolutionFound(solution) => (solution.path, solution.value),
                AlgorithmEvent::RolloutCompleted { path, value } => (path, value),
                _ => continue,
            };
            let first = *scored.entry(key(&path)).or_insert(value.to_bits());
            prop_assert_eq!(first, value.to_bits());
        }

        prop_assert!(submissions.lock().unwrap().values().all(|&count| count == 1));
    }

    #[test]
    fn test_same_seed_same_search(layout in arb_layout(), seed in any::<u64>()) {
        prop_assume!(small_enough(&layout));
        let problem = build(&layout);
        let evaluator = TableEvaluator::from(&problem);
        let config = MCTSConfig::default().with_seed(seed);

        let order = |mut search: MCTSSearch<TableProblem<u32, u32>, TableEvaluator<u32>>| {
            search.call().unwrap();
            search
                .solutions()
                .iter()
                .map(|s| s.path.actions().to_vec())
                .collect::<Vec<_>>()
        };

        let first = order(MCTSSearch::new(problem.clone(), evaluator.clone(), config.clone()));
        let second = order(MCTSSearch::new(problem, evaluator, config));
        prop_assert_eq!(first, second);
    }
}
