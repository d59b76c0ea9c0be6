//! Playout paths and score values.

use serde::{Deserialize, Serialize};

/// Value type produced by a path evaluator.
///
/// The engine orders values and folds them into running statistics, so it
/// needs a lossless-enough projection onto `f64` and back (the latter is used
/// for the configured evaluation-failure penalty).
pub trait Score: Copy + PartialOrd + std::fmt::Debug + Send + 'static {
    /// Project onto `f64` for policy statistics.
    fn to_f64(self) -> f64;

    /// Build a value from an `f64` (used for penalties).
    fn from_f64(value: f64) -> Self;
}

macro_rules! impl_score {
    ($($t:ty),*) => {
        $(
            impl Score for $t {
                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }

                #[inline]
                fn from_f64(value: f64) -> Self {
                    value as $t
                }
            }
        )*
    };
}

impl_score!(f64, f32, i32, i64, u32, u64);

/// A labeled path through the search graph: `nodes[i] --actions[i]--> nodes[i + 1]`.
///
/// The first node is always the root.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchPath<N, A> {
    nodes: Vec<N>,
    actions: Vec<A>,
}

impl<N, A> SearchPath<N, A> {
    /// A path consisting of the root only.
    pub fn root(root: N) -> Self {
        Self {
            nodes: vec![root],
            actions: Vec::new(),
        }
    }

    /// Append an edge to the path.
    pub fn extend(&mut self, action: A, node: N) {
        self.actions.push(action);
        self.nodes.push(node);
    }

    /// All nodes from root to head.
    #[must_use]
    pub fn nodes(&self) -> &[N] {
        &self.nodes
    }

    /// Actions connecting consecutive nodes.
    #[must_use]
    pub fn actions(&self) -> &[A] {
        &self.actions
    }

    /// The first node.
    #[must_use]
    pub fn root_node(&self) -> &N {
        &self.nodes[0]
    }

    /// The last node.
    #[must_use]
    pub fn head(&self) -> &N {
        &self.nodes[self.nodes.len() - 1]
    }

    /// Number of edges on the path.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// True if the path has no edges (root only).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// A goal path together with its evaluated value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Solution<N, A, V> {
    /// Path from root to a goal node.
    pub path: SearchPath<N, A>,

    /// Value returned by the path evaluator.
    pub value: V,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_extend() {
        let mut path = SearchPath::root("r");
        assert!(path.is_empty());
        assert_eq!(path.head(), &"r");

        path.extend('a', "x");
        path.extend('b', "y");

        assert_eq!(path.len(), 2);
        assert_eq!(path.root_node(), &"r");
        assert_eq!(path.head(), &"y");
        assert_eq!(path.nodes(), &["r", "x", "y"]);
        assert_eq!(path.actions(), &['a', 'b']);
    }

    #[test]
    fn test_score_conversions() {
        assert_eq!(3_i32.to_f64(), 3.0);
        assert_eq!(<i64 as Score>::from_f64(-2.0), -2);
        assert_eq!(<f32 as Score>::from_f64(0.5), 0.5);
    }
}
