//! Algorithm events and observers.
//!
//! The engine advances one step at a time and every step produces a tagged
//! [`AlgorithmEvent`]. Fine-grained node bookkeeping events are additionally
//! pushed to any registered [`Observer`]s. Observers are passive: they are
//! called synchronously, must not block, and cannot influence the search.

use std::sync::mpsc::Sender;

use serde::{Deserialize, Serialize};

use super::error::Termination;
use super::path::{SearchPath, Solution};

/// Bookkeeping state of a node, as reported to observers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeState {
    /// The node was recorded by an expansion.
    Added,
    /// The node is part of the playout currently being simulated.
    InRollout,
    /// The node was found to be a dead end.
    Closed,
    /// Everything beneath the node has been explored.
    Exhausted,
    /// The node is a goal that ended a playout.
    Solution,
}

/// Why an algorithm run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FinishReason {
    /// No unexplored nodes remain.
    Exhausted,
    /// The deadline passed.
    Timeout,
    /// The run was cancelled.
    Cancelled,
    /// The worker was interrupted externally.
    Interrupted,
    /// A non-recoverable error (policy or generator failure).
    Failed,
}

impl From<Termination> for FinishReason {
    fn from(t: Termination) -> Self {
        match t {
            Termination::Timeout => FinishReason::Timeout,
            Termination::Cancelled => FinishReason::Cancelled,
            Termination::Interrupted => FinishReason::Interrupted,
        }
    }
}

/// Event produced by one algorithm step or pushed to observers.
#[derive(Clone, Debug, PartialEq)]
pub enum AlgorithmEvent<N, A, V> {
    /// The algorithm was activated.
    Initialized,

    /// A node changed its bookkeeping state.
    NodeStateChanged { node: N, state: NodeState },

    /// A playout ended without reaching a goal (or reached an already
    /// reported goal again); `value` is what was folded into the tree policy.
    RolloutCompleted { path: SearchPath<N, A>, value: V },

    /// A playout reached a goal.
    SolutionFound(Solution<N, A, V>),

    /// The algorithm became inactive.
    Finished { reason: FinishReason },
}

impl<N, A, V> AlgorithmEvent<N, A, V> {
    /// True for the event that ends a run.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self, AlgorithmEvent::Finished { .. })
    }
}

/// Receiver of algorithm events.
pub trait Observer<E>: Send {
    /// Called for every published event, in order.
    fn notify(&mut self, event: &E);
}

impl<E, F> Observer<E> for F
where
    F: FnMut(&E) + Send,
{
    fn notify(&mut self, event: &E) {
        self(event)
    }
}

/// Channel-backed observer. A dropped receiver is silently ignored.
impl<E> Observer<E> for Sender<E>
where
    E: Clone + Send,
{
    fn notify(&mut self, event: &E) {
        let _ = self.send(event.clone());
    }
}

/// Statically typed list of observers.
pub struct ObserverList<E> {
    observers: Vec<Box<dyn Observer<E>>>,
}

impl<E> Default for ObserverList<E> {
    fn default() -> Self {
        Self {
            observers: Vec::new(),
        }
    }
}

impl<E> ObserverList<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer. Observers are notified in registration order.
    pub fn register<O>(&mut self, observer: O)
    where
        O: Observer<E> + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    /// Deliver an event to every observer.
    pub fn publish(&mut self, event: &E) {
        for observer in &mut self.observers {
            observer.notify(event);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl<E> std::fmt::Debug for ObserverList<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverList")
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};

    type Event = AlgorithmEvent<u32, char, f64>;

    #[test]
    fn test_closure_observer_sees_events_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut list: ObserverList<Event> = ObserverList::new();
        list.register(move |e: &Event| sink.lock().unwrap().push(e.clone()));

        list.publish(&AlgorithmEvent::Initialized);
        list.publish(&AlgorithmEvent::NodeStateChanged {
            node: 3,
            state: NodeState::Added,
        });

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], AlgorithmEvent::Initialized);
    }

    #[test]
    fn test_channel_observer() {
        let (tx, rx) = mpsc::channel::<Event>();
        let mut list = ObserverList::new();
        list.register(tx);

        list.publish(&AlgorithmEvent::Finished {
            reason: FinishReason::Exhausted,
        });

        assert!(rx.recv().unwrap().is_finished());
    }

    #[test]
    fn test_dropped_receiver_is_ignored() {
        let (tx, rx) = mpsc::channel::<Event>();
        drop(rx);

        let mut list = ObserverList::new();
        list.register(tx);
        list.publish(&AlgorithmEvent::Initialized);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_finish_reason_from_termination() {
        assert_eq!(FinishReason::from(Termination::Timeout), FinishReason::Timeout);
        assert_eq!(FinishReason::from(Termination::Cancelled), FinishReason::Cancelled);
        assert_eq!(
            FinishReason::from(Termination::Interrupted),
            FinishReason::Interrupted
        );
    }
}
