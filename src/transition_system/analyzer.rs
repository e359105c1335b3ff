//! Transition system analyzer
//!
//! Determinism checks and execution-fragment checks over a transition system.

use crate::transition_system::{Transition, TransitionSystem};
use crate::{Error, Result};
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

/// An alternating sequence `s0 a0 s1 a1 ... sn` of states and actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlternatingSequence<S, A> {
    states: Vec<S>,
    actions: Vec<A>,
}

impl<S, A> AlternatingSequence<S, A> {
    /// A sequence consisting of a single state
    pub fn new(first: S) -> Self {
        Self {
            states: vec![first],
            actions: Vec::new(),
        }
    }

    /// Builds a sequence from its parts; `states` must have exactly one more
    /// element than `actions`.
    pub fn from_parts(states: Vec<S>, actions: Vec<A>) -> Option<Self> {
        (states.len() == actions.len() + 1).then_some(Self { states, actions })
    }

    /// Extends the sequence by one step
    pub fn then(mut self, action: A, state: S) -> Self {
        self.actions.push(action);
        self.states.push(state);
        self
    }

    pub fn head(&self) -> &S {
        &self.states[0]
    }

    pub fn last(&self) -> &S {
        &self.states[self.states.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// The steps `(s_i, a_i, s_i+1)` of the sequence
    pub fn steps(&self) -> impl Iterator<Item = (&S, &A, &S)> {
        self.actions
            .iter()
            .enumerate()
            .map(|(i, action)| (&self.states[i], action, &self.states[i + 1]))
    }
}

/// At most one initial state, and no state has two outgoing transitions over
/// the same action.
pub fn is_action_deterministic<S, A, P>(ts: &TransitionSystem<S, A, P>) -> bool
where
    S: Clone + Eq + Hash + fmt::Debug,
    A: Clone + Eq + Hash + fmt::Debug,
    P: Clone + Eq + Hash + fmt::Debug,
{
    if ts.initial_states().len() > 1 {
        return false;
    }
    ts.states().all(|state| {
        let mut seen = HashSet::new();
        ts.outgoing(state)
            .map(|outgoing| outgoing.into_iter().all(|(action, _)| seen.insert(action)))
            .unwrap_or(true)
    })
}

/// At most one initial state, and the direct successors of every state carry
/// pairwise distinct labels.
pub fn is_ap_deterministic<S, A, P>(ts: &TransitionSystem<S, A, P>) -> bool
where
    S: Clone + Eq + Hash + fmt::Debug,
    A: Clone + Eq + Hash + fmt::Debug,
    P: Clone + Eq + Hash + fmt::Debug,
{
    if ts.initial_states().len() > 1 {
        return false;
    }
    ts.states().all(|state| {
        let Ok(outgoing) = ts.outgoing(state) else {
            return true;
        };
        let successors: HashSet<&S> = outgoing.into_iter().map(|(_, to)| to).collect();
        let labels: Vec<HashSet<P>> = successors
            .into_iter()
            .map(|successor| ts.label(successor).unwrap_or_default())
            .collect();
        labels
            .iter()
            .enumerate()
            .all(|(i, label)| labels[i + 1..].iter().all(|other| other != label))
    })
}

/// Whether every step of the sequence is a transition of `ts`.
///
/// Naming an unregistered state or action is an error.
pub fn is_execution_fragment<S, A, P>(
    ts: &TransitionSystem<S, A, P>,
    sequence: &AlternatingSequence<S, A>,
) -> Result<bool>
where
    S: Clone + Eq + Hash + fmt::Debug,
    A: Clone + Eq + Hash + fmt::Debug,
    P: Clone + Eq + Hash + fmt::Debug,
{
    if !ts.contains_state(sequence.head()) {
        return Err(Error::state_not_found(sequence.head()));
    }
    for (from, action, to) in sequence.steps() {
        if !ts.contains_state(to) {
            return Err(Error::state_not_found(to));
        }
        if !ts.actions().contains(action) {
            return Err(Error::action_not_found(action));
        }
        let step = Transition::new(from.clone(), action.clone(), to.clone());
        if !ts.contains_transition(&step) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// An execution fragment starting in an initial state
pub fn is_initial_execution_fragment<S, A, P>(
    ts: &TransitionSystem<S, A, P>,
    sequence: &AlternatingSequence<S, A>,
) -> Result<bool>
where
    S: Clone + Eq + Hash + fmt::Debug,
    A: Clone + Eq + Hash + fmt::Debug,
    P: Clone + Eq + Hash + fmt::Debug,
{
    Ok(is_execution_fragment(ts, sequence)? && ts.is_initial(sequence.head()))
}

/// An execution fragment ending in a terminal state
pub fn is_maximal_execution_fragment<S, A, P>(
    ts: &TransitionSystem<S, A, P>,
    sequence: &AlternatingSequence<S, A>,
) -> Result<bool>
where
    S: Clone + Eq + Hash + fmt::Debug,
    A: Clone + Eq + Hash + fmt::Debug,
    P: Clone + Eq + Hash + fmt::Debug,
{
    Ok(is_execution_fragment(ts, sequence)? && ts.is_terminal(sequence.last())?)
}

/// An initial, maximal execution fragment
pub fn is_execution<S, A, P>(
    ts: &TransitionSystem<S, A, P>,
    sequence: &AlternatingSequence<S, A>,
) -> Result<bool>
where
    S: Clone + Eq + Hash + fmt::Debug,
    A: Clone + Eq + Hash + fmt::Debug,
    P: Clone + Eq + Hash + fmt::Debug,
{
    Ok(is_maximal_execution_fragment(ts, sequence)? && ts.is_initial(sequence.head()))
}

#[cfg(test)]
mod tests {
    use super::*;

    type Ts = TransitionSystem<&'static str, &'static str, &'static str>;

    /// A vending machine: pay, then get either beer or soda.
    fn vending_machine() -> Ts {
        let mut ts = Ts::with_name("vending");
        ts.add_states(["pay", "select", "beer", "soda"]);
        for action in ["insert", "tau", "get_beer", "get_soda"] {
            ts.add_action(action);
        }
        ts.add_proposition("paid");
        ts.add_proposition("drink");
        ts.set_initial(&"pay", true).unwrap();
        ts.add_transition(Transition::new("pay", "insert", "select"))
            .unwrap();
        ts.add_transition(Transition::new("select", "tau", "beer"))
            .unwrap();
        ts.add_transition(Transition::new("select", "tau", "soda"))
            .unwrap();
        ts.add_transition(Transition::new("beer", "get_beer", "pay"))
            .unwrap();
        ts.add_transition(Transition::new("soda", "get_soda", "pay"))
            .unwrap();
        for state in ["select", "beer", "soda"] {
            ts.add_label(&state, "paid").unwrap();
        }
        ts.add_label(&"beer", "drink").unwrap();
        ts.add_label(&"soda", "drink").unwrap();
        ts
    }

    #[test]
    fn test_action_determinism() {
        let mut ts = vending_machine();
        assert!(!is_action_deterministic(&ts));

        ts.remove_transition(&Transition::new("select", "tau", "soda"))
            .unwrap();
        assert!(is_action_deterministic(&ts));

        ts.set_initial(&"beer", true).unwrap();
        assert!(!is_action_deterministic(&ts));
    }

    #[test]
    fn test_ap_determinism() {
        let mut ts = vending_machine();
        // beer and soda are both labeled {paid, drink}
        assert!(!is_ap_deterministic(&ts));

        ts.add_proposition("cold");
        ts.add_label(&"beer", "cold").unwrap();
        assert!(is_ap_deterministic(&ts));
    }

    #[test]
    fn test_execution_fragments() {
        let ts = vending_machine();
        let fragment = AlternatingSequence::new("pay")
            .then("insert", "select")
            .then("tau", "soda");
        assert_eq!(fragment.len(), 2);
        assert!(is_execution_fragment(&ts, &fragment).unwrap());
        assert!(is_initial_execution_fragment(&ts, &fragment).unwrap());
        assert!(!is_maximal_execution_fragment(&ts, &fragment).unwrap());
        assert!(!is_execution(&ts, &fragment).unwrap());

        let wrong = AlternatingSequence::new("pay").then("tau", "select");
        assert!(!is_execution_fragment(&ts, &wrong).unwrap());

        let from_middle = AlternatingSequence::new("select").then("tau", "beer");
        assert!(is_execution_fragment(&ts, &from_middle).unwrap());
        assert!(!is_initial_execution_fragment(&ts, &from_middle).unwrap());
    }

    #[test]
    fn test_execution_on_terminating_system() {
        let mut ts = vending_machine();
        ts.remove_transition(&Transition::new("soda", "get_soda", "pay"))
            .unwrap();
        let run = AlternatingSequence::from_parts(
            vec!["pay", "select", "soda"],
            vec!["insert", "tau"],
        )
        .unwrap();
        assert!(is_maximal_execution_fragment(&ts, &run).unwrap());
        assert!(is_execution(&ts, &run).unwrap());

        let lonely = AlternatingSequence::<_, &str>::new("soda");
        assert!(is_maximal_execution_fragment(&ts, &lonely).unwrap());
        assert!(!is_execution(&ts, &lonely).unwrap());
    }

    #[test]
    fn test_unknown_parts_are_errors() {
        let ts = vending_machine();
        let unknown_state = AlternatingSequence::new("pay").then("insert", "nowhere");
        assert!(matches!(
            is_execution_fragment(&ts, &unknown_state),
            Err(Error::StateNotFound(_))
        ));

        let unknown_action = AlternatingSequence::new("pay").then("steal", "select");
        assert!(matches!(
            is_execution_fragment(&ts, &unknown_action),
            Err(Error::ActionNotFound(_))
        ));

        assert!(AlternatingSequence::<&str, &str>::from_parts(vec![], vec![]).is_none());
    }
}
