//! Interleaving of transition systems
//!
//! `ts1 ||| ts2` lets both components move independently. With a hand-shake
//! set `H`, actions in `H` may only fire jointly: both components take a
//! transition over the same action at the same time.

use crate::graph::{Pair, Reachability};
use crate::transition_system::{Transition, TransitionSystem};
use crate::Result;
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

/// Full interleaving without synchronisation, pruned to the reachable part
pub fn interleave<S1, S2, A, P>(
    ts1: &TransitionSystem<S1, A, P>,
    ts2: &TransitionSystem<S2, A, P>,
) -> Result<TransitionSystem<Pair<S1, S2>, A, P>>
where
    S1: Clone + Eq + Hash + fmt::Debug,
    S2: Clone + Eq + Hash + fmt::Debug,
    A: Clone + Eq + Hash + fmt::Debug,
    P: Clone + Eq + Hash + fmt::Debug,
{
    let mut ts = product(ts1, ts2, &HashSet::new())?;
    ts.set_name(format!("{} ||| {}", ts1.name(), ts2.name()));
    ts.remove_unreachable();
    Ok(ts)
}

/// Interleaving with hand-shaking on `handshake`, pruned to the reachable part
pub fn interleave_handshaking<S1, S2, A, P>(
    ts1: &TransitionSystem<S1, A, P>,
    ts2: &TransitionSystem<S2, A, P>,
    handshake: &HashSet<A>,
) -> Result<TransitionSystem<Pair<S1, S2>, A, P>>
where
    S1: Clone + Eq + Hash + fmt::Debug,
    S2: Clone + Eq + Hash + fmt::Debug,
    A: Clone + Eq + Hash + fmt::Debug,
    P: Clone + Eq + Hash + fmt::Debug,
{
    let mut ts = product(ts1, ts2, handshake)?;
    ts.set_name(format!("{} ||H {}", ts1.name(), ts2.name()));
    ts.remove_unreachable();
    Ok(ts)
}

/// The unpruned product: every pair of states, the union of actions and
/// propositions, and labels taken from both components.
pub fn product<S1, S2, A, P>(
    ts1: &TransitionSystem<S1, A, P>,
    ts2: &TransitionSystem<S2, A, P>,
    handshake: &HashSet<A>,
) -> Result<TransitionSystem<Pair<S1, S2>, A, P>>
where
    S1: Clone + Eq + Hash + fmt::Debug,
    S2: Clone + Eq + Hash + fmt::Debug,
    A: Clone + Eq + Hash + fmt::Debug,
    P: Clone + Eq + Hash + fmt::Debug,
{
    let mut ts = TransitionSystem::new();

    for s1 in ts1.states() {
        for s2 in ts2.states() {
            ts.add_state(Pair::new(s1.clone(), s2.clone()));
        }
    }
    for s1 in ts1.initial_states() {
        for s2 in ts2.initial_states() {
            ts.set_initial(&Pair::new(s1.clone(), s2.clone()), true)?;
        }
    }

    for action in ts1.actions().iter().chain(ts2.actions()) {
        ts.add_action(action.clone());
    }
    for proposition in ts1.propositions().iter().chain(ts2.propositions()) {
        ts.add_proposition(proposition.clone());
    }

    let states: Vec<Pair<S1, S2>> = ts.states().cloned().collect();
    for state in &states {
        for proposition in ts1
            .label(&state.first)?
            .into_iter()
            .chain(ts2.label(&state.second)?)
        {
            ts.add_label(state, proposition)?;
        }
    }

    let transitions1 = ts1.transitions();
    let transitions2 = ts2.transitions();

    // (s1,s2) -a-> (s1',s2') when both sides move on a hand-shake action
    for t1 in transitions1.iter().filter(|t| handshake.contains(&t.action)) {
        for t2 in transitions2.iter().filter(|t| t.action == t1.action) {
            ts.add_transition(Transition::new(
                Pair::new(t1.from.clone(), t2.from.clone()),
                t1.action.clone(),
                Pair::new(t1.to.clone(), t2.to.clone()),
            ))?;
        }
    }

    // (s1,s2) -a-> (s1',s2)
    for t1 in transitions1.iter().filter(|t| !handshake.contains(&t.action)) {
        for s2 in ts2.states() {
            ts.add_transition(Transition::new(
                Pair::new(t1.from.clone(), s2.clone()),
                t1.action.clone(),
                Pair::new(t1.to.clone(), s2.clone()),
            ))?;
        }
    }

    // (s1,s2) -a-> (s1,s2')
    for t2 in transitions2.iter().filter(|t| !handshake.contains(&t.action)) {
        for s1 in ts1.states() {
            ts.add_transition(Transition::new(
                Pair::new(s1.clone(), t2.from.clone()),
                t2.action.clone(),
                Pair::new(s1.clone(), t2.to.clone()),
            ))?;
        }
    }

    tracing::debug!(
        "Product of {:?} and {:?}: {} states, {} transitions",
        ts1.name(),
        ts2.name(),
        ts.state_count(),
        ts.transition_count()
    );
    Ok(ts)
}

#[cfg(test)]
mod tests {
    use super::*;

    type Ts = TransitionSystem<&'static str, &'static str, &'static str>;

    /// A traffic light: red -switch-> green -switch-> red
    fn light(name: &str, prefix: &'static str) -> Ts {
        let (red, green) = match prefix {
            "a" => ("a_red", "a_green"),
            _ => ("b_red", "b_green"),
        };
        let mut ts = Ts::with_name(name);
        ts.add_states([red, green]);
        ts.add_action("switch");
        ts.add_proposition(red);
        ts.add_proposition(green);
        ts.add_label(&red, red).unwrap();
        ts.add_label(&green, green).unwrap();
        ts.set_initial(&red, true).unwrap();
        ts.add_transition(Transition::new(red, "switch", green))
            .unwrap();
        ts.add_transition(Transition::new(green, "switch", red))
            .unwrap();
        ts
    }

    /// s0 -go-> s1, plus an unreachable s2 -back-> s0
    fn walker() -> Ts {
        let mut ts = Ts::with_name("walker");
        ts.add_states(["s0", "s1", "s2"]);
        ts.add_action("go");
        ts.add_action("back");
        ts.set_initial(&"s0", true).unwrap();
        ts.add_transition(Transition::new("s0", "go", "s1")).unwrap();
        ts.add_transition(Transition::new("s2", "back", "s0"))
            .unwrap();
        ts
    }

    #[test]
    fn test_product_sizes_without_handshake() {
        let ts1 = light("l1", "a");
        let ts2 = walker();
        let composed = product(&ts1, &ts2, &HashSet::new()).unwrap();

        let union: HashSet<&str> = ts1.actions().union(ts2.actions()).copied().collect();
        assert_eq!(composed.actions().len(), union.len());
        assert_eq!(composed.state_count(), ts1.state_count() * ts2.state_count());
        assert_eq!(composed.initial_states().len(), 1);
        // 2 light transitions for each of 3 walker states, 2 walker
        // transitions for each of 2 light states
        assert_eq!(composed.transition_count(), 2 * 3 + 2 * 2);
    }

    #[test]
    fn test_interleave_prunes_unreachable_pairs() {
        let ts1 = light("l1", "a");
        let ts2 = walker();
        let ts = interleave(&ts1, &ts2).unwrap();

        assert_eq!(ts.name(), "l1 ||| walker");
        assert_eq!(ts.state_count(), 4);
        assert!(ts.states().all(|state| state.second != "s2"));
        assert_eq!(ts.reach().len(), ts.state_count());
    }

    #[test]
    fn test_labels_are_merged() {
        let ts1 = light("l1", "a");
        let ts2 = light("l2", "b");
        let ts = interleave(&ts1, &ts2).unwrap();

        let state = Pair::new("a_green", "b_red");
        assert_eq!(
            ts.label(&state).unwrap(),
            HashSet::from(["a_green", "b_red"])
        );
    }

    #[test]
    fn test_handshake_forces_joint_moves() {
        let ts1 = light("l1", "a");
        let ts2 = light("l2", "b");
        let handshake = HashSet::from(["switch"]);
        let ts = interleave_handshaking(&ts1, &ts2, &handshake).unwrap();

        // Both lights always switch together
        assert_eq!(ts.state_count(), 2);
        assert!(ts.contains_state(&Pair::new("a_red", "b_red")));
        assert!(ts.contains_state(&Pair::new("a_green", "b_green")));
        assert_eq!(ts.transition_count(), 2);

        let free = interleave(&ts1, &ts2).unwrap();
        assert_eq!(free.state_count(), 4);
        assert_eq!(free.transition_count(), 8);
    }
}
