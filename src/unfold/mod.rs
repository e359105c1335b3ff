//! Unfold module - Explicit transition systems from program graphs, channel
//! systems and circuits
//!
//! Unfolding pairs each control location with a variable store and explores
//! every combination reachable from the initial ones. Only reachable states
//! are ever created, so the result needs no further pruning.

use crate::eval::{Evaluators, Store};
use crate::transition_system::TransitionSystem;
use crate::{Error, Result};
use std::fmt;
use std::hash::Hash;

pub mod channel_system;
pub mod circuit;
pub mod program_graph;

// Re-export key types
pub use channel_system::transition_system_from_channel_system;
pub use circuit::{Circuit, FnCircuit, Valuation, transition_system_from_circuit};
pub use program_graph::transition_system_from_program_graph;

/// Runs one initialization list from the empty store, returning the store
/// after each of its actions.
///
/// Every action must be recognised by some evaluator and accepted by it.
pub(crate) fn initialization_trace(
    initialization: &[String],
    evaluators: &Evaluators,
) -> Result<Vec<Store>> {
    let mut trace = Vec::with_capacity(initialization.len());
    let mut store = Store::new();
    for action in initialization {
        let def = evaluators.matching_action(action)?.ok_or_else(|| {
            Error::InvalidInitialization(format!("no evaluator recognizes {:?}", action))
        })?;
        store = def.effect(&store, action).ok_or_else(|| {
            Error::InvalidInitialization(format!("{:?} rejected in {}", action, store))
        })?;
        trace.push(store.clone());
    }
    Ok(trace)
}

/// The store a whole initialization list leaves behind
pub(crate) fn run_initialization(initialization: &[String], evaluators: &Evaluators) -> Result<Store> {
    Ok(initialization_trace(initialization, evaluators)?
        .pop()
        .unwrap_or_default())
}

/// One store per distinct initialization list; a single empty store when
/// there are none.
pub(crate) fn initial_stores(
    initializations: &[Vec<String>],
    evaluators: &Evaluators,
) -> Result<Vec<Store>> {
    if initializations.is_empty() {
        return Ok(vec![Store::new()]);
    }
    let mut stores = Vec::new();
    for initialization in initializations {
        let store = run_initialization(initialization, evaluators)?;
        if !stores.contains(&store) {
            stores.push(store);
        }
    }
    Ok(stores)
}

/// Adds `state` together with its label: the given location texts and one
/// `name = value` proposition per store entry. Returns `false` if the state
/// was already present.
pub(crate) fn add_labeled_state<S, A>(
    ts: &mut TransitionSystem<S, A, String>,
    state: S,
    locations: impl IntoIterator<Item = String>,
    store: &Store,
) -> Result<bool>
where
    S: Clone + Eq + Hash + fmt::Debug,
    A: Clone + Eq + Hash + fmt::Debug,
{
    if !ts.add_state(state.clone()) {
        return Ok(false);
    }
    let propositions = locations.into_iter().chain(
        store
            .iter()
            .map(|(name, value)| format!("{} = {}", name, value)),
    );
    for proposition in propositions {
        ts.add_proposition(proposition.clone());
        ts.add_label(&state, proposition)?;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::Value;

    #[test]
    fn test_initial_stores() {
        let evaluators = Evaluators::parser_based();
        assert_eq!(initial_stores(&[], &evaluators).unwrap(), vec![Store::new()]);

        let inits = vec![
            vec!["x:=1".to_string(), "y:=x+1".to_string()],
            vec!["x:=1".to_string(), "y:=2".to_string()],
            vec!["x:=5".to_string()],
        ];
        let stores = initial_stores(&inits, &evaluators).unwrap();
        assert_eq!(
            stores,
            vec![
                Store::new()
                    .with("x", Value::Int(1))
                    .with("y", Value::Int(2)),
                Store::new().with("x", Value::Int(5)),
            ]
        );
    }

    #[test]
    fn test_initialization_trace() {
        let evaluators = Evaluators::parser_based();
        let init = vec!["x:=1".to_string(), "x:=x+1".to_string(), "y:=x".to_string()];
        let trace = initialization_trace(&init, &evaluators).unwrap();
        assert_eq!(
            trace,
            vec![
                Store::new().with("x", Value::Int(1)),
                Store::new().with("x", Value::Int(2)),
                Store::new().with("x", Value::Int(2)).with("y", Value::Int(2)),
            ]
        );
        assert_eq!(run_initialization(&init, &evaluators).unwrap(), trace[2]);
        assert!(initialization_trace(&[], &evaluators).unwrap().is_empty());
        assert_eq!(run_initialization(&[], &evaluators).unwrap(), Store::new());
    }

    #[test]
    fn test_invalid_initializations() {
        let evaluators = Evaluators::parser_based();
        for init in ["x:=y", "c!1", "nonsense"] {
            assert!(
                matches!(
                    run_initialization(&[init.to_string()], &evaluators),
                    Err(Error::InvalidInitialization(_))
                ),
                "{:?}",
                init
            );
        }
    }

    #[test]
    fn test_labeled_state() {
        let mut ts: TransitionSystem<u8, String, String> = TransitionSystem::new();
        let store = Store::new().with("x", Value::Int(3));
        assert!(add_labeled_state(&mut ts, 1, ["loop".to_string()], &store).unwrap());
        assert!(!add_labeled_state(&mut ts, 1, ["other".to_string()], &store).unwrap());
        assert_eq!(
            ts.label(&1).unwrap(),
            ["loop".to_string(), "x = 3".to_string()].into_iter().collect()
        );
    }
}
