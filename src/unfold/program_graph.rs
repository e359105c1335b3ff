use crate::eval::{Evaluators, Store};
use crate::graph::Pair;
use crate::program_graph::ProgramGraph;
use crate::transition_system::{Transition, TransitionSystem};
use crate::unfold::{add_labeled_state, initial_stores};
use crate::Result;
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

/// Unfolds a program graph into a transition system over `(location, store)`.
///
/// Initial states pair every initial location with every initial store.
/// A transition fires when its guard holds and the evaluators accept its
/// action; actions no evaluator recognises leave the store unchanged.
pub fn transition_system_from_program_graph<L, A>(
    pg: &ProgramGraph<L, A>,
    evaluators: &Evaluators,
) -> Result<TransitionSystem<Pair<L, Store>, A, String>>
where
    L: Clone + Eq + Hash + fmt::Debug + fmt::Display,
    A: Clone + Eq + Hash + fmt::Debug + AsRef<str>,
{
    let mut ts = TransitionSystem::with_name(pg.name());
    let stores = initial_stores(pg.initializations(), evaluators)?;

    let mut visited: HashSet<Pair<L, Store>> = HashSet::new();
    let mut stack = Vec::new();

    for location in pg.initial_locations() {
        for store in &stores {
            let state = Pair::new(location.clone(), store.clone());
            add_labeled_state(&mut ts, state.clone(), [location.to_string()], store)?;
            ts.set_initial(&state, true)?;
            if visited.insert(state.clone()) {
                stack.push(state);
            }
        }
    }

    while let Some(state) = stack.pop() {
        for (guarded, to) in pg.outgoing(&state.first)? {
            if !evaluators.evaluate(&state.second, &guarded.guard)? {
                continue;
            }
            let Some(store) = evaluators.effect(&state.second, guarded.action.as_ref())? else {
                tracing::trace!(
                    "{:?} rejected at {}",
                    guarded.action.as_ref(),
                    state.first
                );
                continue;
            };
            let next = Pair::new(to.clone(), store);
            add_labeled_state(&mut ts, next.clone(), [to.to_string()], &next.second)?;
            ts.add_action(guarded.action.clone());
            ts.add_transition(Transition::new(
                state.clone(),
                guarded.action.clone(),
                next.clone(),
            ))?;
            if visited.insert(next.clone()) {
                stack.push(next);
            }
        }
    }

    tracing::debug!(
        "Unfolded {:?}: {} states, {} transitions",
        pg.name(),
        ts.state_count(),
        ts.transition_count()
    );
    Ok(ts)
}
