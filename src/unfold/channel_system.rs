use crate::eval::{ChannelKind, Evaluators, InterleavingActionDef, Store, Value};
use crate::graph::Pair;
use crate::program_graph::ChannelSystem;
use crate::transition_system::{Transition, TransitionSystem};
use crate::unfold::{add_labeled_state, initialization_trace};
use crate::Result;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::hash::Hash;

type State<L> = Pair<Vec<L>, Store>;

/// Every variable ranges independently over all values it holds after any
/// step of any initialization of any process.
fn initial_stores<L>(cs: &ChannelSystem<L>, evaluators: &Evaluators) -> Result<Vec<Store>>
where
    L: Clone + Eq + Hash + fmt::Debug,
{
    let mut domains: BTreeMap<String, BTreeSet<Value>> = BTreeMap::new();
    for pg in cs.program_graphs() {
        for initialization in pg.initializations() {
            for store in initialization_trace(initialization, evaluators)? {
                for (name, value) in store.iter() {
                    domains.entry(name.clone()).or_default().insert(*value);
                }
            }
        }
    }

    let mut stores = vec![Store::new()];
    for (name, values) in &domains {
        stores = stores
            .iter()
            .flat_map(|store| {
                values
                    .iter()
                    .map(move |value| store.clone().with(name.clone(), *value))
            })
            .collect();
    }
    Ok(stores)
}

/// Every combination of per-process initial locations
fn initial_locations<L>(cs: &ChannelSystem<L>) -> Vec<Vec<L>>
where
    L: Clone + Eq + Hash + fmt::Debug,
{
    let mut combinations = vec![Vec::new()];
    for pg in cs.program_graphs() {
        combinations = combinations
            .iter()
            .flat_map(|prefix| {
                pg.initial_locations().iter().map(move |location| {
                    let mut combination = prefix.clone();
                    combination.push(location.clone());
                    combination
                })
            })
            .collect();
    }
    combinations
}

fn location_labels<L: fmt::Display>(locations: &[L]) -> Vec<String> {
    locations.iter().map(ToString::to_string).collect()
}

/// Unfolds a channel system into a transition system over
/// `(locations, store)`, where `locations[i]` is the control location of
/// process `i`.
///
/// Non-channel actions of one process fire on their own through
/// `evaluators`. A send of one process fires only together with an enabled
/// receive on the same channel of another process; the pair forms a single
/// transition labeled with the composed action, whose effect is computed by
/// `interleaving`. Channel actions without a partner block.
pub fn transition_system_from_channel_system<L>(
    cs: &ChannelSystem<L>,
    evaluators: &Evaluators,
    interleaving: &dyn InterleavingActionDef,
) -> Result<TransitionSystem<State<L>, String, String>>
where
    L: Clone + Eq + Hash + fmt::Debug + fmt::Display,
{
    let mut ts = TransitionSystem::with_name(cs.name());
    let graphs = cs.program_graphs();

    let mut visited: HashSet<State<L>> = HashSet::new();
    let mut stack = Vec::new();

    let stores = initial_stores(cs, evaluators)?;
    for locations in initial_locations(cs) {
        for store in &stores {
            let state = Pair::new(locations.clone(), store.clone());
            add_labeled_state(&mut ts, state.clone(), location_labels(&locations), store)?;
            ts.set_initial(&state, true)?;
            if visited.insert(state.clone()) {
                stack.push(state);
            }
        }
    }

    while let Some(state) = stack.pop() {
        let (locations, store) = (&state.first, &state.second);
        let mut successors: Vec<(String, State<L>)> = Vec::new();

        for (i, pg) in graphs.iter().enumerate() {
            for (guarded, to) in pg.outgoing(&locations[i])? {
                if !evaluators.evaluate(store, &guarded.guard)? {
                    continue;
                }

                let Some(send) = interleaving.channel_action(&guarded.action) else {
                    if let Some(next_store) = evaluators.effect(store, &guarded.action)? {
                        let mut next = locations.clone();
                        next[i] = to.clone();
                        successors.push((guarded.action.clone(), Pair::new(next, next_store)));
                    }
                    continue;
                };

                // Rendezvous pairs are emitted from the send side only
                if send.kind != ChannelKind::Send {
                    continue;
                }

                for (j, partner) in graphs.iter().enumerate() {
                    if j == i {
                        continue;
                    }
                    for (received, partner_to) in partner.outgoing(&locations[j])? {
                        let complementary = interleaving
                            .channel_action(&received.action)
                            .is_some_and(|receive| send.complements(&receive));
                        if !complementary || !evaluators.evaluate(store, &received.guard)? {
                            continue;
                        }
                        let action = interleaving.compose(&guarded.action, &received.action);
                        let Some(next_store) = interleaving.effect(store, &action) else {
                            continue;
                        };
                        let mut next = locations.clone();
                        next[i] = to.clone();
                        next[j] = partner_to.clone();
                        successors.push((action, Pair::new(next, next_store)));
                    }
                }
            }
        }

        for (action, next) in successors {
            add_labeled_state(&mut ts, next.clone(), location_labels(&next.first), &next.second)?;
            ts.add_action(action.clone());
            ts.add_transition(Transition::new(state.clone(), action, next.clone()))?;
            if visited.insert(next.clone()) {
                stack.push(next);
            }
        }
    }

    tracing::debug!(
        "Unfolded channel system of {} processes: {} states, {} transitions",
        graphs.len(),
        ts.state_count(),
        ts.transition_count()
    );
    Ok(ts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{GuardedOption, Stmt, program_graph_from_stmt};
    use crate::eval::ParserBasedInterleavingActionDef;
    use crate::graph::Reachability;

    fn unfold(processes: Vec<Stmt>) -> TransitionSystem<State<String>, String, String> {
        let cs: ChannelSystem<String> = processes
            .iter()
            .map(|stmt| program_graph_from_stmt(stmt).unwrap())
            .collect();
        transition_system_from_channel_system(
            &cs,
            &Evaluators::parser_based(),
            &ParserBasedInterleavingActionDef,
        )
        .unwrap()
    }

    #[test]
    fn test_rendezvous() {
        let ts = unfold(vec![Stmt::send("c", "1"), Stmt::receive("c", "x")]);

        assert_eq!(ts.transition_count(), 1);
        let transition = ts.transitions().into_iter().next().unwrap();
        assert_eq!(transition.action, "c!1|c?x");
        assert_eq!(transition.from.first, vec!["c!1".to_string(), "c?x".to_string()]);
        assert_eq!(transition.to.first, vec![String::new(), String::new()]);
        assert_eq!(transition.to.second.get("x"), Some(&Value::Int(1)));
        assert_eq!(ts.state_count(), 2);
    }

    #[test]
    fn test_unmatched_channel_actions_block() {
        let ts = unfold(vec![Stmt::send("c", "1"), Stmt::receive("d", "x")]);
        assert_eq!(ts.state_count(), 1);
        assert_eq!(ts.transition_count(), 0);

        // A process never synchronises with itself
        let ts = unfold(vec![Stmt::if_fi([
            GuardedOption::new("true", Stmt::send("c", "1")),
            GuardedOption::new("true", Stmt::receive("c", "x")),
        ])]);
        assert_eq!(ts.transition_count(), 0);
    }

    #[test]
    fn test_asynchronous_steps_interleave() {
        let ts = unfold(vec![Stmt::assign("x", "1"), Stmt::assign("y", "2")]);
        // Either order: 1 initial, 2 intermediate, 1 final
        assert_eq!(ts.state_count(), 4);
        assert_eq!(ts.transition_count(), 4);
        assert_eq!(ts.terminal_states().len(), 1);
        assert_eq!(ts.reach().len(), ts.state_count());
    }

    #[test]
    fn test_initial_store_domains() {
        let mut sender = program_graph_from_stmt(&Stmt::send("c", "x")).unwrap();
        sender.add_initialization(vec!["x:=1".to_string()]);
        sender.add_initialization(vec!["x:=2".to_string()]);
        let mut receiver = program_graph_from_stmt(&Stmt::receive("c", "y")).unwrap();
        receiver.add_initialization(vec!["y:=0".to_string()]);
        let cs = ChannelSystem::new(vec![sender, receiver]);

        let ts = transition_system_from_channel_system(
            &cs,
            &Evaluators::parser_based(),
            &ParserBasedInterleavingActionDef,
        )
        .unwrap();

        assert_eq!(ts.initial_states().len(), 2);
        assert_eq!(ts.transition_count(), 2);
        let received: HashSet<Option<Value>> = ts
            .terminal_states()
            .into_iter()
            .map(|state| state.second.get("y").copied())
            .collect();
        assert_eq!(received, HashSet::from([Some(Value::Int(1)), Some(Value::Int(2))]));
        assert!(
            ts.label(ts.initial_states().iter().next().unwrap())
                .unwrap()
                .contains("y = 0")
        );
    }

    #[test]
    fn test_initial_domains_include_intermediate_steps() {
        let mut pg = program_graph_from_stmt(&Stmt::skip()).unwrap();
        pg.add_initialization(vec!["x:=1".to_string(), "x:=2".to_string()]);
        let cs = ChannelSystem::new(vec![pg]);

        let ts = transition_system_from_channel_system(
            &cs,
            &Evaluators::parser_based(),
            &ParserBasedInterleavingActionDef,
        )
        .unwrap();

        let initial: HashSet<Option<Value>> = ts
            .initial_states()
            .iter()
            .map(|state| state.second.get("x").copied())
            .collect();
        assert_eq!(initial, HashSet::from([Some(Value::Int(1)), Some(Value::Int(2))]));
        assert_eq!(ts.initial_states().len(), 2);
        assert_eq!(ts.transition_count(), 2);
    }

    #[test]
    fn test_rejected_effects_produce_no_transitions() {
        let ts = unfold(vec![
            Stmt::send("c", "1/0"),
            Stmt::receive("c", "y"),
            Stmt::if_fi([
                GuardedOption::new("true", Stmt::assign("z", "1/0")),
                GuardedOption::new("true", Stmt::assign("z", "2")),
            ]),
        ]);

        assert_eq!(ts.transition_count(), 1);
        assert_eq!(ts.state_count(), 2);
        assert_eq!(ts.actions(), &HashSet::from(["z:=2".to_string()]));
        let transition = ts.transitions().into_iter().next().unwrap();
        assert_eq!(transition.to.second.get("z"), Some(&Value::Int(2)));
        assert_eq!(transition.to.second.get("y"), None);
    }

    #[test]
    fn test_guarded_receive() {
        let sender = Stmt::do_od([GuardedOption::new("true", Stmt::send("c", "1"))]);
        let receiver = Stmt::seq(
            Stmt::assign("n", "0"),
            Stmt::do_od([GuardedOption::new(
                "n < 2",
                Stmt::seq(Stmt::receive("c", "v"), Stmt::assign("n", "n + 1")),
            )]),
        );
        let ts = unfold(vec![sender, receiver]);

        // The receiver accepts exactly while its guard holds
        let handshakes = ts
            .transitions()
            .into_iter()
            .filter(|transition| transition.action.starts_with("c!1|c?v"))
            .count();
        assert_eq!(handshakes, 2);

        let counts: HashSet<Value> = ts
            .states()
            .filter_map(|state| state.second.get("n").copied())
            .collect();
        assert_eq!(
            counts,
            HashSet::from([Value::Int(0), Value::Int(1), Value::Int(2)])
        );

        let terminal = ts.terminal_states();
        assert_eq!(terminal.len(), 1);
        let last = terminal.iter().next().unwrap();
        assert_eq!(last.second.get("n"), Some(&Value::Int(2)));
        assert_eq!(last.first[1], String::new());
    }
}
