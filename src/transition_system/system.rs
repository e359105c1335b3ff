use crate::error::{Error, GraphPart};
use crate::graph::{IndexedGraph, Reachability, dot_escape};
use crate::transition_system::Transition;
use crate::Result;
use petgraph::Direction;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

/// An explicit labelled state space.
///
/// Every mutation checks the structural invariants up front and either
/// succeeds completely or leaves the system untouched:
/// - transitions only reference registered states and actions,
/// - labels only reference registered states and propositions,
/// - a state cannot be removed while it is initial, labeled, or touched by a
///   transition; an action or proposition cannot be removed while in use.
#[derive(Debug, Clone)]
pub struct TransitionSystem<S, A, P> {
    name: String,

    /// States and the transition relation.
    /// Edge weights are the actions labelling the transitions.
    graph: IndexedGraph<S, A>,

    actions: HashSet<A>,
    initial: HashSet<S>,
    propositions: HashSet<P>,
    labels: HashMap<S, HashSet<P>>,
}

impl<S, A, P> Default for TransitionSystem<S, A, P> {
    fn default() -> Self {
        Self {
            name: String::new(),
            graph: IndexedGraph::default(),
            actions: HashSet::new(),
            initial: HashSet::new(),
            propositions: HashSet::new(),
            labels: HashMap::new(),
        }
    }
}

impl<S, A, P> TransitionSystem<S, A, P>
where
    S: Clone + Eq + Hash + fmt::Debug,
    A: Clone + Eq + Hash + fmt::Debug,
    P: Clone + Eq + Hash + fmt::Debug,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    // States

    pub fn states(&self) -> impl Iterator<Item = &S> {
        self.graph.nodes()
    }

    pub fn state_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn contains_state(&self, state: &S) -> bool {
        self.graph.contains(state)
    }

    /// Registers a state, returning `false` if it was already present.
    pub fn add_state(&mut self, state: S) -> bool {
        self.graph.add_node(state)
    }

    pub fn add_states(&mut self, states: impl IntoIterator<Item = S>) {
        for state in states {
            self.add_state(state);
        }
    }

    pub fn remove_state(&mut self, state: &S) -> Result<()> {
        if !self.graph.contains(state) {
            return Err(Error::state_not_found(state));
        }
        if self.initial.contains(state) {
            return Err(Error::attached(state, GraphPart::InitialStates));
        }
        if self.labels.get(state).is_some_and(|label| !label.is_empty()) {
            return Err(Error::attached(state, GraphPart::LabelingFunction));
        }
        if self.graph.has_incident_edges(state) {
            return Err(Error::attached(state, GraphPart::Transitions));
        }
        self.graph.remove_node(state);
        self.labels.remove(state);
        Ok(())
    }

    pub fn initial_states(&self) -> &HashSet<S> {
        &self.initial
    }

    pub fn is_initial(&self, state: &S) -> bool {
        self.initial.contains(state)
    }

    pub fn set_initial(&mut self, state: &S, initial: bool) -> Result<()> {
        if !self.graph.contains(state) {
            return Err(Error::state_not_found(state));
        }
        if initial {
            self.initial.insert(state.clone());
        } else {
            self.initial.remove(state);
        }
        Ok(())
    }

    // Actions

    pub fn actions(&self) -> &HashSet<A> {
        &self.actions
    }

    pub fn add_action(&mut self, action: A) -> bool {
        self.actions.insert(action)
    }

    pub fn remove_action(&mut self, action: &A) -> Result<()> {
        if !self.actions.contains(action) {
            return Err(Error::action_not_found(action));
        }
        if self.graph.edges().any(|(_, used, _)| used == action) {
            return Err(Error::attached(action, GraphPart::Transitions));
        }
        self.actions.remove(action);
        Ok(())
    }

    // Atomic propositions and labels

    pub fn propositions(&self) -> &HashSet<P> {
        &self.propositions
    }

    pub fn add_proposition(&mut self, proposition: P) -> bool {
        self.propositions.insert(proposition)
    }

    pub fn remove_proposition(&mut self, proposition: &P) -> Result<()> {
        if !self.propositions.contains(proposition) {
            return Err(Error::proposition_not_found(proposition));
        }
        if self.labels.values().any(|label| label.contains(proposition)) {
            return Err(Error::attached(proposition, GraphPart::LabelingFunction));
        }
        self.propositions.remove(proposition);
        Ok(())
    }

    /// Adds `proposition` to the label of `state`.
    pub fn add_label(&mut self, state: &S, proposition: P) -> Result<()> {
        if !self.graph.contains(state) {
            return Err(Error::state_not_found(state));
        }
        if !self.propositions.contains(&proposition) {
            return Err(Error::invalid_label(state, &proposition));
        }
        self.labels
            .entry(state.clone())
            .or_default()
            .insert(proposition);
        Ok(())
    }

    /// Removes `proposition` from the label of `state`, returning whether it
    /// was present.
    pub fn remove_label(&mut self, state: &S, proposition: &P) -> Result<bool> {
        if !self.graph.contains(state) {
            return Err(Error::state_not_found(state));
        }
        if !self.propositions.contains(proposition) {
            return Err(Error::invalid_label(state, proposition));
        }
        let removed = self
            .labels
            .get_mut(state)
            .is_some_and(|label| label.remove(proposition));
        if self.labels.get(state).is_some_and(HashSet::is_empty) {
            self.labels.remove(state);
        }
        Ok(removed)
    }

    pub fn label(&self, state: &S) -> Result<HashSet<P>> {
        if !self.graph.contains(state) {
            return Err(Error::state_not_found(state));
        }
        Ok(self.labels.get(state).cloned().unwrap_or_default())
    }

    /// The labeling function restricted to states with a non-empty label
    pub fn labeling(&self) -> &HashMap<S, HashSet<P>> {
        &self.labels
    }

    // Transitions

    pub fn transitions(&self) -> HashSet<Transition<S, A>> {
        self.graph
            .edges()
            .map(|(from, action, to)| Transition::new(from.clone(), action.clone(), to.clone()))
            .collect()
    }

    pub fn transition_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains_transition(&self, transition: &Transition<S, A>) -> bool {
        self.graph
            .contains_edge(&transition.from, &transition.action, &transition.to)
    }

    /// Transitions leaving `state` as `(action, target)` pairs
    pub fn outgoing(&self, state: &S) -> Result<Vec<(&A, &S)>> {
        self.graph
            .neighbors(state, Direction::Outgoing)
            .ok_or_else(|| Error::state_not_found(state))
    }

    /// Adds a transition between registered states over a registered action,
    /// returning `false` if it was already present.
    pub fn add_transition(&mut self, transition: Transition<S, A>) -> Result<bool> {
        if !self.actions.contains(&transition.action) {
            return Err(Error::invalid_transition(&transition));
        }
        let Transition { from, action, to } = transition;
        match self.graph.add_edge(&from, action, &to) {
            Some(added) => Ok(added),
            None => Err(Error::invalid_transition(&(from, to))),
        }
    }

    pub fn remove_transition(&mut self, transition: &Transition<S, A>) -> Result<bool> {
        if !self.graph.contains(&transition.from)
            || !self.graph.contains(&transition.to)
            || !self.actions.contains(&transition.action)
        {
            return Err(Error::invalid_transition(transition));
        }
        Ok(self
            .graph
            .remove_edge(&transition.from, &transition.action, &transition.to))
    }

    /// Whether `state` has no outgoing transition
    pub fn is_terminal(&self, state: &S) -> Result<bool> {
        Ok(self.outgoing(state)?.is_empty())
    }

    pub fn terminal_states(&self) -> Vec<&S> {
        self.states()
            .filter(|state| self.is_terminal(state).unwrap_or(false))
            .collect()
    }

    /// Get state space statistics
    pub fn stats(&self) -> SystemStats {
        SystemStats {
            total_states: self.state_count(),
            total_transitions: self.transition_count(),
            initial_states: self.initial.len(),
            terminal_states: self.terminal_states().len(),
            actions: self.actions.len(),
            propositions: self.propositions.len(),
        }
    }

    /// Export to DOT format for Graphviz.
    ///
    /// `state_name` renders a state; nodes are emitted in name order so the
    /// output is stable.
    pub fn to_dot(&self, state_name: impl Fn(&S) -> String) -> String
    where
        A: fmt::Display,
    {
        let mut named: Vec<(String, &S)> = self.states().map(|s| (state_name(s), s)).collect();
        named.sort_by(|a, b| a.0.cmp(&b.0));
        let ids: HashMap<&S, usize> = named
            .iter()
            .enumerate()
            .map(|(id, (_, state))| (*state, id))
            .collect();

        let mut dot = "digraph TransitionSystem {\n".to_string();
        dot.push_str("  rankdir=LR;\n");
        dot.push_str("  node [shape=box, style=filled];\n\n");

        for (id, (name, state)) in named.iter().enumerate() {
            let color = if self.initial.contains(*state) {
                "lightblue"
            } else if self.is_terminal(state).unwrap_or(false) {
                "green"
            } else {
                "lightgreen"
            };
            dot.push_str(&format!(
                "  s{} [label=\"{}\", fillcolor=\"{}\"];\n",
                id,
                dot_escape(name),
                color
            ));
        }

        dot.push('\n');

        let mut edges: Vec<(usize, String, usize)> = self
            .graph
            .edges()
            .map(|(from, action, to)| (ids[from], action.to_string(), ids[to]))
            .collect();
        edges.sort();
        for (from, action, to) in edges {
            dot.push_str(&format!(
                "  s{} -> s{} [label=\"{}\"];\n",
                from,
                to,
                dot_escape(&action)
            ));
        }

        dot.push_str("}\n");
        dot
    }
}

impl<S, A, P> Reachability for TransitionSystem<S, A, P>
where
    S: Clone + Eq + Hash + fmt::Debug,
    A: Clone + Eq + Hash + fmt::Debug,
    P: Clone + Eq + Hash + fmt::Debug,
{
    type Node = S;
    type Action = A;

    fn post(&self, state: &S) -> Result<HashSet<S>> {
        self.graph
            .step(state, Direction::Outgoing, |_| true)
            .ok_or_else(|| Error::state_not_found(state))
    }

    fn pre(&self, state: &S) -> Result<HashSet<S>> {
        self.graph
            .step(state, Direction::Incoming, |_| true)
            .ok_or_else(|| Error::state_not_found(state))
    }

    fn post_by(&self, state: &S, action: &A) -> Result<HashSet<S>> {
        self.graph
            .step(state, Direction::Outgoing, |used| used == action)
            .ok_or_else(|| Error::state_not_found(state))
    }

    fn pre_by(&self, state: &S, action: &A) -> Result<HashSet<S>> {
        self.graph
            .step(state, Direction::Incoming, |used| used == action)
            .ok_or_else(|| Error::state_not_found(state))
    }

    fn reach(&self) -> HashSet<S> {
        self.graph.reach(&self.initial)
    }

    fn remove_unreachable(&mut self) -> usize {
        let reachable = self.reach();
        let removed = self.graph.retain_nodes(&reachable);
        for state in &removed {
            self.labels.remove(state);
        }
        if !removed.is_empty() {
            tracing::debug!(
                "Pruned {} unreachable states from {:?}",
                removed.len(),
                self.name
            );
        }
        removed.len()
    }
}

/// State space statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemStats {
    pub total_states: usize,
    pub total_transitions: usize,
    pub initial_states: usize,
    pub terminal_states: usize,
    pub actions: usize,
    pub propositions: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    type Ts = TransitionSystem<&'static str, &'static str, &'static str>;

    /// s0 -a-> s1 -b-> s2, s1 -a-> s1, plus an orphan state s3
    fn small() -> Ts {
        let mut ts = Ts::with_name("small");
        ts.add_states(["s0", "s1", "s2", "s3"]);
        ts.add_action("a");
        ts.add_action("b");
        ts.add_proposition("p");
        ts.add_proposition("q");
        ts.set_initial(&"s0", true).unwrap();
        ts.add_transition(Transition::new("s0", "a", "s1")).unwrap();
        ts.add_transition(Transition::new("s1", "b", "s2")).unwrap();
        ts.add_transition(Transition::new("s1", "a", "s1")).unwrap();
        ts.add_label(&"s1", "p").unwrap();
        ts.add_label(&"s3", "q").unwrap();
        ts
    }

    fn snapshot(ts: &Ts) -> (usize, usize, usize, usize) {
        (
            ts.state_count(),
            ts.transition_count(),
            ts.labeling().values().map(HashSet::len).sum(),
            ts.initial_states().len(),
        )
    }

    #[test]
    fn test_empty_system() {
        let ts = Ts::new();
        assert_eq!(ts.state_count(), 0);
        assert_eq!(ts.transition_count(), 0);
        assert!(ts.reach().is_empty());
    }

    #[test]
    fn test_add_transition_requires_registered_parts() {
        let mut ts = small();
        let err = ts
            .add_transition(Transition::new("s0", "a", "nowhere"))
            .unwrap_err();
        assert!(err.is_reference_error());

        let err = ts
            .add_transition(Transition::new("s0", "unknown", "s1"))
            .unwrap_err();
        assert!(err.is_reference_error());

        assert!(!ts.add_transition(Transition::new("s0", "a", "s1")).unwrap());
        assert_eq!(ts.transition_count(), 3);
    }

    #[test]
    fn test_label_requires_registered_parts() {
        let mut ts = small();
        assert!(matches!(
            ts.add_label(&"nowhere", "p"),
            Err(Error::StateNotFound(_))
        ));
        assert!(matches!(
            ts.add_label(&"s0", "unknown"),
            Err(Error::InvalidLabel { .. })
        ));
        assert!(matches!(ts.label(&"nowhere"), Err(Error::StateNotFound(_))));
        assert_eq!(ts.label(&"s1").unwrap(), HashSet::from(["p"]));
        assert!(ts.label(&"s0").unwrap().is_empty());
    }

    #[test]
    fn test_remove_state_is_rejected_while_attached() {
        let mut ts = small();
        let before = snapshot(&ts);

        for state in ["s0", "s1", "s2", "s3"] {
            let err = ts.remove_state(&state).unwrap_err();
            assert!(err.is_deletion_error(), "{} should be attached", state);
            assert_eq!(snapshot(&ts), before);
        }

        assert!(matches!(
            ts.remove_state(&"s0"),
            Err(Error::DeletionOfAttached {
                part: GraphPart::InitialStates,
                ..
            })
        ));
        assert!(matches!(
            ts.remove_state(&"s3"),
            Err(Error::DeletionOfAttached {
                part: GraphPart::LabelingFunction,
                ..
            })
        ));
        assert!(matches!(
            ts.remove_state(&"s2"),
            Err(Error::DeletionOfAttached {
                part: GraphPart::Transitions,
                ..
            })
        ));
        assert!(matches!(
            ts.remove_state(&"nowhere"),
            Err(Error::StateNotFound(_))
        ));
    }

    #[test]
    fn test_remove_state_after_detaching() {
        let mut ts = small();
        assert!(ts.remove_label(&"s3", &"q").unwrap());
        ts.remove_state(&"s3").unwrap();
        assert!(!ts.contains_state(&"s3"));

        ts.remove_transition(&Transition::new("s1", "b", "s2"))
            .unwrap();
        ts.remove_state(&"s2").unwrap();
        assert_eq!(ts.state_count(), 2);
    }

    #[test]
    fn test_remove_action_and_proposition() {
        let mut ts = small();
        assert!(ts.remove_action(&"a").unwrap_err().is_deletion_error());
        assert!(matches!(
            ts.remove_action(&"zzz"),
            Err(Error::ActionNotFound(_))
        ));
        assert!(ts.remove_proposition(&"p").unwrap_err().is_deletion_error());

        ts.add_proposition("unused");
        ts.remove_proposition(&"unused").unwrap();
        assert!(!ts.propositions().contains(&"unused"));
    }

    #[test]
    fn test_post_and_pre() {
        let ts = small();
        assert_eq!(ts.post(&"s1").unwrap(), HashSet::from(["s1", "s2"]));
        assert_eq!(ts.post_by(&"s1", &"b").unwrap(), HashSet::from(["s2"]));
        assert_eq!(ts.pre(&"s1").unwrap(), HashSet::from(["s0", "s1"]));
        assert_eq!(ts.pre_by(&"s1", &"b").unwrap(), HashSet::new());
        assert!(ts.post(&"nowhere").is_err());

        let set = HashSet::from(["s0", "s1"]);
        assert_eq!(ts.post_set(&set).unwrap(), HashSet::from(["s1", "s2"]));
        assert_eq!(ts.pre_set_by(&set, &"a").unwrap(), HashSet::from(["s0", "s1"]));
        assert!(ts.post_set(&HashSet::from(["s0", "nowhere"])).is_err());
    }

    #[test]
    fn test_prune_unreachable_is_idempotent() {
        let mut ts = small();
        assert_eq!(ts.reach(), HashSet::from(["s0", "s1", "s2"]));

        assert_eq!(ts.remove_unreachable(), 1);
        let once = (ts.transitions(), ts.labeling().clone(), snapshot(&ts));
        assert!(!ts.contains_state(&"s3"));

        assert_eq!(ts.remove_unreachable(), 0);
        let twice = (ts.transitions(), ts.labeling().clone(), snapshot(&ts));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_stats_and_terminal_states() {
        let ts = small();
        assert!(ts.is_terminal(&"s2").unwrap());
        assert!(!ts.is_terminal(&"s1").unwrap());
        let stats = ts.stats();
        assert_eq!(stats.total_states, 4);
        assert_eq!(stats.total_transitions, 3);
        assert_eq!(stats.initial_states, 1);
        assert_eq!(stats.terminal_states, 2);
    }

    #[test]
    fn test_to_dot_output() {
        let ts = small();
        let dot = ts.to_dot(|s| s.to_string());
        assert!(dot.starts_with("digraph TransitionSystem"));
        assert!(dot.contains("label=\"s0\", fillcolor=\"lightblue\""));
        assert!(dot.contains("s1 -> s1 [label=\"a\"]"));
        assert!(dot.contains("s1 -> s2 [label=\"b\"]"));
    }
}
