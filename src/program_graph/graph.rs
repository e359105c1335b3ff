use crate::error::{Error, GraphPart};
use crate::graph::{IndexedGraph, Reachability, dot_escape};
use crate::Result;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

/// Edge weight of a program graph: the guard enabling the edge and the
/// action it performs. The empty guard is always enabled.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Guarded<A> {
    pub guard: String,
    pub action: A,
}

/// A guarded control-flow edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PgTransition<L, A> {
    pub from: L,
    pub guard: String,
    pub action: A,
    pub to: L,
}

impl<L, A> PgTransition<L, A> {
    pub fn new(from: L, guard: impl Into<String>, action: A, to: L) -> Self {
        Self {
            from,
            guard: guard.into(),
            action,
            to,
        }
    }
}

impl<L: fmt::Display, A: fmt::Display> fmt::Display for PgTransition<L, A> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} -[{} / {}]-> {}",
            self.from, self.guard, self.action, self.to
        )
    }
}

/// Control-flow graph of one sequential process.
///
/// Initializations are assignment lists run before the process starts; each
/// list yields one initial variable store when the graph is unfolded.
#[derive(Debug, Clone)]
pub struct ProgramGraph<L, A> {
    name: String,
    graph: IndexedGraph<L, Guarded<A>>,
    initial: HashSet<L>,

    /// Ordered, duplicate-free
    initializations: Vec<Vec<String>>,
}

impl<L, A> Default for ProgramGraph<L, A> {
    fn default() -> Self {
        Self {
            name: String::new(),
            graph: IndexedGraph::default(),
            initial: HashSet::new(),
            initializations: Vec::new(),
        }
    }
}

impl<L, A> ProgramGraph<L, A>
where
    L: Clone + Eq + Hash + fmt::Debug,
    A: Clone + Eq + Hash + fmt::Debug,
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

    // Locations

    pub fn locations(&self) -> impl Iterator<Item = &L> {
        self.graph.nodes()
    }

    pub fn location_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn contains_location(&self, location: &L) -> bool {
        self.graph.contains(location)
    }

    pub fn add_location(&mut self, location: L) -> bool {
        self.graph.add_node(location)
    }

    pub fn remove_location(&mut self, location: &L) -> Result<()> {
        if !self.graph.contains(location) {
            return Err(Error::location_not_found(location));
        }
        if self.initial.contains(location) {
            return Err(Error::attached(location, GraphPart::InitialStates));
        }
        if self.graph.has_incident_edges(location) {
            return Err(Error::attached(location, GraphPart::Transitions));
        }
        self.graph.remove_node(location);
        Ok(())
    }

    pub fn initial_locations(&self) -> &HashSet<L> {
        &self.initial
    }

    pub fn is_initial(&self, location: &L) -> bool {
        self.initial.contains(location)
    }

    pub fn set_initial(&mut self, location: &L, initial: bool) -> Result<()> {
        if !self.graph.contains(location) {
            return Err(Error::location_not_found(location));
        }
        if initial {
            self.initial.insert(location.clone());
        } else {
            self.initial.remove(location);
        }
        Ok(())
    }

    // Initializations

    pub fn initializations(&self) -> &[Vec<String>] {
        &self.initializations
    }

    /// Adds an initialization list, returning `false` if it was already present.
    pub fn add_initialization(&mut self, initialization: Vec<String>) -> bool {
        if self.initializations.contains(&initialization) {
            return false;
        }
        self.initializations.push(initialization);
        true
    }

    // Transitions

    /// Actions used by at least one transition
    pub fn actions(&self) -> HashSet<A> {
        self.graph
            .edges()
            .map(|(_, guarded, _)| guarded.action.clone())
            .collect()
    }

    pub fn transitions(&self) -> HashSet<PgTransition<L, A>> {
        self.graph
            .edges()
            .map(|(from, guarded, to)| {
                PgTransition::new(
                    from.clone(),
                    guarded.guard.clone(),
                    guarded.action.clone(),
                    to.clone(),
                )
            })
            .collect()
    }

    pub fn transition_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains_transition(&self, transition: &PgTransition<L, A>) -> bool {
        let weight = Guarded {
            guard: transition.guard.clone(),
            action: transition.action.clone(),
        };
        self.graph
            .contains_edge(&transition.from, &weight, &transition.to)
    }

    /// Edges leaving `location` as `(guarded action, target)` pairs
    pub fn outgoing(&self, location: &L) -> Result<Vec<(&Guarded<A>, &L)>> {
        self.graph
            .neighbors(location, Direction::Outgoing)
            .ok_or_else(|| Error::location_not_found(location))
    }

    /// Adds a transition between registered locations, returning `false` if
    /// it was already present.
    pub fn add_transition(&mut self, transition: PgTransition<L, A>) -> Result<bool> {
        let PgTransition {
            from,
            guard,
            action,
            to,
        } = transition;
        match self.graph.add_edge(&from, Guarded { guard, action }, &to) {
            Some(added) => Ok(added),
            None => Err(Error::invalid_transition(&(from, to))),
        }
    }

    pub fn remove_transition(&mut self, transition: &PgTransition<L, A>) -> Result<bool> {
        if !self.graph.contains(&transition.from) || !self.graph.contains(&transition.to) {
            return Err(Error::invalid_transition(transition));
        }
        let weight = Guarded {
            guard: transition.guard.clone(),
            action: transition.action.clone(),
        };
        Ok(self
            .graph
            .remove_edge(&transition.from, &weight, &transition.to))
    }

    /// Copy of the graph with every location renamed through `rename`.
    ///
    /// `rename` must be injective on the locations of the graph.
    pub fn map_locations<M>(&self, rename: impl Fn(&L) -> M) -> Result<ProgramGraph<M, A>>
    where
        M: Clone + Eq + Hash + fmt::Debug,
    {
        let mut mapped = ProgramGraph::with_name(self.name.clone());
        for location in self.locations() {
            if !mapped.add_location(rename(location)) {
                return Err(Error::custom(format!(
                    "Renaming merges location {:?} with another location",
                    location
                )));
            }
        }
        for location in &self.initial {
            mapped.set_initial(&rename(location), true)?;
        }
        for (from, guarded, to) in self.graph.edges() {
            mapped.add_transition(PgTransition::new(
                rename(from),
                guarded.guard.clone(),
                guarded.action.clone(),
                rename(to),
            ))?;
        }
        mapped.initializations = self.initializations.clone();
        Ok(mapped)
    }

    /// Export to DOT format for Graphviz
    pub fn to_dot(&self, location_name: impl Fn(&L) -> String) -> String
    where
        A: fmt::Display,
    {
        let mut named: Vec<(String, &L)> =
            self.locations().map(|l| (location_name(l), l)).collect();
        named.sort_by(|a, b| a.0.cmp(&b.0));

        let mut dot = "digraph ProgramGraph {\n".to_string();
        dot.push_str("  rankdir=LR;\n");
        dot.push_str("  node [shape=ellipse, style=filled];\n\n");

        for (id, (name, location)) in named.iter().enumerate() {
            let color = if self.initial.contains(*location) {
                "lightblue"
            } else {
                "lightgreen"
            };
            dot.push_str(&format!(
                "  l{} [label=\"{}\", fillcolor=\"{}\"];\n",
                id,
                dot_escape(name),
                color
            ));
        }

        dot.push('\n');

        let id_of = |location: &L| named.iter().position(|(_, l)| *l == location);
        let mut edges: Vec<(usize, String, usize)> = self
            .graph
            .edges()
            .filter_map(|(from, guarded, to)| {
                let label = if guarded.guard.is_empty() {
                    guarded.action.to_string()
                } else {
                    format!("{} / {}", guarded.guard, guarded.action)
                };
                Some((id_of(from)?, label, id_of(to)?))
            })
            .collect();
        edges.sort();
        for (from, label, to) in edges {
            dot.push_str(&format!(
                "  l{} -> l{} [label=\"{}\"];\n",
                from,
                to,
                dot_escape(&label)
            ));
        }

        dot.push_str("}\n");
        dot
    }
}

impl<L, A> Reachability for ProgramGraph<L, A>
where
    L: Clone + Eq + Hash + fmt::Debug,
    A: Clone + Eq + Hash + fmt::Debug,
{
    type Node = L;
    type Action = A;

    fn post(&self, location: &L) -> Result<HashSet<L>> {
        self.graph
            .step(location, Direction::Outgoing, |_| true)
            .ok_or_else(|| Error::location_not_found(location))
    }

    fn pre(&self, location: &L) -> Result<HashSet<L>> {
        self.graph
            .step(location, Direction::Incoming, |_| true)
            .ok_or_else(|| Error::location_not_found(location))
    }

    fn post_by(&self, location: &L, action: &A) -> Result<HashSet<L>> {
        self.graph
            .step(location, Direction::Outgoing, |guarded| guarded.action == *action)
            .ok_or_else(|| Error::location_not_found(location))
    }

    fn pre_by(&self, location: &L, action: &A) -> Result<HashSet<L>> {
        self.graph
            .step(location, Direction::Incoming, |guarded| guarded.action == *action)
            .ok_or_else(|| Error::location_not_found(location))
    }

    fn reach(&self) -> HashSet<L> {
        self.graph.reach(&self.initial)
    }

    fn remove_unreachable(&mut self) -> usize {
        let reachable = self.reach();
        let removed = self.graph.retain_nodes(&reachable);
        if !removed.is_empty() {
            tracing::debug!(
                "Pruned {} unreachable locations from {:?}",
                removed.len(),
                self.name
            );
        }
        removed.len()
    }
}
