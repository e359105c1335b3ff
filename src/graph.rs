//! Graph algebra shared by program graphs and transition systems
//!
//! Both structures store their nodes in a [`StableGraph`] together with a lookup
//! table from node value to graph index, so that nodes can be removed without
//! invalidating the indices of the remaining ones. On top of that storage this
//! module provides the `pre`/`post`/`reach` operators and unreachable pruning
//! through the [`Reachability`] trait.

use crate::Result;
use petgraph::Direction;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableGraph};
use petgraph::visit::{Dfs, EdgeRef};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

/// A product node: a state or location of a composed model
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pair<A, B> {
    pub first: A,
    pub second: B,
}

impl<A, B> Pair<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A, B> From<(A, B)> for Pair<A, B> {
    fn from((first, second): (A, B)) -> Self {
        Self { first, second }
    }
}

impl<A: fmt::Display, B: fmt::Display> fmt::Display for Pair<A, B> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<{}, {}>", self.first, self.second)
    }
}

/// Directed graph whose nodes are addressed by value.
///
/// Edges form a set: adding an edge that already connects the same endpoints
/// with an equal weight is a no-op.
#[derive(Debug, Clone)]
pub struct IndexedGraph<N, E> {
    graph: StableGraph<N, E>,

    /// Lookup table mapping node values to their graph indices
    index: HashMap<N, NodeIndex>,
}

impl<N, E> Default for IndexedGraph<N, E> {
    fn default() -> Self {
        Self {
            graph: StableGraph::new(),
            index: HashMap::new(),
        }
    }
}

impl<N, E> IndexedGraph<N, E>
where
    N: Clone + Eq + Hash,
    E: PartialEq,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, node: &N) -> bool {
        self.index.contains_key(node)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &N> {
        self.index.keys()
    }

    /// Adds a node, returning `false` if it was already present.
    pub fn add_node(&mut self, node: N) -> bool {
        if self.index.contains_key(&node) {
            return false;
        }
        let idx = self.graph.add_node(node.clone());
        self.index.insert(node, idx);
        true
    }

    /// Removes a node together with its incident edges.
    pub fn remove_node(&mut self, node: &N) -> bool {
        match self.index.remove(node) {
            Some(idx) => {
                self.graph.remove_node(idx);
                true
            }
            None => false,
        }
    }

    /// Adds an edge between two registered nodes.
    ///
    /// Returns `None` if an endpoint is missing and `Some(false)` if the edge
    /// already exists.
    pub fn add_edge(&mut self, from: &N, weight: E, to: &N) -> Option<bool> {
        let from_idx = *self.index.get(from)?;
        let to_idx = *self.index.get(to)?;
        if self.find_edge(from_idx, &weight, to_idx).is_some() {
            return Some(false);
        }
        self.graph.add_edge(from_idx, to_idx, weight);
        Some(true)
    }

    pub fn remove_edge(&mut self, from: &N, weight: &E, to: &N) -> bool {
        let (Some(&from_idx), Some(&to_idx)) = (self.index.get(from), self.index.get(to)) else {
            return false;
        };
        match self.find_edge(from_idx, weight, to_idx) {
            Some(edge) => self.graph.remove_edge(edge).is_some(),
            None => false,
        }
    }

    pub fn contains_edge(&self, from: &N, weight: &E, to: &N) -> bool {
        match (self.index.get(from), self.index.get(to)) {
            (Some(&from_idx), Some(&to_idx)) => self.find_edge(from_idx, weight, to_idx).is_some(),
            _ => false,
        }
    }

    fn find_edge(&self, from: NodeIndex, weight: &E, to: NodeIndex) -> Option<EdgeIndex> {
        self.graph
            .edges_connecting(from, to)
            .find(|edge| edge.weight() == weight)
            .map(|edge| edge.id())
    }

    /// All edges as `(from, weight, to)` triples
    pub fn edges(&self) -> impl Iterator<Item = (&N, &E, &N)> {
        self.graph.edge_indices().filter_map(move |edge| {
            let (from, to) = self.graph.edge_endpoints(edge)?;
            Some((&self.graph[from], &self.graph[edge], &self.graph[to]))
        })
    }

    /// Edges touching `node` in the given direction, paired with the node on
    /// the other end. `None` if the node is absent.
    pub fn neighbors(&self, node: &N, direction: Direction) -> Option<Vec<(&E, &N)>> {
        let idx = *self.index.get(node)?;
        let neighbors = self
            .graph
            .edges_directed(idx, direction)
            .map(|edge| {
                let other = if edge.source() == idx {
                    edge.target()
                } else {
                    edge.source()
                };
                (edge.weight(), &self.graph[other])
            })
            .collect();
        Some(neighbors)
    }

    /// Nodes one edge away from `node` whose edge weight satisfies `accept`.
    pub fn step(
        &self,
        node: &N,
        direction: Direction,
        accept: impl Fn(&E) -> bool,
    ) -> Option<HashSet<N>> {
        let neighbors = self.neighbors(node, direction)?;
        Some(
            neighbors
                .into_iter()
                .filter(|(weight, _)| accept(weight))
                .map(|(_, other)| other.clone())
                .collect(),
        )
    }

    /// Whether any edge starts or ends at `node`
    pub fn has_incident_edges(&self, node: &N) -> bool {
        self.index.get(node).is_some_and(|&idx| {
            self.graph
                .edges_directed(idx, Direction::Outgoing)
                .next()
                .is_some()
                || self
                    .graph
                    .edges_directed(idx, Direction::Incoming)
                    .next()
                    .is_some()
        })
    }

    /// Depth-first exploration from every start node.
    ///
    /// The discovered set is shared across start nodes, so no node is visited
    /// twice. Absent start nodes are ignored.
    pub fn reach<'a>(&self, starts: impl IntoIterator<Item = &'a N>) -> HashSet<N>
    where
        N: 'a,
    {
        let mut dfs = Dfs::empty(&self.graph);
        let mut reached = HashSet::new();
        for start in starts {
            let Some(&idx) = self.index.get(start) else {
                continue;
            };
            dfs.move_to(idx);
            while let Some(next) = dfs.next(&self.graph) {
                reached.insert(self.graph[next].clone());
            }
        }
        reached
    }

    /// Removes every node not in `keep`, returning the removed nodes.
    ///
    /// The removal set is computed before anything is removed; incident edges
    /// go first.
    pub fn retain_nodes(&mut self, keep: &HashSet<N>) -> Vec<N> {
        let doomed: Vec<N> = self
            .index
            .keys()
            .filter(|node| !keep.contains(*node))
            .cloned()
            .collect();
        let doomed_edges: Vec<EdgeIndex> = self
            .graph
            .edge_indices()
            .filter(|&edge| {
                self.graph.edge_endpoints(edge).is_some_and(|(from, to)| {
                    !keep.contains(&self.graph[from]) || !keep.contains(&self.graph[to])
                })
            })
            .collect();
        for edge in doomed_edges {
            self.graph.remove_edge(edge);
        }
        for node in &doomed {
            self.remove_node(node);
        }
        doomed
    }
}

/// Escapes a label for use inside a quoted DOT string
pub(crate) fn dot_escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// `pre`/`post`/`reach` operators over a graph with initial nodes
pub trait Reachability {
    type Node: Clone + Eq + Hash + fmt::Debug;
    type Action;

    /// Direct successors of `node`
    fn post(&self, node: &Self::Node) -> Result<HashSet<Self::Node>>;

    /// Direct predecessors of `node`
    fn pre(&self, node: &Self::Node) -> Result<HashSet<Self::Node>>;

    /// Direct successors of `node` through edges labeled `action`
    fn post_by(&self, node: &Self::Node, action: &Self::Action) -> Result<HashSet<Self::Node>>;

    /// Direct predecessors of `node` through edges labeled `action`
    fn pre_by(&self, node: &Self::Node, action: &Self::Action) -> Result<HashSet<Self::Node>>;

    /// Every node reachable from an initial node in zero or more steps
    fn reach(&self) -> HashSet<Self::Node>;

    /// Removes unreachable nodes and everything referencing them.
    ///
    /// Returns the number of removed nodes.
    fn remove_unreachable(&mut self) -> usize;

    fn post_set(&self, nodes: &HashSet<Self::Node>) -> Result<HashSet<Self::Node>> {
        let mut result = HashSet::new();
        for node in nodes {
            result.extend(self.post(node)?);
        }
        Ok(result)
    }

    fn pre_set(&self, nodes: &HashSet<Self::Node>) -> Result<HashSet<Self::Node>> {
        let mut result = HashSet::new();
        for node in nodes {
            result.extend(self.pre(node)?);
        }
        Ok(result)
    }

    fn post_set_by(
        &self,
        nodes: &HashSet<Self::Node>,
        action: &Self::Action,
    ) -> Result<HashSet<Self::Node>> {
        let mut result = HashSet::new();
        for node in nodes {
            result.extend(self.post_by(node, action)?);
        }
        Ok(result)
    }

    fn pre_set_by(
        &self,
        nodes: &HashSet<Self::Node>,
        action: &Self::Action,
    ) -> Result<HashSet<Self::Node>> {
        let mut result = HashSet::new();
        for node in nodes {
            result.extend(self.pre_by(node, action)?);
        }
        Ok(result)
    }
}
