use crate::program_graph::ProgramGraph;
use std::fmt;
use std::hash::Hash;

/// Program graphs running concurrently and communicating over channels.
///
/// The position of a graph is its process id.
#[derive(Debug, Clone)]
pub struct ChannelSystem<L> {
    graphs: Vec<ProgramGraph<L, String>>,
}

impl<L> Default for ChannelSystem<L> {
    fn default() -> Self {
        Self { graphs: Vec::new() }
    }
}

impl<L> ChannelSystem<L>
where
    L: Clone + Eq + Hash + fmt::Debug,
{
    pub fn new(graphs: Vec<ProgramGraph<L, String>>) -> Self {
        Self { graphs }
    }

    /// Appends a process, returning its id
    pub fn add_program_graph(&mut self, graph: ProgramGraph<L, String>) -> usize {
        self.graphs.push(graph);
        self.graphs.len() - 1
    }

    pub fn program_graphs(&self) -> &[ProgramGraph<L, String>] {
        &self.graphs
    }

    pub fn program_graph(&self, id: usize) -> Option<&ProgramGraph<L, String>> {
        self.graphs.get(id)
    }

    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }

    /// Process names joined with `|||`
    pub fn name(&self) -> String {
        self.graphs
            .iter()
            .map(|graph| graph.name())
            .collect::<Vec<_>>()
            .join(" ||| ")
    }
}

impl<L> FromIterator<ProgramGraph<L, String>> for ChannelSystem<L> {
    fn from_iter<I: IntoIterator<Item = ProgramGraph<L, String>>>(iter: I) -> Self {
        Self {
            graphs: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_ids() {
        let mut cs = ChannelSystem::new(vec![ProgramGraph::<String, String>::with_name("sender")]);
        assert_eq!(cs.add_program_graph(ProgramGraph::with_name("receiver")), 1);
        assert_eq!(cs.len(), 2);
        assert_eq!(cs.program_graph(1).map(|pg| pg.name()), Some("receiver"));
        assert!(cs.program_graph(2).is_none());
        assert_eq!(cs.name(), "sender ||| receiver");

        let collected: ChannelSystem<String> = cs.program_graphs().iter().cloned().collect();
        assert_eq!(collected.len(), 2);
    }
}
