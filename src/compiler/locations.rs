//! Statement tree to program graph compilation
//!
//! A location is the text of the statement that remains to run, and `""`
//! means the process has finished. The location of a sub-statement `s`
//! nested inside sequences is `s;rest`, where `rest` is what runs after it.
//!
//! Both the location enumeration and the edge inference walk the tree with
//! explicit stacks so that deeply nested programs cannot overflow the call
//! stack.

use crate::compiler::Stmt;
use crate::graph::Reachability;
use crate::program_graph::{PgTransition, ProgramGraph};
use crate::Result;
use std::collections::{HashMap, HashSet};

/// The final location
pub const EXIT: &str = "";

/// A statement reached through a chain of sequences, followed by `rest`
/// (innermost continuation first).
#[derive(Debug, Clone)]
pub struct SubLocation<'a> {
    pub stmt: &'a Stmt,
    pub rest: Vec<&'a Stmt>,
}

impl SubLocation<'_> {
    /// Text of the continuation, `""` if nothing follows
    pub fn rest_text(&self) -> String {
        self.rest
            .iter()
            .map(|stmt| stmt.text())
            .collect::<Vec<_>>()
            .join(";")
    }

    pub fn text(&self) -> String {
        chain(&self.stmt.text(), &self.rest_text())
    }
}

/// An inferred edge of a statement, before its continuation is applied
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub guard: String,
    pub action: String,
    pub to: String,
}

/// `to;rest`, where an exit target is replaced by the continuation itself
fn chain(to: &str, rest: &str) -> String {
    match (to, rest) {
        (EXIT, rest) => rest.to_string(),
        (to, EXIT) => to.to_string(),
        (to, rest) => format!("{};{}", to, rest),
    }
}

/// `(g)` or `(g) && (inner)`
fn conjoin(guard: &str, inner: &str) -> String {
    if inner.is_empty() {
        format!("({})", guard)
    } else {
        format!("({}) && ({})", guard, inner)
    }
}

fn compact(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Every location of `root`, deduplicated by text.
///
/// - `s1;s2`: the locations of `s1` continued by `s2`, then those of `s2`
/// - `if`: the statement itself and the locations of each option body
/// - `do`: the statement itself and the locations of each option body
///   continued by the loop
/// - anything else: the statement itself
pub fn sub_locations(root: &Stmt) -> Vec<SubLocation<'_>> {
    let mut locations = Vec::new();
    let mut seen = HashSet::new();
    let mut stack = vec![SubLocation {
        stmt: root,
        rest: Vec::new(),
    }];

    while let Some(location) = stack.pop() {
        match location.stmt {
            Stmt::Seq { first, second } => {
                stack.push(SubLocation {
                    stmt: second,
                    rest: location.rest.clone(),
                });
                let mut rest = vec![&**second];
                rest.extend(location.rest);
                stack.push(SubLocation { stmt: first, rest });
            }
            Stmt::If { options } => {
                for option in options.iter().rev() {
                    stack.push(SubLocation {
                        stmt: &option.body,
                        rest: location.rest.clone(),
                    });
                }
                if seen.insert(location.text()) {
                    locations.push(location);
                }
            }
            Stmt::Do { options } => {
                for option in options.iter().rev() {
                    let mut rest = vec![location.stmt];
                    rest.extend(location.rest.iter().copied());
                    stack.push(SubLocation {
                        stmt: &option.body,
                        rest,
                    });
                }
                if seen.insert(location.text()) {
                    locations.push(location);
                }
            }
            _ => {
                if seen.insert(location.text()) {
                    locations.push(location);
                }
            }
        }
    }

    locations
}

/// Memoized edge inference, keyed by statement text
#[derive(Debug, Default)]
pub struct EdgeTable {
    edges: HashMap<String, Vec<Edge>>,
}

impl EdgeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The edges leaving the start of `stmt`.
    ///
    /// - a single step: one unguarded edge to `""` performing it
    /// - `s1;s2`: the edges of `s1` continued by `s2`
    /// - `if`: each option's body edges, guarded by `(g)` or `(g) && (inner)`
    /// - `do`: like `if`, continued by the loop; plus an exit edge guarded by
    ///   the negation of every option guard
    pub fn edges(&mut self, stmt: &Stmt) -> &[Edge] {
        let key = stmt.text();
        if !self.edges.contains_key(&key) {
            self.infer(stmt);
        }
        self.edges.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Post-order walk: a node's edges are built once all children it
    /// depends on are in the table.
    fn infer(&mut self, root: &Stmt) {
        let mut stack = vec![(root, false)];
        while let Some((stmt, expanded)) = stack.pop() {
            let text = stmt.text();
            if self.edges.contains_key(&text) {
                continue;
            }
            if !expanded {
                stack.push((stmt, true));
                match stmt {
                    Stmt::Seq { first, .. } => stack.push((&**first, false)),
                    Stmt::If { options } | Stmt::Do { options } => {
                        stack.extend(options.iter().map(|option| (&option.body, false)));
                    }
                    _ => {}
                }
                continue;
            }
            let edges = self.combine(stmt, &text);
            self.edges.insert(text, edges);
        }
    }

    fn known(&self, stmt: &Stmt) -> &[Edge] {
        self.edges
            .get(&stmt.text())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn combine(&self, stmt: &Stmt, text: &str) -> Vec<Edge> {
        match stmt {
            Stmt::Seq { first, second } => {
                let rest = second.text();
                self.known(first)
                    .iter()
                    .map(|edge| Edge {
                        guard: edge.guard.clone(),
                        action: edge.action.clone(),
                        to: chain(&edge.to, &rest),
                    })
                    .collect()
            }
            Stmt::If { options } => options
                .iter()
                .flat_map(|option| {
                    let guard = compact(&option.guard);
                    self.known(&option.body).iter().map(move |edge| Edge {
                        guard: conjoin(&guard, &edge.guard),
                        action: edge.action.clone(),
                        to: edge.to.clone(),
                    })
                })
                .collect(),
            Stmt::Do { options } => {
                let mut edges: Vec<Edge> = options
                    .iter()
                    .flat_map(|option| {
                        let guard = compact(&option.guard);
                        self.known(&option.body).iter().map(move |edge| Edge {
                            guard: conjoin(&guard, &edge.guard),
                            action: edge.action.clone(),
                            to: if edge.to == EXIT {
                                text.to_string()
                            } else {
                                format!("{};{}", edge.to, text)
                            },
                        })
                    })
                    .collect();
                let exit_guard = options
                    .iter()
                    .map(|option| format!("!(({}))", compact(&option.guard)))
                    .collect::<Vec<_>>()
                    .join(" && ");
                edges.push(Edge {
                    guard: exit_guard,
                    action: String::new(),
                    to: EXIT.to_string(),
                });
                edges
            }
            leaf => vec![Edge {
                guard: String::new(),
                action: leaf.text(),
                to: EXIT.to_string(),
            }],
        }
    }
}

/// Compiles a statement into a program graph.
///
/// The initial location is the statement's text. Locations that cannot be
/// reached from it are pruned.
pub fn program_graph_from_stmt(root: &Stmt) -> Result<ProgramGraph<String, String>> {
    let mut pg = ProgramGraph::new();
    let mut table = EdgeTable::new();

    pg.add_location(EXIT.to_string());
    let initial = root.text();
    pg.add_location(initial.clone());

    for location in sub_locations(root) {
        let from = location.text();
        let rest = location.rest_text();
        pg.add_location(from.clone());
        for edge in table.edges(location.stmt) {
            let to = chain(&edge.to, &rest);
            pg.add_location(to.clone());
            pg.add_transition(PgTransition::new(
                from.clone(),
                edge.guard.clone(),
                edge.action.clone(),
                to,
            ))?;
        }
    }

    pg.set_initial(&initial, true)?;
    let pruned = pg.remove_unreachable();
    tracing::debug!(
        "Compiled {:?}: {} locations, {} transitions ({} unreachable pruned)",
        initial,
        pg.location_count(),
        pg.transition_count(),
        pruned
    );
    Ok(pg)
}
