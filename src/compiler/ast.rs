//! Statement trees
//!
//! A closed set of nanoPromela statements. Every statement has a canonical
//! text (its `Display` form with all whitespace removed) that names the
//! program-graph location where the statement is about to run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One `var := expr` assignment inside an atomic block
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Assignment {
    pub var: String,
    pub expr: String,
}

/// A guarded option `:: guard -> body` of a conditional or loop
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GuardedOption {
    pub guard: String,
    pub body: Stmt,
}

impl GuardedOption {
    pub fn new(guard: impl Into<String>, body: Stmt) -> Self {
        Self {
            guard: guard.into(),
            body,
        }
    }
}

/// A statement tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Stmt {
    Skip,
    Assign { var: String, expr: String },
    Send { channel: String, expr: String },
    Receive { channel: String, var: String },
    Atomic { assignments: Vec<Assignment> },
    Seq { first: Box<Stmt>, second: Box<Stmt> },
    If { options: Vec<GuardedOption> },
    Do { options: Vec<GuardedOption> },
}

impl Stmt {
    pub fn skip() -> Self {
        Stmt::Skip
    }

    pub fn assign(var: impl Into<String>, expr: impl Into<String>) -> Self {
        Stmt::Assign {
            var: var.into(),
            expr: expr.into(),
        }
    }

    pub fn send(channel: impl Into<String>, expr: impl Into<String>) -> Self {
        Stmt::Send {
            channel: channel.into(),
            expr: expr.into(),
        }
    }

    pub fn receive(channel: impl Into<String>, var: impl Into<String>) -> Self {
        Stmt::Receive {
            channel: channel.into(),
            var: var.into(),
        }
    }

    pub fn atomic<V: Into<String>, E: Into<String>>(
        assignments: impl IntoIterator<Item = (V, E)>,
    ) -> Self {
        Stmt::Atomic {
            assignments: assignments
                .into_iter()
                .map(|(var, expr)| Assignment {
                    var: var.into(),
                    expr: expr.into(),
                })
                .collect(),
        }
    }

    pub fn seq(first: Stmt, second: Stmt) -> Self {
        Stmt::Seq {
            first: Box::new(first),
            second: Box::new(second),
        }
    }

    /// Chains statements with `;`. `None` for an empty list.
    pub fn seq_all(statements: impl IntoIterator<Item = Stmt>) -> Option<Self> {
        let mut statements: Vec<Stmt> = statements.into_iter().collect();
        let mut chain = statements.pop()?;
        while let Some(previous) = statements.pop() {
            chain = Stmt::seq(previous, chain);
        }
        Some(chain)
    }

    pub fn if_fi(options: impl IntoIterator<Item = GuardedOption>) -> Self {
        Stmt::If {
            options: options.into_iter().collect(),
        }
    }

    pub fn do_od(options: impl IntoIterator<Item = GuardedOption>) -> Self {
        Stmt::Do {
            options: options.into_iter().collect(),
        }
    }

    /// Statements that run as a single step
    pub fn is_leaf(&self) -> bool {
        matches!(
            self,
            Stmt::Skip
                | Stmt::Assign { .. }
                | Stmt::Send { .. }
                | Stmt::Receive { .. }
                | Stmt::Atomic { .. }
        )
    }

    /// The canonical text naming this statement's location
    pub fn text(&self) -> String {
        self.to_string()
    }
}

fn compact(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// A piece of canonical text still to be written
enum Fragment<'a> {
    Text(&'static str),
    Compact(&'a str),
    Node(&'a Stmt),
}

impl fmt::Display for Stmt {
    /// Writes the canonical text from an explicit work-list, so arbitrarily
    /// deep trees render without growing the call stack.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut pending = vec![Fragment::Node(self)];
        while let Some(fragment) = pending.pop() {
            let stmt = match fragment {
                Fragment::Text(text) => {
                    f.write_str(text)?;
                    continue;
                }
                Fragment::Compact(text) => {
                    f.write_str(&compact(text))?;
                    continue;
                }
                Fragment::Node(stmt) => stmt,
            };

            // Children are pushed in reverse so they pop in writing order
            match stmt {
                Stmt::Skip => f.write_str("skip")?,
                Stmt::Assign { var, expr } => write!(f, "{}:={}", compact(var), compact(expr))?,
                Stmt::Send { channel, expr } => write!(f, "{}!{}", compact(channel), compact(expr))?,
                Stmt::Receive { channel, var } => {
                    write!(f, "{}?{}", compact(channel), compact(var))?
                }
                Stmt::Atomic { assignments } => {
                    f.write_str("atomic{")?;
                    for (i, Assignment { var, expr }) in assignments.iter().enumerate() {
                        if i > 0 {
                            f.write_str(";")?;
                        }
                        write!(f, "{}:={}", compact(var), compact(expr))?;
                    }
                    f.write_str("}")?;
                }
                Stmt::Seq { first, second } => {
                    pending.push(Fragment::Node(&**second));
                    pending.push(Fragment::Text(";"));
                    pending.push(Fragment::Node(&**first));
                }
                Stmt::If { options } | Stmt::Do { options } => {
                    let (open, close) = match stmt {
                        Stmt::If { .. } => ("if", "fi"),
                        _ => ("do", "od"),
                    };
                    pending.push(Fragment::Text(close));
                    for option in options.iter().rev() {
                        pending.push(Fragment::Node(&option.body));
                        pending.push(Fragment::Text("->"));
                        pending.push(Fragment::Compact(&option.guard));
                        pending.push(Fragment::Text("::"));
                    }
                    f.write_str(open)?;
                }
            }
        }
        Ok(())
    }
}

/// Moves the direct children of `stmt` into `pending`, leaving `skip` behind
fn detach_children(stmt: &mut Stmt, pending: &mut Vec<Stmt>) {
    match stmt {
        Stmt::Seq { first, second } => {
            pending.push(std::mem::replace(&mut **first, Stmt::Skip));
            pending.push(std::mem::replace(&mut **second, Stmt::Skip));
        }
        Stmt::If { options } | Stmt::Do { options } => {
            pending.extend(options.drain(..).map(|option| option.body));
        }
        _ => {}
    }
}

impl Drop for Stmt {
    // Tears deep trees down iteratively instead of through nested drop glue
    fn drop(&mut self) {
        let mut pending = Vec::new();
        detach_children(self, &mut pending);
        while let Some(mut stmt) = pending.pop() {
            detach_children(&mut stmt, &mut pending);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_text() {
        let stmt = Stmt::seq(
            Stmt::assign("x", "0"),
            Stmt::do_od([GuardedOption::new("x < 3", Stmt::assign("x", "x + 1"))]),
        );
        assert_eq!(stmt.text(), "x:=0;do::x<3->x:=x+1od");

        let choice = Stmt::if_fi([
            GuardedOption::new("c", Stmt::send("ch", "x * 2")),
            GuardedOption::new("!c", Stmt::receive("ch", "y")),
        ]);
        assert_eq!(choice.text(), "if::c->ch!x*2::!c->ch?yfi");

        let block = Stmt::atomic([("a", "1"), ("b", "a + 1")]);
        assert_eq!(block.text(), "atomic{a:=1;b:=a+1}");
        assert!(block.is_leaf());
        assert!(!choice.is_leaf());
    }

    #[test]
    fn test_seq_all() {
        assert!(Stmt::seq_all([]).is_none());
        let chain = Stmt::seq_all([Stmt::skip(), Stmt::assign("x", "1"), Stmt::skip()]).unwrap();
        assert_eq!(chain.text(), "skip;x:=1;skip");
        assert!(matches!(chain, Stmt::Seq { ref first, .. } if **first == Stmt::Skip));
    }

    #[test]
    fn test_deserialize_from_toml() {
        let stmt: Stmt = toml::from_str(
            r#"
kind = "seq"

[first]
kind = "assign"
var = "x"
expr = "0"

[second]
kind = "do"

[[second.options]]
guard = "x < 3"
body = { kind = "assign", var = "x", expr = "x + 1" }
            "#,
        )
        .unwrap();
        assert_eq!(stmt.text(), "x:=0;do::x<3->x:=x+1od");
    }

    #[test]
    fn test_deeply_nested_text() {
        let depth = 5000;
        let mut stmt = Stmt::skip();
        for i in 0..depth {
            let option = GuardedOption::new("true", stmt);
            stmt = if i % 2 == 0 {
                Stmt::if_fi([option])
            } else {
                Stmt::do_od([option])
            };
        }

        let text = stmt.text();
        assert!(text.starts_with("do::true->if::true->do::true->"));
        assert!(text.ends_with("->skipfiod"));
        assert_eq!(text.matches("::true->").count(), depth);
        assert_eq!(text, stmt.to_string());
    }

    #[test]
    fn test_multi_option_text_order() {
        let stmt = Stmt::do_od([
            GuardedOption::new("a", Stmt::seq(Stmt::skip(), Stmt::assign("x", "1"))),
            GuardedOption::new("b", Stmt::if_fi([GuardedOption::new("c", Stmt::skip())])),
        ]);
        assert_eq!(stmt.text(), "do::a->skip;x:=1::b->if::c->skipfiod");
    }
}
