//! Output formatting module
//!
//! This module handles formatting program graphs and transition systems for
//! different output formats. States and locations are rendered through a
//! caller-supplied naming function.

use crate::program_graph::ProgramGraph;
use crate::transition_system::TransitionSystem;
use crate::Result;
use serde_json::json;
use std::fmt;
use std::hash::Hash;

/// Display name of a location; the exit location has an empty text
pub fn location_name(location: &str) -> String {
    if location.is_empty() {
        "<exit>".to_string()
    } else {
        location.to_string()
    }
}

fn shorten(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let kept: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        text.to_string()
    }
}

fn sorted_strings<T: ToString>(items: impl IntoIterator<Item = T>) -> Vec<String> {
    let mut strings: Vec<String> = items.into_iter().map(|item| item.to_string()).collect();
    strings.sort();
    strings
}

/// Output a transition system as JSON
pub fn output_json<S, A, P>(
    w: &mut impl std::io::Write,
    ts: &TransitionSystem<S, A, P>,
    state_name: impl Fn(&S) -> String,
) -> Result<()>
where
    S: Clone + Eq + Hash + fmt::Debug,
    A: Clone + Eq + Hash + fmt::Debug + fmt::Display,
    P: Clone + Eq + Hash + fmt::Debug + fmt::Display,
{
    let mut states: Vec<(String, &S)> = ts.states().map(|s| (state_name(s), s)).collect();
    states.sort_by(|a, b| a.0.cmp(&b.0));

    let mut transitions: Vec<(String, String, String)> = ts
        .transitions()
        .into_iter()
        .map(|t| (state_name(&t.from), t.action.to_string(), state_name(&t.to)))
        .collect();
    transitions.sort();

    let output = json!({
        "name": ts.name(),
        "summary": ts.stats(),
        "actions": sorted_strings(ts.actions()),
        "propositions": sorted_strings(ts.propositions()),
        "states": states.iter().map(|(name, state)| {
            json!({
                "name": name,
                "initial": ts.is_initial(state),
                "terminal": ts.is_terminal(state).unwrap_or(false),
                "labels": sorted_strings(ts.label(state).unwrap_or_default()),
            })
        }).collect::<Vec<_>>(),
        "transitions": transitions.iter().map(|(from, action, to)| {
            json!({
                "from": from,
                "action": action,
                "to": to,
            })
        }).collect::<Vec<_>>(),
    });

    serde_json::to_writer_pretty(&mut *w, &output)?;
    writeln!(w)?; // Add trailing newline
    Ok(())
}

/// Output a transition system as text table
pub fn output_table<S, A, P>(
    w: &mut impl std::io::Write,
    ts: &TransitionSystem<S, A, P>,
    state_name: impl Fn(&S) -> String,
) -> Result<()>
where
    S: Clone + Eq + Hash + fmt::Debug,
    A: Clone + Eq + Hash + fmt::Debug + fmt::Display,
    P: Clone + Eq + Hash + fmt::Debug + fmt::Display,
{
    let stats = ts.stats();
    writeln!(w, "Transition System: {}", ts.name())?;
    writeln!(w, "{}", "=".repeat(80))?;
    writeln!(w)?;

    writeln!(w, "Summary:")?;
    writeln!(w, "  States:       {}", stats.total_states)?;
    writeln!(w, "  Initial:      {}", stats.initial_states)?;
    writeln!(w, "  Terminal:     {}", stats.terminal_states)?;
    writeln!(w, "  Transitions:  {}", stats.total_transitions)?;
    writeln!(w, "  Actions:      {}", stats.actions)?;
    writeln!(w, "  Propositions: {}", stats.propositions)?;
    writeln!(w)?;

    let mut states: Vec<(String, &S)> = ts.states().map(|s| (state_name(s), s)).collect();
    states.sort_by(|a, b| a.0.cmp(&b.0));

    if !states.is_empty() {
        writeln!(w, "States:")?;
        writeln!(w, "{:-<120}", "")?;
        writeln!(w, "{:<5} {:<60} {:<53}", "Flags", "State", "Label")?;
        writeln!(w, "{:-<120}", "")?;

        for (name, state) in &states {
            let flags = format!(
                "{}{}",
                if ts.is_initial(state) { "I" } else { "" },
                if ts.is_terminal(state).unwrap_or(false) { "T" } else { "" },
            );
            let label = sorted_strings(ts.label(state).unwrap_or_default()).join(", ");
            writeln!(
                w,
                "{:<5} {:<60} {:<53}",
                flags,
                shorten(name, 60),
                shorten(&label, 53)
            )?;
        }
        writeln!(w)?;
    }

    let mut transitions: Vec<(String, String, String)> = ts
        .transitions()
        .into_iter()
        .map(|t| (state_name(&t.from), t.action.to_string(), state_name(&t.to)))
        .collect();
    transitions.sort();

    if !transitions.is_empty() {
        writeln!(w, "Transitions:")?;
        writeln!(w, "{:-<120}", "")?;
        writeln!(w, "{:<45} {:<28} {:<45}", "From", "Action", "To")?;
        writeln!(w, "{:-<120}", "")?;

        for (from, action, to) in &transitions {
            writeln!(
                w,
                "{:<45} {:<28} {:<45}",
                shorten(from, 45),
                shorten(action, 28),
                shorten(to, 45)
            )?;
        }
        writeln!(w)?;
    }

    Ok(())
}

/// Output program graphs as JSON
pub fn output_program_graphs_json(
    w: &mut impl std::io::Write,
    graphs: &[ProgramGraph<String, String>],
) -> Result<()> {
    let output = json!({
        "program_graphs": graphs.iter().map(|pg| {
            let mut transitions: Vec<_> = pg.transitions().into_iter().collect();
            transitions.sort_by(|a, b| {
                (&a.from, &a.guard, &a.action, &a.to).cmp(&(&b.from, &b.guard, &b.action, &b.to))
            });
            json!({
                "name": pg.name(),
                "locations": sorted_strings(pg.locations()),
                "initial": sorted_strings(pg.initial_locations()),
                "initializations": pg.initializations(),
                "transitions": transitions,
            })
        }).collect::<Vec<_>>(),
    });

    serde_json::to_writer_pretty(&mut *w, &output)?;
    writeln!(w)?;
    Ok(())
}

/// Output program graphs as text table
pub fn output_program_graphs_table(
    w: &mut impl std::io::Write,
    graphs: &[ProgramGraph<String, String>],
) -> Result<()> {
    for pg in graphs {
        writeln!(w, "Program Graph: {}", pg.name())?;
        writeln!(w, "{}", "=".repeat(80))?;
        writeln!(w, "  Locations:    {}", pg.location_count())?;
        writeln!(w, "  Transitions:  {}", pg.transition_count())?;
        for initial in sorted_strings(pg.initial_locations()) {
            writeln!(w, "  Initial:      {}", location_name(&initial))?;
        }
        for initialization in pg.initializations() {
            writeln!(w, "  Init:         {}", initialization.join("; "))?;
        }
        writeln!(w)?;

        let mut transitions: Vec<_> = pg.transitions().into_iter().collect();
        transitions.sort_by(|a, b| (&a.from, &a.action, &a.to).cmp(&(&b.from, &b.action, &b.to)));

        writeln!(w, "{:-<120}", "")?;
        writeln!(
            w,
            "{:<35} {:<25} {:<20} {:<35}",
            "From", "Guard", "Action", "To"
        )?;
        writeln!(w, "{:-<120}", "")?;
        for t in &transitions {
            writeln!(
                w,
                "{:<35} {:<25} {:<20} {:<35}",
                shorten(&location_name(&t.from), 35),
                shorten(&t.guard, 25),
                shorten(&t.action, 20),
                shorten(&location_name(&t.to), 35)
            )?;
        }
        writeln!(w)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{GuardedOption, Stmt, program_graph_from_stmt};
    use crate::graph::Pair;
    use crate::transition_system::Transition;

    fn create_test_system() -> TransitionSystem<Pair<&'static str, u8>, String, String> {
        let mut ts = TransitionSystem::with_name("test");
        let s0 = Pair::new("a", 0);
        let s1 = Pair::new("b", 1);
        ts.add_state(s0.clone());
        ts.add_state(s1.clone());
        ts.set_initial(&s0, true).unwrap();
        ts.add_action("go".to_string());
        ts.add_proposition("p".to_string());
        ts.add_label(&s1, "p".to_string()).unwrap();
        ts.add_transition(Transition::new(s0, "go".to_string(), s1))
            .unwrap();
        ts
    }

    #[test]
    fn test_output_json() {
        let ts = create_test_system();
        let mut output = Vec::new();
        output_json(&mut output, &ts, |s| s.to_string()).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(value["name"], "test");
        assert_eq!(value["summary"]["total_states"], 2);
        assert_eq!(value["states"][0]["name"], "<a, 0>");
        assert_eq!(value["states"][0]["initial"], true);
        assert_eq!(value["states"][1]["labels"][0], "p");
        assert_eq!(value["transitions"][0]["action"], "go");
    }

    #[test]
    fn test_output_table() {
        let ts = create_test_system();
        let mut output = Vec::new();
        output_table(&mut output, &ts, |s| s.to_string()).unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Transition System: test"));
        assert!(text.contains("<b, 1>"));
        assert!(text.contains("go"));
    }

    #[test]
    fn test_output_program_graphs() {
        let stmt = Stmt::do_od([GuardedOption::new("x < 3", Stmt::assign("x", "x + 1"))]);
        let graphs = vec![program_graph_from_stmt(&stmt).unwrap()];

        let mut output = Vec::new();
        output_program_graphs_json(&mut output, &graphs).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(value["program_graphs"][0]["locations"][0], "");
        assert_eq!(
            value["program_graphs"][0]["transitions"]
                .as_array()
                .unwrap()
                .len(),
            2
        );

        let mut output = Vec::new();
        output_program_graphs_table(&mut output, &graphs).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("<exit>"));
        assert!(text.contains("x:=x+1"));
    }

    #[test]
    fn test_shorten() {
        assert_eq!(shorten("abc", 5), "abc");
        assert_eq!(shorten("abcdefgh", 6), "abc...");
    }
}
