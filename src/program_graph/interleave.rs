//! Interleaving of program graphs
//!
//! The composed graph runs both processes side by side: every step moves
//! exactly one of them. Channel hand-shakes are not resolved here; they are
//! left for the unfolding of a channel system.

use crate::graph::Pair;
use crate::program_graph::{PgTransition, ProgramGraph};
use crate::Result;
use std::fmt;
use std::hash::Hash;

/// `pg1 ||| pg2`
///
/// Initialization lists are combined pairwise by concatenation; a side
/// without initializations contributes a single empty list.
pub fn interleave<L1, L2, A>(
    pg1: &ProgramGraph<L1, A>,
    pg2: &ProgramGraph<L2, A>,
) -> Result<ProgramGraph<Pair<L1, L2>, A>>
where
    L1: Clone + Eq + Hash + fmt::Debug,
    L2: Clone + Eq + Hash + fmt::Debug,
    A: Clone + Eq + Hash + fmt::Debug,
{
    let mut pg = ProgramGraph::with_name(format!("{} ||| {}", pg1.name(), pg2.name()));

    for l1 in pg1.locations() {
        for l2 in pg2.locations() {
            pg.add_location(Pair::new(l1.clone(), l2.clone()));
        }
    }
    for l1 in pg1.initial_locations() {
        for l2 in pg2.initial_locations() {
            pg.set_initial(&Pair::new(l1.clone(), l2.clone()), true)?;
        }
    }

    let empty = [Vec::new()];
    let inits1 = match pg1.initializations() {
        [] => &empty[..],
        inits => inits,
    };
    let inits2 = match pg2.initializations() {
        [] => &empty[..],
        inits => inits,
    };
    for init1 in inits1 {
        for init2 in inits2 {
            let combined: Vec<String> = init1.iter().chain(init2).cloned().collect();
            if !combined.is_empty() {
                pg.add_initialization(combined);
            }
        }
    }

    // (l1,l2) -> (l1',l2)
    for t in pg1.transitions() {
        for l2 in pg2.locations() {
            pg.add_transition(PgTransition::new(
                Pair::new(t.from.clone(), l2.clone()),
                t.guard.clone(),
                t.action.clone(),
                Pair::new(t.to.clone(), l2.clone()),
            ))?;
        }
    }

    // (l1,l2) -> (l1,l2')
    for t in pg2.transitions() {
        for l1 in pg1.locations() {
            pg.add_transition(PgTransition::new(
                Pair::new(l1.clone(), t.from.clone()),
                t.guard.clone(),
                t.action.clone(),
                Pair::new(l1.clone(), t.to.clone()),
            ))?;
        }
    }

    tracing::debug!(
        "Interleaved {:?} and {:?}: {} locations, {} transitions",
        pg1.name(),
        pg2.name(),
        pg.location_count(),
        pg.transition_count()
    );
    Ok(pg)
}

#[cfg(test)]
mod tests {
    use super::*;

    type Pg = ProgramGraph<&'static str, &'static str>;

    fn two_step(name: &str, a: &'static str, b: &'static str, action: &'static str) -> Pg {
        let mut pg = Pg::with_name(name);
        pg.add_location(a);
        pg.add_location(b);
        pg.set_initial(&a, true).unwrap();
        pg.add_transition(PgTransition::new(a, "", action, b)).unwrap();
        pg
    }

    #[test]
    fn test_interleave_sizes() {
        let pg1 = two_step("p", "p0", "p1", "x:=1");
        let pg2 = two_step("q", "q0", "q1", "y:=1");
        let pg = interleave(&pg1, &pg2).unwrap();

        assert_eq!(pg.name(), "p ||| q");
        assert_eq!(pg.location_count(), 4);
        assert_eq!(
            pg.initial_locations().iter().collect::<Vec<_>>(),
            vec![&Pair::new("p0", "q0")]
        );
        // Each side's transition lifted over both locations of the other side
        assert_eq!(pg.transition_count(), 2 + 2);
        assert!(pg.contains_transition(&PgTransition::new(
            Pair::new("p0", "q1"),
            "",
            "x:=1",
            Pair::new("p1", "q1"),
        )));
    }

    #[test]
    fn test_initializations_are_concatenated() {
        let mut pg1 = two_step("p", "p0", "p1", "x:=1");
        let mut pg2 = two_step("q", "q0", "q1", "y:=1");
        pg1.add_initialization(vec!["x:=0".to_string()]);
        pg1.add_initialization(vec!["x:=5".to_string()]);

        // One side without initializations keeps the other side's lists
        let pg = interleave(&pg1, &pg2).unwrap();
        assert_eq!(pg.initializations().len(), 2);

        pg2.add_initialization(vec!["y:=0".to_string()]);
        let pg = interleave(&pg1, &pg2).unwrap();
        assert_eq!(
            pg.initializations(),
            &[
                vec!["x:=0".to_string(), "y:=0".to_string()],
                vec!["x:=5".to_string(), "y:=0".to_string()],
            ]
        );
    }
}
