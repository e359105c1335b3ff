//! Transition representation

use serde::{Deserialize, Serialize};
use std::fmt;

/// A labelled edge of a transition system
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transition<S, A> {
    pub from: S,
    pub action: A,
    pub to: S,
}

impl<S, A> Transition<S, A> {
    pub fn new(from: S, action: A, to: S) -> Self {
        Self { from, action, to }
    }

    /// Whether the transition starts or ends at `state`
    pub fn touches(&self, state: &S) -> bool
    where
        S: PartialEq,
    {
        self.from == *state || self.to == *state
    }
}

impl<S: fmt::Display, A: fmt::Display> fmt::Display for Transition<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} -[{}]-> {}", self.from, self.action, self.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_touches() {
        let transition = Transition::new("s0", "go", "s1");
        assert_eq!(transition.to_string(), "s0 -[go]-> s1");
        assert!(transition.touches(&"s1"));
        assert!(!transition.touches(&"s2"));
    }
}
