//! Evaluator module - Pluggable interpreters for actions and conditions
//!
//! Program graphs carry their actions and guards as plain text. Unfolding a
//! graph needs to know what that text means, so it consults an ordered set
//! of evaluators:
//! - an [`ActionDef`] turns an action into a store update (or rejects it),
//! - a [`ConditionDef`] decides whether a guard holds in a store,
//! - an [`InterleavingActionDef`] recognises channel actions and computes the
//!   effect of a send/receive pair firing together.
//!
//! [`parser_based`] provides the built-in implementations over the small
//! expression language in [`expr`].

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use thiserror::Error;

pub mod expr;
pub mod parser_based;

// Re-export key types
pub use expr::Expr;
pub use parser_based::{ParserBasedActionDef, ParserBasedConditionDef, ParserBasedInterleavingActionDef};

/// A variable value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Bool(bool),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Bool(_) => "bool",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Symbolic process memory: variable names mapped to values.
///
/// Ordered so that it can be part of a state and prints deterministically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Store(BTreeMap<String, Value>);

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(name.into(), value)
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.insert(name, value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Store {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} = {}", name, value)?;
        }
        f.write_str("}")
    }
}

impl FromIterator<(String, Value)> for Store {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Expression parsing and evaluation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("Undefined variable: {0}")]
    UndefinedVariable(String),

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Integer overflow")]
    Overflow,

    #[error("Cannot parse {text:?}: {message}")]
    Parse { text: String, message: String },
}

/// Interprets actions as store updates
pub trait ActionDef {
    /// Whether this evaluator understands `action`
    fn is_matching_action(&self, action: &str) -> bool;

    /// The store after performing `action`, or `None` if the action cannot be
    /// performed in `store`.
    fn effect(&self, store: &Store, action: &str) -> Option<Store>;
}

/// Interprets guards
pub trait ConditionDef {
    fn is_matching_condition(&self, condition: &str) -> bool;

    fn evaluate(&self, store: &Store, condition: &str) -> bool;
}

/// Direction of a channel action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Send,
    Receive,
}

/// A one-sided channel action such as `c!e` or `c?x`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelAction {
    pub channel: String,
    pub kind: ChannelKind,
}

impl ChannelAction {
    /// Whether `other` is the opposite side on the same channel
    pub fn complements(&self, other: &ChannelAction) -> bool {
        self.channel == other.channel && self.kind != other.kind
    }
}

/// Action evaluator aware of synchronous channel communication.
///
/// One-sided actions never fire alone; a send and a receive on the same
/// channel fire together as a single composed action whose effect is given by
/// [`ActionDef::effect`].
pub trait InterleavingActionDef: ActionDef {
    /// The channel action `action` performs, if any
    fn channel_action(&self, action: &str) -> Option<ChannelAction>;

    fn is_one_sided_action(&self, action: &str) -> bool {
        self.channel_action(action).is_some()
    }

    /// The composed action of a send firing together with a receive
    fn compose(&self, send: &str, receive: &str) -> String {
        format!("{}|{}", send, receive)
    }
}

/// Ordered collection of action and condition evaluators.
///
/// The evaluator chosen for a given action or guard text is remembered, so
/// the matching predicates run once per distinct text.
#[derive(Default)]
pub struct Evaluators {
    actions: Vec<Box<dyn ActionDef>>,
    conditions: Vec<Box<dyn ConditionDef>>,
    resolved_actions: RefCell<HashMap<String, Option<usize>>>,
    resolved_conditions: RefCell<HashMap<String, usize>>,
}

impl Evaluators {
    /// An empty collection: every action leaves the store unchanged and only
    /// the empty guard is supported.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in expression-language evaluators
    pub fn parser_based() -> Self {
        Self::new()
            .with_action(ParserBasedActionDef)
            .with_condition(ParserBasedConditionDef)
    }

    pub fn with_action(mut self, def: impl ActionDef + 'static) -> Self {
        self.actions.push(Box::new(def));
        self.resolved_actions.get_mut().clear();
        self
    }

    pub fn with_condition(mut self, def: impl ConditionDef + 'static) -> Self {
        self.conditions.push(Box::new(def));
        self.resolved_conditions.get_mut().clear();
        self
    }

    /// The single action evaluator recognising `action`, if any
    pub fn matching_action(&self, action: &str) -> Result<Option<&dyn ActionDef>> {
        let cached = self.resolved_actions.borrow().get(action).copied();
        let index = match cached {
            Some(index) => index,
            None => {
                let mut matching = self
                    .actions
                    .iter()
                    .enumerate()
                    .filter(|(_, def)| def.is_matching_action(action))
                    .map(|(index, _)| index);
                let index = match (matching.next(), matching.next()) {
                    (Some(_), Some(_)) => return Err(Error::AmbiguousEvaluator(action.to_string())),
                    (first, _) => first,
                };
                self.resolved_actions
                    .borrow_mut()
                    .insert(action.to_string(), index);
                index
            }
        };
        Ok(index.map(|index| &*self.actions[index]))
    }

    /// The single condition evaluator recognising `condition`
    fn matching_condition(&self, condition: &str) -> Result<&dyn ConditionDef> {
        let cached = self.resolved_conditions.borrow().get(condition).copied();
        let index = match cached {
            Some(index) => index,
            None => {
                let mut matching = self
                    .conditions
                    .iter()
                    .enumerate()
                    .filter(|(_, def)| def.is_matching_condition(condition))
                    .map(|(index, _)| index);
                let index = match (matching.next(), matching.next()) {
                    (Some(_), Some(_)) => {
                        return Err(Error::AmbiguousEvaluator(condition.to_string()));
                    }
                    (Some(index), None) => index,
                    (None, _) => return Err(Error::UnsupportedCondition(condition.to_string())),
                };
                self.resolved_conditions
                    .borrow_mut()
                    .insert(condition.to_string(), index);
                index
            }
        };
        Ok(&*self.conditions[index])
    }

    /// Applies `action` to `store`.
    ///
    /// Actions no evaluator recognises leave the store unchanged; `None`
    /// means the recognising evaluator rejected the action.
    pub fn effect(&self, store: &Store, action: &str) -> Result<Option<Store>> {
        match self.matching_action(action)? {
            Some(def) => Ok(def.effect(store, action)),
            None => Ok(Some(store.clone())),
        }
    }

    /// Evaluates `condition` in `store`. The empty guard always holds.
    pub fn evaluate(&self, store: &Store, condition: &str) -> Result<bool> {
        if condition.trim().is_empty() {
            return Ok(true);
        }
        Ok(self.matching_condition(condition)?.evaluate(store, condition))
    }
}

impl fmt::Debug for Evaluators {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Evaluators")
            .field("actions", &self.actions.len())
            .field("conditions", &self.conditions.len())
            .finish()
    }
}
