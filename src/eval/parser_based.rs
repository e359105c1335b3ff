//! Built-in evaluators over the expression language
//!
//! Recognised actions:
//! - `skip`
//! - `x := e`
//! - `atomic{x := e; y := f}` (assignments applied left to right)
//! - `c!e` and `c?x` (channel actions, only through the interleaving evaluator)
//! - `c!e|c?x` (a send and receive firing together: `x` gets the value of `e`)

use crate::eval::{
    ActionDef, ChannelAction, ChannelKind, ConditionDef, Expr, InterleavingActionDef, Store, Value,
};
use regex::Regex;
use std::sync::LazyLock;

static ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_]\w*)\s*:=\s*(.+)$").expect("assignment pattern is valid")
});

static ATOMIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^atomic\s*\{(.*)\}$").expect("atomic pattern is valid"));

static SEND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z_]\w*)\s*!\s*([^=\s].*)$").expect("send pattern is valid"));

static RECEIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_]\w*)\s*\?\s*([A-Za-z_]\w*)$").expect("receive pattern is valid")
});

/// A single `var := expr` assignment
#[derive(Debug, Clone, PartialEq, Eq)]
struct Assignment {
    var: String,
    expr: Expr,
}

fn assignment(text: &str) -> Option<Assignment> {
    let captures = ASSIGNMENT.captures(text.trim())?;
    let expr = Expr::parse(&captures[2]).ok()?;
    Some(Assignment {
        var: captures[1].to_string(),
        expr,
    })
}

/// The assignments performed by `action`: empty for `skip`, one for a plain
/// assignment, the sequence for an atomic block.
fn assignments(action: &str) -> Option<Vec<Assignment>> {
    let action = action.trim();
    if action == "skip" {
        return Some(Vec::new());
    }
    if let Some(captures) = ATOMIC.captures(action) {
        return captures[1]
            .split(';')
            .map(str::trim)
            .filter(|part| !part.is_empty() && *part != "skip")
            .map(assignment)
            .collect();
    }
    assignment(action).map(|assignment| vec![assignment])
}

fn apply(store: &Store, assignments: &[Assignment], action: &str) -> Option<Store> {
    let mut next = store.clone();
    for Assignment { var, expr } in assignments {
        match expr.eval(&next) {
            Ok(value) => {
                next.insert(var.clone(), value);
            }
            Err(err) => {
                tracing::debug!("Rejecting {:?} in {}: {}", action, store, err);
                return None;
            }
        }
    }
    Some(next)
}

/// Evaluates `skip`, assignments and atomic blocks
#[derive(Debug, Clone, Copy, Default)]
pub struct ParserBasedActionDef;

impl ActionDef for ParserBasedActionDef {
    fn is_matching_action(&self, action: &str) -> bool {
        assignments(action).is_some()
    }

    fn effect(&self, store: &Store, action: &str) -> Option<Store> {
        apply(store, &assignments(action)?, action)
    }
}

/// Evaluates boolean expressions; anything else (or an evaluation error)
/// makes the guard false.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParserBasedConditionDef;

impl ConditionDef for ParserBasedConditionDef {
    fn is_matching_condition(&self, condition: &str) -> bool {
        Expr::parse(condition).is_ok()
    }

    fn evaluate(&self, store: &Store, condition: &str) -> bool {
        match Expr::parse(condition).and_then(|expr| expr.eval(store)) {
            Ok(Value::Bool(holds)) => holds,
            Ok(value) => {
                tracing::debug!("Condition {:?} evaluated to non-boolean {}", condition, value);
                false
            }
            Err(err) => {
                tracing::debug!("Condition {:?} failed in {}: {}", condition, store, err);
                false
            }
        }
    }
}

/// Evaluates channel actions and their hand-shakes
#[derive(Debug, Clone, Copy, Default)]
pub struct ParserBasedInterleavingActionDef;

#[derive(Debug)]
struct SendAction {
    channel: String,
    expr: Expr,
}

#[derive(Debug)]
struct ReceiveAction {
    channel: String,
    var: String,
}

fn send(action: &str) -> Option<SendAction> {
    let captures = SEND.captures(action.trim())?;
    let expr = Expr::parse(&captures[2]).ok()?;
    Some(SendAction {
        channel: captures[1].to_string(),
        expr,
    })
}

fn receive(action: &str) -> Option<ReceiveAction> {
    let captures = RECEIVE.captures(action.trim())?;
    Some(ReceiveAction {
        channel: captures[1].to_string(),
        var: captures[2].to_string(),
    })
}

/// Splits a composed `send|receive` action. The receive side contains no `|`,
/// so the last separator is the right one even when the sent expression uses
/// `||`.
fn handshake(action: &str) -> Option<(SendAction, ReceiveAction)> {
    let (left, right) = action.rsplit_once('|')?;
    let send = send(left)?;
    let receive = receive(right)?;
    (send.channel == receive.channel).then_some((send, receive))
}

impl ActionDef for ParserBasedInterleavingActionDef {
    fn is_matching_action(&self, action: &str) -> bool {
        handshake(action).is_some() || self.is_one_sided_action(action)
    }

    fn effect(&self, store: &Store, action: &str) -> Option<Store> {
        // One-sided actions never fire alone
        let (send, receive) = handshake(action)?;
        match send.expr.eval(store) {
            Ok(value) => Some(store.clone().with(receive.var, value)),
            Err(err) => {
                tracing::debug!("Rejecting {:?} in {}: {}", action, store, err);
                None
            }
        }
    }
}

impl InterleavingActionDef for ParserBasedInterleavingActionDef {
    fn channel_action(&self, action: &str) -> Option<ChannelAction> {
        if let Some(SendAction { channel, .. }) = send(action) {
            return Some(ChannelAction {
                channel,
                kind: ChannelKind::Send,
            });
        }
        receive(action).map(|ReceiveAction { channel, .. }| ChannelAction {
            channel,
            kind: ChannelKind::Receive,
        })
    }
}
