//! Expression language
//!
//! Integer and boolean expressions over store variables:
//! `+ - * / %`, `< <= > >=`, `== !=`, `&& || !`, parentheses and the
//! literals `true`/`false`. Binary operators are left associative; `&&` and
//! `||` short-circuit.

use crate::eval::{EvalError, Store, Value};
use pest::Parser;
use pest::iterators::Pairs;
use pest::pratt_parser::PrattParser;
use pest_derive::Parser;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

#[derive(Parser)]
#[grammar = "eval/expr.pest"]
struct ExprParser;

static PRATT_PARSER: LazyLock<PrattParser<Rule>> = LazyLock::new(|| {
    use pest::pratt_parser::{Assoc::*, Op};
    use Rule::*;

    // Precedence is defined lowest to highest
    PrattParser::new()
        .op(Op::infix(or, Left))
        .op(Op::infix(and, Left))
        .op(Op::infix(eq, Left) | Op::infix(ne, Left))
        .op(Op::infix(lt, Left) | Op::infix(le, Left) | Op::infix(gt, Left) | Op::infix(ge, Left))
        .op(Op::infix(add, Left) | Op::infix(sub, Left))
        .op(Op::infix(mul, Left) | Op::infix(div, Left) | Op::infix(rem, Left))
        .op(Op::prefix(neg) | Op::prefix(not))
});

/// Parsed expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Int(i64),
    Bool(bool),
    Var(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        }
    }
}

fn parse_error(text: &str, message: &str) -> EvalError {
    EvalError::Parse {
        text: text.to_string(),
        message: message.to_string(),
    }
}

/// Builds the tree of one `expr` pair's children
fn build(pairs: Pairs<Rule>, text: &str) -> Result<Expr, EvalError> {
    PRATT_PARSER
        .map_primary(|primary| match primary.as_rule() {
            Rule::integer => primary
                .as_str()
                .parse()
                .map(Expr::Int)
                .map_err(|_| parse_error(text, "integer literal out of range")),
            Rule::boolean => Ok(Expr::Bool(primary.as_str() == "true")),
            Rule::ident => Ok(Expr::Var(primary.as_str().to_string())),
            Rule::expr => build(primary.into_inner(), text),
            rule => Err(parse_error(text, &format!("unexpected {:?}", rule))),
        })
        .map_prefix(|op, arg| {
            let op = match op.as_rule() {
                Rule::neg => UnaryOp::Neg,
                Rule::not => UnaryOp::Not,
                rule => return Err(parse_error(text, &format!("unexpected {:?}", rule))),
            };
            Ok(Expr::Unary(op, Box::new(arg?)))
        })
        .map_infix(|lhs, op, rhs| {
            let op = match op.as_rule() {
                Rule::or => BinaryOp::Or,
                Rule::and => BinaryOp::And,
                Rule::eq => BinaryOp::Eq,
                Rule::ne => BinaryOp::Ne,
                Rule::lt => BinaryOp::Lt,
                Rule::le => BinaryOp::Le,
                Rule::gt => BinaryOp::Gt,
                Rule::ge => BinaryOp::Ge,
                Rule::add => BinaryOp::Add,
                Rule::sub => BinaryOp::Sub,
                Rule::mul => BinaryOp::Mul,
                Rule::div => BinaryOp::Div,
                Rule::rem => BinaryOp::Rem,
                rule => return Err(parse_error(text, &format!("unexpected {:?}", rule))),
            };
            Ok(Expr::Binary(op, Box::new(lhs?), Box::new(rhs?)))
        })
        .parse(pairs)
}

impl Expr {
    pub fn parse(text: &str) -> Result<Expr, EvalError> {
        let mut pairs = ExprParser::parse(Rule::expression, text)
            .map_err(|err| parse_error(text, &err.variant.message()))?;
        match pairs.next() {
            Some(expr) if expr.as_rule() == Rule::expr => build(expr.into_inner(), text),
            _ => Err(parse_error(text, "expected an expression")),
        }
    }

    /// The value of a literal expression such as `3`, `-1` or `true`
    pub fn as_literal(&self) -> Option<Value> {
        match self {
            Expr::Int(n) => Some(Value::Int(*n)),
            Expr::Bool(b) => Some(Value::Bool(*b)),
            Expr::Unary(UnaryOp::Neg, inner) => match **inner {
                Expr::Int(n) => n.checked_neg().map(Value::Int),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn eval(&self, store: &Store) -> Result<Value, EvalError> {
        match self {
            Expr::Int(n) => Ok(Value::Int(*n)),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Var(name) => store
                .get(name)
                .copied()
                .ok_or_else(|| EvalError::UndefinedVariable(name.clone())),
            Expr::Unary(UnaryOp::Neg, inner) => {
                let n = expect_int(inner.eval(store)?)?;
                n.checked_neg().map(Value::Int).ok_or(EvalError::Overflow)
            }
            Expr::Unary(UnaryOp::Not, inner) => Ok(Value::Bool(!expect_bool(inner.eval(store)?)?)),
            Expr::Binary(BinaryOp::And, lhs, rhs) => {
                if !expect_bool(lhs.eval(store)?)? {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(expect_bool(rhs.eval(store)?)?))
            }
            Expr::Binary(BinaryOp::Or, lhs, rhs) => {
                if expect_bool(lhs.eval(store)?)? {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(expect_bool(rhs.eval(store)?)?))
            }
            Expr::Binary(op @ (BinaryOp::Eq | BinaryOp::Ne), lhs, rhs) => {
                let (lhs, rhs) = (lhs.eval(store)?, rhs.eval(store)?);
                if lhs.type_name() != rhs.type_name() {
                    return Err(EvalError::TypeMismatch {
                        expected: lhs.type_name(),
                        found: rhs.type_name(),
                    });
                }
                Ok(Value::Bool((lhs == rhs) == (*op == BinaryOp::Eq)))
            }
            Expr::Binary(op, lhs, rhs) => {
                let a = expect_int(lhs.eval(store)?)?;
                let b = expect_int(rhs.eval(store)?)?;
                arithmetic(*op, a, b)
            }
        }
    }
}

fn arithmetic(op: BinaryOp, a: i64, b: i64) -> Result<Value, EvalError> {
    let int = |result: Option<i64>| result.map(Value::Int).ok_or(EvalError::Overflow);
    match op {
        BinaryOp::Lt => Ok(Value::Bool(a < b)),
        BinaryOp::Le => Ok(Value::Bool(a <= b)),
        BinaryOp::Gt => Ok(Value::Bool(a > b)),
        BinaryOp::Ge => Ok(Value::Bool(a >= b)),
        BinaryOp::Add => int(a.checked_add(b)),
        BinaryOp::Sub => int(a.checked_sub(b)),
        BinaryOp::Mul => int(a.checked_mul(b)),
        BinaryOp::Div | BinaryOp::Rem if b == 0 => Err(EvalError::DivisionByZero),
        BinaryOp::Div => int(a.checked_div(b)),
        BinaryOp::Rem => int(a.checked_rem(b)),
        BinaryOp::And | BinaryOp::Or | BinaryOp::Eq | BinaryOp::Ne => {
            unreachable!("logical operators are evaluated by Expr::eval")
        }
    }
}

fn expect_int(value: Value) -> Result<i64, EvalError> {
    match value {
        Value::Int(n) => Ok(n),
        other => Err(EvalError::TypeMismatch {
            expected: "int",
            found: other.type_name(),
        }),
    }
}

fn expect_bool(value: Value) -> Result<bool, EvalError> {
    match value {
        Value::Bool(b) => Ok(b),
        other => Err(EvalError::TypeMismatch {
            expected: "bool",
            found: other.type_name(),
        }),
    }
}

impl FromStr for Expr {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Expr::parse(s)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Int(n) => write!(f, "{}", n),
            Expr::Bool(b) => write!(f, "{}", b),
            Expr::Var(name) => f.write_str(name),
            Expr::Unary(UnaryOp::Neg, inner) => write!(f, "-{}", inner),
            Expr::Unary(UnaryOp::Not, inner) => write!(f, "!{}", inner),
            Expr::Binary(op, lhs, rhs) => write!(f, "({} {} {})", lhs, op.symbol(), rhs),
        }
    }
}
