//! Input predicate tree over a table's columns.
//!
//! The tree is collaborator-owned and read-only during analysis. Constant
//! folding and type checking happen upstream; the builder re-validates only
//! what range extraction needs.

use crate::value::{Value, canonical_cmp};
use derive_more::Display;
use std::cmp::Ordering;

///
/// CompareOp
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum CompareOp {
    #[display("=")]
    Eq,
    #[display("<=>")]
    NullSafeEq,
    #[display("<")]
    Lt,
    #[display("<=")]
    Lte,
    #[display(">")]
    Gt,
    #[display(">=")]
    Gte,
}

///
/// ComparePredicate
/// One `column OP constant` leaf.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ComparePredicate {
    pub field: &'static str,
    pub op: CompareOp,
    pub value: Value,
}

///
/// Predicate
///
/// Boolean predicate tree. `True`/`False` appear after upstream constant
/// folding; the builder treats them as Always/Impossible branches.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Predicate {
    True,
    False,
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Compare(ComparePredicate),
    In {
        field: &'static str,
        values: Vec<Value>,
    },
    NotIn {
        field: &'static str,
        values: Vec<Value>,
    },
    Between {
        field: &'static str,
        low: Value,
        high: Value,
        negated: bool,
    },
    IsNull {
        field: &'static str,
        negated: bool,
    },
}

impl Predicate {
    #[must_use]
    pub const fn compare(field: &'static str, op: CompareOp, value: Value) -> Self {
        Self::Compare(ComparePredicate { field, op, value })
    }

    #[must_use]
    pub const fn eq(field: &'static str, value: Value) -> Self {
        Self::compare(field, CompareOp::Eq, value)
    }

    #[must_use]
    pub fn and(children: impl Into<Vec<Self>>) -> Self {
        Self::And(children.into())
    }

    #[must_use]
    pub fn or(children: impl Into<Vec<Self>>) -> Self {
        Self::Or(children.into())
    }

    /// Maximum nesting depth, used by the depth-capped descent.
    #[must_use]
    pub fn depth(&self) -> u32 {
        match self {
            Self::And(children) | Self::Or(children) => {
                1 + children.iter().map(Self::depth).max().unwrap_or(0)
            }
            _ => 1,
        }
    }
}

/// Evaluate a predicate against one row under SQL three-valued logic.
///
/// `None` is UNKNOWN; a row is selected only when the result is
/// `Some(true)`. This is the residual filter applied to rows surviving a
/// (possibly over-inclusive) range scan.
pub fn evaluate<F>(predicate: &Predicate, row: &F) -> Option<bool>
where
    F: Fn(&str) -> Value,
{
    match predicate {
        Predicate::True => Some(true),
        Predicate::False => Some(false),
        Predicate::And(children) => fold_and(children, row),
        Predicate::Or(children) => fold_or(children, row),
        Predicate::Compare(cmp) => compare(&row(cmp.field), cmp.op, &cmp.value),
        Predicate::In { field, values } => {
            let current = row(field);
            if current.is_null() {
                return None;
            }
            Some(
                values
                    .iter()
                    .any(|v| canonical_cmp(&current, v) == Ordering::Equal),
            )
        }
        Predicate::NotIn { field, values } => {
            let current = row(field);
            if current.is_null() {
                return None;
            }
            Some(
                !values
                    .iter()
                    .any(|v| canonical_cmp(&current, v) == Ordering::Equal),
            )
        }
        Predicate::Between {
            field,
            low,
            high,
            negated,
        } => {
            let lower = compare(&row(field), CompareOp::Gte, low);
            let upper = compare(&row(field), CompareOp::Lte, high);
            let both = match (lower, upper) {
                (Some(false), _) | (_, Some(false)) => Some(false),
                (Some(true), Some(true)) => Some(true),
                _ => None,
            };
            if *negated { both.map(|b| !b) } else { both }
        }
        Predicate::IsNull { field, negated } => {
            let is_null = row(field).is_null();
            Some(if *negated { !is_null } else { is_null })
        }
    }
}

fn fold_and<F>(children: &[Predicate], row: &F) -> Option<bool>
where
    F: Fn(&str) -> Value,
{
    let mut unknown = false;
    for child in children {
        match evaluate(child, row) {
            Some(false) => return Some(false),
            None => unknown = true,
            Some(true) => {}
        }
    }
    if unknown { None } else { Some(true) }
}

fn fold_or<F>(children: &[Predicate], row: &F) -> Option<bool>
where
    F: Fn(&str) -> Value,
{
    let mut unknown = false;
    for child in children {
        match evaluate(child, row) {
            Some(true) => return Some(true),
            None => unknown = true,
            Some(false) => {}
        }
    }
    if unknown { None } else { Some(false) }
}

fn compare(current: &Value, op: CompareOp, constant: &Value) -> Option<bool> {
    if op == CompareOp::NullSafeEq {
        return Some(canonical_cmp(current, constant) == Ordering::Equal);
    }
    if current.is_null() || constant.is_null() {
        return None;
    }

    let ordering = canonical_cmp(current, constant);
    Some(match op {
        CompareOp::Eq | CompareOp::NullSafeEq => ordering == Ordering::Equal,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Lte => ordering != Ordering::Greater,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Gte => ordering != Ordering::Less,
    })
}
