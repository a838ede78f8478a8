//! Column-domain scalar values and their canonical total order.
//!
//! Ordering contract:
//! - `canonical_cmp` is a total order over every `Value`, used for interval
//!   bounds and key tuples.
//! - `Null` sorts before every other value, matching index key order where
//!   NULL entries lead the key space.
//! - Numeric variants compare by numeric magnitude across Int/Uint/Float.

pub mod coerce;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

///
/// Value
///
/// Runtime scalar in the index-key domain. Deliberately small: the range
/// engine reasons about orderable scalars only, not documents or
/// collections.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(F64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    /// Convenience constructor for float literals.
    #[must_use]
    pub const fn float(value: f64) -> Self {
        Self::Float(F64(value))
    }

    /// Routing family used by coercion and compatibility checks.
    #[must_use]
    pub const fn family(&self) -> CoercionFamily {
        match self {
            Self::Null => CoercionFamily::Null,
            Self::Bool(_) => CoercionFamily::Bool,
            Self::Int(_) | Self::Uint(_) | Self::Float(_) => CoercionFamily::Numeric,
            Self::Text(_) => CoercionFamily::Textual,
            Self::Bytes(_) => CoercionFamily::Binary,
        }
    }

    /// Heap bytes owned by this value, used for arena budget accounting.
    #[must_use]
    pub fn heap_bytes(&self) -> usize {
        match self {
            Self::Text(text) => text.capacity(),
            Self::Bytes(bytes) => bytes.capacity(),
            _ => 0,
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

///
/// F64
///
/// Float wrapper with a total order (`f64::total_cmp`) so interval bounds
/// and key tuples stay `Eq`/`Hash`.
///

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct F64(pub f64);

impl Eq for F64 {}

impl std::hash::Hash for F64 {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

///
/// CoercionFamily
///
/// Routing category for comparability checks; capability decisions are made
/// in `coerce`, not here.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CoercionFamily {
    Null,
    Bool,
    Numeric,
    Textual,
    Binary,
}

/// Rank used to order values of different families.
const fn family_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Int(_) | Value::Uint(_) | Value::Float(_) => 2,
        Value::Text(_) => 3,
        Value::Bytes(_) => 4,
    }
}

/// Canonical total order over values.
#[must_use]
pub fn canonical_cmp(left: &Value, right: &Value) -> Ordering {
    let rank = family_rank(left).cmp(&family_rank(right));
    if rank != Ordering::Equal {
        return rank;
    }

    match (left, right) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Text(a), Value::Text(b)) => a.cmp(b),
        (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
        (a, b) => numeric_cmp(a, b),
    }
}

// Exact where possible (Int/Uint), via total_cmp when a float is involved.
fn numeric_cmp(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a.cmp(b),
        (Value::Uint(a), Value::Uint(b)) => a.cmp(b),
        (Value::Int(a), Value::Uint(b)) => {
            if *a < 0 {
                Ordering::Less
            } else {
                u64::try_from(*a).map_or(Ordering::Less, |a| a.cmp(b))
            }
        }
        (Value::Uint(a), Value::Int(b)) => numeric_cmp(&Value::Int(*b), &Value::Uint(*a)).reverse(),
        (a, b) => as_f64(a).total_cmp(&as_f64(b)),
    }
}

#[allow(clippy::cast_precision_loss)]
fn as_f64(value: &Value) -> f64 {
    match value {
        Value::Int(v) => *v as f64,
        Value::Uint(v) => *v as f64,
        Value::Float(v) => v.0,
        _ => f64::NAN,
    }
}
