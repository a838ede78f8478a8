//! Binding comparison constants into a column's native domain.
//!
//! Conversion contract:
//! - A constant that cannot be represented exactly is reported with the
//!   direction of rounding, never silently adjusted.
//! - Out-of-domain constants short-circuit to Always/Impossible depending on
//!   the operator; the result may over-select rows but never under-selects.
//! - Incomparable constants degrade to Impossible for equality and Always
//!   otherwise.

use crate::{predicate::CompareOp, value::Value};
use std::ops::Bound;

///
/// ColumnType
///
/// Native domain of one indexed column.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ColumnType {
    Bool,
    Int,
    Uint,
    Float,
    Text,
    Bytes,
}

///
/// BindOutcome
///
/// Result of converting one non-NULL constant into a column domain.
/// Rounding direction is relative to the true constant: `RoundedDown` stores
/// a value strictly below it, `RoundedUp` strictly above it.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BindOutcome {
    Exact(Value),
    RoundedDown(Value),
    RoundedUp(Value),
    BelowRange,
    AboveRange,
    Incomparable,
}

///
/// BoundsOutcome
///
/// One-column constraint produced from an operator and a bind outcome.
/// `Always` constrains nothing for this branch; `Impossible` matches no rows.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BoundsOutcome {
    Always,
    Impossible,
    Range {
        lower: Bound<Value>,
        upper: Bound<Value>,
        maybe_null: bool,
    },
}

/// Convert one non-NULL constant into `column`'s domain.
#[must_use]
pub fn bind_constant(column: ColumnType, constant: &Value) -> BindOutcome {
    debug_assert!(!constant.is_null(), "NULL constants are resolved earlier");

    match column {
        ColumnType::Bool => match constant {
            Value::Bool(b) => BindOutcome::Exact(Value::Bool(*b)),
            _ => BindOutcome::Incomparable,
        },
        ColumnType::Int => bind_int(constant),
        ColumnType::Uint => bind_uint(constant),
        ColumnType::Float => bind_float(constant),
        ColumnType::Text => match constant {
            Value::Text(text) => BindOutcome::Exact(Value::Text(text.clone())),
            _ => BindOutcome::Incomparable,
        },
        ColumnType::Bytes => match constant {
            Value::Bytes(bytes) => BindOutcome::Exact(Value::Bytes(bytes.clone())),
            _ => BindOutcome::Incomparable,
        },
    }
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn bind_int(constant: &Value) -> BindOutcome {
    match constant {
        Value::Int(v) => BindOutcome::Exact(Value::Int(*v)),
        Value::Uint(v) => i64::try_from(*v)
            .map_or(BindOutcome::AboveRange, |v| BindOutcome::Exact(Value::Int(v))),
        Value::Float(f) => {
            let f = f.0;
            if f.is_nan() {
                return BindOutcome::Incomparable;
            }
            if f < i64::MIN as f64 {
                return BindOutcome::BelowRange;
            }
            if f > i64::MAX as f64 {
                return BindOutcome::AboveRange;
            }
            let floor = f.floor();
            if floor == f {
                BindOutcome::Exact(Value::Int(floor as i64))
            } else {
                BindOutcome::RoundedDown(Value::Int(floor as i64))
            }
        }
        _ => BindOutcome::Incomparable,
    }
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn bind_uint(constant: &Value) -> BindOutcome {
    match constant {
        Value::Uint(v) => BindOutcome::Exact(Value::Uint(*v)),
        Value::Int(v) => u64::try_from(*v)
            .map_or(BindOutcome::BelowRange, |v| BindOutcome::Exact(Value::Uint(v))),
        Value::Float(f) => {
            let f = f.0;
            if f.is_nan() {
                return BindOutcome::Incomparable;
            }
            if f < 0.0 {
                return BindOutcome::BelowRange;
            }
            if f > u64::MAX as f64 {
                return BindOutcome::AboveRange;
            }
            let floor = f.floor();
            if floor == f {
                BindOutcome::Exact(Value::Uint(floor as u64))
            } else {
                BindOutcome::RoundedDown(Value::Uint(floor as u64))
            }
        }
        _ => BindOutcome::Incomparable,
    }
}

#[allow(clippy::cast_precision_loss)]
fn bind_float(constant: &Value) -> BindOutcome {
    match constant {
        Value::Float(f) if f.0.is_nan() => BindOutcome::Incomparable,
        Value::Float(f) => BindOutcome::Exact(Value::float(f.0)),
        Value::Int(v) => BindOutcome::Exact(Value::float(*v as f64)),
        Value::Uint(v) => BindOutcome::Exact(Value::float(*v as f64)),
        _ => BindOutcome::Incomparable,
    }
}

/// Derive the single-column constraint for `op` against a bound constant.
///
/// Lower bounds of `<`/`<=` anchor just above NULL so NULL-keyed rows are
/// excluded, matching three-valued comparison semantics.
#[must_use]
pub fn compare_bounds(op: CompareOp, outcome: BindOutcome) -> BoundsOutcome {
    match outcome {
        BindOutcome::Exact(value) => exact_bounds(op, value),
        BindOutcome::RoundedDown(value) => match op {
            CompareOp::Eq | CompareOp::NullSafeEq => BoundsOutcome::Impossible,
            // No column value lies between the stored value and the true
            // constant, so both strict and non-strict collapse the same way.
            CompareOp::Gt | CompareOp::Gte => range(Bound::Excluded(value), Bound::Unbounded),
            CompareOp::Lt | CompareOp::Lte => {
                range(Bound::Excluded(Value::Null), Bound::Included(value))
            }
        },
        BindOutcome::RoundedUp(value) => match op {
            CompareOp::Eq | CompareOp::NullSafeEq => BoundsOutcome::Impossible,
            CompareOp::Gt | CompareOp::Gte => range(Bound::Included(value), Bound::Unbounded),
            CompareOp::Lt | CompareOp::Lte => {
                range(Bound::Excluded(Value::Null), Bound::Excluded(value))
            }
        },
        BindOutcome::BelowRange => match op {
            CompareOp::Gt | CompareOp::Gte => BoundsOutcome::Always,
            _ => BoundsOutcome::Impossible,
        },
        BindOutcome::AboveRange => match op {
            CompareOp::Lt | CompareOp::Lte => BoundsOutcome::Always,
            _ => BoundsOutcome::Impossible,
        },
        BindOutcome::Incomparable => match op {
            CompareOp::Eq | CompareOp::NullSafeEq => BoundsOutcome::Impossible,
            _ => BoundsOutcome::Always,
        },
    }
}

fn exact_bounds(op: CompareOp, value: Value) -> BoundsOutcome {
    match op {
        CompareOp::Eq | CompareOp::NullSafeEq => {
            range(Bound::Included(value.clone()), Bound::Included(value))
        }
        CompareOp::Lt => range(Bound::Excluded(Value::Null), Bound::Excluded(value)),
        CompareOp::Lte => range(Bound::Excluded(Value::Null), Bound::Included(value)),
        CompareOp::Gt => range(Bound::Excluded(value), Bound::Unbounded),
        CompareOp::Gte => range(Bound::Included(value), Bound::Unbounded),
    }
}

const fn range(lower: Bound<Value>, upper: Bound<Value>) -> BoundsOutcome {
    BoundsOutcome::Range {
        lower,
        upper,
        maybe_null: false,
    }
}
