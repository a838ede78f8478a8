//! One interval node plus the bound arithmetic the algebra is built on.
//!
//! Bound vocabulary:
//! - An interval is `[lower, upper]` with `std::ops::Bound` ends over the
//!   canonical value order; `Unbounded` lower reaches below NULL,
//!   `Unbounded` upper above every value.
//! - `Excluded(Value::Null)` as a lower bound is the NEAR_MIN anchor: it
//!   admits every non-NULL value.

use crate::{
    interval::arena::Handle,
    value::{Value, canonical_cmp},
};
use std::cmp::Ordering;
use std::ops::Bound;

///
/// Color
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Color {
    Red,
    Black,
}

///
/// IntervalNode
///
/// One bounded range on one keypart. Tree pointers form a red-black tree
/// ordered by lower bound; `next`/`prev` thread the same order as a doubly
/// linked list for O(1) sideways iteration; `continuation` ANDs this
/// interval with a graph on the next keypart.
///

#[derive(Clone, Debug)]
pub struct IntervalNode {
    pub keypart: u16,
    pub lower: Bound<Value>,
    pub upper: Bound<Value>,
    pub maybe_null: bool,

    pub(crate) color: Color,
    pub(crate) parent: Option<Handle>,
    pub(crate) left: Option<Handle>,
    pub(crate) right: Option<Handle>,
    pub(crate) next: Option<Handle>,
    pub(crate) prev: Option<Handle>,

    pub continuation: Option<Handle>,
    /// Live references to this node as a tree root (continuation edges plus
    /// externally held roots). Interior nodes stay at one.
    pub share_count: u32,
}

impl IntervalNode {
    #[must_use]
    pub fn new(keypart: u16, lower: Bound<Value>, upper: Bound<Value>, maybe_null: bool) -> Self {
        debug_assert!(
            bounds_nonempty(&lower, &upper),
            "interval node must be nonempty",
        );

        Self {
            keypart,
            lower,
            upper,
            maybe_null,
            color: Color::Red,
            parent: None,
            left: None,
            right: None,
            next: None,
            prev: None,
            continuation: None,
            share_count: 1,
        }
    }

    /// Single-point interval, both ends inclusive on the same value.
    #[must_use]
    pub fn point(keypart: u16, value: Value) -> Self {
        let maybe_null = value.is_null();
        Self::new(
            keypart,
            Bound::Included(value.clone()),
            Bound::Included(value),
            maybe_null,
        )
    }

    #[must_use]
    pub fn is_point(&self) -> bool {
        match (&self.lower, &self.upper) {
            (Bound::Included(lo), Bound::Included(hi)) => {
                canonical_cmp(lo, hi) == Ordering::Equal
            }
            _ => false,
        }
    }

    /// Point value when this is a single-point interval.
    #[must_use]
    pub fn point_value(&self) -> Option<&Value> {
        if self.is_point() {
            match &self.lower {
                Bound::Included(value) => Some(value),
                _ => None,
            }
        } else {
            None
        }
    }

    #[must_use]
    pub(crate) fn heap_bytes(&self) -> usize {
        bound_heap_bytes(&self.lower) + bound_heap_bytes(&self.upper)
    }
}

fn bound_heap_bytes(bound: &Bound<Value>) -> usize {
    match bound {
        Bound::Included(value) | Bound::Excluded(value) => value.heap_bytes(),
        Bound::Unbounded => 0,
    }
}

/// Total order over lower bounds: `Unbounded` first, and at equal values an
/// inclusive bound starts before an exclusive one.
#[must_use]
pub(crate) fn cmp_lower(left: &Bound<Value>, right: &Bound<Value>) -> Ordering {
    match (left, right) {
        (Bound::Unbounded, Bound::Unbounded) => Ordering::Equal,
        (Bound::Unbounded, _) => Ordering::Less,
        (_, Bound::Unbounded) => Ordering::Greater,
        (Bound::Included(a), Bound::Included(b)) | (Bound::Excluded(a), Bound::Excluded(b)) => {
            canonical_cmp(a, b)
        }
        (Bound::Included(a), Bound::Excluded(b)) => canonical_cmp(a, b).then(Ordering::Less),
        (Bound::Excluded(a), Bound::Included(b)) => canonical_cmp(a, b).then(Ordering::Greater),
    }
}

/// Total order over upper bounds: `Unbounded` last, and at equal values an
/// exclusive bound ends before an inclusive one.
#[must_use]
pub(crate) fn cmp_upper(left: &Bound<Value>, right: &Bound<Value>) -> Ordering {
    match (left, right) {
        (Bound::Unbounded, Bound::Unbounded) => Ordering::Equal,
        (Bound::Unbounded, _) => Ordering::Greater,
        (_, Bound::Unbounded) => Ordering::Less,
        (Bound::Included(a), Bound::Included(b)) | (Bound::Excluded(a), Bound::Excluded(b)) => {
            canonical_cmp(a, b)
        }
        (Bound::Included(a), Bound::Excluded(b)) => canonical_cmp(a, b).then(Ordering::Greater),
        (Bound::Excluded(a), Bound::Included(b)) => canonical_cmp(a, b).then(Ordering::Less),
    }
}

/// True when `[lower, upper]` contains at least one value.
#[must_use]
pub(crate) fn bounds_nonempty(lower: &Bound<Value>, upper: &Bound<Value>) -> bool {
    match (lower, upper) {
        (Bound::Unbounded, _) | (_, Bound::Unbounded) => true,
        (
            Bound::Included(lo) | Bound::Excluded(lo),
            Bound::Included(hi) | Bound::Excluded(hi),
        ) => match canonical_cmp(lo, hi) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => {
                matches!(lower, Bound::Included(_)) && matches!(upper, Bound::Included(_))
            }
        },
    }
}

/// True when a value could fall strictly between `upper` and `lower`.
#[must_use]
pub(crate) fn gap_between(upper: &Bound<Value>, lower: &Bound<Value>) -> bool {
    match (upper, lower) {
        (Bound::Unbounded, _) | (_, Bound::Unbounded) => false,
        (
            Bound::Included(hi) | Bound::Excluded(hi),
            Bound::Included(lo) | Bound::Excluded(lo),
        ) => match canonical_cmp(hi, lo) {
            Ordering::Greater => false,
            Ordering::Less => true,
            Ordering::Equal => {
                matches!(upper, Bound::Excluded(_)) && matches!(lower, Bound::Excluded(_))
            }
        },
    }
}

/// The later of two lower bounds.
#[must_use]
pub(crate) fn max_lower(left: &Bound<Value>, right: &Bound<Value>) -> Bound<Value> {
    if cmp_lower(left, right) == Ordering::Less {
        right.clone()
    } else {
        left.clone()
    }
}

/// The earlier of two upper bounds.
#[must_use]
pub(crate) fn min_upper(left: &Bound<Value>, right: &Bound<Value>) -> Bound<Value> {
    if cmp_upper(left, right) == Ordering::Greater {
        right.clone()
    } else {
        left.clone()
    }
}

/// Exact complement turning a lower bound into the upper bound just below
/// it: everything before `Included(v)` is `Excluded(v)` and vice versa.
#[must_use]
pub(crate) fn lower_to_upper(lower: &Bound<Value>) -> Bound<Value> {
    match lower {
        Bound::Included(value) => Bound::Excluded(value.clone()),
        Bound::Excluded(value) => Bound::Included(value.clone()),
        Bound::Unbounded => unreachable!("no upper bound precedes an unbounded lower"),
    }
}

/// Exact complement turning an upper bound into the lower bound just above
/// it.
#[must_use]
pub(crate) fn upper_to_lower(upper: &Bound<Value>) -> Bound<Value> {
    match upper {
        Bound::Included(value) => Bound::Excluded(value.clone()),
        Bound::Excluded(value) => Bound::Included(value.clone()),
        Bound::Unbounded => unreachable!("no lower bound follows an unbounded upper"),
    }
}

/// True when `value` lies within `[lower, upper]`.
#[must_use]
pub(crate) fn contains(lower: &Bound<Value>, upper: &Bound<Value>, value: &Value) -> bool {
    let above_lower = match lower {
        Bound::Unbounded => true,
        Bound::Included(lo) => canonical_cmp(value, lo) != Ordering::Less,
        Bound::Excluded(lo) => canonical_cmp(value, lo) == Ordering::Greater,
    };
    let below_upper = match upper {
        Bound::Unbounded => true,
        Bound::Included(hi) => canonical_cmp(value, hi) != Ordering::Greater,
        Bound::Excluded(hi) => canonical_cmp(value, hi) == Ordering::Less,
    };
    above_lower && below_upper
}
