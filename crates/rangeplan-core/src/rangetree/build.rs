//! Recursive descent from the predicate tree to a `RangeTree`.
//!
//! Each leaf binds its constant once per column and then projects the
//! resulting bounds onto every usable index containing the column. AND/OR
//! nodes fold their children pairwise through `tree_and`/`tree_or`.

use crate::{
    config::RangeConfig,
    error::RangeError,
    interval::{Handle, IntervalArena, IntervalNode, tree},
    model::{IndexMask, TableModel},
    predicate::{CompareOp, Predicate},
    rangetree::{RangeTree, TreeClass, tree_and, tree_or},
    value::{
        Value, canonical_cmp,
        coerce::{BindOutcome, BoundsOutcome, bind_constant, compare_bounds},
    },
};
use std::cmp::Ordering;
use std::ops::Bound;

/// Build the `RangeTree` for `predicate` over `table`'s usable indexes.
pub(crate) fn build_range_tree(
    arena: &mut IntervalArena,
    table: &TableModel,
    usable: IndexMask,
    config: &RangeConfig,
    predicate: &Predicate,
) -> Result<RangeTree, RangeError> {
    let mut builder = Builder {
        arena,
        table,
        usable,
        config,
    };
    builder.node(predicate, 0)
}

struct Builder<'a> {
    arena: &'a mut IntervalArena,
    table: &'a TableModel,
    usable: IndexMask,
    config: &'a RangeConfig,
}

impl Builder<'_> {
    fn index_count(&self) -> usize {
        self.table.indexes.len()
    }

    fn node(&mut self, predicate: &Predicate, depth: u32) -> Result<RangeTree, RangeError> {
        self.arena.step(depth)?;

        match predicate {
            Predicate::True => Ok(RangeTree::always(self.index_count())),
            Predicate::False => Ok(RangeTree::impossible(self.index_count())),
            Predicate::And(children) => self.fold_and(children, depth),
            Predicate::Or(children) => self.fold_or(children, depth),
            Predicate::Compare(cmp) => self.leaf(cmp.field, cmp.op, &cmp.value, depth),
            Predicate::In { field, values } => self.in_list(field, values),
            Predicate::NotIn { field, values } => self.not_in(field, values),
            Predicate::Between {
                field,
                low,
                high,
                negated,
            } => self.between(field, low, high, *negated, depth),
            Predicate::IsNull { field, negated } => self.is_null(field, *negated),
        }
    }

    fn fold_and(&mut self, children: &[Predicate], depth: u32) -> Result<RangeTree, RangeError> {
        let mut folded = RangeTree::always(self.index_count());
        for child in children {
            let tree = self.node(child, depth + 1)?;
            folded = tree_and(self.arena, folded, tree, depth + 1)?;
            if folded.classification == TreeClass::Impossible {
                break;
            }
        }
        Ok(folded)
    }

    fn fold_or(&mut self, children: &[Predicate], depth: u32) -> Result<RangeTree, RangeError> {
        let mut folded = RangeTree::impossible(self.index_count());
        for child in children {
            let tree = self.node(child, depth + 1)?;
            folded = tree_or(self.arena, folded, tree, depth + 1)?;
            if folded.classification == TreeClass::AlwaysTrue {
                break;
            }
        }
        Ok(folded)
    }

    fn leaf(
        &mut self,
        field: &str,
        op: CompareOp,
        constant: &Value,
        _depth: u32,
    ) -> Result<RangeTree, RangeError> {
        let Some(column) = self.table.column(field) else {
            return Ok(RangeTree::uncertain(self.index_count()));
        };

        if constant.is_null() {
            // Only `<=>` can match against a NULL constant.
            if op == CompareOp::NullSafeEq {
                return self.is_null(field, false);
            }
            return Ok(RangeTree::impossible(self.index_count()));
        }

        match compare_bounds(op, bind_constant(column.ty, constant)) {
            BoundsOutcome::Always => Ok(RangeTree::always(self.index_count())),
            BoundsOutcome::Impossible => Ok(RangeTree::impossible(self.index_count())),
            BoundsOutcome::Range {
                lower,
                upper,
                maybe_null,
            } => self.project(field, &[(lower, upper, maybe_null)]),
        }
    }

    fn is_null(&mut self, field: &str, negated: bool) -> Result<RangeTree, RangeError> {
        let Some(column) = self.table.column(field) else {
            return Ok(RangeTree::uncertain(self.index_count()));
        };
        if !column.nullable {
            return Ok(if negated {
                RangeTree::always(self.index_count())
            } else {
                RangeTree::impossible(self.index_count())
            });
        }

        let range = if negated {
            (Bound::Excluded(Value::Null), Bound::Unbounded, false)
        } else {
            (
                Bound::Included(Value::Null),
                Bound::Included(Value::Null),
                true,
            )
        };
        self.project(field, &[range])
    }

    fn in_list(&mut self, field: &str, values: &[Value]) -> Result<RangeTree, RangeError> {
        if values.is_empty() {
            return Ok(RangeTree::impossible(self.index_count()));
        }
        if values.len() > self.config.in_list_expansion_limit {
            return Ok(RangeTree::uncertain(self.index_count()));
        }
        let Some(column) = self.table.column(field) else {
            return Ok(RangeTree::uncertain(self.index_count()));
        };

        let points = bind_exact_sorted(column.ty, values);
        if points.is_empty() {
            // No listed constant can equal any stored value.
            return Ok(RangeTree::impossible(self.index_count()));
        }
        let ranges: Vec<_> = points
            .into_iter()
            .map(|value| {
                (
                    Bound::Included(value.clone()),
                    Bound::Included(value),
                    false,
                )
            })
            .collect();
        self.project(field, &ranges)
    }

    fn not_in(&mut self, field: &str, values: &[Value]) -> Result<RangeTree, RangeError> {
        if values.len() > self.config.in_list_expansion_limit {
            return Ok(RangeTree::uncertain(self.index_count()));
        }
        let Some(column) = self.table.column(field) else {
            return Ok(RangeTree::uncertain(self.index_count()));
        };

        // Constants that bind inexactly equal no stored value and exclude
        // nothing.
        let points = bind_exact_sorted(column.ty, values);
        if points.is_empty() {
            return Ok(RangeTree::always(self.index_count()));
        }

        // Adjacent strict intervals between consecutive excluded points.
        let mut ranges = Vec::with_capacity(points.len() + 1);
        let mut lower = Bound::Excluded(Value::Null);
        for point in &points {
            ranges.push((lower, Bound::Excluded(point.clone()), false));
            lower = Bound::Excluded(point.clone());
        }
        ranges.push((lower, Bound::Unbounded, false));
        self.project(field, &ranges)
    }

    fn between(
        &mut self,
        field: &'static str,
        low: &Value,
        high: &Value,
        negated: bool,
        depth: u32,
    ) -> Result<RangeTree, RangeError> {
        if negated {
            let below = self.leaf(field, CompareOp::Lt, low, depth + 1)?;
            let above = self.leaf(field, CompareOp::Gt, high, depth + 1)?;
            tree_or(self.arena, below, above, depth + 1)
        } else {
            let lower = self.leaf(field, CompareOp::Gte, low, depth + 1)?;
            let upper = self.leaf(field, CompareOp::Lte, high, depth + 1)?;
            tree_and(self.arena, lower, upper, depth + 1)
        }
    }

    // Project disjoint ordered ranges on `field` onto every usable index
    // containing it as a whole (non-partial) keypart.
    fn project(
        &mut self,
        field: &str,
        ranges: &[(Bound<Value>, Bound<Value>, bool)],
    ) -> Result<RangeTree, RangeError> {
        debug_assert!(!ranges.is_empty(), "projection without ranges");

        let mut slots = Vec::new();
        for (position, index) in self.table.indexes.iter().enumerate() {
            if !self.usable.contains(position) {
                continue;
            }
            let Some(keypart) = index.keypart_of(field) else {
                continue;
            };
            if index.keyparts[keypart].partial || keypart >= crate::MAX_KEYPARTS {
                continue;
            }
            let keypart = match u16::try_from(keypart) {
                Ok(keypart) => keypart,
                Err(_) => continue,
            };

            let mut root: Option<Handle> = None;
            for (lower, upper, maybe_null) in ranges {
                let node = self.arena.alloc(IntervalNode::new(
                    keypart,
                    lower.clone(),
                    upper.clone(),
                    *maybe_null,
                ))?;
                root = Some(tree::insert(self.arena, root, node));
            }
            if let Some(root) = root {
                slots.push((position, root));
            }
        }

        if slots.is_empty() {
            return Ok(RangeTree::uncertain(self.index_count()));
        }
        Ok(RangeTree::for_indexes(self.index_count(), slots))
    }
}

// Sorted, deduplicated constants that bind exactly into `ty`. NULLs and
// inexact bindings are dropped.
fn bind_exact_sorted(
    ty: crate::value::coerce::ColumnType,
    values: &[Value],
) -> Vec<Value> {
    let mut bound: Vec<Value> = values
        .iter()
        .filter(|value| !value.is_null())
        .filter_map(|value| match bind_constant(ty, value) {
            BindOutcome::Exact(value) => Some(value),
            _ => None,
        })
        .collect();
    bound.sort_by(canonical_cmp);
    bound.dedup_by(|a, b| canonical_cmp(a, b) == Ordering::Equal);
    bound
}
