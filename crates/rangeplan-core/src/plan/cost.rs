//! Cost vocabulary and the storage-engine estimation boundary.
//!
//! The oracle is injected so plan selection is deterministic under test;
//! everything behind it (index dives, statistics, I/O models) belongs to
//! the storage engine.

use crate::{
    model::{IndexModel, TableModel},
    sequence::KeyRange,
};
use std::ops::Add;

/// One B-tree descent to position a scan at a range start.
pub(crate) const DESCENT_COST: f64 = 1.0;
/// Fetching one row by rowid after an index scan.
pub(crate) const ROW_FETCH_COST: f64 = 0.2;
/// One rowid comparison in a merge of sorted streams.
pub(crate) const KEY_COMPARE_COST: f64 = 0.05;
/// De-duplicating one rowid in a sort/hash unique pass.
pub(crate) const DEDUP_COST: f64 = 0.1;

///
/// Cost
///
/// Abstract planner cost units, comparable only to each other.
///

#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct Cost(f64);

impl Cost {
    pub const ZERO: Self = Self(0.0);

    #[must_use]
    pub const fn new(value: f64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }
}

impl Add for Cost {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

///
/// RowCostEstimate
///

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RowCostEstimate {
    pub rows: u64,
    pub cost: Cost,
}

impl RowCostEstimate {
    #[must_use]
    pub const fn new(rows: u64, cost: Cost) -> Self {
        Self { rows, cost }
    }
}

///
/// CostOracle
///
/// Narrow storage-engine estimation interface consumed by the selector.
///

pub trait CostOracle {
    /// Estimated rows and index-traversal cost of scanning `ranges` on
    /// `index`. Fetching the rows themselves is costed by the selector,
    /// which knows whether the scan is covering.
    fn estimate_range(&self, index: &IndexModel, ranges: &[KeyRange]) -> RowCostEstimate;

    /// Average rows matching one equality prefix of `keypart + 1` keyparts,
    /// from index statistics rather than per-range dives.
    fn estimate_equality_dive_count(&self, index: &IndexModel, keypart: usize) -> u64;

    /// Baseline: rows and cost of a full table scan.
    fn full_scan_cost(&self, table: &TableModel) -> RowCostEstimate;
}
