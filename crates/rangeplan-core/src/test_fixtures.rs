//! Shared table models, a stub cost oracle, and a recording trace sink for
//! tests.

use crate::{
    diagnostics::{AnalysisEvent, TraceSink},
    model::{ColumnModel, IndexModel, KeypartModel, TableModel},
    plan::{Cost, CostOracle, RowCostEstimate},
    sequence::KeyRange,
    value::coerce::ColumnType,
};
use std::cell::RefCell;

const COL_A: ColumnModel = ColumnModel::new("a", ColumnType::Int, false);
const COL_B: ColumnModel = ColumnModel::new("b", ColumnType::Int, false);
const COL_C: ColumnModel = ColumnModel::new("c", ColumnType::Int, true);
const COL_U: ColumnModel = ColumnModel::new("u", ColumnType::Uint, false);

/// Composite ROR index on `(a, b)`.
pub(crate) const COMPOSITE: TableModel = TableModel::new(
    "orders",
    &[COL_A, COL_B, COL_C, COL_U],
    &[IndexModel::ror(
        "idx_ab",
        &[KeypartModel::new("a"), KeypartModel::new("b")],
        false,
    )],
);

/// Three-keypart index for constraints that skip a keypart.
pub(crate) const THREE_PART: TableModel = TableModel::new(
    "orders_three",
    &[COL_A, COL_B, COL_C],
    &[IndexModel::ror(
        "idx_abc",
        &[
            KeypartModel::new("a"),
            KeypartModel::new("b"),
            KeypartModel::new("c"),
        ],
        false,
    )],
);

/// Two single-column ROR indexes, one per column.
pub(crate) const TWO_ROR: TableModel = TableModel::new(
    "orders_two",
    &[COL_A, COL_B],
    &[
        IndexModel::ror("idx_a", &[KeypartModel::new("a")], false),
        IndexModel::ror("idx_b", &[KeypartModel::new("b")], false),
    ],
);

/// Same shape with one non-ROR index, forcing sort-based merges.
pub(crate) const TWO_MIXED: TableModel = TableModel::new(
    "orders_mixed",
    &[COL_A, COL_B],
    &[
        IndexModel::ror("idx_a", &[KeypartModel::new("a")], false),
        IndexModel::new("idx_b", &[KeypartModel::new("b")], false),
    ],
);

/// Nullable indexed column for NULL-semantics tests.
pub(crate) const NULLABLE: TableModel = TableModel::new(
    "orders_nullable",
    &[COL_C],
    &[IndexModel::ror("idx_c", &[KeypartModel::new("c")], false)],
);

/// Grouping table for loose index scans: index on `(g, m)`.
pub(crate) const GROUPED: TableModel = TableModel::new(
    "measurements",
    &[
        ColumnModel::new("g", ColumnType::Int, false),
        ColumnModel::new("m", ColumnType::Int, false),
    ],
    &[IndexModel::ror(
        "idx_gm",
        &[KeypartModel::new("g"), KeypartModel::new("m")],
        false,
    )],
);

///
/// StubOracle
///
/// Deterministic estimates: a fixed row count per range and a full-scan
/// cost proportional to the table row count.
///

pub(crate) struct StubOracle {
    pub rows_per_range: u64,
    pub table_rows: u64,
}

impl StubOracle {
    pub(crate) const fn uniform() -> Self {
        Self {
            rows_per_range: 10,
            table_rows: 100_000,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
impl CostOracle for StubOracle {
    fn estimate_range(&self, _index: &IndexModel, ranges: &[KeyRange]) -> RowCostEstimate {
        let rows = self.rows_per_range * ranges.len() as u64;
        let cost = ranges.len() as f64 * 2.0 + rows as f64 * 0.1;
        RowCostEstimate::new(rows, Cost::new(cost))
    }

    fn estimate_equality_dive_count(&self, _index: &IndexModel, _keypart: usize) -> u64 {
        self.rows_per_range
    }

    fn full_scan_cost(&self, _table: &TableModel) -> RowCostEstimate {
        RowCostEstimate::new(self.table_rows, Cost::new(self.table_rows as f64))
    }
}

///
/// RecordingTrace
///

#[derive(Default)]
pub(crate) struct RecordingTrace {
    events: RefCell<Vec<AnalysisEvent>>,
}

impl RecordingTrace {
    pub(crate) fn events(&self) -> Vec<AnalysisEvent> {
        self.events.borrow().clone()
    }
}

impl TraceSink for RecordingTrace {
    fn on_event(&self, event: AnalysisEvent) {
        self.events.borrow_mut().push(event);
    }
}
