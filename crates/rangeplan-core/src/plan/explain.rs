//! Deterministic, serializable description of a selection outcome.
//!
//! The same table, predicate, and configuration always produce an
//! identical explain value; tests snapshot it as JSON.

use crate::{model::TableModel, plan::PlanKind};
use serde::{Deserialize, Serialize};

///
/// RangeExplain
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RangeExplain {
    pub table: String,
    pub strategy: PlanKind,
    pub estimated_rows: u64,
    pub estimated_cost: f64,
    /// Constrained indexes with their materialized range counts, in
    /// catalog order.
    pub indexes: Vec<ExplainIndex>,
    pub rejected: Vec<RejectedCandidate>,
}

///
/// ExplainIndex
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ExplainIndex {
    pub index: String,
    pub ranges: u32,
}

///
/// RejectedCandidate
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RejectedCandidate {
    pub strategy: PlanKind,
    pub reason: String,
}

impl RejectedCandidate {
    pub(crate) fn new(strategy: PlanKind, reason: &str) -> Self {
        Self {
            strategy,
            reason: reason.to_string(),
        }
    }
}

pub(crate) fn build_explain(
    table: &TableModel,
    selection: &super::selector::Selection,
    chosen: &super::ChosenPlan,
) -> RangeExplain {
    RangeExplain {
        table: table.name.to_string(),
        strategy: chosen.kind,
        estimated_rows: chosen.estimate.rows,
        estimated_cost: chosen.estimate.cost.value(),
        indexes: selection
            .range_counts
            .iter()
            .map(|&(position, ranges)| ExplainIndex {
                index: table.indexes[position].name.to_string(),
                ranges,
            })
            .collect(),
        rejected: selection.rejected.clone(),
    }
}
