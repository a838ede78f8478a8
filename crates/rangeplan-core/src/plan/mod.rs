//! Cost-based selection among index access strategies.

pub mod cost;
pub mod explain;
pub(crate) mod loose;
pub(crate) mod selector;


pub use cost::{Cost, CostOracle, RowCostEstimate};
pub use explain::{ExplainIndex, RangeExplain, RejectedCandidate};

use crate::{interval::Handle, model::IndexMask};
use derive_more::Display;
use serde::{Deserialize, Serialize};

///
/// PlanKind
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum PlanKind {
    #[display("range_scan")]
    RangeScan,
    #[display("ror_intersection")]
    RorIntersection,
    #[display("ror_union")]
    RorUnion,
    #[display("sort_index_merge")]
    SortIndexMerge,
    #[display("loose_index_scan")]
    LooseIndexScan,
}

///
/// QueryShape
///
/// The parts of the surrounding query the selector needs: output columns,
/// grouping, aggregate MIN/MAX, and whether rows are read for deletion.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct QueryShape {
    pub needed_columns: Vec<&'static str>,
    pub group_fields: Vec<&'static str>,
    pub min_max: Option<MinMaxSpec>,
    pub distinct: bool,
    pub for_delete: bool,
    /// Indexes the surrounding query allows, by catalog position.
    pub usable_indexes: IndexMask,
}

///
/// MinMaxSpec
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MinMaxSpec {
    pub field: &'static str,
    pub is_min: bool,
}

///
/// ChosenPlan
///
/// Winning strategy plus the interval graph references it scans. The
/// references are owned: the plan keeps its graphs alive after the
/// originating `RangeTree` is gone.
///

#[derive(Debug)]
pub struct ChosenPlan {
    pub kind: PlanKind,
    pub estimate: RowCostEstimate,
    pub(crate) access: PlanAccess,
}

#[derive(Debug)]
pub(crate) enum PlanAccess {
    Range {
        scan: IndexScan,
    },
    RorIntersection {
        scans: Vec<IndexScan>,
        clustered_filter: Option<IndexScan>,
    },
    RorUnion {
        scans: Vec<IndexScan>,
    },
    SortMerge {
        scans: Vec<IndexScan>,
    },
    Loose {
        index: usize,
        root: Option<Handle>,
        group_prefix_len: usize,
        infix_len: usize,
    },
}

/// One index scan leg: catalog position plus the graph it walks.
#[derive(Clone, Copy, Debug)]
pub(crate) struct IndexScan {
    pub(crate) index: usize,
    pub(crate) root: Handle,
}
