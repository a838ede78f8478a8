//! Range analysis and index-access planning for a relational query optimizer:
//! interval graphs, graph algebra, plan selection, and the lazy range
//! sequence consumed by storage-engine scans.
#![warn(unreachable_pub)]

pub mod analyze;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod interval;
pub mod model;
pub mod plan;
pub mod predicate;
pub mod rangetree;
pub mod sequence;
pub mod value;

#[cfg(test)]
pub(crate) mod test_fixtures;

///
/// CONSTANTS
///

/// Maximum number of keyparts a single index may declare.
///
/// This bounds key-tuple widths in the range sequence and keeps per-index
/// bookkeeping in fixed-size structures.
pub const MAX_KEYPARTS: usize = 16;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, arenas, selectors, or helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        analyze::{AccessOutcome, RangeAnalysis, analyze_range_access},
        config::RangeConfig,
        model::{IndexModel, KeypartModel, TableModel},
        plan::{CostOracle, PlanKind, QueryShape},
        predicate::{CompareOp, Predicate},
        sequence::KeyRange,
        value::Value,
    };
}
