//! Per-call analysis configuration.
//!
//! Every tunable is threaded explicitly through the analysis call; nothing
//! is read from process-wide state, so the engine stays reentrant and
//! testable with varied configurations in one process.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

///
/// RangeConfig
///

#[derive(Clone, Debug)]
pub struct RangeConfig {
    /// Hard cap on interval-graph memory. Exceeding it abandons range
    /// analysis for the current table and degrades to a full scan.
    pub max_mem_bytes: usize,

    /// Above this many equality ranges, row estimation switches from
    /// per-range index dives to aggregate index statistics.
    pub eq_range_dive_limit: usize,

    /// IN-lists longer than this are not expanded into point intervals.
    pub in_list_expansion_limit: usize,

    /// Cap on predicate/interval recursion depth; exceeding it degrades to
    /// a full scan, it is never fatal.
    pub max_depth: u32,

    /// Strategy toggles, each independently switchable.
    pub index_merge_union: bool,
    pub index_merge_sort_union: bool,
    pub index_merge_intersection: bool,

    /// Cooperative abort flag checked at every recursion step.
    pub abort: AbortFlag,
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self {
            max_mem_bytes: 8 * 1024 * 1024,
            eq_range_dive_limit: 200,
            in_list_expansion_limit: 2000,
            max_depth: 128,
            index_merge_union: true,
            index_merge_sort_union: true,
            index_merge_intersection: true,
            abort: AbortFlag::default(),
        }
    }
}

///
/// AbortFlag
///
/// Shared kill switch; raising it makes every in-flight analysis unwind to
/// "no range access" at its next recursion step.
///

#[derive(Clone, Debug, Default)]
pub struct AbortFlag(Arc<AtomicBool>);

impl AbortFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
