//! Analysis tracing boundary and user-visible warnings.
//!
//! Tracing is optional, injected by the caller, and must not affect
//! analysis semantics. Warnings are the only user-visible surface of
//! recovered anomalies; none of them fails the query.

use crate::plan::PlanKind;
use serde::{Deserialize, Serialize};

///
/// TraceSink
///

pub trait TraceSink {
    fn on_event(&self, event: AnalysisEvent);
}

///
/// AnalysisEvent
///
/// Best-effort analysis milestones; payloads may evolve.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AnalysisEvent {
    Started {
        table: &'static str,
    },
    TreeBuilt {
        constrained_indexes: u32,
        merge_alternatives: u32,
    },
    CandidateCosted {
        kind: PlanKind,
        considered: bool,
    },
    BudgetExceeded {
        budget: usize,
    },
    Finished {
        chosen: Option<PlanKind>,
    },
}

///
/// RangeWarning
///
/// One-per-call warnings surfaced on the analysis output.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum RangeWarning {
    /// Graph construction ran out of memory budget; range access was
    /// abandoned for this table.
    MemoryBudgetExceeded,
    /// Predicate nesting exceeded the depth cap.
    DepthCapExceeded,
    /// The caller aborted analysis mid-flight.
    AnalysisAborted,
}

///
/// Warnings
///
/// Deduplicating warning collector; each variant is recorded at most once
/// per analysis call.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct Warnings {
    entries: Vec<RangeWarning>,
}

impl Warnings {
    pub(crate) fn push(&mut self, warning: RangeWarning) {
        if !self.entries.contains(&warning) {
            self.entries.push(warning);
        }
    }

    pub(crate) fn into_vec(self) -> Vec<RangeWarning> {
        self.entries
    }
}
