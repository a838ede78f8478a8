//! Public entry point tying the builder, selector, and sequence together.
//!
//! Every recoverable anomaly (budget, depth, abort) degrades to
//! `NoRangeAccess` plus a warning; only internal invariant violations
//! surface as errors.

use crate::{
    config::RangeConfig,
    diagnostics::{AnalysisEvent, RangeWarning, TraceSink, Warnings},
    error::RangeError,
    interval::IntervalArena,
    model::TableModel,
    plan::{
        ChosenPlan, CostOracle, PlanAccess, PlanKind, QueryShape, RangeExplain, RowCostEstimate,
        explain::build_explain,
        selector::select_plan,
    },
    predicate::Predicate,
    rangetree::{TreeClass, build::build_range_tree},
    sequence::RangeSequence,
};

///
/// RangeAnalysis
///

#[derive(Debug)]
pub struct RangeAnalysis {
    pub outcome: AccessOutcome,
    pub warnings: Vec<RangeWarning>,
}

///
/// AccessOutcome
///

#[derive(Debug)]
pub enum AccessOutcome {
    /// No usable range access; the caller falls back to a full scan.
    NoRangeAccess,
    /// The predicate provably matches no rows.
    NoMatchingRows,
    /// A range strategy beat the full scan.
    Plan(PlannedAccess),
}

///
/// PlannedAccess
///
/// The winning plan bound to the arena that owns its interval graphs.
///

#[derive(Debug)]
pub struct PlannedAccess {
    pub kind: PlanKind,
    pub estimate: RowCostEstimate,
    pub explain: RangeExplain,
    arena: IntervalArena,
    access: PlanAccess,
}

/// One scan leg of a chosen plan: index catalog position plus its lazy
/// range sequence.
pub struct ScanLeg<'a> {
    pub index: usize,
    pub ranges: RangeSequence<'a>,
}

///
/// LooseParameters
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LooseParameters {
    pub index: usize,
    pub group_prefix_len: usize,
    pub infix_len: usize,
}

impl PlannedAccess {
    /// Scan legs in execution order. A loose scan without range
    /// constraints has none.
    #[must_use]
    pub fn scan_legs(&self) -> Vec<ScanLeg<'_>> {
        let leg = |index: usize, root| ScanLeg {
            index,
            ranges: RangeSequence::new(&self.arena, root),
        };
        match &self.access {
            PlanAccess::Range { scan } => vec![leg(scan.index, scan.root)],
            PlanAccess::RorIntersection {
                scans,
                clustered_filter,
            } => scans
                .iter()
                .chain(clustered_filter.iter())
                .map(|scan| leg(scan.index, scan.root))
                .collect(),
            PlanAccess::RorUnion { scans } | PlanAccess::SortMerge { scans } => {
                scans.iter().map(|scan| leg(scan.index, scan.root)).collect()
            }
            PlanAccess::Loose { index, root, .. } => {
                root.map(|root| leg(*index, root)).into_iter().collect()
            }
        }
    }

    #[must_use]
    pub fn loose_parameters(&self) -> Option<LooseParameters> {
        match &self.access {
            PlanAccess::Loose {
                index,
                group_prefix_len,
                infix_len,
                ..
            } => Some(LooseParameters {
                index: *index,
                group_prefix_len: *group_prefix_len,
                infix_len: *infix_len,
            }),
            _ => None,
        }
    }
}

/// Analyze `predicate` over `table` and pick the cheapest index access.
///
/// Returns `Err` only on internal invariant violations; resource
/// exhaustion and aborts degrade to `NoRangeAccess`.
pub fn analyze_range_access(
    table: &TableModel,
    predicate: &Predicate,
    shape: &QueryShape,
    config: &RangeConfig,
    oracle: &dyn CostOracle,
    trace: Option<&dyn TraceSink>,
) -> Result<RangeAnalysis, RangeError> {
    emit(trace, AnalysisEvent::Started { table: table.name });

    let mut warnings = Warnings::default();
    let mut arena = IntervalArena::new(config.max_mem_bytes, config.max_depth, config.abort.clone());

    let built = build_range_tree(&mut arena, table, shape.usable_indexes, config, predicate);
    let range_tree = match built {
        Ok(tree) => tree,
        Err(err) if err.is_recoverable() => {
            record_warning(&mut warnings, &err);
            if let RangeError::BudgetExceeded { budget } = err {
                emit(trace, AnalysisEvent::BudgetExceeded { budget });
            }
            emit(trace, AnalysisEvent::Finished { chosen: None });
            return Ok(RangeAnalysis {
                outcome: AccessOutcome::NoRangeAccess,
                warnings: warnings.into_vec(),
            });
        }
        Err(err) => return Err(err),
    };

    #[cfg(debug_assertions)]
    for (_, root) in range_tree.constrained() {
        crate::interval::invariants::validate_graph(&arena, root)?;
    }

    emit(
        trace,
        AnalysisEvent::TreeBuilt {
            constrained_indexes: u32::try_from(range_tree.constrained_count()).unwrap_or(u32::MAX),
            merge_alternatives: u32::try_from(range_tree.merge_alternatives().len())
                .unwrap_or(u32::MAX),
        },
    );

    if range_tree.classification == TreeClass::Impossible {
        range_tree.release(&mut arena);
        emit(trace, AnalysisEvent::Finished { chosen: None });
        return Ok(RangeAnalysis {
            outcome: AccessOutcome::NoMatchingRows,
            warnings: warnings.into_vec(),
        });
    }

    let mut selection = select_plan(&mut arena, table, &range_tree, shape, config, oracle, trace);
    range_tree.release(&mut arena);

    let outcome = match selection.chosen.take() {
        Some(chosen) => {
            let explain = build_explain(table, &selection, &chosen);
            let ChosenPlan {
                kind,
                estimate,
                access,
            } = chosen;
            emit(trace, AnalysisEvent::Finished { chosen: Some(kind) });
            AccessOutcome::Plan(PlannedAccess {
                kind,
                estimate,
                explain,
                arena,
                access,
            })
        }
        None => {
            emit(trace, AnalysisEvent::Finished { chosen: None });
            AccessOutcome::NoRangeAccess
        }
    };

    Ok(RangeAnalysis {
        outcome,
        warnings: warnings.into_vec(),
    })
}

fn emit(trace: Option<&dyn TraceSink>, event: AnalysisEvent) {
    if let Some(trace) = trace {
        trace.on_event(event);
    }
}

fn record_warning(warnings: &mut Warnings, err: &RangeError) {
    let warning = match err {
        RangeError::BudgetExceeded { .. } => RangeWarning::MemoryBudgetExceeded,
        RangeError::DepthExceeded { .. } => RangeWarning::DepthCapExceeded,
        RangeError::Aborted => RangeWarning::AnalysisAborted,
        RangeError::Internal(_) => return,
    };
    warnings.push(warning);
}
