//! Candidate enumeration and the final cost comparison.
//!
//! Selection is deterministic: indexes are visited in catalog order and
//! cost ties prefer covering candidates, then the earlier-enumerated one.

use crate::{
    config::RangeConfig,
    diagnostics::{AnalysisEvent, TraceSink},
    interval::{Handle, IntervalArena, tree},
    model::{IndexModel, TableModel},
    plan::{
        ChosenPlan, IndexScan, PlanAccess, PlanKind, QueryShape,
        cost::{
            CostOracle, DEDUP_COST, DESCENT_COST, KEY_COMPARE_COST, ROW_FETCH_COST, Cost,
            RowCostEstimate,
        },
        explain::RejectedCandidate,
        loose,
    },
    rangetree::RangeTree,
    sequence::{KeyRange, RangeSequence},
};

///
/// Selection
///
/// Everything the caller needs from one selection pass: the winner (if any
/// beat the full scan), the baseline, and the explain bookkeeping.
///

pub(crate) struct Selection {
    pub(crate) chosen: Option<ChosenPlan>,
    pub(crate) baseline: RowCostEstimate,
    pub(crate) rejected: Vec<RejectedCandidate>,
    /// Catalog position and range count per constrained index.
    pub(crate) range_counts: Vec<(usize, u32)>,
}

pub(crate) struct Candidate {
    pub(crate) kind: PlanKind,
    pub(crate) estimate: RowCostEstimate,
    pub(crate) covering: bool,
    pub(crate) access: PlanAccess,
}

pub(crate) fn select_plan(
    arena: &mut IntervalArena,
    table: &TableModel,
    range_tree: &RangeTree,
    shape: &QueryShape,
    config: &RangeConfig,
    oracle: &dyn CostOracle,
    trace: Option<&dyn TraceSink>,
) -> Selection {
    let baseline = oracle.full_scan_cost(table);
    let mut candidates: Vec<Candidate> = Vec::new();
    let mut rejected: Vec<RejectedCandidate> = Vec::new();
    let mut range_counts: Vec<(usize, u32)> = Vec::new();

    // Plain range scans, one candidate per constrained index anchored at
    // the leading keypart.
    for (position, root) in range_tree.constrained() {
        if arena.node(root).keypart != 0 {
            continue;
        }
        let index = &table.indexes[position];
        let ranges: Vec<KeyRange> = RangeSequence::new(arena, root).collect();
        range_counts.push((position, u32::try_from(ranges.len()).unwrap_or(u32::MAX)));

        let scan = estimate_index_ranges(index, &ranges, config, oracle);
        let covering = index.covers(&shape.needed_columns);
        #[allow(clippy::cast_precision_loss)]
        let fetch = if covering {
            Cost::ZERO
        } else {
            Cost::new(scan.rows as f64 * ROW_FETCH_COST)
        };
        let estimate = RowCostEstimate::new(scan.rows, scan.cost + fetch);
        emit(trace, PlanKind::RangeScan);
        candidates.push(Candidate {
            kind: PlanKind::RangeScan,
            estimate,
            covering,
            access: PlanAccess::Range {
                scan: IndexScan {
                    index: position,
                    root,
                },
            },
        });
    }

    if config.index_merge_intersection {
        if let Some(candidate) =
            ror_intersection(arena, table, range_tree, shape, config, oracle, baseline)
        {
            emit(trace, PlanKind::RorIntersection);
            candidates.push(candidate);
        }
    } else if range_tree.constrained_count() > 1 {
        rejected.push(RejectedCandidate::new(
            PlanKind::RorIntersection,
            "intersection strategy disabled",
        ));
    }

    index_merge_candidates(
        arena,
        table,
        range_tree,
        shape,
        config,
        oracle,
        trace,
        &mut candidates,
        &mut rejected,
    );

    if let Some(candidate) = loose::consider(arena, table, range_tree, shape, oracle) {
        emit(trace, PlanKind::LooseIndexScan);
        candidates.push(candidate);
    }

    // Cheapest candidate wins; ties prefer covering, then enumeration
    // order.
    let mut best: Option<Candidate> = None;
    for candidate in candidates {
        let replace = match &best {
            None => true,
            Some(current) => {
                match candidate
                    .estimate
                    .cost
                    .value()
                    .total_cmp(&current.estimate.cost.value())
                {
                    std::cmp::Ordering::Less => true,
                    std::cmp::Ordering::Greater => false,
                    std::cmp::Ordering::Equal => candidate.covering && !current.covering,
                }
            }
        };
        if replace {
            best = Some(candidate);
        }
    }

    let chosen = match best {
        Some(candidate) if candidate.estimate.cost < baseline.cost => {
            retain_access(arena, &candidate.access);
            Some(ChosenPlan {
                kind: candidate.kind,
                estimate: candidate.estimate,
                access: candidate.access,
            })
        }
        Some(candidate) => {
            rejected.push(RejectedCandidate::new(
                candidate.kind,
                "full table scan is cheaper",
            ));
            None
        }
        None => None,
    };

    Selection {
        chosen,
        baseline,
        rejected,
        range_counts,
    }
}

fn emit(trace: Option<&dyn TraceSink>, kind: PlanKind) {
    if let Some(trace) = trace {
        trace.on_event(AnalysisEvent::CandidateCosted {
            kind,
            considered: true,
        });
    }
}

// The chosen plan owns one reference per graph it scans.
fn retain_access(arena: &mut IntervalArena, access: &PlanAccess) {
    match access {
        PlanAccess::Range { scan } => tree::retain(arena, scan.root),
        PlanAccess::RorIntersection {
            scans,
            clustered_filter,
        } => {
            for scan in scans {
                tree::retain(arena, scan.root);
            }
            if let Some(filter) = clustered_filter {
                tree::retain(arena, filter.root);
            }
        }
        PlanAccess::RorUnion { scans } | PlanAccess::SortMerge { scans } => {
            for scan in scans {
                tree::retain(arena, scan.root);
            }
        }
        PlanAccess::Loose { root, .. } => {
            if let Some(root) = root {
                tree::retain(arena, *root);
            }
        }
    }
}

/// Estimate one index's ranges, switching from per-range dives to aggregate
/// statistics above the equality dive limit.
fn estimate_index_ranges(
    index: &IndexModel,
    ranges: &[KeyRange],
    config: &RangeConfig,
    oracle: &dyn CostOracle,
) -> RowCostEstimate {
    let all_points = !ranges.is_empty() && ranges.iter().all(KeyRange::is_point);
    if all_points && ranges.len() > config.eq_range_dive_limit {
        let keypart = ranges[0].start.len().saturating_sub(1);
        let rows_per = oracle.estimate_equality_dive_count(index, keypart);
        let count = ranges.len() as u64;
        let rows = rows_per.saturating_mul(count);
        #[allow(clippy::cast_precision_loss)]
        let cost = Cost::new(count as f64 * DESCENT_COST + rows as f64 * KEY_COMPARE_COST);
        return RowCostEstimate::new(rows, cost);
    }
    oracle.estimate_range(index, ranges)
}

struct RorLeg {
    position: usize,
    root: Handle,
    estimate: RowCostEstimate,
    selectivity: f64,
}

// Greedy rowid-ordered intersection. The ordering heuristic (most newly
// covered columns, then fewest rows) is not globally optimal; it matches
// the long-standing behavior this planner reproduces.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn ror_intersection(
    arena: &IntervalArena,
    table: &TableModel,
    range_tree: &RangeTree,
    shape: &QueryShape,
    config: &RangeConfig,
    oracle: &dyn CostOracle,
    baseline: RowCostEstimate,
) -> Option<Candidate> {
    let table_rows = baseline.rows.max(1) as f64;

    let mut legs: Vec<RorLeg> = Vec::new();
    let mut clustered: Option<RorLeg> = None;
    for (position, root) in range_tree.constrained() {
        if arena.node(root).keypart != 0 {
            continue;
        }
        let index = &table.indexes[position];
        if !index.ror_capable {
            continue;
        }
        let ranges: Vec<KeyRange> = RangeSequence::new(arena, root).collect();
        let estimate = estimate_index_ranges(index, &ranges, config, oracle);
        let selectivity = (estimate.rows as f64 / table_rows).min(1.0);
        let leg = RorLeg {
            position,
            root,
            estimate,
            selectivity,
        };
        if index.clustered {
            clustered = Some(leg);
        } else {
            legs.push(leg);
        }
    }
    if legs.len() < 2 {
        return None;
    }

    let mut covered: Vec<&str> = Vec::new();
    let mut chosen: Vec<RorLeg> = Vec::new();
    let mut rows = table_rows;
    let mut scan_cost = 0.0;

    while !legs.is_empty() {
        // Pick the leg covering the most not-yet-covered output columns,
        // then the fewest rows, then catalog order.
        let mut best_at = 0usize;
        let mut best_key = (0usize, f64::INFINITY);
        for (at, leg) in legs.iter().enumerate() {
            let newly = newly_covered(&table.indexes[leg.position], &covered, shape);
            let key = (newly, leg.estimate.rows as f64);
            if key.0 > best_key.0 || (key.0 == best_key.0 && key.1 < best_key.1) {
                best_key = key;
                best_at = at;
            }
        }
        let leg = legs.remove(best_at);

        // A leg that neither narrows the row set nor covers new columns
        // only adds cost.
        if !chosen.is_empty() && leg.selectivity >= 1.0 && best_key.0 == 0 {
            continue;
        }

        for keypart in table.indexes[leg.position].keyparts {
            if !keypart.partial && !covered.contains(&keypart.column) {
                covered.push(keypart.column);
            }
        }
        rows *= leg.selectivity;
        scan_cost += leg.estimate.cost.value();
        chosen.push(leg);

        if covers_all(&covered, shape) {
            break;
        }
    }
    if chosen.len() < 2 {
        return None;
    }

    let covering = covers_all(&covered, shape);
    let mut clustered_filter = None;
    if let Some(leg) = clustered {
        if leg.selectivity < 1.0 {
            rows *= leg.selectivity;
            scan_cost += rows * KEY_COMPARE_COST;
            clustered_filter = Some(IndexScan {
                index: leg.position,
                root: leg.root,
            });
        }
    }

    let rows = rows.max(1.0) as u64;
    let mut cost = scan_cost + rows as f64 * KEY_COMPARE_COST * chosen.len() as f64;
    if !covering {
        cost += rows as f64 * ROW_FETCH_COST;
    }

    Some(Candidate {
        kind: PlanKind::RorIntersection,
        estimate: RowCostEstimate::new(rows, Cost::new(cost)),
        covering,
        access: PlanAccess::RorIntersection {
            scans: chosen
                .into_iter()
                .map(|leg| IndexScan {
                    index: leg.position,
                    root: leg.root,
                })
                .collect(),
            clustered_filter,
        },
    })
}

fn newly_covered(index: &IndexModel, covered: &[&str], shape: &QueryShape) -> usize {
    shape
        .needed_columns
        .iter()
        .filter(|column| {
            !covered.contains(column)
                && index
                    .keyparts
                    .iter()
                    .any(|kp| kp.column == **column && !kp.partial)
        })
        .count()
}

fn covers_all(covered: &[&str], shape: &QueryShape) -> bool {
    shape
        .needed_columns
        .iter()
        .all(|column| covered.contains(column))
}

// Index-merge execution of the tree's alternatives: rowid-ordered union
// when every arm is ROR-capable (and the rows are not being deleted),
// otherwise a sort-based merge.
#[allow(clippy::too_many_arguments, clippy::cast_precision_loss)]
fn index_merge_candidates(
    arena: &IntervalArena,
    table: &TableModel,
    range_tree: &RangeTree,
    shape: &QueryShape,
    config: &RangeConfig,
    oracle: &dyn CostOracle,
    trace: Option<&dyn TraceSink>,
    candidates: &mut Vec<Candidate>,
    rejected: &mut Vec<RejectedCandidate>,
) {
    for alternative in range_tree.merge_alternatives() {
        let mut scans: Vec<IndexScan> = Vec::new();
        let mut rows: u64 = 0;
        let mut scan_cost = 0.0;
        let mut all_ror = true;
        let mut viable = true;

        for arm in &alternative.arms {
            // Cheapest leading-keypart index for this arm.
            let mut best: Option<(IndexScan, RowCostEstimate)> = None;
            for &(position, root) in &arm.candidates {
                if arena.node(root).keypart != 0 {
                    continue;
                }
                let index = &table.indexes[position];
                let ranges: Vec<KeyRange> = RangeSequence::new(arena, root).collect();
                let estimate = estimate_index_ranges(index, &ranges, config, oracle);
                let better = best
                    .as_ref()
                    .is_none_or(|(_, current)| estimate.cost < current.cost);
                if better {
                    best = Some((
                        IndexScan {
                            index: position,
                            root,
                        },
                        estimate,
                    ));
                }
            }
            let Some((scan, estimate)) = best else {
                viable = false;
                break;
            };
            all_ror &= table.indexes[scan.index].ror_capable;
            rows = rows.saturating_add(estimate.rows);
            scan_cost += estimate.cost.value();
            scans.push(scan);
        }

        if !viable {
            rejected.push(RejectedCandidate::new(
                PlanKind::SortIndexMerge,
                "merge arm without a leading-keypart index",
            ));
            continue;
        }

        let arm_count = scans.len() as f64;
        if all_ror && !shape.for_delete && config.index_merge_union {
            let cost = scan_cost
                + rows as f64 * arm_count.log2().max(1.0) * KEY_COMPARE_COST
                + rows as f64 * ROW_FETCH_COST;
            emit(trace, PlanKind::RorUnion);
            candidates.push(Candidate {
                kind: PlanKind::RorUnion,
                estimate: RowCostEstimate::new(rows, Cost::new(cost)),
                covering: false,
                access: PlanAccess::RorUnion { scans },
            });
        } else if config.index_merge_sort_union {
            let cost =
                scan_cost + rows as f64 * DEDUP_COST + rows as f64 * ROW_FETCH_COST;
            emit(trace, PlanKind::SortIndexMerge);
            candidates.push(Candidate {
                kind: PlanKind::SortIndexMerge,
                estimate: RowCostEstimate::new(rows, Cost::new(cost)),
                covering: false,
                access: PlanAccess::SortMerge { scans },
            });
        } else {
            rejected.push(RejectedCandidate::new(
                PlanKind::SortIndexMerge,
                "index merge strategies disabled",
            ));
        }
    }
}
