//! Loose index scan: answering GROUP BY / DISTINCT (with optional MIN/MAX)
//! by jumping between distinct group prefixes instead of reading every row.

use crate::{
    interval::{Handle, IntervalArena, tree},
    model::{IndexModel, TableModel},
    plan::{
        PlanAccess, PlanKind, QueryShape,
        cost::{CostOracle, DESCENT_COST, Cost, RowCostEstimate},
        selector::Candidate,
    },
    rangetree::RangeTree,
};

/// Build the loose-scan candidate, if any index qualifies. Indexes are
/// tried in catalog order; the cheapest qualifying one wins.
pub(crate) fn consider(
    arena: &IntervalArena,
    table: &TableModel,
    range_tree: &RangeTree,
    shape: &QueryShape,
    oracle: &dyn CostOracle,
) -> Option<Candidate> {
    let group: &[&str] = if shape.group_fields.is_empty() {
        if !shape.distinct {
            return None;
        }
        &shape.needed_columns
    } else {
        &shape.group_fields
    };
    if group.is_empty() {
        return None;
    }

    let table_rows = oracle.full_scan_cost(table).rows.max(1);
    let mut best: Option<Candidate> = None;

    for (position, index) in table.indexes.iter().enumerate() {
        if !shape.usable_indexes.contains(position) {
            continue;
        }
        let Some(scan) = qualify(arena, index, position, range_tree, shape, group) else {
            continue;
        };

        let prefix_len = group.len();
        let rows_per_group = oracle
            .estimate_equality_dive_count(index, prefix_len - 1)
            .max(1);
        let groups = table_rows.div_ceil(rows_per_group);
        #[allow(clippy::cast_precision_loss)]
        let cost = Cost::new(groups as f64 * DESCENT_COST);

        let candidate = Candidate {
            kind: PlanKind::LooseIndexScan,
            estimate: RowCostEstimate::new(groups, cost),
            covering: true,
            access: scan,
        };
        let better = best
            .as_ref()
            .is_none_or(|current| candidate.estimate.cost < current.estimate.cost);
        if better {
            best = Some(candidate);
        }
    }
    best
}

// One index qualifies when the group columns are exactly its leading
// keyparts, the MIN/MAX argument (if any) follows an equality-constrained
// infix, and nothing past the argument is constrained.
fn qualify(
    arena: &IntervalArena,
    index: &IndexModel,
    position: usize,
    range_tree: &RangeTree,
    shape: &QueryShape,
    group: &[&str],
) -> Option<PlanAccess> {
    let prefix_len = group.len();
    if index.keyparts.len() < prefix_len {
        return None;
    }
    let leading = &index.keyparts[..prefix_len];
    let prefix_matches = leading
        .iter()
        .all(|kp| !kp.partial && group.contains(&kp.column))
        && group
            .iter()
            .all(|column| leading.iter().any(|kp| kp.column == *column));
    if !prefix_matches {
        return None;
    }

    let (infix_len, last_used) = match shape.min_max {
        Some(min_max) => {
            let at = index.keypart_of(min_max.field)?;
            if at < prefix_len {
                return None;
            }
            (at - prefix_len, at)
        }
        None => (0, prefix_len.saturating_sub(1)),
    };

    // Loose scans produce only the prefix, infix, and argument columns.
    let produced = &index.keyparts[..=last_used];
    let all_produced = shape
        .needed_columns
        .iter()
        .all(|column| produced.iter().any(|kp| kp.column == *column && !kp.partial));
    if !all_produced {
        return None;
    }

    let root = range_tree.per_index[position];
    if let Some(root) = root {
        let levels = levels(arena, root);
        // Infix keyparts must each be pinned to a single value.
        for level in prefix_len..prefix_len + infix_len {
            match levels.get(level) {
                Some(nodes) if nodes.len() == 1 && arena.node(nodes[0]).is_point() => {}
                _ => return None,
            }
        }
        // At most one non-equality range on the argument keypart, nothing
        // past it.
        if shape.min_max.is_some() {
            if let Some(nodes) = levels.get(last_used) {
                let open = nodes
                    .iter()
                    .filter(|h| !arena.node(**h).is_point())
                    .count();
                if open > 1 {
                    return None;
                }
            }
        }
        if levels.len() > last_used + 1 {
            return None;
        }
    }

    Some(PlanAccess::Loose {
        index: position,
        root,
        group_prefix_len: prefix_len,
        infix_len,
    })
}

// All graph nodes grouped by keypart, across continuation edges.
fn levels(arena: &IntervalArena, root: Handle) -> Vec<Vec<Handle>> {
    let mut out: Vec<Vec<Handle>> = Vec::new();
    collect(arena, root, &mut out);
    out
}

fn collect(arena: &IntervalArena, root: Handle, out: &mut Vec<Vec<Handle>>) {
    for handle in tree::handles(arena, root) {
        let keypart = arena.node(handle).keypart as usize;
        if out.len() <= keypart {
            out.resize_with(keypart + 1, Vec::new);
        }
        out[keypart].push(handle);
        if let Some(continuation) = arena.node(handle).continuation {
            collect(arena, continuation, out);
        }
    }
}
