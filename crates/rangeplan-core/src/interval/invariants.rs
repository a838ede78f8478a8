//! Structural audits over interval graphs. Exercised by tests and by debug
//! assertions at the analysis boundary; violations indicate bugs, never bad
//! input.

use crate::{
    error::{InternalError, RangeError},
    interval::{
        arena::{Handle, IntervalArena},
        node::{Color, bounds_nonempty, cmp_lower, cmp_upper},
        tree,
    },
};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Validate one graph reachable from `root`: red-black shape, interval
/// ordering and disjointness, sibling-list agreement, and keypart
/// monotonicity across continuation edges.
pub(crate) fn validate_graph(arena: &IntervalArena, root: Handle) -> Result<(), RangeError> {
    validate_tree(arena, root)?;
    for handle in tree::handles(arena, root) {
        if let Some(continuation) = arena.node(handle).continuation {
            if arena.node(continuation).keypart <= arena.node(handle).keypart {
                return Err(InternalError::graph_invariant(format!(
                    "continuation keypart {} does not follow keypart {}",
                    arena.node(continuation).keypart,
                    arena.node(handle).keypart,
                ))
                .into());
            }
            validate_graph(arena, continuation)?;
        }
    }
    Ok(())
}

fn validate_tree(arena: &IntervalArena, root: Handle) -> Result<(), RangeError> {
    let node = arena.node(root);
    if node.parent.is_some() {
        return Err(InternalError::graph_invariant("tree root has a parent").into());
    }
    if node.color != Color::Black {
        return Err(InternalError::graph_invariant("tree root is red").into());
    }
    if node.share_count == 0 {
        return Err(InternalError::graph_invariant("live root with zero share count").into());
    }

    black_height(arena, Some(root), node.keypart)?;

    // The sibling list must enumerate exactly the in-order walk, and the
    // intervals along it must be nonempty, disjoint, and strictly ordered.
    let mut in_order = Vec::new();
    collect_in_order(arena, root, &mut in_order);
    let listed = tree::handles(arena, root);
    if in_order != listed {
        return Err(
            InternalError::graph_invariant("sibling list disagrees with in-order walk").into(),
        );
    }
    for handle in &listed {
        let n = arena.node(*handle);
        if !bounds_nonempty(&n.lower, &n.upper) {
            return Err(InternalError::graph_invariant("empty interval in tree").into());
        }
        if *handle != root && n.share_count != 1 {
            return Err(
                InternalError::graph_invariant("interior node with shared count").into(),
            );
        }
    }
    for pair in listed.windows(2) {
        let a = arena.node(pair[0]);
        let b = arena.node(pair[1]);
        if cmp_lower(&a.lower, &b.lower) != Ordering::Less {
            return Err(InternalError::graph_invariant("intervals out of order").into());
        }
        if cmp_upper(&a.upper, &b.upper) != Ordering::Less || overlapping(arena, pair[0], pair[1])
        {
            return Err(InternalError::graph_invariant("overlapping intervals").into());
        }
    }
    Ok(())
}

// Adjacent-in-order intervals overlap when the first's upper reaches the
// second's lower.
fn overlapping(arena: &IntervalArena, first: Handle, second: Handle) -> bool {
    let a = arena.node(first);
    let b = arena.node(second);
    bounds_nonempty(&b.lower, &a.upper)
}

// Checks red-red violations, keypart uniformity, and equal black heights;
// returns the subtree's black height.
fn black_height(
    arena: &IntervalArena,
    handle: Option<Handle>,
    keypart: u16,
) -> Result<u32, RangeError> {
    let Some(handle) = handle else {
        return Ok(1);
    };
    let node = arena.node(handle);
    if node.keypart != keypart {
        return Err(InternalError::graph_invariant("mixed keyparts in one tree").into());
    }
    if node.color == Color::Red
        && (color_of(arena, node.left) == Color::Red
            || color_of(arena, node.right) == Color::Red)
    {
        return Err(InternalError::graph_invariant("red node with red child").into());
    }
    for child in [node.left, node.right] {
        if let Some(child) = child {
            if arena.node(child).parent != Some(handle) {
                return Err(InternalError::graph_invariant("child parent pointer broken").into());
            }
        }
    }
    let left = black_height(arena, node.left, keypart)?;
    let right = black_height(arena, node.right, keypart)?;
    if left != right {
        return Err(InternalError::graph_invariant("unequal black heights").into());
    }
    Ok(left + u32::from(node.color == Color::Black))
}

fn color_of(arena: &IntervalArena, handle: Option<Handle>) -> Color {
    handle.map_or(Color::Black, |h| arena.node(h).color)
}

fn collect_in_order(arena: &IntervalArena, handle: Handle, out: &mut Vec<Handle>) {
    let node = arena.node(handle);
    if let Some(left) = node.left {
        collect_in_order(arena, left, out);
    }
    out.push(handle);
    if let Some(right) = node.right {
        collect_in_order(arena, right, out);
    }
}

/// Recompute every reachable root's reference count from the entry roots
/// and continuation edges, and compare against the stored counts.
pub(crate) fn audit_share_counts(
    arena: &IntervalArena,
    entry_roots: &[Handle],
) -> Result<(), RangeError> {
    let mut expected: HashMap<Handle, u32> = HashMap::new();
    for &root in entry_roots {
        accumulate(arena, root, &mut expected);
    }
    for (root, count) in expected {
        let stored = arena.node(root).share_count;
        if stored != count {
            return Err(InternalError::graph_invariant(format!(
                "share count {stored} but {count} live references",
            ))
            .into());
        }
    }
    Ok(())
}

fn accumulate(arena: &IntervalArena, root: Handle, expected: &mut HashMap<Handle, u32>) {
    let count = expected.entry(root).or_insert(0);
    *count += 1;
    // Only the first reference walks the tree; later ones would double
    // count the continuation edges.
    if *count > 1 {
        return;
    }
    for handle in tree::handles(arena, root) {
        if let Some(continuation) = arena.node(handle).continuation {
            accumulate(arena, continuation, expected);
        }
    }
}
