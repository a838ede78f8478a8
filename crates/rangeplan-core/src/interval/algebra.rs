//! AND/OR algebra over interval trees.
//!
//! Calling convention: operands are owned references. Every operation
//! consumes one reference to each operand and returns an owned reference to
//! the result (or none when the result matches no rows). A shared tree is
//! never mutated in place: `ensure_exclusive` clones the minimal tree first
//! and shifts reference counts accordingly.
//!
//! Cross-keypart AND nests the higher keypart under every interval of the
//! lower one; an N-way by M-way combination can allocate up to N*M leaves.
//! The only cap on that blow-up is the arena byte budget, surfaced as a
//! recoverable `RangeError::BudgetExceeded`.

use crate::{
    error::RangeError,
    interval::{
        arena::{Handle, IntervalArena},
        node::{
            IntervalNode, bounds_nonempty, cmp_lower, cmp_upper, gap_between, lower_to_upper,
            max_lower, min_upper, upper_to_lower,
        },
        tree,
    },
    value::Value,
};
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::ops::Bound;

///
/// UnionOutcome
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum UnionOutcome {
    Tree(Handle),
    /// The union degenerated to the full unconstrained range.
    Always,
}

// Flat view of one interval used by the sweep phases. `cont` is borrowed
// from the source tree until a piece retains it.
#[derive(Clone, Debug)]
struct Segment {
    lower: Bound<Value>,
    upper: Bound<Value>,
    cont: Option<Handle>,
    maybe_null: bool,
}

fn segments_of(arena: &IntervalArena, root: Handle) -> Vec<Segment> {
    tree::handles(arena, root)
        .into_iter()
        .map(|handle| {
            let node = arena.node(handle);
            Segment {
                lower: node.lower.clone(),
                upper: node.upper.clone(),
                cont: node.continuation,
                maybe_null: node.maybe_null,
            }
        })
        .collect()
}

/// Clone a whole tree, sharing (and retaining) its continuations.
pub(crate) fn clone_tree(arena: &mut IntervalArena, root: Handle) -> Result<Handle, RangeError> {
    let copy = copy_subtree(arena, root, None)?;
    rethread(arena, copy);
    Ok(copy)
}

fn copy_subtree(
    arena: &mut IntervalArena,
    source: Handle,
    parent: Option<Handle>,
) -> Result<Handle, RangeError> {
    let (template, source_left, source_right) = {
        let node = arena.node(source);
        (
            IntervalNode {
                keypart: node.keypart,
                lower: node.lower.clone(),
                upper: node.upper.clone(),
                maybe_null: node.maybe_null,
                color: node.color,
                parent: None,
                left: None,
                right: None,
                next: None,
                prev: None,
                continuation: node.continuation,
                share_count: 1,
            },
            node.left,
            node.right,
        )
    };
    if let Some(continuation) = template.continuation {
        tree::retain(arena, continuation);
    }

    let copy = arena.alloc(template)?;
    arena.node_mut(copy).parent = parent;
    if let Some(left) = source_left {
        let left_copy = copy_subtree(arena, left, Some(copy))?;
        arena.node_mut(copy).left = Some(left_copy);
    }
    if let Some(right) = source_right {
        let right_copy = copy_subtree(arena, right, Some(copy))?;
        arena.node_mut(copy).right = Some(right_copy);
    }
    Ok(copy)
}

// Rebuild the sibling list of a freshly copied tree from its in-order walk.
fn rethread(arena: &mut IntervalArena, root: Handle) {
    let mut ordered = Vec::new();
    collect_in_order(arena, root, &mut ordered);
    for pair in ordered.windows(2) {
        arena.node_mut(pair[0]).next = Some(pair[1]);
        arena.node_mut(pair[1]).prev = Some(pair[0]);
    }
}

fn collect_in_order(arena: &IntervalArena, handle: Handle, out: &mut Vec<Handle>) {
    let (left, right) = {
        let node = arena.node(handle);
        (node.left, node.right)
    };
    if let Some(left) = left {
        collect_in_order(arena, left, out);
    }
    out.push(handle);
    if let Some(right) = right {
        collect_in_order(arena, right, out);
    }
}

/// Take exclusive ownership of a tree, cloning it when shared.
pub(crate) fn ensure_exclusive(
    arena: &mut IntervalArena,
    root: Handle,
) -> Result<Handle, RangeError> {
    if arena.node(root).share_count <= 1 {
        return Ok(root);
    }
    arena.node_mut(root).share_count -= 1;
    clone_tree(arena, root)
}

/// Structural equivalence of two trees: same intervals in order, with
/// structurally equivalent continuations. Tree shape and sharing may differ.
pub(crate) fn structural_eq(arena: &IntervalArena, a: Handle, b: Handle) -> bool {
    if a == b {
        return true;
    }
    let la = tree::handles(arena, a);
    let lb = tree::handles(arena, b);
    if la.len() != lb.len() {
        return false;
    }
    la.iter().zip(lb.iter()).all(|(&ha, &hb)| {
        let na = arena.node(ha);
        let nb = arena.node(hb);
        na.keypart == nb.keypart
            && na.lower == nb.lower
            && na.upper == nb.upper
            && na.maybe_null == nb.maybe_null
            && match (na.continuation, nb.continuation) {
                (None, None) => true,
                (Some(ca), Some(cb)) => structural_eq(arena, ca, cb),
                _ => false,
            }
    })
}

/// AND of two graphs. Consumes both operand references; returns `None` when
/// the intersection provably matches no rows.
pub(crate) fn intersect(
    arena: &mut IntervalArena,
    a: Handle,
    b: Handle,
    depth: u32,
) -> Result<Option<Handle>, RangeError> {
    arena.step(depth)?;

    if a == b {
        // Two references to the same graph; AND is the graph itself.
        tree::release(arena, a);
        return Ok(Some(a));
    }

    let keypart_a = arena.node(a).keypart;
    let keypart_b = arena.node(b).keypart;
    if keypart_a != keypart_b {
        let (outer, inner) = if keypart_a < keypart_b { (a, b) } else { (b, a) };
        return and_next_keypart(arena, outer, inner, depth);
    }

    let left = segments_of(arena, a);
    let right = segments_of(arena, b);
    let mut pieces = Vec::new();
    let (mut ia, mut ib) = (0usize, 0usize);
    while ia < left.len() && ib < right.len() {
        arena.check_abort()?;
        let x = &left[ia];
        let y = &right[ib];
        let lower = max_lower(&x.lower, &y.lower);
        let upper = min_upper(&x.upper, &y.upper);
        if bounds_nonempty(&lower, &upper) {
            let cont = match (x.cont, y.cont) {
                (None, None) => Some(None),
                (Some(c), None) | (None, Some(c)) => {
                    tree::retain(arena, c);
                    Some(Some(c))
                }
                (Some(ca), Some(cb)) => {
                    tree::retain(arena, ca);
                    tree::retain(arena, cb);
                    intersect(arena, ca, cb, depth + 1)?.map(Some)
                }
            };
            // An empty continuation intersection drops the whole piece.
            if let Some(cont) = cont {
                pieces.push(Segment {
                    lower,
                    upper,
                    cont,
                    maybe_null: x.maybe_null && y.maybe_null,
                });
            }
        }
        match cmp_upper(&x.upper, &y.upper) {
            Ordering::Less => ia += 1,
            Ordering::Greater => ib += 1,
            Ordering::Equal => {
                ia += 1;
                ib += 1;
            }
        }
    }

    let root = build_tree(arena, keypart_a, pieces)?;
    tree::release(arena, a);
    tree::release(arena, b);
    Ok(root)
}

// AND a higher-keypart graph under every interval of the lower-keypart one.
fn and_next_keypart(
    arena: &mut IntervalArena,
    outer: Handle,
    inner: Handle,
    depth: u32,
) -> Result<Option<Handle>, RangeError> {
    let outer = ensure_exclusive(arena, outer)?;
    let mut root = Some(outer);

    for handle in tree::handles(arena, outer) {
        arena.step(depth)?;
        let cont = arena.node(handle).continuation;
        tree::retain(arena, inner);
        let new_cont = match cont {
            None => Some(inner),
            Some(existing) => {
                // Transfer the node's continuation reference into the
                // recursive intersect.
                arena.node_mut(handle).continuation = None;
                intersect(arena, existing, inner, depth + 1)?
            }
        };
        match new_cont {
            Some(next) => arena.node_mut(handle).continuation = Some(next),
            None => {
                let Some(current) = root else {
                    unreachable!("removal from an empty tree");
                };
                root = tree::remove(arena, current, handle);
                tree::free_detached(arena, handle);
            }
        }
    }

    tree::release(arena, inner);
    Ok(root)
}

/// OR of two graphs on the same keypart. Consumes both operand references.
pub(crate) fn union(
    arena: &mut IntervalArena,
    a: Handle,
    b: Handle,
    depth: u32,
) -> Result<UnionOutcome, RangeError> {
    arena.step(depth)?;
    debug_assert_eq!(
        arena.node(a).keypart,
        arena.node(b).keypart,
        "union requires matching keyparts",
    );

    if a == b {
        tree::release(arena, a);
        return Ok(UnionOutcome::Tree(a));
    }

    let keypart = arena.node(a).keypart;
    let mut qa: VecDeque<Segment> = segments_of(arena, a).into();
    let mut qb: VecDeque<Segment> = segments_of(arena, b).into();
    let mut pieces: Vec<Segment> = Vec::new();

    loop {
        arena.check_abort()?;
        let Some(x) = qa.front().cloned() else {
            while let Some(y) = qb.pop_front() {
                push_single(arena, &mut pieces, y);
            }
            break;
        };
        let Some(y) = qb.front().cloned() else {
            while let Some(x) = qa.pop_front() {
                push_single(arena, &mut pieces, x);
            }
            break;
        };

        let overlap_lower = max_lower(&x.lower, &y.lower);
        let overlap_upper = min_upper(&x.upper, &y.upper);
        if !bounds_nonempty(&overlap_lower, &overlap_upper) {
            // Disjoint heads; emit the earlier one whole.
            if cmp_lower(&x.lower, &y.lower) == Ordering::Greater {
                qb.pop_front();
                push_single(arena, &mut pieces, y);
            } else {
                qa.pop_front();
                push_single(arena, &mut pieces, x);
            }
            continue;
        }

        match cmp_lower(&x.lower, &y.lower) {
            Ordering::Less => {
                // Leading non-overlapping slice of x keeps x's continuation.
                let cut = lower_to_upper(&y.lower);
                let lead = Segment {
                    lower: x.lower.clone(),
                    upper: cut,
                    cont: x.cont,
                    maybe_null: x.maybe_null,
                };
                if bounds_nonempty(&lead.lower, &lead.upper) {
                    push_single(arena, &mut pieces, lead);
                }
                if let Some(front) = qa.front_mut() {
                    front.lower = y.lower.clone();
                }
            }
            Ordering::Greater => {
                let cut = lower_to_upper(&x.lower);
                let lead = Segment {
                    lower: y.lower.clone(),
                    upper: cut,
                    cont: y.cont,
                    maybe_null: y.maybe_null,
                };
                if bounds_nonempty(&lead.lower, &lead.upper) {
                    push_single(arena, &mut pieces, lead);
                }
                if let Some(front) = qb.front_mut() {
                    front.lower = x.lower.clone();
                }
            }
            Ordering::Equal => {
                // Common start: emit the overlap with the OR'd continuation.
                let cont = union_continuations(arena, x.cont, y.cont, depth)?;
                pieces.push(Segment {
                    lower: overlap_lower,
                    upper: overlap_upper.clone(),
                    cont,
                    maybe_null: x.maybe_null || y.maybe_null,
                });
                match cmp_upper(&x.upper, &y.upper) {
                    Ordering::Less => {
                        qa.pop_front();
                        if let Some(front) = qb.front_mut() {
                            front.lower = upper_to_lower(&overlap_upper);
                        }
                    }
                    Ordering::Greater => {
                        qb.pop_front();
                        if let Some(front) = qa.front_mut() {
                            front.lower = upper_to_lower(&overlap_upper);
                        }
                    }
                    Ordering::Equal => {
                        qa.pop_front();
                        qb.pop_front();
                    }
                }
            }
        }
    }

    fuse_adjacent(arena, &mut pieces);

    // A union that covers the whole key space constrains nothing.
    if let [only] = pieces.as_slice() {
        if only.lower == Bound::Unbounded && only.upper == Bound::Unbounded && only.cont.is_none()
        {
            tree::release(arena, a);
            tree::release(arena, b);
            return Ok(UnionOutcome::Always);
        }
    }

    let root = build_tree(arena, keypart, pieces)?;
    tree::release(arena, a);
    tree::release(arena, b);
    match root {
        Some(root) => Ok(UnionOutcome::Tree(root)),
        None => unreachable!("union of nonempty trees produced no intervals"),
    }
}

// Emit a piece covered by exactly one operand; retains its continuation.
fn push_single(arena: &mut IntervalArena, pieces: &mut Vec<Segment>, segment: Segment) {
    if let Some(cont) = segment.cont {
        tree::retain(arena, cont);
    }
    pieces.push(segment);
}

// OR of two continuation slots. `None` means "no further constraint" and
// absorbs everything.
fn union_continuations(
    arena: &mut IntervalArena,
    a: Option<Handle>,
    b: Option<Handle>,
    depth: u32,
) -> Result<Option<Handle>, RangeError> {
    match (a, b) {
        (None, _) | (_, None) => Ok(None),
        (Some(ca), Some(cb)) => {
            if structural_eq(arena, ca, cb) {
                tree::retain(arena, ca);
                return Ok(Some(ca));
            }
            tree::retain(arena, ca);
            tree::retain(arena, cb);
            match union(arena, ca, cb, depth + 1)? {
                UnionOutcome::Tree(root) => Ok(Some(root)),
                UnionOutcome::Always => Ok(None),
            }
        }
    }
}

// Fuse touching pieces whose continuations are structurally equal, so a
// fused span never widens the matched row set.
fn fuse_adjacent(arena: &mut IntervalArena, pieces: &mut Vec<Segment>) {
    let mut fused: Vec<Segment> = Vec::with_capacity(pieces.len());
    for piece in pieces.drain(..) {
        let merge = fused.last().is_some_and(|last| {
            !gap_between(&last.upper, &piece.lower)
                && match (last.cont, piece.cont) {
                    (None, None) => true,
                    (Some(ca), Some(cb)) => structural_eq(arena, ca, cb),
                    _ => false,
                }
        });
        if merge {
            let Some(last) = fused.last_mut() else {
                unreachable!("fuse target vanished");
            };
            last.maybe_null |= piece.maybe_null;
            if cmp_upper(&piece.upper, &last.upper) == Ordering::Greater {
                last.upper = piece.upper;
            }
            if let Some(cont) = piece.cont {
                tree::release(arena, cont);
            }
        } else {
            fused.push(piece);
        }
    }
    *pieces = fused;
}

// Build a fresh RB tree from disjoint, ordered pieces. Piece continuations
// are owned references and move into the nodes.
fn build_tree(
    arena: &mut IntervalArena,
    keypart: u16,
    pieces: Vec<Segment>,
) -> Result<Option<Handle>, RangeError> {
    let mut root: Option<Handle> = None;
    for piece in pieces {
        let node = arena.alloc(IntervalNode::new(
            keypart,
            piece.lower,
            piece.upper,
            piece.maybe_null,
        ))?;
        arena.node_mut(node).continuation = piece.cont;
        root = Some(tree::insert(arena, root, node));
    }
    Ok(root)
}
