//! Per-index range constraint trees and their AND/OR composition.
//!
//! A `RangeTree` is the unit the builder folds over the predicate tree: one
//! optional interval graph per candidate index, plus index-merge
//! alternatives for disjunctions no single index can express. Every stored
//! root handle is one counted reference; composition consumes its operands'
//! references and the result owns its own.

pub mod build;

#[cfg(test)]
mod property;
#[cfg(test)]
mod tests;

use crate::{
    error::RangeError,
    interval::{
        Handle, IntervalArena,
        algebra::{self, UnionOutcome},
        tree,
    },
};

///
/// TreeClass
///
/// Lattice of what a tree says about its predicate branch.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TreeClass {
    /// The branch provably matches no rows.
    Impossible,
    /// The branch matches every row; it constrains nothing.
    AlwaysTrue,
    /// The branch is not decidable at plan time and constrains no index.
    Uncertain,
    /// At least one index carries a usable constraint.
    Usable,
    /// Usable, but the ranges over-select and rows need residual filtering.
    UsableWithResidual,
}

impl TreeClass {
    #[must_use]
    pub const fn is_usable(self) -> bool {
        matches!(self, Self::Usable | Self::UsableWithResidual)
    }
}

///
/// RangeTree
///
/// One slot per catalog index, in catalog order. Finalized trees are
/// consumed read-only by the plan selector.
///

#[derive(Debug)]
pub struct RangeTree {
    pub classification: TreeClass,
    pub(crate) per_index: Vec<Option<Handle>>,
    pub(crate) alternatives: Vec<IndexMergeAlternative>,
}

///
/// IndexMergeAlternative
///
/// One disjunction whose arms must each be scanned on their own index, the
/// rowid streams combined afterwards.
///

#[derive(Debug)]
pub struct IndexMergeAlternative {
    pub(crate) arms: Vec<MergeArm>,
}

/// One disjunct of an index-merge: the indexes able to cover it, each with
/// its own interval graph.
#[derive(Debug)]
pub(crate) struct MergeArm {
    pub(crate) candidates: Vec<(usize, Handle)>,
}

impl RangeTree {
    #[must_use]
    pub(crate) fn impossible(index_count: usize) -> Self {
        Self::unconstrained(TreeClass::Impossible, index_count)
    }

    #[must_use]
    pub(crate) fn always(index_count: usize) -> Self {
        Self::unconstrained(TreeClass::AlwaysTrue, index_count)
    }

    #[must_use]
    pub(crate) fn uncertain(index_count: usize) -> Self {
        Self::unconstrained(TreeClass::Uncertain, index_count)
    }

    fn unconstrained(classification: TreeClass, index_count: usize) -> Self {
        Self {
            classification,
            per_index: vec![None; index_count],
            alternatives: Vec::new(),
        }
    }

    /// Tree constraining exactly one index. Takes ownership of the root
    /// reference.
    #[must_use]
    pub(crate) fn for_indexes(index_count: usize, slots: Vec<(usize, Handle)>) -> Self {
        debug_assert!(!slots.is_empty(), "constrained tree without slots");
        let mut per_index = vec![None; index_count];
        for (position, root) in slots {
            debug_assert!(per_index[position].is_none(), "duplicate index slot");
            per_index[position] = Some(root);
        }
        Self {
            classification: TreeClass::Usable,
            per_index,
            alternatives: Vec::new(),
        }
    }

    /// Constrained slots in catalog order.
    pub(crate) fn constrained(&self) -> impl Iterator<Item = (usize, Handle)> + '_ {
        self.per_index
            .iter()
            .enumerate()
            .filter_map(|(position, slot)| slot.map(|root| (position, root)))
    }

    #[must_use]
    pub(crate) fn constrained_count(&self) -> usize {
        self.per_index.iter().filter(|slot| slot.is_some()).count()
    }

    #[must_use]
    pub fn merge_alternatives(&self) -> &[IndexMergeAlternative] {
        &self.alternatives
    }

    /// Drop every reference this tree owns.
    pub(crate) fn release(mut self, arena: &mut IntervalArena) {
        for slot in self.per_index.iter_mut() {
            if let Some(root) = slot.take() {
                tree::release(arena, root);
            }
        }
        for alternative in self.alternatives.drain(..) {
            for arm in alternative.arms {
                for (_, root) in arm.candidates {
                    tree::release(arena, root);
                }
            }
        }
    }

    // Downgrade a nominally usable tree that lost all its constraints.
    fn reclassify(mut self) -> Self {
        if self.classification.is_usable()
            && self.constrained_count() == 0
            && self.alternatives.is_empty()
        {
            self.classification = TreeClass::Uncertain;
        }
        self
    }

    fn mark_residual(mut self) -> Self {
        if self.classification == TreeClass::Usable {
            self.classification = TreeClass::UsableWithResidual;
        }
        self
    }
}

/// True when the per-index graphs of one slot can be merged by `union`:
/// both sides constrain the same index starting at the same keypart.
#[must_use]
pub(crate) fn can_be_ored(arena: &IntervalArena, a: Handle, b: Handle) -> bool {
    arena.node(a).keypart == arena.node(b).keypart
}

/// AND-fold two trees. Consumes both.
pub(crate) fn tree_and(
    arena: &mut IntervalArena,
    a: RangeTree,
    b: RangeTree,
    depth: u32,
) -> Result<RangeTree, RangeError> {
    arena.step(depth)?;

    match (a.classification, b.classification) {
        (TreeClass::Impossible, _) => {
            b.release(arena);
            return Ok(a);
        }
        (_, TreeClass::Impossible) => {
            a.release(arena);
            return Ok(b);
        }
        (TreeClass::AlwaysTrue, _) => return Ok(b),
        (_, TreeClass::AlwaysTrue) => return Ok(a),
        // An undecidable conjunct widens the row set the other side admits.
        (TreeClass::Uncertain, _) => return Ok(b.mark_residual()),
        (_, TreeClass::Uncertain) => return Ok(a.mark_residual()),
        _ => {}
    }

    let index_count = a.per_index.len();
    debug_assert_eq!(index_count, b.per_index.len(), "mismatched index catalogs");

    let residual = a.classification == TreeClass::UsableWithResidual
        || b.classification == TreeClass::UsableWithResidual;

    let mut a = a;
    let mut b = b;
    let mut per_index: Vec<Option<Handle>> = vec![None; index_count];
    for position in 0..index_count {
        let merged = match (a.per_index[position].take(), b.per_index[position].take()) {
            (None, None) => None,
            (Some(root), None) | (None, Some(root)) => Some(root),
            (Some(left), Some(right)) => {
                match algebra::intersect(arena, left, right, depth + 1)? {
                    Some(root) => Some(root),
                    None => {
                        // A necessary condition of the AND is empty, so the
                        // whole conjunction matches no rows.
                        for slot in per_index.iter_mut() {
                            if let Some(root) = slot.take() {
                                tree::release(arena, root);
                            }
                        }
                        a.release(arena);
                        b.release(arena);
                        return Ok(RangeTree::impossible(index_count));
                    }
                }
            }
        };
        per_index[position] = merged;
    }

    let mut alternatives = std::mem::take(&mut a.alternatives);
    alternatives.append(&mut b.alternatives);

    let tree = RangeTree {
        classification: if residual {
            TreeClass::UsableWithResidual
        } else {
            TreeClass::Usable
        },
        per_index,
        alternatives,
    };
    Ok(tree.reclassify())
}

/// OR-fold two trees. Consumes both. Slots constrained on both sides merge
/// via `union` when `can_be_ored` holds; discarding any slot's constraint
/// downgrades the result to residual filtering. When no slot survives, the
/// two sides become arms of an `IndexMergeAlternative` instead.
pub(crate) fn tree_or(
    arena: &mut IntervalArena,
    a: RangeTree,
    b: RangeTree,
    depth: u32,
) -> Result<RangeTree, RangeError> {
    arena.step(depth)?;

    match (a.classification, b.classification) {
        (TreeClass::AlwaysTrue, _) => {
            b.release(arena);
            return Ok(a);
        }
        (_, TreeClass::AlwaysTrue) => {
            a.release(arena);
            return Ok(b);
        }
        (TreeClass::Impossible, _) => return Ok(b),
        (_, TreeClass::Impossible) => return Ok(a),
        // An undecidable disjunct can match any row; no index constraint
        // from the other side survives the OR.
        (TreeClass::Uncertain, _) => {
            b.release(arena);
            return Ok(a);
        }
        (_, TreeClass::Uncertain) => {
            a.release(arena);
            return Ok(b);
        }
        _ => {}
    }

    let index_count = a.per_index.len();
    debug_assert_eq!(index_count, b.per_index.len(), "mismatched index catalogs");

    let residual = a.classification == TreeClass::UsableWithResidual
        || b.classification == TreeClass::UsableWithResidual;

    // Existing alternatives on either side keep their arms; an OR with more
    // disjuncts only widens what the merge must cover.
    if !a.alternatives.is_empty() || !b.alternatives.is_empty() {
        return or_into_alternative(arena, a, b, residual);
    }

    // The per-index path applies only when at least one slot is constrained
    // on both sides with matching leading keyparts; otherwise the OR falls
    // back to an index-merge before any slot is consumed.
    let mergeable = (0..index_count).any(|position| {
        match (a.per_index[position], b.per_index[position]) {
            (Some(left), Some(right)) => can_be_ored(arena, left, right),
            _ => false,
        }
    });
    if !mergeable {
        return or_into_alternative(arena, a, b, residual);
    }

    let mut a = a;
    let mut b = b;
    let mut per_index: Vec<Option<Handle>> = vec![None; index_count];
    let mut survivors = 0usize;
    let mut dropped = false;
    for position in 0..index_count {
        match (a.per_index[position].take(), b.per_index[position].take()) {
            (None, None) => {}
            // An index constrained on one side only is not a necessary
            // condition of the OR; discarding it leaves the surviving
            // ranges over-selecting.
            (Some(root), None) | (None, Some(root)) => {
                tree::release(arena, root);
                dropped = true;
            }
            (Some(left), Some(right)) => {
                if can_be_ored(arena, left, right) {
                    match algebra::union(arena, left, right, depth + 1)? {
                        UnionOutcome::Tree(root) => {
                            per_index[position] = Some(root);
                            survivors += 1;
                        }
                        UnionOutcome::Always => {}
                    }
                } else {
                    tree::release(arena, left);
                    tree::release(arena, right);
                    dropped = true;
                }
            }
        }
    }

    if survivors == 0 {
        // Every shared slot collapsed to the full range.
        return Ok(RangeTree::uncertain(index_count));
    }

    let tree = RangeTree {
        classification: if residual || dropped {
            TreeClass::UsableWithResidual
        } else {
            TreeClass::Usable
        },
        per_index,
        alternatives: Vec::new(),
    };
    Ok(tree)
}

// Fold two trees into one alternative: each tree contributes one arm (its
// constrained slots as candidates), and pre-existing alternatives carry
// their arms across unchanged.
fn or_into_alternative(
    arena: &mut IntervalArena,
    mut a: RangeTree,
    mut b: RangeTree,
    residual: bool,
) -> Result<RangeTree, RangeError> {
    let index_count = a.per_index.len();

    let mut arms: Vec<MergeArm> = Vec::new();
    for tree in [&mut a, &mut b] {
        let candidates: Vec<(usize, Handle)> = tree
            .per_index
            .iter_mut()
            .enumerate()
            .filter_map(|(position, slot)| slot.take().map(|root| (position, root)))
            .collect();
        if !candidates.is_empty() {
            arms.push(MergeArm { candidates });
        }
        for alternative in tree.alternatives.drain(..) {
            arms.extend(alternative.arms);
        }
    }

    // Every disjunct must be coverable by some index, or the merge cannot
    // represent the OR at all.
    if arms.len() < 2 {
        for arm in arms {
            for (_, root) in arm.candidates {
                tree::release(arena, root);
            }
        }
        return Ok(RangeTree::uncertain(index_count));
    }

    Ok(RangeTree {
        classification: if residual {
            TreeClass::UsableWithResidual
        } else {
            TreeClass::Usable
        },
        per_index: vec![None; index_count],
        alternatives: vec![IndexMergeAlternative { arms }],
    })
}
