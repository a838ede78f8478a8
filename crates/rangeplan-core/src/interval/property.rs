//! Property tests: the algebra must agree with pointwise membership and
//! leave the graph structurally valid after every operation.

use crate::{
    config::AbortFlag,
    interval::{
        algebra::{self, UnionOutcome},
        arena::{Handle, IntervalArena},
        invariants::{audit_share_counts, validate_graph},
        node::{self, IntervalNode},
        tree,
    },
    value::Value,
};
use proptest::prelude::*;
use std::ops::Bound;

fn arena() -> IntervalArena {
    IntervalArena::new(1 << 20, 64, AbortFlag::new())
}

/// Disjoint sorted inclusive spans from arbitrary endpoint pairs.
fn normalize(mut raw: Vec<(i64, i64)>) -> Vec<(i64, i64)> {
    for pair in &mut raw {
        if pair.0 > pair.1 {
            *pair = (pair.1, pair.0);
        }
    }
    raw.sort_unstable();
    let mut spans: Vec<(i64, i64)> = Vec::new();
    for (lo, hi) in raw {
        match spans.last_mut() {
            Some(last) if lo <= last.1 => last.1 = last.1.max(hi),
            _ => spans.push((lo, hi)),
        }
    }
    spans
}

fn arb_spans() -> impl Strategy<Value = Vec<(i64, i64)>> {
    prop::collection::vec((0..32i64, 0..32i64), 1..8).prop_map(normalize)
}

fn build(arena: &mut IntervalArena, spans: &[(i64, i64)]) -> Handle {
    let mut root = None;
    for &(lo, hi) in spans {
        let handle = arena
            .alloc(IntervalNode::new(
                0,
                Bound::Included(Value::Int(lo)),
                Bound::Included(Value::Int(hi)),
                false,
            ))
            .unwrap();
        root = Some(tree::insert(arena, root, handle));
    }
    root.unwrap()
}

fn member(spans: &[(i64, i64)], v: i64) -> bool {
    spans.iter().any(|&(lo, hi)| lo <= v && v <= hi)
}

fn tree_member(arena: &IntervalArena, root: Handle, v: i64) -> bool {
    tree::handles(arena, root).into_iter().any(|handle| {
        let n = arena.node(handle);
        node::contains(&n.lower, &n.upper, &Value::Int(v))
    })
}

proptest! {
    #[test]
    fn union_agrees_with_pointwise_membership(a in arb_spans(), b in arb_spans()) {
        let mut arena = arena();
        let ta = build(&mut arena, &a);
        let tb = build(&mut arena, &b);

        let root = match algebra::union(&mut arena, ta, tb, 0).unwrap() {
            UnionOutcome::Tree(root) => root,
            UnionOutcome::Always => panic!("bounded spans cannot union to the full range"),
        };
        validate_graph(&arena, root).unwrap();
        audit_share_counts(&arena, &[root]).unwrap();

        for v in -2..=34i64 {
            prop_assert_eq!(
                tree_member(&arena, root, v),
                member(&a, v) || member(&b, v),
                "disagreement at {}", v,
            );
        }

        tree::release(&mut arena, root);
        prop_assert_eq!(arena.live_nodes(), 0);
    }

    #[test]
    fn intersect_agrees_with_pointwise_membership(a in arb_spans(), b in arb_spans()) {
        let mut arena = arena();
        let ta = build(&mut arena, &a);
        let tb = build(&mut arena, &b);

        match algebra::intersect(&mut arena, ta, tb, 0).unwrap() {
            Some(root) => {
                validate_graph(&arena, root).unwrap();
                audit_share_counts(&arena, &[root]).unwrap();
                for v in -2..=34i64 {
                    prop_assert_eq!(
                        tree_member(&arena, root, v),
                        member(&a, v) && member(&b, v),
                        "disagreement at {}", v,
                    );
                }
                tree::release(&mut arena, root);
            }
            None => {
                for v in -2..=34i64 {
                    prop_assert!(!(member(&a, v) && member(&b, v)));
                }
            }
        }
        prop_assert_eq!(arena.live_nodes(), 0);
    }

    #[test]
    fn union_is_commutative_by_membership(a in arb_spans(), b in arb_spans()) {
        let mut left = arena();
        let la = build(&mut left, &a);
        let lb = build(&mut left, &b);
        let ab = match algebra::union(&mut left, la, lb, 0).unwrap() {
            UnionOutcome::Tree(root) => root,
            UnionOutcome::Always => panic!("bounded spans cannot union to the full range"),
        };

        let mut right = arena();
        let rb = build(&mut right, &b);
        let ra = build(&mut right, &a);
        let ba = match algebra::union(&mut right, rb, ra, 0).unwrap() {
            UnionOutcome::Tree(root) => root,
            UnionOutcome::Always => panic!("bounded spans cannot union to the full range"),
        };

        for v in -2..=34i64 {
            prop_assert_eq!(tree_member(&left, ab, v), tree_member(&right, ba, v));
        }
    }
}
