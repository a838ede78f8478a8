use crate::{
    config::{AbortFlag, RangeConfig},
    interval::{Handle, IntervalArena, invariants, tree},
    model::{IndexMask, TableModel},
    predicate::{CompareOp, Predicate},
    rangetree::{RangeTree, TreeClass, build::build_range_tree},
    test_fixtures::{COMPOSITE, NULLABLE, TWO_ROR},
    value::Value,
};
use std::ops::Bound;

fn build(table: &TableModel, predicate: &Predicate) -> (IntervalArena, RangeTree) {
    build_with(table, predicate, &RangeConfig::default())
}

fn build_with(
    table: &TableModel,
    predicate: &Predicate,
    config: &RangeConfig,
) -> (IntervalArena, RangeTree) {
    let mut arena = IntervalArena::new(config.max_mem_bytes, config.max_depth, AbortFlag::new());
    let tree = build_range_tree(&mut arena, table, IndexMask::all(), config, predicate).unwrap();
    for (_, root) in tree.constrained() {
        invariants::validate_graph(&arena, root).unwrap();
    }
    (arena, tree)
}

fn only_root(tree: &RangeTree) -> Handle {
    let mut constrained = tree.constrained();
    let (_, root) = constrained.next().expect("no constrained index");
    assert!(constrained.next().is_none(), "more than one constrained index");
    root
}

#[test]
fn equality_conjunction_chains_keyparts() {
    // a = 1 AND b = 2 on (a, b).
    let predicate = Predicate::and([
        Predicate::eq("a", Value::Int(1)),
        Predicate::eq("b", Value::Int(2)),
    ]);
    let (arena, range_tree) = build(&COMPOSITE, &predicate);
    assert_eq!(range_tree.classification, TreeClass::Usable);

    let root = only_root(&range_tree);
    let outer = tree::handles(&arena, root);
    assert_eq!(outer.len(), 1);
    let node = arena.node(outer[0]);
    assert_eq!(node.keypart, 0);
    assert_eq!(node.point_value(), Some(&Value::Int(1)));

    let continuation = node.continuation.expect("missing continuation");
    let inner = tree::handles(&arena, continuation);
    assert_eq!(inner.len(), 1);
    let node = arena.node(inner[0]);
    assert_eq!(node.keypart, 1);
    assert_eq!(node.point_value(), Some(&Value::Int(2)));
    assert!(node.continuation.is_none());
}

#[test]
fn disjunction_on_one_keypart_stays_one_graph() {
    // a < 1 OR a = 2 OR a = 3.
    let predicate = Predicate::or([
        Predicate::compare("a", CompareOp::Lt, Value::Int(1)),
        Predicate::eq("a", Value::Int(2)),
        Predicate::eq("a", Value::Int(3)),
    ]);
    let (arena, range_tree) = build(&COMPOSITE, &predicate);
    assert_eq!(range_tree.classification, TreeClass::Usable);

    let root = only_root(&range_tree);
    let handles = tree::handles(&arena, root);
    assert_eq!(handles.len(), 3);

    // The a < 1 interval anchors just above NULL.
    let first = arena.node(handles[0]);
    assert_eq!(first.lower, Bound::Excluded(Value::Null));
    assert_eq!(first.upper, Bound::Excluded(Value::Int(1)));
    assert_eq!(arena.node(handles[1]).point_value(), Some(&Value::Int(2)));
    assert_eq!(arena.node(handles[2]).point_value(), Some(&Value::Int(3)));
}

#[test]
fn contradictory_equalities_are_impossible() {
    let predicate = Predicate::and([
        Predicate::eq("a", Value::Int(1)),
        Predicate::eq("a", Value::Int(2)),
    ]);
    let (mut arena, range_tree) = build(&COMPOSITE, &predicate);
    assert_eq!(range_tree.classification, TreeClass::Impossible);
    range_tree.release(&mut arena);
    assert_eq!(arena.live_nodes(), 0);
}

#[test]
fn unsigned_column_short_circuits_negative_constants() {
    let always = Predicate::compare("u", CompareOp::Gt, Value::Int(-5));
    let (_, range_tree) = build(&COMPOSITE, &always);
    assert_eq!(range_tree.classification, TreeClass::AlwaysTrue);

    let impossible = Predicate::compare("u", CompareOp::Lt, Value::Int(-5));
    let (_, range_tree) = build(&COMPOSITE, &impossible);
    assert_eq!(range_tree.classification, TreeClass::Impossible);
}

#[test]
fn comparison_against_null_constant_is_impossible() {
    let predicate = Predicate::eq("a", Value::Null);
    let (_, range_tree) = build(&COMPOSITE, &predicate);
    assert_eq!(range_tree.classification, TreeClass::Impossible);
}

#[test]
fn null_safe_equality_against_null_uses_the_null_point() {
    let predicate = Predicate::compare("c", CompareOp::NullSafeEq, Value::Null);
    let (arena, range_tree) = build(&NULLABLE, &predicate);
    let root = only_root(&range_tree);
    let handles = tree::handles(&arena, root);
    assert_eq!(handles.len(), 1);
    let node = arena.node(handles[0]);
    assert_eq!(node.lower, Bound::Included(Value::Null));
    assert_eq!(node.upper, Bound::Included(Value::Null));
    assert!(node.maybe_null);
}

#[test]
fn is_not_null_excludes_the_null_point() {
    let predicate = Predicate::IsNull {
        field: "c",
        negated: true,
    };
    let (arena, range_tree) = build(&NULLABLE, &predicate);
    let node_handle = tree::handles(&arena, only_root(&range_tree))[0];
    let node = arena.node(node_handle);
    assert_eq!(node.lower, Bound::Excluded(Value::Null));
    assert_eq!(node.upper, Bound::Unbounded);
}

#[test]
fn is_null_on_non_nullable_column_is_impossible() {
    let predicate = Predicate::IsNull {
        field: "a",
        negated: false,
    };
    let (_, range_tree) = build(&COMPOSITE, &predicate);
    assert_eq!(range_tree.classification, TreeClass::Impossible);
}

#[test]
fn in_list_sorts_and_deduplicates_points() {
    let predicate = Predicate::In {
        field: "a",
        values: vec![Value::Int(3), Value::Int(1), Value::Int(3), Value::Int(2)],
    };
    let (arena, range_tree) = build(&COMPOSITE, &predicate);
    let handles = tree::handles(&arena, only_root(&range_tree));
    let points: Vec<_> = handles
        .iter()
        .map(|h| arena.node(*h).point_value().cloned().unwrap())
        .collect();
    assert_eq!(points, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
}

#[test]
fn oversized_in_list_is_not_expanded() {
    let config = RangeConfig {
        in_list_expansion_limit: 3,
        ..RangeConfig::default()
    };
    let predicate = Predicate::In {
        field: "a",
        values: (0..10).map(Value::Int).collect(),
    };
    let (_, range_tree) = build_with(&COMPOSITE, &predicate, &config);
    assert_eq!(range_tree.classification, TreeClass::Uncertain);
}

#[test]
fn not_in_produces_adjacent_strict_intervals() {
    let predicate = Predicate::NotIn {
        field: "a",
        values: vec![Value::Int(5), Value::Int(3)],
    };
    let (arena, range_tree) = build(&COMPOSITE, &predicate);
    let handles = tree::handles(&arena, only_root(&range_tree));
    assert_eq!(handles.len(), 3);

    let bounds: Vec<_> = handles
        .iter()
        .map(|h| {
            let node = arena.node(*h);
            (node.lower.clone(), node.upper.clone())
        })
        .collect();
    assert_eq!(
        bounds,
        vec![
            (
                Bound::Excluded(Value::Null),
                Bound::Excluded(Value::Int(3))
            ),
            (
                Bound::Excluded(Value::Int(3)),
                Bound::Excluded(Value::Int(5))
            ),
            (Bound::Excluded(Value::Int(5)), Bound::Unbounded),
        ]
    );
}

#[test]
fn between_collapses_to_one_interval() {
    let predicate = Predicate::Between {
        field: "a",
        low: Value::Int(2),
        high: Value::Int(8),
        negated: false,
    };
    let (arena, range_tree) = build(&COMPOSITE, &predicate);
    let handles = tree::handles(&arena, only_root(&range_tree));
    assert_eq!(handles.len(), 1);
    let node = arena.node(handles[0]);
    assert_eq!(node.lower, Bound::Included(Value::Int(2)));
    assert_eq!(node.upper, Bound::Included(Value::Int(8)));
}

#[test]
fn negated_between_splits_into_two_intervals() {
    let predicate = Predicate::Between {
        field: "a",
        low: Value::Int(2),
        high: Value::Int(8),
        negated: true,
    };
    let (arena, range_tree) = build(&COMPOSITE, &predicate);
    let handles = tree::handles(&arena, only_root(&range_tree));
    assert_eq!(handles.len(), 2);
    assert_eq!(
        arena.node(handles[0]).upper,
        Bound::Excluded(Value::Int(2))
    );
    assert_eq!(
        arena.node(handles[1]).lower,
        Bound::Excluded(Value::Int(8))
    );
}

#[test]
fn cross_index_disjunction_becomes_a_merge_alternative() {
    // a = 1 OR b = 1 on single-column indexes.
    let predicate = Predicate::or([
        Predicate::eq("a", Value::Int(1)),
        Predicate::eq("b", Value::Int(1)),
    ]);
    let (arena, range_tree) = build(&TWO_ROR, &predicate);
    assert_eq!(range_tree.classification, TreeClass::Usable);
    assert_eq!(range_tree.constrained_count(), 0);
    assert_eq!(range_tree.merge_alternatives().len(), 1);

    let alternative = &range_tree.merge_alternatives()[0];
    assert_eq!(alternative.arms.len(), 2);
    let arm_indexes: Vec<_> = alternative
        .arms
        .iter()
        .map(|arm| {
            assert_eq!(arm.candidates.len(), 1);
            arm.candidates[0].0
        })
        .collect();
    assert_eq!(arm_indexes, vec![0, 1]);
    for arm in &alternative.arms {
        for &(_, root) in &arm.candidates {
            invariants::validate_graph(&arena, root).unwrap();
        }
    }
}

#[test]
fn unindexed_disjunct_poisons_the_or() {
    // "c" is not indexed in TWO_ROR, so the OR cannot be covered.
    let predicate = Predicate::or([
        Predicate::eq("a", Value::Int(1)),
        Predicate::eq("c", Value::Int(1)),
    ]);
    let (mut arena, range_tree) = build(&TWO_ROR, &predicate);
    assert_eq!(range_tree.classification, TreeClass::Uncertain);
    range_tree.release(&mut arena);
    assert_eq!(arena.live_nodes(), 0);
}

#[test]
fn uncertain_conjunct_marks_residual_filtering() {
    let predicate = Predicate::and([
        Predicate::eq("a", Value::Int(1)),
        Predicate::eq("zzz", Value::Int(1)),
    ]);
    let (_, range_tree) = build(&COMPOSITE, &predicate);
    assert_eq!(range_tree.classification, TreeClass::UsableWithResidual);
}

#[test]
fn or_discarding_a_one_sided_slot_marks_residual_filtering() {
    // (a = 1 AND b = 1) OR a = 2: the b constraint holds on one arm only,
    // so the surviving idx_a ranges over-select.
    let predicate = Predicate::or([
        Predicate::and([
            Predicate::eq("a", Value::Int(1)),
            Predicate::eq("b", Value::Int(1)),
        ]),
        Predicate::eq("a", Value::Int(2)),
    ]);
    let (mut arena, range_tree) = build(&TWO_ROR, &predicate);
    assert_eq!(range_tree.classification, TreeClass::UsableWithResidual);
    assert_eq!(range_tree.constrained_count(), 1);
    range_tree.release(&mut arena);
    assert_eq!(arena.live_nodes(), 0);
}

#[test]
fn impossible_disjunct_is_absorbed() {
    let predicate = Predicate::or([
        Predicate::eq("a", Value::Int(1)),
        Predicate::compare("u", CompareOp::Lt, Value::Int(-1)),
    ]);
    let (arena, range_tree) = build(&COMPOSITE, &predicate);
    assert_eq!(range_tree.classification, TreeClass::Usable);
    assert_eq!(tree::handles(&arena, only_root(&range_tree)).len(), 1);
}

#[test]
fn overlapping_or_branches_fuse_per_keypart() {
    // a in [0,10] OR a in [5,20] collapses to one interval.
    let predicate = Predicate::or([
        Predicate::Between {
            field: "a",
            low: Value::Int(0),
            high: Value::Int(10),
            negated: false,
        },
        Predicate::Between {
            field: "a",
            low: Value::Int(5),
            high: Value::Int(20),
            negated: false,
        },
    ]);
    let (arena, range_tree) = build(&COMPOSITE, &predicate);
    let handles = tree::handles(&arena, only_root(&range_tree));
    assert_eq!(handles.len(), 1);
    let node = arena.node(handles[0]);
    assert_eq!(node.lower, Bound::Included(Value::Int(0)));
    assert_eq!(node.upper, Bound::Included(Value::Int(20)));
}

#[test]
fn release_after_build_leaves_no_live_nodes() {
    let predicate = Predicate::and([
        Predicate::In {
            field: "a",
            values: (0..50).map(Value::Int).collect(),
        },
        Predicate::Between {
            field: "b",
            low: Value::Int(10),
            high: Value::Int(20),
            negated: false,
        },
    ]);
    let (mut arena, range_tree) = build(&COMPOSITE, &predicate);
    assert!(arena.live_nodes() > 0);
    range_tree.release(&mut arena);
    assert_eq!(arena.live_nodes(), 0);
    assert_eq!(arena.live_bytes(), 0);
}
