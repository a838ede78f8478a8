//! Property tests: ranges built from a random predicate must never exclude
//! a row the predicate selects.

use crate::{
    config::{AbortFlag, RangeConfig},
    interval::{
        Handle, IntervalArena, invariants::validate_graph, node, tree,
    },
    model::IndexMask,
    predicate::{CompareOp, Predicate, evaluate},
    rangetree::{TreeClass, build::build_range_tree},
    test_fixtures::NULLABLE,
    value::Value,
};
use proptest::prelude::*;

fn arb_constant() -> impl Strategy<Value = Value> {
    prop_oneof![
        8 => (-3..12i64).prop_map(Value::Int),
        1 => Just(Value::Null),
    ]
}

fn arb_op() -> impl Strategy<Value = CompareOp> {
    prop_oneof![
        Just(CompareOp::Eq),
        Just(CompareOp::NullSafeEq),
        Just(CompareOp::Lt),
        Just(CompareOp::Lte),
        Just(CompareOp::Gt),
        Just(CompareOp::Gte),
    ]
}

fn arb_leaf() -> impl Strategy<Value = Predicate> {
    prop_oneof![
        Just(Predicate::True),
        Just(Predicate::False),
        (arb_op(), arb_constant()).prop_map(|(op, value)| Predicate::compare("c", op, value)),
        prop::collection::vec(arb_constant(), 0..5)
            .prop_map(|values| Predicate::In { field: "c", values }),
        prop::collection::vec(arb_constant(), 0..5)
            .prop_map(|values| Predicate::NotIn { field: "c", values }),
        (arb_constant(), arb_constant(), any::<bool>()).prop_map(|(low, high, negated)| {
            Predicate::Between {
                field: "c",
                low,
                high,
                negated,
            }
        }),
        any::<bool>().prop_map(|negated| Predicate::IsNull { field: "c", negated }),
    ]
}

fn arb_predicate() -> impl Strategy<Value = Predicate> {
    arb_leaf().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 1..4).prop_map(Predicate::and),
            prop::collection::vec(inner, 1..4).prop_map(Predicate::or),
        ]
    })
}

/// NULL plus every integer the constants are drawn from, with margin.
fn probes() -> Vec<Value> {
    let mut out: Vec<Value> = (-5..14).map(Value::Int).collect();
    out.push(Value::Null);
    out
}

fn matches(predicate: &Predicate, value: &Value) -> Option<bool> {
    let current = value.clone();
    evaluate(predicate, &move |_: &str| current.clone())
}

fn admits(arena: &IntervalArena, root: Handle, value: &Value) -> bool {
    tree::handles(arena, root).into_iter().any(|handle| {
        let n = arena.node(handle);
        node::contains(&n.lower, &n.upper, value)
    })
}

proptest! {
    #[test]
    fn built_ranges_never_exclude_a_selected_row(predicate in arb_predicate()) {
        let config = RangeConfig::default();
        let mut arena =
            IntervalArena::new(config.max_mem_bytes, config.max_depth, AbortFlag::new());
        let range_tree =
            build_range_tree(&mut arena, &NULLABLE, IndexMask::all(), &config, &predicate)
                .unwrap();

        match range_tree.classification {
            TreeClass::Impossible => {
                for value in probes() {
                    prop_assert_ne!(matches(&predicate, &value), Some(true));
                }
            }
            TreeClass::Usable | TreeClass::UsableWithResidual => {
                if let Some((_, root)) = range_tree.constrained().next() {
                    validate_graph(&arena, root).unwrap();
                    for value in probes() {
                        if matches(&predicate, &value) == Some(true) {
                            prop_assert!(
                                admits(&arena, root, &value),
                                "ranges miss selected row {:?}", value,
                            );
                        }
                    }
                }
            }
            TreeClass::AlwaysTrue | TreeClass::Uncertain => {}
        }

        range_tree.release(&mut arena);
        prop_assert_eq!(arena.live_nodes(), 0);
    }
}
