//! Pulled-up predicates must hold on every row the tree produces, for any
//! data. The reference evaluator supplies the rows.

use proptest::prelude::*;
use relopt_core::expr::{Expr, ScalarValue};
use relopt_core::operator::{AggCall, JoinType, TableRef};
use relopt_core::predicates::{predicates_for, EquivalenceClosure};
use relopt_core::rel::RelNode;
use relopt_core::testing::{eval_expr, evaluate, int_row, Row, TestDatabase};
use relopt_core::types::{DataType, Field, RowType};

fn xy() -> RowType {
    RowType::new(vec![
        Field::new("x", DataType::Int64, true),
        Field::new("y", DataType::Int64, true),
    ])
}

fn table(name: &str) -> RelNode {
    RelNode::scan(TableRef::new("s", name), xy())
}

fn rows() -> impl Strategy<Value = Vec<Row>> {
    let value = prop_oneof![1 => Just(None), 4 => (0i64..4).prop_map(Some)];
    prop::collection::vec((value.clone(), value), 0..6)
        .prop_map(|rows| rows.into_iter().map(|(x, y)| int_row(&[x, y])).collect())
}

fn database() -> impl Strategy<Value = TestDatabase> {
    (rows(), rows()).prop_map(|(a, b)| {
        TestDatabase::new()
            .with_table(&TableRef::new("s", "a"), a)
            .with_table(&TableRef::new("s", "b"), b)
    })
}

fn join_type() -> impl Strategy<Value = JoinType> {
    prop_oneof![
        Just(JoinType::Inner),
        Just(JoinType::Left),
        Just(JoinType::Right),
        Just(JoinType::Full),
        Just(JoinType::Semi),
        Just(JoinType::Anti),
    ]
}

/// How the join output is consumed.
#[derive(Debug, Clone, Copy)]
enum Top {
    Nothing,
    Project,
    Aggregate,
    Union,
}

fn top() -> impl Strategy<Value = Top> {
    prop_oneof![Just(Top::Nothing), Just(Top::Project), Just(Top::Aggregate), Just(Top::Union)]
}

/// σ(a) ⋈ σ(b) with an equi-join, under `top`.
fn tree(join_type: JoinType, k1: i64, k2: i64, two_keys: bool, top: Top) -> RelNode {
    let left = table("a").filter(Expr::gt(Expr::col(0), Expr::int(k1)));
    let right = table("b").filter(Expr::eq(Expr::col(1), Expr::int(k2)));
    let condition = if two_keys {
        Expr::and_all([
            Expr::eq(Expr::col(0), Expr::col(2)),
            Expr::eq(Expr::col(1), Expr::col(3)),
        ])
    } else {
        Expr::eq(Expr::col(1), Expr::col(3))
    };
    let join = left.join(right, join_type, condition);
    match top {
        Top::Nothing => join,
        Top::Project => join.project(vec![Expr::col(1), Expr::int(7), Expr::col(0)]),
        Top::Aggregate => join.aggregate(vec![1, 0], vec![AggCall::count_star("c")]),
        Top::Union => RelNode::union(
            vec![
                join.project(vec![Expr::col(0), Expr::col(1)]),
                table("a").filter(Expr::eq(Expr::col(1), Expr::int(k2))),
            ],
            true,
        ),
    }
}

fn holds(predicate: &Expr, row: &Row) -> bool {
    eval_expr(predicate, row) == ScalarValue::Bool(true)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn pulled_up_predicates_hold_on_output(
        db in database(),
        join_type in join_type(),
        k1 in 0i64..3,
        k2 in 0i64..3,
        two_keys in any::<bool>(),
        top in top(),
    ) {
        let node = tree(join_type, k1, k2, two_keys, top);
        let predicates = predicates_for(&node);
        for row in evaluate(&node, &db).unwrap() {
            for p in &predicates.pulled_up {
                prop_assert!(holds(p, &row), "{} fails on {:?} for\n{}", p, row, node.explain());
            }
        }
    }

    #[test]
    fn inferred_predicates_hold_on_join_inputs(
        db in database(),
        join_type in join_type(),
        k1 in 0i64..3,
        k2 in 0i64..3,
    ) {
        // For the join's matched rows, inferred predicates hold on the side
        // they were inferred for.
        let node = tree(join_type, k1, k2, true, Top::Nothing);
        let predicates = predicates_for(&node);
        let inner = tree(JoinType::Inner, k1, k2, true, Top::Nothing);
        for row in evaluate(&inner, &db).unwrap() {
            for p in &predicates.left_inferred {
                prop_assert!(holds(p, &row[..2].to_vec()), "{} fails on left of {:?}", p, row);
            }
            for p in &predicates.right_inferred {
                prop_assert!(holds(p, &row[2..].to_vec()), "{} fails on right of {:?}", p, row);
            }
        }
    }
}

#[test]
fn closure_is_transitive_and_symmetric() {
    let closure = EquivalenceClosure::from_predicates(
        6,
        &[
            Expr::eq(Expr::col(0), Expr::col(3)),
            Expr::eq(Expr::col(3), Expr::col(5)),
            Expr::gt(Expr::col(1), Expr::col(2)),
        ],
    );
    assert!(closure.are_equivalent(5, 0));
    assert!(closure.are_equivalent(0, 5));
    assert!(!closure.are_equivalent(1, 2));
    assert_eq!(closure.class_of(3), vec![0, 3, 5]);
    assert_eq!(closure.class_of(9), vec![9]);
}

#[test]
fn filter_constant_is_inferred_across_inner_join() {
    // σ(y = 2)(b) joined on a.y = b.y: a.y = 2 holds on the left input
    let node = table("a").join(
        table("b").filter(Expr::eq(Expr::col(1), Expr::int(2))),
        JoinType::Inner,
        Expr::eq(Expr::col(1), Expr::col(3)),
    );
    let predicates = predicates_for(&node);
    assert_eq!(predicates.left_inferred, vec![Expr::eq(Expr::col(1), Expr::int(2))]);
    assert!(predicates.pulled_up.contains(&Expr::eq(Expr::col(1), Expr::int(2))));
    assert!(predicates.pulled_up.contains(&Expr::eq(Expr::col(3), Expr::int(2))));
}
