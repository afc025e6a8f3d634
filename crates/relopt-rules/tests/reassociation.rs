//! Rewrites checked against the reference evaluator: firing a rule on a tree
//! must not change the multiset of rows it produces, whatever the data.

use proptest::prelude::*;
use relopt_core::catalog::InMemoryCatalog;
use relopt_core::cost::DefaultCostModel;
use relopt_core::expr::Expr;
use relopt_core::operator::{JoinType, TableRef};
use relopt_core::rel::RelNode;
use relopt_core::rule::{Rule, RuleRegistry};
use relopt_core::search::{PlannerConfig, VolcanoPlanner};
use relopt_core::testing::{canonical, evaluate, int_row, Row, TestDatabase};
use relopt_core::types::{DataType, Field, RowType};
use relopt_rules::filter_join::FilterJoinRule;
use relopt_rules::join_commutativity::JoinCommuteRule;
use relopt_rules::join_push_through_join::JoinPushThroughJoinRule;
use std::sync::Arc;

const TABLES: [&str; 3] = ["a", "b", "c"];

fn xy() -> RowType {
    RowType::new(vec![
        Field::new("x", DataType::Int64, true),
        Field::new("y", DataType::Int64, true),
    ])
}

fn table(name: &str) -> RelNode {
    RelNode::scan(TableRef::new("s", name), xy())
}

fn rows_strategy() -> impl Strategy<Value = Vec<Row>> {
    let value = prop_oneof![1 => Just(None), 4 => (0i64..4).prop_map(Some)];
    prop::collection::vec((value.clone(), value), 0..6)
        .prop_map(|rows| rows.into_iter().map(|(x, y)| int_row(&[x, y])).collect())
}

fn database_strategy() -> impl Strategy<Value = TestDatabase> {
    (rows_strategy(), rows_strategy(), rows_strategy()).prop_map(|(a, b, c)| {
        TestDatabase::new()
            .with_table(&TableRef::new("s", "a"), a)
            .with_table(&TableRef::new("s", "b"), b)
            .with_table(&TableRef::new("s", "c"), c)
    })
}

/// Fires `rule` on `node` and returns the rewritten tree rooted at the last
/// expression the rule created.
fn rewrite(rule: &dyn Rule, node: &RelNode) -> Option<RelNode> {
    let mut catalog = InMemoryCatalog::new();
    for name in TABLES {
        catalog.add_table(&TableRef::new("s", name), xy(), None);
    }
    let mut planner = VolcanoPlanner::new(
        Arc::new(RuleRegistry::new()),
        Arc::new(DefaultCostModel::default()),
        Arc::new(catalog),
        PlannerConfig::default(),
    );
    planner.register(node).unwrap();
    let created = planner.apply_rule(rule).unwrap();
    planner.memo.extract_logical(*created.last()?)
}

fn assert_same_rows(before: &RelNode, after: &RelNode, db: &TestDatabase) {
    let expected = canonical(evaluate(before, db).unwrap());
    let actual = canonical(evaluate(after, db).unwrap());
    assert_eq!(expected, actual, "\nbefore:\n{}\nafter:\n{}", before.explain(), after.explain());
}

/// `(a ⋈ b ON a.x = b.x) ⋈ c ON a.y = c.y AND b.x = c.x`
fn three_way() -> RelNode {
    table("a")
        .join(table("b"), JoinType::Inner, Expr::eq(Expr::col(0), Expr::col(2)))
        .join(
            table("c"),
            JoinType::Inner,
            Expr::and_all([
                Expr::eq(Expr::col(1), Expr::col(5)),
                Expr::eq(Expr::col(2), Expr::col(4)),
            ]),
        )
}

fn join_type_strategy() -> impl Strategy<Value = JoinType> {
    prop_oneof![
        Just(JoinType::Inner),
        Just(JoinType::Left),
        Just(JoinType::Right),
        Just(JoinType::Full),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn push_right_through_join_preserves_rows(db in database_strategy()) {
        let before = three_way();
        let after = rewrite(&JoinPushThroughJoinRule::right(), &before).unwrap();
        assert_same_rows(&before, &after, &db);
    }

    #[test]
    fn push_left_through_join_preserves_rows(db in database_strategy()) {
        let before = three_way();
        let after = rewrite(&JoinPushThroughJoinRule::left(), &before).unwrap();
        assert_same_rows(&before, &after, &db);
    }

    #[test]
    fn commute_preserves_rows(db in database_strategy(), join_type in join_type_strategy()) {
        let before = table("a").join(
            table("b"),
            join_type,
            Expr::and_all([
                Expr::eq(Expr::col(0), Expr::col(2)),
                Expr::gt(Expr::col(1), Expr::int(1)),
            ]),
        );
        let after = rewrite(&JoinCommuteRule::swap_outer(), &before).unwrap();
        assert_same_rows(&before, &after, &db);
    }

    #[test]
    fn filter_into_join_preserves_rows(
        db in database_strategy(),
        join_type in join_type_strategy(),
        column in 0usize..4,
        bound in 0i64..3,
    ) {
        let before = table("a")
            .join(table("b"), join_type, Expr::eq(Expr::col(0), Expr::col(2)))
            .filter(Expr::gt(Expr::col(column), Expr::int(bound)));
        // None when the rule finds nothing to move.
        if let Some(after) = rewrite(&FilterJoinRule::filter_into_join(), &before) {
            assert_same_rows(&before, &after, &db);
        }
    }

    #[test]
    fn join_condition_push_preserves_rows(
        db in database_strategy(),
        join_type in join_type_strategy(),
        column in 0usize..4,
    ) {
        let before = table("a").join(
            table("b"),
            join_type,
            Expr::and_all([
                Expr::eq(Expr::col(0), Expr::col(2)),
                Expr::gt(Expr::col(column), Expr::int(1)),
            ]),
        );
        if let Some(after) = rewrite(&FilterJoinRule::join_condition_push(), &before) {
            assert_same_rows(&before, &after, &db);
        }
    }
}
