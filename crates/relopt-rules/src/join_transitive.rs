//! # Join Push Transitive Predicates Rule
//!
//! Uses predicate inference to copy filters from one join input to the other:
//!
//! ```text
//! Before: Join(Filter(a.x > 7, A), B, a.x = b.x)
//! After:  Join(Filter(a.x > 7, A), Filter(b.x > 7, B), a.x = b.x)
//! ```
//!
//! The predicates come from the memo's metadata query, which pulls them up
//! from both inputs, closes the join's column equalities and rewrites each
//! predicate along them. The join type decides which side may receive an
//! inferred filter: for a LEFT join only the right (null-generating) input
//! does, since filtering the preserved side would drop rows that must survive.

use relopt_core::expr::Expr;
use relopt_core::memo::SetId;
use relopt_core::operator::{LogicalOp, Operator};
use relopt_core::pattern::Pattern;
use relopt_core::rule::{Rule, RuleCall, RuleChild, RuleResult, RuleType};
use tracing::trace;

pub struct JoinPushTransitivePredicatesRule;

impl Rule for JoinPushTransitivePredicatesRule {
    fn name(&self) -> &str {
        "JoinPushTransitivePredicates"
    }

    fn rule_type(&self) -> RuleType {
        RuleType::Transformation
    }

    fn pattern(&self) -> Pattern {
        Pattern::join()
    }

    fn on_match(&self, call: &mut RuleCall) {
        let join = call.rel(0);
        let Operator::Logical(LogicalOp::Join { .. }) = &join.op else {
            return;
        };
        let predicates = call.ctx.metadata.expr_predicates(join.id);
        if predicates.left_inferred.is_empty() && predicates.right_inferred.is_empty() {
            return;
        }
        trace!(
            "Inferred {} left and {} right predicates for join {}",
            predicates.left_inferred.len(),
            predicates.right_inferred.len(),
            join.id
        );

        let inputs = call.inputs(0);
        call.transform_to(RuleResult::NewChildren(
            join.op.clone(),
            vec![
                with_filter(inputs[0], predicates.left_inferred),
                with_filter(inputs[1], predicates.right_inferred),
            ],
        ));
    }
}

fn with_filter(set: SetId, conjuncts: Vec<Expr>) -> RuleChild {
    if conjuncts.is_empty() {
        return RuleChild::Set(set);
    }
    RuleChild::expr(
        Operator::Logical(LogicalOp::Filter {
            condition: Expr::and_all(conjuncts),
        }),
        vec![RuleChild::Set(set)],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{planner_for, table};
    use relopt_core::operator::JoinType;
    use relopt_core::rel::RelNode;

    fn push(tree: &RelNode) -> Vec<RelNode> {
        let mut planner = planner_for(&["a", "b"]);
        planner.register(tree).unwrap();
        let created = planner.apply_rule(&JoinPushTransitivePredicatesRule).unwrap();
        created
            .into_iter()
            .filter_map(|id| planner.memo.extract_logical(id))
            .filter(|n| matches!(n.op, LogicalOp::Join { .. }))
            .collect()
    }

    #[test]
    fn test_filter_copies_across_equi_join() {
        let tree = table("a")
            .filter(Expr::gt(Expr::col(0), Expr::int(7)))
            .join(table("b"), JoinType::Inner, Expr::eq(Expr::col(0), Expr::col(2)));
        let joins = push(&tree);
        assert_eq!(joins.len(), 1);
        assert_eq!(
            joins[0].inputs[1].op,
            LogicalOp::Filter {
                condition: Expr::gt(Expr::col(0), Expr::int(7)),
            }
        );
        // The left input already carried its filter.
        assert_eq!(joins[0].inputs[0], tree.inputs[0]);
    }

    #[test]
    fn test_left_join_never_filters_the_preserved_side() {
        let tree = table("a").join(
            table("b").filter(Expr::gt(Expr::col(0), Expr::int(7))),
            JoinType::Left,
            Expr::eq(Expr::col(0), Expr::col(2)),
        );
        assert!(push(&tree).is_empty());
    }
}
