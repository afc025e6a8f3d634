//! # Filter-Project Transpose Rule
//!
//! Pushes a Filter below the Project it sits on by rewriting the filter in
//! terms of the project's input:
//!
//! ```text
//! Before: Filter($0 > 5, Project([$1 + 1, $0], T))
//! After:  Project([$1 + 1, $0], Filter($1 + 1 > 5, T))
//! ```
//!
//! Once below the project the filter can keep moving down (into a join, below
//! an aggregate) with the other pushdown rules.
//!
//! A project computing windowed aggregates is never crossed: the window sees
//! the whole input, so filtering first would change its values.

use relopt_core::expr::Expr;
use relopt_core::operator::{LogicalOp, Operator};
use relopt_core::pattern::Pattern;
use relopt_core::rule::{Rule, RuleCall, RuleChild, RuleResult, RuleType};

pub struct FilterProjectTransposeRule;

impl Rule for FilterProjectTransposeRule {
    fn name(&self) -> &str {
        "FilterProjectTranspose"
    }

    fn rule_type(&self) -> RuleType {
        RuleType::Transformation
    }

    fn pattern(&self) -> Pattern {
        Pattern::filter_project()
    }

    fn on_match(&self, call: &mut RuleCall) {
        let (
            Operator::Logical(LogicalOp::Filter { condition }),
            Operator::Logical(LogicalOp::Project { exprs, names }),
        ) = (&call.rel(0).op, &call.rel(1).op)
        else {
            return;
        };
        if exprs.iter().any(Expr::contains_over) || condition.contains_over() {
            return;
        }
        if condition.input_refs().iter().any(|i| i >= exprs.len()) {
            return;
        }

        let pushed = condition.substitute_refs(&|i| exprs[i].clone());
        let input = call.inputs(1)[0];
        call.transform_to(RuleResult::NewChildren(
            Operator::Logical(LogicalOp::Project {
                exprs: exprs.clone(),
                names: names.clone(),
            }),
            vec![RuleChild::expr(
                Operator::Logical(LogicalOp::Filter { condition: pushed }),
                vec![RuleChild::Set(input)],
            )],
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{planner_for, table};
    use relopt_core::expr::{AggFunc, BinaryOp};
    use relopt_core::predicates::predicates_for;
    use relopt_core::rel::RelNode;

    fn transpose(tree: &RelNode) -> RelNode {
        let mut planner = planner_for(&["t"]);
        planner.register(tree).unwrap();
        let created = planner.apply_rule(&FilterProjectTransposeRule).unwrap();
        planner.memo.extract_logical(*created.last().unwrap()).unwrap()
    }

    #[test]
    fn test_filter_moves_below_project() {
        let plus_one = Expr::binary(BinaryOp::Add, Expr::col(1), Expr::int(1));
        let tree = table("t")
            .project(vec![plus_one.clone(), Expr::col(0)])
            .filter(Expr::gt(Expr::col(0), Expr::int(5)));
        let rewritten = transpose(&tree);

        assert!(matches!(rewritten.op, LogicalOp::Project { .. }));
        assert_eq!(
            rewritten.inputs[0].op,
            LogicalOp::Filter {
                condition: Expr::gt(plus_one, Expr::int(5)),
            }
        );
    }

    #[test]
    fn test_transposed_tree_keeps_its_predicates() {
        let tree = table("t")
            .project(vec![Expr::col(1), Expr::col(0)])
            .filter(Expr::gt(Expr::col(1), Expr::int(5)));
        let rewritten = transpose(&tree);
        assert_eq!(
            predicates_for(&rewritten).pulled_up,
            predicates_for(&tree).pulled_up
        );
        assert_eq!(
            predicates_for(&tree).pulled_up,
            vec![Expr::gt(Expr::col(1), Expr::int(5))]
        );
    }

    #[test]
    fn test_windowed_project_is_not_crossed() {
        let over = Expr::Over {
            func: AggFunc::Sum,
            args: vec![Expr::col(1)],
            partition_by: vec![Expr::col(0)],
            order_by: vec![],
        };
        let tree = table("t")
            .project(vec![Expr::col(0), over])
            .filter(Expr::gt(Expr::col(1), Expr::int(5)));
        let mut planner = planner_for(&["t"]);
        planner.register(&tree).unwrap();
        assert!(planner.apply_rule(&FilterProjectTransposeRule).unwrap().is_empty());
    }
}
