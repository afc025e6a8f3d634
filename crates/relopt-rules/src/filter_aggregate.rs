//! # Filter-Aggregate Transpose Rule
//!
//! Moves HAVING conjuncts that only read group columns below the Aggregate,
//! where they become WHERE conjuncts:
//!
//! ```text
//! Before: Filter($0 > 5, Aggregate(group [a], [COUNT(*)], T))
//! After:  Aggregate(group [a], [COUNT(*)], Filter(a > 5, T))
//! ```
//!
//! Every row of a group shares the group columns' values, so such a conjunct
//! keeps or drops whole groups either way. Conjuncts that read aggregate
//! results stay above. A global aggregate (empty group set) emits a row even
//! for empty input, so nothing crosses it.

use relopt_core::expr::Expr;
use relopt_core::operator::{LogicalOp, Operator};
use relopt_core::pattern::Pattern;
use relopt_core::rule::{Rule, RuleCall, RuleChild, RuleResult, RuleType};

pub struct FilterAggregateTransposeRule;

impl Rule for FilterAggregateTransposeRule {
    fn name(&self) -> &str {
        "FilterAggregateTranspose"
    }

    fn rule_type(&self) -> RuleType {
        RuleType::Transformation
    }

    fn pattern(&self) -> Pattern {
        Pattern::filter_aggregate()
    }

    fn on_match(&self, call: &mut RuleCall) {
        let (
            Operator::Logical(LogicalOp::Filter { condition }),
            Operator::Logical(aggregate @ LogicalOp::Aggregate { group_set, .. }),
        ) = (&call.rel(0).op, &call.rel(1).op)
        else {
            return;
        };
        if group_set.is_empty() {
            return;
        }

        let mut pushed = vec![];
        let mut remaining = vec![];
        for conjunct in condition.conjuncts() {
            // Output column k of the aggregate is input column group_set[k].
            match conjunct.map_columns(&|k| group_set.get(k).copied()) {
                Some(below) if conjunct.is_deterministic() => pushed.push(below),
                _ => remaining.push(conjunct.clone()),
            }
        }
        if pushed.is_empty() {
            return;
        }

        let input = call.inputs(1)[0];
        let filtered = RuleChild::expr(
            Operator::Logical(LogicalOp::Filter {
                condition: Expr::and_all(pushed),
            }),
            vec![RuleChild::Set(input)],
        );
        let aggregate = Operator::Logical(aggregate.clone());
        let result = if remaining.is_empty() {
            RuleResult::NewChildren(aggregate, vec![filtered])
        } else {
            RuleResult::NewChildren(
                Operator::Logical(LogicalOp::Filter {
                    condition: Expr::and_all(remaining),
                }),
                vec![RuleChild::expr(aggregate, vec![filtered])],
            )
        };
        call.transform_to(result);
    }
}
