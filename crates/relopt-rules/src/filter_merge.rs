//! Combines two stacked Filters into one conjunction.

use relopt_core::expr::Expr;
use relopt_core::operator::{LogicalOp, Operator};
use relopt_core::pattern::Pattern;
use relopt_core::rule::{Rule, RuleCall, RuleResult, RuleType};

/// `Filter(p, Filter(q, T)) -> Filter(q AND p, T)`
pub struct FilterMergeRule;

impl Rule for FilterMergeRule {
    fn name(&self) -> &str {
        "FilterMerge"
    }

    fn rule_type(&self) -> RuleType {
        RuleType::Transformation
    }

    fn pattern(&self) -> Pattern {
        Pattern::filter_filter()
    }

    fn on_match(&self, call: &mut RuleCall) {
        let (
            Operator::Logical(LogicalOp::Filter { condition: top }),
            Operator::Logical(LogicalOp::Filter { condition: bottom }),
        ) = (&call.rel(0).op, &call.rel(1).op)
        else {
            return;
        };

        let mut conjuncts: Vec<Expr> = bottom.conjuncts().into_iter().cloned().collect();
        for c in top.conjuncts() {
            if !conjuncts.contains(c) {
                conjuncts.push(c.clone());
            }
        }
        call.transform_to(RuleResult::Substitution(
            Operator::Logical(LogicalOp::Filter {
                condition: Expr::and_all(conjuncts),
            }),
            call.inputs(1),
        ));
    }
}
