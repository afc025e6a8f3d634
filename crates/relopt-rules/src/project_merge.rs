//! # Project Merge and Project Remove Rules
//!
//! The join reordering rules leave a Project on top of every rewritten join to
//! restore column order. Stacked projects are composed into one, and a project
//! that passes its input through unchanged is recognized as equivalent to that
//! input, which merges the two sets in the memo.

use relopt_core::expr::Expr;
use relopt_core::operator::{LogicalOp, Operator};
use relopt_core::pattern::Pattern;
use relopt_core::rule::{Rule, RuleCall, RuleResult, RuleType};

/// `Project(e, Project(f, T)) -> Project(e[$i := f[i]], T)`
pub struct ProjectMergeRule;

impl Rule for ProjectMergeRule {
    fn name(&self) -> &str {
        "ProjectMerge"
    }

    fn rule_type(&self) -> RuleType {
        RuleType::Transformation
    }

    fn pattern(&self) -> Pattern {
        Pattern::project_project()
    }

    fn on_match(&self, call: &mut RuleCall) {
        let (
            Operator::Logical(LogicalOp::Project { exprs: top, names }),
            Operator::Logical(LogicalOp::Project { exprs: bottom, .. }),
        ) = (&call.rel(0).op, &call.rel(1).op)
        else {
            return;
        };
        // Windowed expressions are evaluated over the whole input.
        if bottom.iter().any(Expr::contains_over) {
            return;
        }
        if top.iter().any(|e| e.input_refs().iter().any(|i| i >= bottom.len())) {
            return;
        }

        let exprs = top
            .iter()
            .map(|e| e.substitute_refs(&|i| bottom[i].clone()))
            .collect();
        call.transform_to(RuleResult::Substitution(
            Operator::Logical(LogicalOp::Project {
                exprs,
                names: names.clone(),
            }),
            call.inputs(1),
        ));
    }
}

/// `Project([$0, .., $n-1], T) == T` when T has n columns.
pub struct ProjectRemoveRule;

impl Rule for ProjectRemoveRule {
    fn name(&self) -> &str {
        "ProjectRemove"
    }

    fn rule_type(&self) -> RuleType {
        RuleType::Transformation
    }

    fn pattern(&self) -> Pattern {
        Pattern::project()
    }

    fn on_match(&self, call: &mut RuleCall) {
        let Operator::Logical(LogicalOp::Project { exprs, .. }) = &call.rel(0).op else {
            return;
        };
        let input = call.inputs(0)[0];
        let is_identity = exprs.len() == call.row_type(input).field_count()
            && exprs.iter().enumerate().all(|(i, e)| e.as_input_ref() == Some(i));
        if is_identity && input != call.set_of(0) {
            call.transform_to(RuleResult::Equivalent(input));
        }
    }
}
