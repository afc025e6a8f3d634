//! Implementation rules for the n-ary set operations.
//!
//! UNION, INTERSECT and EXCEPT each have one physical form that hashes its
//! inputs; the `all` flag is carried through unchanged.

use relopt_core::operator::{LogicalOp, LogicalOpKind, Operator, PhysicalOp};
use relopt_core::pattern::{OpMatcher, Pattern};
use relopt_core::rule::{Rule, RuleCall, RuleResult, RuleType};

/// Implement Union, Intersect and Minus.
pub struct ImplSetOpRule {
    kind: LogicalOpKind,
    name: &'static str,
}

impl ImplSetOpRule {
    pub fn union() -> Self {
        Self {
            kind: LogicalOpKind::Union,
            name: "ImplUnion",
        }
    }

    pub fn intersect() -> Self {
        Self {
            kind: LogicalOpKind::Intersect,
            name: "ImplIntersect",
        }
    }

    pub fn minus() -> Self {
        Self {
            kind: LogicalOpKind::Minus,
            name: "ImplMinus",
        }
    }
}

impl Rule for ImplSetOpRule {
    fn name(&self) -> &str {
        self.name
    }

    fn rule_type(&self) -> RuleType {
        RuleType::Implementation
    }

    fn pattern(&self) -> Pattern {
        Pattern::Variadic(OpMatcher::LogicalOp(self.kind))
    }

    fn on_match(&self, call: &mut RuleCall) {
        let op = match &call.rel(0).op {
            Operator::Logical(LogicalOp::Union { all }) => PhysicalOp::Union { all: *all },
            Operator::Logical(LogicalOp::Intersect { all }) => PhysicalOp::Intersect { all: *all },
            Operator::Logical(LogicalOp::Minus { all }) => PhysicalOp::Minus { all: *all },
            _ => return,
        };
        call.transform_to(RuleResult::Substitution(
            Operator::Physical(op),
            call.inputs(0),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{planner_for, table};
    use relopt_core::rel::RelNode;

    #[test]
    fn test_set_ops_match_any_arity() {
        let mut planner = planner_for(&["a", "b", "c"]);
        planner
            .register(&RelNode::union(vec![table("a"), table("b"), table("c")], true))
            .unwrap();
        planner
            .register(&RelNode::minus(vec![table("a"), table("b")], false))
            .unwrap();

        let unions = planner.apply_rule(&ImplSetOpRule::union()).unwrap();
        assert_eq!(unions.len(), 1);
        assert_eq!(planner.memo.children(unions[0]).len(), 3);
        assert_eq!(
            planner.memo.expr(unions[0]).op.as_physical(),
            Some(&PhysicalOp::Union { all: true })
        );

        let minus = planner.apply_rule(&ImplSetOpRule::minus()).unwrap();
        assert_eq!(
            planner.memo.expr(minus[0]).op.as_physical(),
            Some(&PhysicalOp::Minus { all: false })
        );
        assert!(planner.apply_rule(&ImplSetOpRule::intersect()).unwrap().is_empty());
    }
}
