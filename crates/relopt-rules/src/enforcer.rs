//! # Sort Enforcer / Implementation Rule
//!
//! This module provides the implementation rule for the logical Sort operator.
//!
//! ## Enforcers
//!
//! An "enforcer" is a physical operator whose sole purpose is to satisfy a
//! required physical property that the child plan doesn't natively provide.
//! Sort is the canonical enforcer: when a consumer requires sorted input (a
//! merge join, a stream aggregate) but no plan in the input set delivers that
//! order, the planner places a sort on top.
//!
//! ## How It Works
//!
//! 1. A logical Sort appears in the tree (ORDER BY, LIMIT/OFFSET).
//! 2. This rule maps it to a physical SortOp carrying the same offset and fetch.
//! 3. Independently, the planner inserts an offset-free SortOp into a set the
//!    first time a consumer asks for one of its sorted subsets.
//!
//! The sort cost is O(n log n) CPU per key, so a sorted plan that needs no
//! enforcer is preferred whenever one exists.

use relopt_core::operator::{LogicalOp, Operator, PhysicalOp};
use relopt_core::pattern::Pattern;
use relopt_core::rule::{Rule, RuleCall, RuleResult, RuleType};

/// Implement logical sort as a physical sort operator.
pub struct ImplSortRule;

impl Rule for ImplSortRule {
    fn name(&self) -> &str {
        "ImplSort"
    }

    fn rule_type(&self) -> RuleType {
        RuleType::Implementation
    }

    fn pattern(&self) -> Pattern {
        Pattern::sort()
    }

    fn on_match(&self, call: &mut RuleCall) {
        let Operator::Logical(LogicalOp::Sort {
            collation,
            offset,
            fetch,
        }) = &call.rel(0).op
        else {
            return;
        };

        call.transform_to(RuleResult::Substitution(
            Operator::Physical(PhysicalOp::SortOp {
                collation: collation.clone(),
                offset: *offset,
                fetch: *fetch,
            }),
            call.inputs(0),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impl_scan::ImplSeqScanRule;
    use crate::testing::{planner_with, table};
    use relopt_core::operator::SortKey;
    use relopt_core::rule::RuleRegistry;

    #[test]
    fn test_limit_keeps_offset_and_fetch() {
        let mut registry = RuleRegistry::new();
        registry.add_rule(Box::new(ImplSeqScanRule));
        registry.add_rule(Box::new(ImplSortRule));
        let mut planner = planner_with(registry, &["t"]);
        planner
            .set_root(&table("t").sort(vec![SortKey::desc(0)]).limit(Some(5), Some(10)))
            .unwrap();

        let plan = planner.find_best_plan().unwrap();
        assert_eq!(
            plan.op,
            PhysicalOp::SortOp {
                collation: vec![],
                offset: Some(5),
                fetch: Some(10),
            }
        );
        assert!(matches!(
            &plan.children[0].op,
            PhysicalOp::SortOp { collation, fetch: None, .. } if collation == &vec![SortKey::desc(0)]
        ));
    }
}
