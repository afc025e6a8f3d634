//! # Aggregate Implementation Rules
//!
//! This module provides the implementation rules for the operators that fold
//! many input rows into fewer (or wider) output rows:
//!
//! ## Hash Aggregate (`ImplHashAggregateRule`)
//!
//! Uses a hash table keyed by the group columns. Each input row is routed to its
//! bucket, where the aggregate accumulators are updated. Works with any input
//! ordering.
//!
//! **Cost trade-off**: O(n) CPU + O(groups) memory. The go-to choice when the
//! input is not pre-sorted.
//!
//! ## Stream Aggregate (`ImplStreamAggregateRule`)
//!
//! Processes input rows in a single pass, detecting group boundaries from the
//! sorted order. Requires input sorted on the group columns; the planner
//! requests that collation from the input set and costs in a sort enforcer when
//! no input plan delivers it.
//!
//! ## Window and Collect
//!
//! `ImplWindowRule` and `ImplCollectRule` each have a single physical form.

use relopt_core::operator::{LogicalOp, LogicalOpKind, Operator, PhysicalOp};
use relopt_core::pattern::Pattern;
use relopt_core::rule::{Rule, RuleCall, RuleResult, RuleType};

/// Implement logical aggregate as a hash aggregate.
///
/// Always applicable.
pub struct ImplHashAggregateRule;

impl Rule for ImplHashAggregateRule {
    fn name(&self) -> &str {
        "ImplHashAggregate"
    }

    fn rule_type(&self) -> RuleType {
        RuleType::Implementation
    }

    fn pattern(&self) -> Pattern {
        Pattern::aggregate()
    }

    fn on_match(&self, call: &mut RuleCall) {
        let Operator::Logical(LogicalOp::Aggregate {
            group_set,
            aggregates,
        }) = &call.rel(0).op
        else {
            return;
        };

        call.transform_to(RuleResult::Substitution(
            Operator::Physical(PhysicalOp::HashAggregate {
                group_set: group_set.clone(),
                aggregates: aggregates.clone(),
            }),
            call.inputs(0),
        ));
    }
}

/// Implement logical aggregate as a stream aggregate (requires sorted input).
pub struct ImplStreamAggregateRule;

impl Rule for ImplStreamAggregateRule {
    fn name(&self) -> &str {
        "ImplStreamAggregate"
    }

    fn rule_type(&self) -> RuleType {
        RuleType::Implementation
    }

    fn pattern(&self) -> Pattern {
        Pattern::aggregate()
    }

    fn on_match(&self, call: &mut RuleCall) {
        let Operator::Logical(LogicalOp::Aggregate {
            group_set,
            aggregates,
        }) = &call.rel(0).op
        else {
            return;
        };

        call.transform_to(RuleResult::Substitution(
            Operator::Physical(PhysicalOp::StreamAggregate {
                group_set: group_set.clone(),
                aggregates: aggregates.clone(),
            }),
            call.inputs(0),
        ));
    }
}

pub struct ImplWindowRule;

impl Rule for ImplWindowRule {
    fn name(&self) -> &str {
        "ImplWindow"
    }

    fn rule_type(&self) -> RuleType {
        RuleType::Implementation
    }

    fn pattern(&self) -> Pattern {
        Pattern::logical(LogicalOpKind::Window, 1)
    }

    fn on_match(&self, call: &mut RuleCall) {
        let Operator::Logical(LogicalOp::Window { groups }) = &call.rel(0).op else {
            return;
        };

        call.transform_to(RuleResult::Substitution(
            Operator::Physical(PhysicalOp::Window {
                groups: groups.clone(),
            }),
            call.inputs(0),
        ));
    }
}

pub struct ImplCollectRule;

impl Rule for ImplCollectRule {
    fn name(&self) -> &str {
        "ImplCollect"
    }

    fn rule_type(&self) -> RuleType {
        RuleType::Implementation
    }

    fn pattern(&self) -> Pattern {
        Pattern::logical(LogicalOpKind::Collect, 1)
    }

    fn on_match(&self, call: &mut RuleCall) {
        let Operator::Logical(LogicalOp::Collect { field_name }) = &call.rel(0).op else {
            return;
        };

        call.transform_to(RuleResult::Substitution(
            Operator::Physical(PhysicalOp::Collect {
                field_name: field_name.clone(),
            }),
            call.inputs(0),
        ));
    }
}
