//! # Join Implementation Rules
//!
//! This module provides the implementation rules that map a logical Join (and
//! its correlated variant) to physical operators. Each physical join has
//! different cost characteristics and applicability constraints:
//!
//! ## Hash Join (`ImplHashJoinRule`)
//!
//! The workhorse join algorithm. Builds a hash table on one side (the "build
//! side") and probes it with rows from the other side. Produces two
//! alternatives per join (build-left and build-right) so the cost model can
//! pick the cheaper option, typically building on the smaller side.
//!
//! **Requires**: at least one equi-join conjunct between the two inputs.
//!
//! ## Merge Join (`ImplMergeJoinRule`)
//!
//! Merges two streams sorted on the join keys. The planner requests the sorted
//! subsets of both inputs; unless an input already delivers that order, a sort
//! enforcer is costed in, which makes merge join rarely win over hash join.
//!
//! **Requires**: inner join with equi-join conjuncts.
//!
//! ## Nested Loop Join (`ImplNestedLoopJoinRule`)
//!
//! The universal fallback: for each left row, scans all right rows. Works with
//! any join condition, including non-equi predicates and cross joins, but its
//! O(n * m) cost means it is chosen only for small inputs or when no equi-join
//! conjunct exists.
//!
//! ## Correlate (`ImplCorrelateRule`)
//!
//! A correlated nested loop: re-evaluates the right input per left row.

use crate::util::{equi_keys, has_equi_predicate};
use relopt_core::operator::{BuildSide, JoinType, LogicalOp, LogicalOpKind, Operator, PhysicalOp};
use relopt_core::pattern::Pattern;
use relopt_core::rule::{Rule, RuleCall, RuleResult, RuleType};

/// Implement logical join as a hash join.
///
/// Generates two alternatives: build on left side and build on right side.
pub struct ImplHashJoinRule;

impl Rule for ImplHashJoinRule {
    fn name(&self) -> &str {
        "ImplHashJoin"
    }

    fn rule_type(&self) -> RuleType {
        RuleType::Implementation
    }

    fn pattern(&self) -> Pattern {
        Pattern::join()
    }

    fn on_match(&self, call: &mut RuleCall) {
        let Operator::Logical(LogicalOp::Join {
            join_type,
            condition,
        }) = &call.rel(0).op
        else {
            return;
        };
        let inputs = call.inputs(0);
        let n_left = call.row_type(inputs[0]).field_count();

        // Hash join requires at least one equi-join predicate
        if !has_equi_predicate(condition, n_left) {
            return;
        }

        for build_side in [BuildSide::Right, BuildSide::Left] {
            call.transform_to(RuleResult::Substitution(
                Operator::Physical(PhysicalOp::HashJoin {
                    join_type: *join_type,
                    condition: condition.clone(),
                    build_side,
                }),
                inputs.clone(),
            ));
        }
    }
}

/// Implement logical join as a merge join (requires sorted input).
///
/// Only fires for inner joins with equi-join predicates. The planner derives
/// sort requirements for both children from the keys.
pub struct ImplMergeJoinRule;

impl Rule for ImplMergeJoinRule {
    fn name(&self) -> &str {
        "ImplMergeJoin"
    }

    fn rule_type(&self) -> RuleType {
        RuleType::Implementation
    }

    fn pattern(&self) -> Pattern {
        Pattern::join()
    }

    fn on_match(&self, call: &mut RuleCall) {
        let Operator::Logical(LogicalOp::Join {
            join_type,
            condition,
        }) = &call.rel(0).op
        else {
            return;
        };
        if *join_type != JoinType::Inner {
            return;
        }
        let inputs = call.inputs(0);
        let n_left = call.row_type(inputs[0]).field_count();
        let (left_keys, right_keys) = equi_keys(condition, n_left);
        if left_keys.is_empty() {
            return;
        }

        call.transform_to(RuleResult::Substitution(
            Operator::Physical(PhysicalOp::MergeJoin {
                join_type: *join_type,
                condition: condition.clone(),
                left_keys,
                right_keys,
            }),
            inputs,
        ));
    }
}

/// Implement logical join as a nested loop join (universal fallback).
pub struct ImplNestedLoopJoinRule;

impl Rule for ImplNestedLoopJoinRule {
    fn name(&self) -> &str {
        "ImplNestedLoopJoin"
    }

    fn rule_type(&self) -> RuleType {
        RuleType::Implementation
    }

    fn pattern(&self) -> Pattern {
        Pattern::join()
    }

    fn on_match(&self, call: &mut RuleCall) {
        let Operator::Logical(LogicalOp::Join {
            join_type,
            condition,
        }) = &call.rel(0).op
        else {
            return;
        };

        call.transform_to(RuleResult::Substitution(
            Operator::Physical(PhysicalOp::NestedLoopJoin {
                join_type: *join_type,
                condition: condition.clone(),
            }),
            call.inputs(0),
        ));
    }
}

pub struct ImplCorrelateRule;

impl Rule for ImplCorrelateRule {
    fn name(&self) -> &str {
        "ImplCorrelate"
    }

    fn rule_type(&self) -> RuleType {
        RuleType::Implementation
    }

    fn pattern(&self) -> Pattern {
        Pattern::logical(LogicalOpKind::Correlate, 2)
    }

    fn on_match(&self, call: &mut RuleCall) {
        let Operator::Logical(LogicalOp::Correlate {
            join_type,
            correlation_id,
            required_columns,
        }) = &call.rel(0).op
        else {
            return;
        };

        call.transform_to(RuleResult::Substitution(
            Operator::Physical(PhysicalOp::Correlate {
                join_type: *join_type,
                correlation_id: *correlation_id,
                required_columns: required_columns.clone(),
            }),
            call.inputs(0),
        ));
    }
}
