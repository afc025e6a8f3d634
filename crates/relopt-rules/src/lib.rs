//! # Built-in Optimization Rules
//!
//! This crate provides the default rule set for the Volcano planner in
//! `relopt-core`. Rules are divided into two categories:
//!
//! ## Transformation Rules (Logical -> Logical)
//!
//! These rules expand the search space by registering equivalent logical
//! alternatives:
//!
//! - **`FilterJoinRule`**: pushes WHERE and ON conjuncts into or below a join,
//!   weakening outer joins whose null-padded rows a filter would discard.
//! - **`FilterProjectTransposeRule`**: moves a filter below a project.
//! - **`FilterAggregateTransposeRule`**: moves HAVING conjuncts on group
//!   columns below the aggregate.
//! - **`FilterMergeRule`** / **`ProjectMergeRule`** / **`ProjectRemoveRule`**:
//!   collapse stacked filters and projects, and drop identity projects.
//! - **`JoinCommuteRule`**: swaps the inputs of a join (A JOIN B -> B JOIN A).
//! - **`JoinPushThroughJoinRule`**: regroups two inner joins,
//!   `(A ⋈ B) ⋈ C -> (A ⋈ C) ⋈ B` and `-> (C ⋈ B) ⋈ A`.
//! - **`JoinPushTransitivePredicatesRule`**: copies filters across a join's
//!   column equalities.
//!
//! ## Implementation Rules (Logical -> Physical)
//!
//! These rules produce physical operator alternatives that the cost model scores:
//!
//! - **`ImplHashJoinRule`**: a join as a hash join (build-left and build-right).
//! - **`ImplMergeJoinRule`**: a join as a merge join (inner equi-joins only).
//! - **`ImplNestedLoopJoinRule`**: a join as a nested loop join (universal fallback).
//! - **`ImplSeqScanRule`**, **`ImplFilterRule`**, **`ImplProjectRule`**.
//! - **`ImplHashAggregateRule`** / **`ImplStreamAggregateRule`**.
//! - **`ImplSortRule`**: a logical sort (or limit) as a physical sort.
//! - **`ImplSetOpRule`**, **`ImplCorrelateRule`**, **`ImplWindowRule`**,
//!   **`ImplCollectRule`**.

pub mod enforcer;
pub mod filter_aggregate;
pub mod filter_join;
pub mod filter_merge;
pub mod filter_project;
pub mod impl_agg;
pub mod impl_join;
pub mod impl_scan;
pub mod impl_set_op;
pub mod join_commutativity;
pub mod join_push_through_join;
pub mod join_transitive;
pub mod project_merge;
mod util;

#[cfg(test)]
mod testing;

use relopt_core::rule::RuleRegistry;

/// Create a default rule registry with all built-in rules.
///
/// This is the standard configuration for the planner. Connector-specific rules
/// can be added to the returned registry via `add_source_rule_set()`.
pub fn default_rule_registry() -> RuleRegistry {
    let mut registry = RuleRegistry::new();

    // Transformation rules: expand the logical search space.
    registry.add_rule(Box::new(filter_join::FilterJoinRule::filter_into_join()));
    registry.add_rule(Box::new(filter_join::FilterJoinRule::join_condition_push()));
    registry.add_rule(Box::new(filter_project::FilterProjectTransposeRule));
    registry.add_rule(Box::new(filter_aggregate::FilterAggregateTransposeRule));
    registry.add_rule(Box::new(filter_merge::FilterMergeRule));
    registry.add_rule(Box::new(project_merge::ProjectMergeRule));
    registry.add_rule(Box::new(project_merge::ProjectRemoveRule));
    registry.add_rule(Box::new(join_commutativity::JoinCommuteRule::default()));
    registry.add_rule(Box::new(join_push_through_join::JoinPushThroughJoinRule::right()));
    registry.add_rule(Box::new(join_push_through_join::JoinPushThroughJoinRule::left()));
    registry.add_rule(Box::new(join_transitive::JoinPushTransitivePredicatesRule));

    // Implementation rules: map logical operators to physical alternatives.
    registry.add_rule(Box::new(impl_scan::ImplSeqScanRule));
    registry.add_rule(Box::new(impl_scan::ImplFilterRule));
    registry.add_rule(Box::new(impl_scan::ImplProjectRule));
    registry.add_rule(Box::new(impl_join::ImplHashJoinRule));
    registry.add_rule(Box::new(impl_join::ImplMergeJoinRule));
    registry.add_rule(Box::new(impl_join::ImplNestedLoopJoinRule));
    registry.add_rule(Box::new(impl_join::ImplCorrelateRule));
    registry.add_rule(Box::new(impl_agg::ImplHashAggregateRule));
    registry.add_rule(Box::new(impl_agg::ImplStreamAggregateRule));
    registry.add_rule(Box::new(impl_agg::ImplWindowRule));
    registry.add_rule(Box::new(impl_agg::ImplCollectRule));
    registry.add_rule(Box::new(enforcer::ImplSortRule));
    registry.add_rule(Box::new(impl_set_op::ImplSetOpRule::union()));
    registry.add_rule(Box::new(impl_set_op::ImplSetOpRule::intersect()));
    registry.add_rule(Box::new(impl_set_op::ImplSetOpRule::minus()));

    registry
}

/// Only the implementation rules: plans every query in the shape it was
/// written.
pub fn implementation_rule_registry() -> RuleRegistry {
    let mut registry = RuleRegistry::new();
    for rule in default_rule_registry().base_rules {
        if rule.rule_type() == relopt_core::rule::RuleType::Implementation {
            registry.add_rule(rule);
        }
    }
    registry
}
