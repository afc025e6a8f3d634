//! Fixtures for the rule unit tests.

use relopt_core::catalog::InMemoryCatalog;
use relopt_core::cost::DefaultCostModel;
use relopt_core::operator::TableRef;
use relopt_core::rel::RelNode;
use relopt_core::rule::RuleRegistry;
use relopt_core::search::{PlannerConfig, VolcanoPlanner};
use relopt_core::types::{DataType, Field, RowType};
use std::sync::Arc;

/// `(x, y)`, both nullable BIGINT.
pub fn xy() -> RowType {
    RowType::new(vec![
        Field::new("x", DataType::Int64, true),
        Field::new("y", DataType::Int64, true),
    ])
}

/// Scan of `s.<name>` with the [`xy`] row type.
pub fn table(name: &str) -> RelNode {
    RelNode::scan(TableRef::new("s", name), xy())
}

/// A planner without rules over `s.<name>` tables, for firing single rules
/// with `apply_rule`.
pub fn planner_for(names: &[&str]) -> VolcanoPlanner {
    planner_with(RuleRegistry::new(), names)
}

pub fn planner_with(registry: RuleRegistry, names: &[&str]) -> VolcanoPlanner {
    let mut catalog = InMemoryCatalog::new();
    for name in names {
        catalog.add_table(&TableRef::new("s", *name), xy(), None);
    }
    VolcanoPlanner::new(
        Arc::new(registry),
        Arc::new(DefaultCostModel::default()),
        Arc::new(catalog),
        PlannerConfig::default(),
    )
}
