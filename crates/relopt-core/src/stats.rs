//! # Statistics for Cost-Based Optimization
//!
//! Statistics are derived bottom-up for every equivalence set from one of its
//! logical members. Base tables take theirs from the catalog; tables without
//! statistics get a flat row-count estimate.
//!
//! ## Derivation Formulas
//!
//! - **Filter**: `rows = input * selectivity(condition)`.
//! - **Join**: `rows = left * right * selectivity(condition)`, adjusted for the
//!   preserved side of outer joins; semi/anti joins keep a fraction of the left.
//! - **Aggregate**: product of group-column NDVs capped by input rows when NDVs
//!   are known, otherwise `input * (1 - 0.5^k)` for `k` group columns; a global
//!   aggregate yields one row.
//!
//! ## Selectivity Estimation
//!
//! - **Equality**: `1 / NDV` when known, otherwise 0.15.
//! - **Comparison**: 0.5.
//! - **IS NOT NULL**: `1 - null_fraction` when known, otherwise 0.9.
//! - **Anything else**: 0.25.
//!
//! Conjunctions multiply (independence); disjunctions use inclusion-exclusion.

use crate::expr::{BinaryOp, Expr, ScalarValue, UnaryOp};
use crate::operator::{JoinType, LogicalOp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const EQUALITY_SELECTIVITY: f64 = 0.15;
pub const COMPARISON_SELECTIVITY: f64 = 0.5;
pub const NOT_NULL_SELECTIVITY: f64 = 0.9;
pub const DEFAULT_FILTER_SELECTIVITY: f64 = 0.25;

/// Statistics for a relation (or an equivalence set in the memo).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub row_count: f64,
    /// Per-column statistics keyed by column position.
    pub column_stats: HashMap<usize, ColumnStatistics>,
}

impl Statistics {
    pub fn new(row_count: f64) -> Self {
        Self {
            row_count,
            column_stats: HashMap::new(),
        }
    }

    pub fn with_column(mut self, index: usize, stats: ColumnStatistics) -> Self {
        self.column_stats.insert(index, stats);
        self
    }

    pub fn distinct_count(&self, index: usize) -> Option<f64> {
        self.column_stats.get(&index).map(|c| c.distinct_count)
    }
}

/// Per-column statistics, typically gathered by ANALYZE and stored in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStatistics {
    /// Number of distinct values (NDV).
    pub distinct_count: f64,
    /// Fraction of rows that are NULL, in `[0, 1]`.
    pub null_fraction: f64,
    pub min_value: Option<ScalarValue>,
    pub max_value: Option<ScalarValue>,
}

impl ColumnStatistics {
    pub fn new(distinct_count: f64, null_fraction: f64) -> Self {
        Self {
            distinct_count,
            null_fraction,
            min_value: None,
            max_value: None,
        }
    }
}

/// Fraction of input rows expected to satisfy `condition`.
pub fn estimate_selectivity(condition: &Expr, stats: &Statistics) -> f64 {
    match condition {
        Expr::Literal(ScalarValue::Bool(true)) => 1.0,
        Expr::Literal(ScalarValue::Bool(false)) => 0.0,
        Expr::And(conjuncts) => conjuncts
            .iter()
            .map(|c| estimate_selectivity(c, stats))
            .product(),
        Expr::Or(disjuncts) => {
            let miss: f64 = disjuncts
                .iter()
                .map(|d| 1.0 - estimate_selectivity(d, stats))
                .product();
            1.0 - miss
        }
        Expr::BinaryOp {
            op: BinaryOp::Eq,
            left,
            right,
        } => {
            let ndv = [left.as_input_ref(), right.as_input_ref()]
                .into_iter()
                .flatten()
                .filter_map(|i| stats.distinct_count(i))
                .fold(None, |acc: Option<f64>, n| Some(acc.map_or(n, |a| a.max(n))));
            ndv.map_or(EQUALITY_SELECTIVITY, |n| 1.0 / n.max(1.0))
        }
        Expr::BinaryOp { op, .. } if op.is_comparison() => COMPARISON_SELECTIVITY,
        Expr::UnaryOp {
            op: UnaryOp::IsNotNull,
            operand,
        } => operand
            .as_input_ref()
            .and_then(|i| stats.column_stats.get(&i))
            .map_or(NOT_NULL_SELECTIVITY, |c| 1.0 - c.null_fraction),
        _ => DEFAULT_FILTER_SELECTIVITY,
    }
}

/// Derive statistics for filter output.
///
/// Column NDVs are scaled by the same ratio as the rows and clamped to
/// `[1, rows]`.
pub fn derive_filter_stats(input: &Statistics, selectivity: f64) -> Statistics {
    let row_count = (input.row_count * selectivity).max(1.0);
    let ratio = if input.row_count > 0.0 {
        row_count / input.row_count
    } else {
        1.0
    };
    let column_stats = input
        .column_stats
        .iter()
        .map(|(&i, cs)| {
            let mut cs = cs.clone();
            cs.distinct_count = (cs.distinct_count * ratio).max(1.0).min(row_count);
            (i, cs)
        })
        .collect();
    Statistics {
        row_count,
        column_stats,
    }
}

/// Derive statistics for join output. `left_fields` is the width of the left
/// input, used to address right-side column statistics.
pub fn derive_join_stats(
    left: &Statistics,
    right: &Statistics,
    left_fields: usize,
    join_type: JoinType,
    condition: &Expr,
) -> Statistics {
    let mut combined = left.clone();
    for (&i, cs) in &right.column_stats {
        combined.column_stats.insert(i + left_fields, cs.clone());
    }
    let selectivity = estimate_selectivity(condition, &combined);
    let inner = left.row_count * right.row_count * selectivity;
    let row_count = match join_type {
        JoinType::Inner => inner,
        JoinType::Left => inner.max(left.row_count),
        JoinType::Right => inner.max(right.row_count),
        JoinType::Full => inner.max(left.row_count + right.row_count),
        JoinType::Semi => left.row_count * (selectivity * right.row_count).min(1.0),
        JoinType::Anti => left.row_count * (1.0 - (selectivity * right.row_count).min(1.0)),
    }
    .max(1.0);

    let mut column_stats = HashMap::new();
    let projected = if join_type.projects_right() {
        &combined
    } else {
        left
    };
    for (&i, cs) in &projected.column_stats {
        let mut cs = cs.clone();
        cs.distinct_count = cs.distinct_count.min(row_count);
        column_stats.insert(i, cs);
    }
    Statistics {
        row_count,
        column_stats,
    }
}

/// Derive statistics for aggregate output.
pub fn derive_aggregate_stats(input: &Statistics, group_set: &[usize]) -> Statistics {
    if group_set.is_empty() {
        return Statistics::new(1.0);
    }
    let ndvs: Option<Vec<f64>> = group_set.iter().map(|&g| input.distinct_count(g)).collect();
    let row_count = match ndvs {
        Some(ndvs) => ndvs.iter().product::<f64>().min(input.row_count),
        None => input.row_count * (1.0 - 0.5f64.powi(group_set.len() as i32)),
    }
    .max(1.0);
    let column_stats = group_set
        .iter()
        .enumerate()
        .filter_map(|(out, g)| input.column_stats.get(g).map(|cs| (out, cs.clone())))
        .collect();
    Statistics {
        row_count,
        column_stats,
    }
}

/// Derive statistics for project output: plain column references keep their
/// column statistics.
pub fn derive_project_stats(input: &Statistics, exprs: &[Expr]) -> Statistics {
    let column_stats = exprs
        .iter()
        .enumerate()
        .filter_map(|(out, e)| {
            let cs = input.column_stats.get(&e.as_input_ref()?)?;
            Some((out, cs.clone()))
        })
        .collect();
    Statistics {
        row_count: input.row_count,
        column_stats,
    }
}

/// Statistics for any non-scan logical operator. `input_widths[i]` is the field
/// count of input `i`.
pub fn derive_stats(op: &LogicalOp, inputs: &[&Statistics], input_widths: &[usize]) -> Statistics {
    let first = inputs.first().map_or(1.0, |s| s.row_count);
    match op {
        LogicalOp::Scan { .. } => Statistics::new(first),
        LogicalOp::Filter { condition } => match inputs.first() {
            Some(input) => derive_filter_stats(input, estimate_selectivity(condition, input)),
            None => Statistics::new(1.0),
        },
        LogicalOp::Project { exprs, .. } => match inputs.first() {
            Some(input) => derive_project_stats(input, exprs),
            None => Statistics::new(1.0),
        },
        LogicalOp::Join {
            join_type,
            condition,
        } => match inputs {
            [left, right] => derive_join_stats(
                left,
                right,
                input_widths.first().copied().unwrap_or(0),
                *join_type,
                condition,
            ),
            _ => Statistics::new(1.0),
        },
        LogicalOp::Aggregate { group_set, .. } => match inputs.first() {
            Some(input) => derive_aggregate_stats(input, group_set),
            None => Statistics::new(1.0),
        },
        LogicalOp::Sort { offset, fetch, .. } => {
            let mut rows = first - offset.unwrap_or(0) as f64;
            if let Some(fetch) = fetch {
                rows = rows.min(*fetch as f64);
            }
            let mut stats = inputs.first().map_or_else(|| Statistics::new(1.0), |s| (*s).clone());
            stats.row_count = rows.max(1.0);
            stats
        }
        LogicalOp::Union { .. } => {
            Statistics::new(inputs.iter().map(|s| s.row_count).sum::<f64>().max(1.0))
        }
        LogicalOp::Intersect { .. } => Statistics::new(
            inputs
                .iter()
                .map(|s| s.row_count)
                .fold(f64::INFINITY, f64::min)
                .max(1.0),
        ),
        LogicalOp::Minus { .. } => Statistics::new(first.max(1.0)),
        LogicalOp::Correlate { join_type, .. } => {
            let right = inputs.get(1).map_or(1.0, |s| s.row_count);
            let rows = match join_type {
                JoinType::Semi | JoinType::Anti => first * 0.5,
                _ => first * right,
            };
            Statistics::new(rows.max(1.0))
        }
        LogicalOp::Collect { .. } => Statistics::new(1.0),
        LogicalOp::Window { .. } => match inputs.first() {
            Some(input) => (*input).clone(),
            None => Statistics::new(1.0),
        },
    }
}
