//! # Cost Model
//!
//! ## Three-Component Cost
//!
//! A [`Cost`] is an immutable `(rows, cpu, io)` triple. Comparison is dominated by
//! the row count: `a.is_le(b)` holds whenever `a.rows <= b.rows`, so two plans
//! with equal row counts are `is_le` each other. A plan only *replaces* an
//! incumbent when it is strictly lower ([`Cost::is_lt`]): fewer rows, or equal
//! rows and no worse on cpu and io while differing somewhere. Plans with equal
//! rows that trade cpu against io are incomparable, and the incumbent stays.
//!
//! ## Cost Accumulation
//!
//! Costs are additive: the cumulative cost of a plan is the operator's self cost
//! plus the cumulative costs of the winners of the input subsets it consumes.
//!
//! ## Pluggable Design
//!
//! The [`CostModel`] trait lets callers replace the default formulas, which
//! follow the classic Volcano/Calcite per-operator estimates.

use crate::operator::{BuildSide, PhysicalOp};
use crate::stats::Statistics;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cost {
    pub rows: f64,
    pub cpu: f64,
    pub io: f64,
}

impl Cost {
    pub const ZERO: Cost = Cost {
        rows: 0.0,
        cpu: 0.0,
        io: 0.0,
    };
    pub const TINY: Cost = Cost {
        rows: 1.0,
        cpu: 1.0,
        io: 0.0,
    };
    pub const HUGE: Cost = Cost {
        rows: f64::MAX,
        cpu: f64::MAX,
        io: f64::MAX,
    };
    pub const INFINITY: Cost = Cost {
        rows: f64::INFINITY,
        cpu: f64::INFINITY,
        io: f64::INFINITY,
    };

    pub fn new(rows: f64, cpu: f64, io: f64) -> Self {
        Self { rows, cpu, io }
    }

    pub fn zero() -> Self {
        Self::ZERO
    }

    pub fn tiny() -> Self {
        Self::TINY
    }

    pub fn huge() -> Self {
        Self::HUGE
    }

    pub fn infinite() -> Self {
        Self::INFINITY
    }

    pub fn is_infinite(&self) -> bool {
        *self == Self::INFINITY || self.rows.is_infinite() || self.cpu.is_infinite() || self.io.is_infinite()
    }

    pub fn is_le(&self, other: &Cost) -> bool {
        self == other || self.rows <= other.rows
    }

    /// Strictly lower: fewer rows, or equal rows and Pareto-better on (cpu, io).
    pub fn is_lt(&self, other: &Cost) -> bool {
        if self == other {
            return false;
        }
        if self.rows < other.rows {
            return true;
        }
        self.rows == other.rows && self.cpu <= other.cpu && self.io <= other.io
    }

    pub fn plus(&self, other: &Cost) -> Cost {
        if self.is_infinite() || other.is_infinite() {
            return Self::INFINITY;
        }
        Cost::new(self.rows + other.rows, self.cpu + other.cpu, self.io + other.io)
    }

    pub fn minus(&self, other: &Cost) -> Cost {
        if self.is_infinite() {
            return Self::INFINITY;
        }
        Cost::new(self.rows - other.rows, self.cpu - other.cpu, self.io - other.io)
    }

    pub fn multiply_by(&self, factor: f64) -> Cost {
        if self.is_infinite() {
            return Self::INFINITY;
        }
        Cost::new(self.rows * factor, self.cpu * factor, self.io * factor)
    }

    /// Geometric mean of the component ratios that are finite and non-zero on
    /// both sides; `1.0` when none are.
    pub fn divide_by(&self, other: &Cost) -> f64 {
        let mut product = 1.0;
        let mut n = 0;
        for (a, b) in [(self.rows, other.rows), (self.cpu, other.cpu), (self.io, other.io)] {
            if a != 0.0 && a.is_finite() && b != 0.0 && b.is_finite() {
                product *= a / b;
                n += 1;
            }
        }
        if n == 0 {
            1.0
        } else {
            product.powf(1.0 / n as f64)
        }
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Cost::INFINITY {
            write!(f, "{{inf}}")
        } else if *self == Cost::HUGE {
            write!(f, "{{huge}}")
        } else if *self == Cost::TINY {
            write!(f, "{{tiny}}")
        } else {
            write!(f, "{{{} rows, {} cpu, {} io}}", self.rows, self.cpu, self.io)
        }
    }
}

/// Trait for pluggable cost models.
pub trait CostModel: Send + Sync {
    /// Cost of `op` alone, excluding its inputs.
    fn self_cost(&self, op: &PhysicalOp, input_stats: &[&Statistics], output_stats: &Statistics) -> Cost;

    /// Self cost plus the cumulative costs of the inputs.
    fn compute_cost(
        &self,
        op: &PhysicalOp,
        input_stats: &[&Statistics],
        output_stats: &Statistics,
        children_costs: &[Cost],
    ) -> Cost {
        children_costs
            .iter()
            .fold(self.self_cost(op, input_stats, output_stats), |acc, c| acc.plus(c))
    }
}

/// `n * ln(n)`, or `n` when `n <= 1`.
pub fn n_log_n(n: f64) -> f64 {
    if n > 1.0 {
        n * n.ln()
    } else {
        n
    }
}

/// Per-operator formulas in the Volcano tradition.
///
/// Every self cost reports at least one row, so an expression can never win a
/// subset by consuming its own set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultCostModel {
    /// Extra row-cost fraction per aggregate call.
    pub agg_call_factor: f64,
    /// IO charged per field per scanned row; narrower tables are cheaper to read.
    pub io_per_field: f64,
}

impl Default for DefaultCostModel {
    fn default() -> Self {
        Self {
            agg_call_factor: 0.125,
            io_per_field: 1.0,
        }
    }
}

impl CostModel for DefaultCostModel {
    fn self_cost(&self, op: &PhysicalOp, input_stats: &[&Statistics], output_stats: &Statistics) -> Cost {
        let out = output_stats.row_count;
        let input = |i: usize| input_stats.get(i).map_or(1.0, |s| s.row_count);
        let inputs_total: f64 = input_stats.iter().map(|s| s.row_count).sum();

        let cost = match op {
            PhysicalOp::SeqScan { row_type, .. } => Cost::new(
                out,
                out + 1.0,
                out * row_type.field_count() as f64 * self.io_per_field,
            ),
            PhysicalOp::Filter { .. } => Cost::new(out, input(0), 0.0),
            PhysicalOp::Project { exprs, .. } => Cost::new(out, out * exprs.len() as f64, 0.0),
            // The build side pays for the hash table; the probe side streams.
            PhysicalOp::HashJoin { build_side, .. } => {
                let (build, probe) = match build_side {
                    BuildSide::Left => (input(0), input(1)),
                    BuildSide::Right => (input(1), input(0)),
                };
                Cost::new(out + n_log_n(build) + probe, build + probe, 0.0)
            }
            PhysicalOp::MergeJoin { .. } => Cost::new(out + input(0) + input(1), inputs_total, 0.0),
            PhysicalOp::NestedLoopJoin { .. } | PhysicalOp::Correlate { .. } => {
                Cost::new(out + input(0) * input(1), input(0) * input(1), 0.0)
            }
            PhysicalOp::HashAggregate { aggregates, .. }
            | PhysicalOp::StreamAggregate { aggregates, .. } => Cost::new(
                out * (1.0 + self.agg_call_factor * aggregates.len() as f64),
                input(0),
                0.0,
            ),
            PhysicalOp::SortOp { collation, .. } => {
                let keys = collation.len().max(1) as f64;
                Cost::new(out, n_log_n(input(0)) * keys, 0.0)
            }
            PhysicalOp::Union { .. } => Cost::new(inputs_total, 0.0, 0.0),
            PhysicalOp::Intersect { .. } | PhysicalOp::Minus { .. } => {
                Cost::new(inputs_total, inputs_total, 0.0)
            }
            PhysicalOp::Collect { .. } => Cost::new(1.0, input(0), 0.0),
            PhysicalOp::Window { groups } => {
                let calls: usize = groups.iter().map(|g| g.calls.len()).sum();
                Cost::new(input(0), input(0) * calls.max(1) as f64, 0.0)
            }
        };
        Cost {
            rows: cost.rows.max(1.0),
            ..cost
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;
    use crate::operator::{JoinType, TableRef};
    use crate::types::{DataType, Field, RowType};

    #[test]
    fn test_sentinel_display() {
        assert_eq!(Cost::infinite().to_string(), "{inf}");
        assert_eq!(Cost::huge().to_string(), "{huge}");
        assert_eq!(Cost::tiny().to_string(), "{tiny}");
        assert_eq!(Cost::new(10.0, 2.5, 0.0).to_string(), "{10 rows, 2.5 cpu, 0 io}");
    }

    #[test]
    fn test_row_count_dominates_comparison() {
        let a = Cost::new(10.0, 100.0, 100.0);
        let b = Cost::new(20.0, 1.0, 1.0);
        assert!(a.is_le(&b) && !b.is_le(&a));
        assert!(a.is_lt(&b));

        // Equal rows: both directions are is_le, neither is strictly lower
        // unless one dominates on cpu and io.
        let c = Cost::new(10.0, 5.0, 50.0);
        let d = Cost::new(10.0, 6.0, 40.0);
        assert!(c.is_le(&d) && d.is_le(&c));
        assert!(!c.is_lt(&d) && !d.is_lt(&c));
        let e = Cost::new(10.0, 5.0, 40.0);
        assert!(e.is_lt(&c) && e.is_lt(&d));
        assert!(!e.is_lt(&e));
    }

    #[test]
    fn test_infinity_absorbs_arithmetic() {
        let x = Cost::new(1.0, 2.0, 3.0);
        assert_eq!(x.plus(&Cost::infinite()), Cost::INFINITY);
        assert_eq!(Cost::infinite().minus(&x), Cost::INFINITY);
        assert_eq!(Cost::infinite().multiply_by(0.5), Cost::INFINITY);
        assert!(x.is_lt(&Cost::infinite()));
        assert!(Cost::infinite().is_le(&Cost::infinite()));
        assert_eq!(x.plus(&x).minus(&x), x);
        assert!((x.multiply_by(4.0).divide_by(&x) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_narrow_scan_is_cheaper() {
        let model = DefaultCostModel::default();
        let stats = Statistics::new(100.0);
        let scan = |fields: usize| PhysicalOp::SeqScan {
            table: TableRef::new("s", "t"),
            row_type: RowType::new(
                (0..fields)
                    .map(|i| Field::new(format!("c{i}"), DataType::Int64, false))
                    .collect(),
            ),
        };
        let wide = model.self_cost(&scan(5), &[], &stats);
        let narrow = model.self_cost(&scan(2), &[], &stats);
        assert!(narrow.is_lt(&wide));
    }

    #[test]
    fn test_hash_join_prefers_smaller_build_side() {
        let model = DefaultCostModel::default();
        let small = Statistics::new(10.0);
        let large = Statistics::new(10_000.0);
        let out = Statistics::new(10_000.0);
        let join = |build_side| PhysicalOp::HashJoin {
            join_type: JoinType::Inner,
            condition: Expr::eq(Expr::col(0), Expr::col(1)),
            build_side,
        };
        let build_small = model.self_cost(&join(BuildSide::Left), &[&small, &large], &out);
        let build_large = model.self_cost(&join(BuildSide::Right), &[&small, &large], &out);
        assert!(build_small.is_lt(&build_large));
        let total = model.compute_cost(
            &join(BuildSide::Left),
            &[&small, &large],
            &out,
            &[Cost::new(10.0, 11.0, 10.0), Cost::new(10_000.0, 10_001.0, 10_000.0)],
        );
        assert!((total.rows - (build_small.rows + 10_010.0)).abs() < 1e-6);
    }
}
