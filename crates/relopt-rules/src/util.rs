//! Helpers shared by the join rules.

use relopt_core::expr::Expr;
use relopt_core::mapping::Mapping;
use relopt_core::operator::{LogicalOp, Operator};
use relopt_core::types::RowType;

/// `$i = $j` conjuncts with one column on each side of a join whose left
/// input has `n_left` columns.
fn cross_equalities(condition: &Expr, n_left: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
    condition.conjuncts().into_iter().filter_map(move |c| {
        let (a, b) = c.as_ref_equality()?;
        match (a < n_left, b < n_left) {
            (true, false) => Some((a, b - n_left)),
            (false, true) => Some((b, a - n_left)),
            _ => None,
        }
    })
}

/// Whether the condition holds at least one equi-join conjunct (col = col
/// across the two inputs).
pub fn has_equi_predicate(condition: &Expr, n_left: usize) -> bool {
    cross_equalities(condition, n_left).next().is_some()
}

/// Left and right key columns of the equi-join conjuncts; right keys are
/// relative to the right input.
pub fn equi_keys(condition: &Expr, n_left: usize) -> (Vec<usize>, Vec<usize>) {
    cross_equalities(condition, n_left).unzip()
}

/// A project that reads the permuted row through `mapping` and restores the
/// original column order and names.
pub fn restoring_project(mapping: &Mapping, row_type: &RowType) -> Option<Operator> {
    let exprs = (0..mapping.source_count())
        .map(|i| mapping.target(i).map(Expr::col))
        .collect::<Option<Vec<_>>>()?;
    Some(Operator::Logical(LogicalOp::Project {
        exprs,
        names: row_type.field_names(),
    }))
}
