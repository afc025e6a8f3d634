//! Star-table rewrites: routing part of a query's join graph through a table
//! that stores a precomputed multi-way join.

use crate::leaf_join::{rewrite_subtrees, LeafJoin};
use relopt_core::catalog::StarTable;
use relopt_core::operator::LogicalOp;
use relopt_core::rel::RelNode;
use tracing::trace;

/// Rewrites `tree` to scan `star` in place of the tables it joins. Succeeds
/// when the star's join graph is a subgraph of one of the query's leaf joins
/// under the same join keys and the star exposes every column the rest of the
/// query reads from those tables. Conditions the star does not cover stay as
/// residual filters.
pub fn try_use_star(tree: &RelNode, star: &StarTable) -> Option<RelNode> {
    let star_form = LeafJoin::from_rel(&star.definition)?;
    let joins_tables = star_form.leaves.len() > 1
        && star_form
            .leaves
            .iter()
            .all(|leaf| matches!(leaf.op, LogicalOp::Scan { .. }));
    if !joins_tables {
        trace!("Star table {} is not a join of tables", star.table);
        return None;
    }
    let scan = RelNode::scan(star.table.clone(), star.definition.row_type()?);

    let rewritten = rewrite_subtrees(tree, &|form| form.rewrite_using(&star_form, scan.clone())?.to_rel());
    if rewritten.is_some() {
        trace!("Star table {} matched", star.table);
    }
    rewritten
}

/// First star table in `candidates` that `tree` can use.
pub fn first_star_match(tree: &RelNode, candidates: &[StarTable]) -> Option<(RelNode, usize)> {
    candidates
        .iter()
        .enumerate()
        .find_map(|(i, star)| try_use_star(tree, star).map(|rewritten| (rewritten, i)))
}
