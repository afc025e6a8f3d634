//! # Leaf-Join Normal Form
//!
//! A maximal subtree of scans, filters, projects and inner joins is flattened
//! into one multi-way join: the list of leaves (scans, or any subtree that is
//! not one of those four operators), the join conditions relating two or more
//! leaves, the residual filters over at most one leaf, and the output
//! projection. All expressions are written over the concatenation of the
//! leaves' columns.
//!
//! Two trees that differ only in join order and filter placement flatten to
//! forms that compare equal up to the order of the leaves, which is what view
//! and star-table matching need.
//!
//! ## Rewriting over a covering table
//!
//! [`LeafJoin::rewrite_using`] replaces some of the leaves by a table whose
//! contents are another leaf-join form (a materialized view or a star table):
//!
//! 1. every leaf of the covering form is matched to a distinct, equal leaf of
//!    this form, in order;
//! 2. every condition of the covering form must be a condition of this form;
//!    those conditions are satisfied by the table and dropped;
//! 3. the remaining conditions and the projection are rewritten over the
//!    table's columns, which requires every referenced column of a covered
//!    leaf to be exposed by the table.

use relopt_core::expr::Expr;
use relopt_core::operator::{JoinType, LogicalOp};
use relopt_core::rel::RelNode;

#[derive(Debug, Clone, PartialEq)]
pub struct LeafJoin {
    pub leaves: Vec<RelNode>,
    /// Column count of each leaf.
    pub widths: Vec<usize>,
    pub join_conditions: Vec<Expr>,
    pub filters: Vec<Expr>,
    pub projection: Vec<Expr>,
    pub names: Vec<String>,
}

impl LeafJoin {
    /// Flattens `node`. `None` if a row type in the tree cannot be derived.
    pub fn from_rel(node: &RelNode) -> Option<Self> {
        match &node.op {
            LogicalOp::Filter { condition } => {
                let mut form = Self::from_rel(node.inputs.first()?)?;
                let condition = form.inline(condition);
                form.add_conditions(&condition);
                Some(form)
            }
            LogicalOp::Project { exprs, names } if !exprs.iter().any(Expr::contains_over) => {
                let mut form = Self::from_rel(node.inputs.first()?)?;
                form.projection = exprs.iter().map(|e| form.inline(e)).collect();
                form.names = names.clone();
                Some(form)
            }
            LogicalOp::Join {
                join_type: JoinType::Inner,
                condition,
            } => {
                let left = Self::from_rel(node.inputs.first()?)?;
                let right = Self::from_rel(node.inputs.get(1)?)?;
                let offset = left.width() as isize;
                let shifted = |exprs: Vec<Expr>| exprs.iter().map(|e| e.shift(offset)).collect::<Vec<_>>();

                let mut form = LeafJoin {
                    leaves: [left.leaves, right.leaves].concat(),
                    widths: [left.widths, right.widths].concat(),
                    join_conditions: [left.join_conditions, shifted(right.join_conditions)].concat(),
                    filters: [left.filters, shifted(right.filters)].concat(),
                    projection: [left.projection, shifted(right.projection)].concat(),
                    names: [left.names, right.names].concat(),
                };
                let condition = form.inline(condition);
                form.add_conditions(&condition);
                Some(form)
            }
            _ => Self::leaf(node),
        }
    }

    fn leaf(node: &RelNode) -> Option<Self> {
        let row_type = node.row_type()?;
        let width = row_type.field_count();
        Some(LeafJoin {
            leaves: vec![node.clone()],
            widths: vec![width],
            join_conditions: vec![],
            filters: vec![],
            projection: (0..width).map(Expr::col).collect(),
            names: row_type.field_names(),
        })
    }

    /// Total number of leaf columns.
    pub fn width(&self) -> usize {
        self.widths.iter().sum()
    }

    /// Position of the first column of leaf `leaf`.
    pub fn offset(&self, leaf: usize) -> usize {
        self.widths[..leaf].iter().sum()
    }

    /// Leaf owning leaf column `column`.
    pub fn leaf_of(&self, column: usize) -> Option<usize> {
        let mut start = 0;
        for (leaf, width) in self.widths.iter().enumerate() {
            if column < start + width {
                return Some(leaf);
            }
            start += width;
        }
        None
    }

    /// Conjuncts of all join conditions and filters.
    pub fn conditions(&self) -> impl Iterator<Item = &Expr> {
        self.join_conditions.iter().chain(&self.filters)
    }

    /// Rewrites an expression over the current output into one over the leaf
    /// columns.
    fn inline(&self, expr: &Expr) -> Expr {
        expr.substitute_refs(&|i| self.projection.get(i).cloned().unwrap_or(Expr::col(i)))
    }

    fn add_conditions(&mut self, condition: &Expr) {
        for conjunct in condition.conjuncts() {
            let conjunct = normalize(conjunct);
            if self.conditions().any(|c| *c == conjunct) {
                continue;
            }
            let mut leaves: Vec<usize> = conjunct.input_refs().iter().filter_map(|c| self.leaf_of(c)).collect();
            leaves.dedup();
            if leaves.len() > 1 {
                self.join_conditions.push(conjunct);
            } else {
                self.filters.push(conjunct);
            }
        }
    }

    /// Rebuilds a logical tree: a left-deep cross join of the leaves, one
    /// filter with every condition, and the projection. The join rules push
    /// the conditions back into place during planning.
    pub fn to_rel(&self) -> Option<RelNode> {
        let mut leaves = self.leaves.iter().cloned();
        let first = leaves.next()?;
        let joined = leaves.fold(first, |acc, leaf| {
            acc.join(leaf, JoinType::Inner, Expr::boolean(true))
        });
        let conditions: Vec<Expr> = self.conditions().cloned().collect();
        let filtered = if conditions.is_empty() {
            joined
        } else {
            joined.filter(Expr::and_all(conditions))
        };
        let names: Vec<&str> = self.names.iter().map(String::as_str).collect();
        Some(filtered.project_named(self.projection.clone(), &names))
    }

    /// Replaces the leaves that `covering` describes by `table`, whose columns
    /// are the outputs of `covering`. `None` when the covering form does not
    /// fit this one.
    pub fn rewrite_using(&self, covering: &LeafJoin, table: RelNode) -> Option<LeafJoin> {
        if table.row_type()?.field_count() != covering.projection.len() {
            return None;
        }

        let mut covered = vec![false; self.leaves.len()];
        let mut leaf_map = Vec::with_capacity(covering.leaves.len());
        for leaf in &covering.leaves {
            let target = (0..self.leaves.len()).find(|&i| !covered[i] && self.leaves[i] == *leaf)?;
            covered[target] = true;
            leaf_map.push(target);
        }
        let to_query = |c: usize| {
            let leaf = covering.leaf_of(c)?;
            Some(self.offset(leaf_map[leaf]) + c - covering.offset(leaf))
        };

        let mut residual: Vec<Expr> = self.conditions().cloned().collect();
        for condition in covering.conditions() {
            let mapped = normalize(&condition.map_columns(&to_query)?);
            let position = residual.iter().position(|c| *c == mapped)?;
            residual.remove(position);
        }

        let exposed: Vec<Option<Expr>> = covering
            .projection
            .iter()
            .map(|e| e.map_columns(&to_query))
            .collect();

        let table_width = exposed.len();
        let mut new_offsets = vec![0; self.leaves.len()];
        let mut next = table_width;
        for (leaf, width) in self.widths.iter().enumerate() {
            if !covered[leaf] {
                new_offsets[leaf] = next;
                next += width;
            }
        }

        let rewrite = |expr: &Expr| -> Option<Expr> {
            let mut complete = true;
            let rewritten = expr.transform(&mut |sub| {
                if let Some(k) = exposed.iter().position(|e| e.as_ref() == Some(sub)) {
                    return Some(Expr::col(k));
                }
                let Expr::InputRef(c) = sub else {
                    return None;
                };
                match self.leaf_of(*c) {
                    Some(leaf) if !covered[leaf] => Some(Expr::col(new_offsets[leaf] + c - self.offset(leaf))),
                    _ => {
                        complete = false;
                        Some(sub.clone())
                    }
                }
            });
            complete.then_some(rewritten)
        };

        let mut leaves = vec![table];
        let mut widths = vec![table_width];
        for (leaf, node) in self.leaves.iter().enumerate() {
            if !covered[leaf] {
                leaves.push(node.clone());
                widths.push(self.widths[leaf]);
            }
        }
        let mut form = LeafJoin {
            leaves,
            widths,
            join_conditions: vec![],
            filters: vec![],
            projection: self.projection.iter().map(&rewrite).collect::<Option<_>>()?,
            names: self.names.clone(),
        };
        let residual = residual.iter().map(&rewrite).collect::<Option<Vec<_>>>()?;
        form.add_conditions(&Expr::and_all(residual));
        Some(form)
    }
}

/// Writes a column equality with the lower position first.
fn normalize(expr: &Expr) -> Expr {
    match expr.as_ref_equality() {
        Some((a, b)) if a > b => Expr::eq(Expr::col(b), Expr::col(a)),
        _ => expr.clone(),
    }
}

/// Applies `rewrite` to the leaf-join form of `node`, or failing that, to the
/// forms of its inputs, left to right. Returns `node` with the first rewritten
/// subtree replaced.
pub fn rewrite_subtrees(node: &RelNode, rewrite: &dyn Fn(&LeafJoin) -> Option<RelNode>) -> Option<RelNode> {
    if let Some(rewritten) = LeafJoin::from_rel(node).as_ref().and_then(rewrite) {
        return Some(rewritten);
    }
    for (i, input) in node.inputs.iter().enumerate() {
        if let Some(rewritten) = rewrite_subtrees(input, rewrite) {
            let mut inputs = node.inputs.clone();
            inputs[i] = rewritten;
            return Some(RelNode::new(node.op.clone(), inputs));
        }
    }
    None
}
