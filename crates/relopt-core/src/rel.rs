//! Logical expression trees.
//!
//! A [`RelNode`] is the tree the SQL layer hands to the planner, and the shape in
//! which rules, predicate analysis and materialization matching see plans outside
//! the memo. Builders consume `self` so trees read bottom-up:
//!
//! ```
//! use relopt_core::expr::Expr;
//! use relopt_core::operator::TableRef;
//! use relopt_core::rel::RelNode;
//! use relopt_core::types::{DataType, Field, RowType};
//!
//! let emps = RowType::new(vec![
//!     Field::new("empid", DataType::Int64, false),
//!     Field::new("deptno", DataType::Int64, false),
//! ]);
//! let tree = RelNode::scan(TableRef::new("hr", "emps"), emps)
//!     .filter(Expr::eq(Expr::col(1), Expr::int(10)))
//!     .project(vec![Expr::col(0)]);
//! assert_eq!(tree.row_type().unwrap().field_names(), vec!["empid"]);
//! ```

use crate::expr::Expr;
use crate::operator::{AggCall, JoinType, LogicalOp, Operator, SortKey, TableRef, WindowGroup};
use crate::types::RowType;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelNode {
    pub op: LogicalOp,
    pub inputs: Vec<RelNode>,
}

impl RelNode {
    pub fn new(op: LogicalOp, inputs: Vec<RelNode>) -> Self {
        Self { op, inputs }
    }

    pub fn scan(table: TableRef, row_type: RowType) -> Self {
        Self::new(LogicalOp::Scan { table, row_type }, vec![])
    }

    pub fn filter(self, condition: Expr) -> Self {
        Self::new(LogicalOp::Filter { condition }, vec![self])
    }

    /// Project with derived names: a plain column keeps its input name, anything
    /// else is called `$f<i>`.
    pub fn project(self, exprs: Vec<Expr>) -> Self {
        let input = self.row_type().unwrap_or_default();
        let names = exprs
            .iter()
            .enumerate()
            .map(|(i, e)| {
                e.as_input_ref()
                    .and_then(|c| input.field(c))
                    .map(|f| f.name.clone())
                    .unwrap_or_else(|| format!("$f{i}"))
            })
            .collect();
        Self::new(LogicalOp::Project { exprs, names }, vec![self])
    }

    pub fn project_named(self, exprs: Vec<Expr>, names: &[&str]) -> Self {
        let names = names.iter().map(|n| n.to_string()).collect();
        Self::new(LogicalOp::Project { exprs, names }, vec![self])
    }

    pub fn join(self, right: RelNode, join_type: JoinType, condition: Expr) -> Self {
        Self::new(
            LogicalOp::Join {
                join_type,
                condition,
            },
            vec![self, right],
        )
    }

    pub fn aggregate(self, group_set: Vec<usize>, aggregates: Vec<AggCall>) -> Self {
        Self::new(
            LogicalOp::Aggregate {
                group_set,
                aggregates,
            },
            vec![self],
        )
    }

    pub fn sort(self, collation: Vec<SortKey>) -> Self {
        Self::new(
            LogicalOp::Sort {
                collation,
                offset: None,
                fetch: None,
            },
            vec![self],
        )
    }

    pub fn limit(self, offset: Option<u64>, fetch: Option<u64>) -> Self {
        Self::new(
            LogicalOp::Sort {
                collation: vec![],
                offset,
                fetch,
            },
            vec![self],
        )
    }

    pub fn union(inputs: Vec<RelNode>, all: bool) -> Self {
        Self::new(LogicalOp::Union { all }, inputs)
    }

    pub fn intersect(inputs: Vec<RelNode>, all: bool) -> Self {
        Self::new(LogicalOp::Intersect { all }, inputs)
    }

    pub fn minus(inputs: Vec<RelNode>, all: bool) -> Self {
        Self::new(LogicalOp::Minus { all }, inputs)
    }

    pub fn correlate(
        self,
        right: RelNode,
        join_type: JoinType,
        correlation_id: u32,
        required_columns: Vec<usize>,
    ) -> Self {
        Self::new(
            LogicalOp::Correlate {
                join_type,
                correlation_id,
                required_columns,
            },
            vec![self, right],
        )
    }

    pub fn collect(self, field_name: impl Into<String>) -> Self {
        Self::new(
            LogicalOp::Collect {
                field_name: field_name.into(),
            },
            vec![self],
        )
    }

    pub fn window(self, groups: Vec<WindowGroup>) -> Self {
        Self::new(LogicalOp::Window { groups }, vec![self])
    }

    /// Derived output row type; `None` if some node is malformed.
    pub fn row_type(&self) -> Option<RowType> {
        let inputs = self
            .inputs
            .iter()
            .map(RelNode::row_type)
            .collect::<Option<Vec<_>>>()?;
        let refs: Vec<&RowType> = inputs.iter().collect();
        Operator::Logical(self.op.clone()).derive_row_type(&refs)
    }

    /// Every table scanned anywhere in the tree, left to right.
    pub fn tables(&self) -> Vec<&TableRef> {
        let mut out = Vec::new();
        self.collect_tables(&mut out);
        out
    }

    fn collect_tables<'a>(&'a self, out: &mut Vec<&'a TableRef>) {
        if let LogicalOp::Scan { table, .. } = &self.op {
            out.push(table);
        }
        for input in &self.inputs {
            input.collect_tables(out);
        }
    }

    /// Indented print-tree, one operator per line.
    pub fn explain(&self) -> String {
        let mut out = String::new();
        self.explain_into(&mut out, 0);
        out
    }

    fn explain_into(&self, out: &mut String, indent: usize) {
        let op = Operator::Logical(self.op.clone());
        let _ = writeln!(
            out,
            "{}{}({})",
            "  ".repeat(indent),
            op.name(),
            format_attrs(&op.explain_attrs())
        );
        for input in &self.inputs {
            input.explain_into(out, indent + 1);
        }
    }
}

impl fmt::Display for RelNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.explain())
    }
}

pub(crate) fn format_attrs(attrs: &[(String, String)]) -> String {
    attrs
        .iter()
        .map(|(k, v)| format!("{k}=[{v}]"))
        .collect::<Vec<_>>()
        .join(", ")
}
