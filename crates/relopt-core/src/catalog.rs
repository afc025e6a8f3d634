//! # Catalog Interface
//!
//! The catalog supplies table metadata to the planner: row types, handles and
//! statistics for base tables, and the star tables (precomputed multi-way joins)
//! declared in each schema.
//!
//! The `Catalog` trait sits behind a trait object (`dyn Catalog`) so different
//! backends can provide metadata. [`InMemoryCatalog`] is a HashMap-backed
//! implementation that is populated programmatically, for tests and embedding.

use crate::operator::TableRef;
use crate::rel::RelNode;
use crate::stats::Statistics;
use crate::types::RowType;
use std::collections::HashMap;

/// Opaque handle to a resolved physical table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableHandle {
    pub table: TableRef,
    pub id: u64,
}

/// Everything the planner needs about a table.
#[derive(Debug, Clone)]
pub struct ResolvedTable {
    pub handle: TableHandle,
    pub row_type: RowType,
    /// `None` when the table has never been analyzed.
    pub statistics: Option<Statistics>,
}

/// A table holding the result of a multi-way join, described by the join tree
/// that defines its contents. The tree's output columns are the table's columns.
#[derive(Debug, Clone)]
pub struct StarTable {
    pub table: TableRef,
    pub definition: RelNode,
}

/// Catalog provides schema and statistics information.
pub trait Catalog: Send + Sync {
    /// Looks up a table by qualified name.
    fn resolve(&self, table: &TableRef) -> Option<ResolvedTable>;

    /// Star tables declared in `schema`.
    fn star_tables(&self, _schema: &str) -> Vec<StarTable> {
        vec![]
    }
}

/// In-memory catalog for testing and development.
///
/// Tables are keyed by their fully-qualified name (`schema.table`).
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    tables: HashMap<String, ResolvedTable>,
    star_tables: HashMap<String, Vec<StarTable>>,
    next_id: u64,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_table(&mut self, table: &TableRef, row_type: RowType, statistics: Option<Statistics>) {
        self.next_id += 1;
        self.tables.insert(
            table.to_string(),
            ResolvedTable {
                handle: TableHandle {
                    table: table.clone(),
                    id: self.next_id,
                },
                row_type,
                statistics,
            },
        );
    }

    /// Removes a table, as a DROP TABLE would.
    pub fn drop_table(&mut self, table: &TableRef) -> bool {
        self.tables.remove(&table.to_string()).is_some()
    }

    /// Registers `table` as a star table whose contents are `definition`. The
    /// table itself must also be added with [`InMemoryCatalog::add_table`] to be
    /// resolvable.
    pub fn add_star_table(&mut self, table: &TableRef, definition: RelNode) {
        self.star_tables
            .entry(table.schema.clone())
            .or_default()
            .push(StarTable {
                table: table.clone(),
                definition,
            });
    }

    /// Scan node for a registered table.
    pub fn scan(&self, table: &TableRef) -> Option<RelNode> {
        let resolved = self.tables.get(&table.to_string())?;
        Some(RelNode::scan(table.clone(), resolved.row_type.clone()))
    }
}

impl Catalog for InMemoryCatalog {
    fn resolve(&self, table: &TableRef) -> Option<ResolvedTable> {
        self.tables.get(&table.to_string()).cloned()
    }

    fn star_tables(&self, schema: &str) -> Vec<StarTable> {
        self.star_tables.get(schema).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DataType, Field};

    #[test]
    fn test_resolve_and_drop() {
        let mut catalog = InMemoryCatalog::new();
        let emps = TableRef::new("hr", "emps");
        let rt = RowType::new(vec![Field::new("empid", DataType::Int64, false)]);
        catalog.add_table(&emps, rt.clone(), Some(Statistics::new(14.0)));

        let resolved = catalog.resolve(&emps).unwrap();
        assert_eq!(resolved.row_type, rt);
        assert_eq!(resolved.handle.table, emps);
        assert_eq!(resolved.statistics.unwrap().row_count, 14.0);
        assert!(catalog.scan(&emps).is_some());

        assert!(catalog.drop_table(&emps));
        assert!(catalog.resolve(&emps).is_none());
        assert!(catalog.star_tables("hr").is_empty());
    }
}
