//! # Materialized-View Substitution
//!
//! Rewrites a query to read a materialized view instead of the tables the view
//! was computed from. Both the query and the view's defining query are brought
//! to leaf-join normal form; the view is usable when its tables appear in the
//! query, every view condition is also a query condition, and the view exposes
//! every column the rest of the query needs. Query conditions the view does
//! not apply are kept as a residual filter over the view.
//!
//! [`MaterializedViewSubstitution`] plugs this into the planner. It offers, for
//! the query root:
//! - one rewrite per valid materialization that matches, and
//! - the rewrite over the first star table that matches, if any.
//!
//! A view that fails to match the query as written is retried in star form:
//! its definition rewritten over a star table against the query rewritten
//! over the same star.
//!
//! Every rewrite is registered in the root's set and competes on cost with
//! the original tree. A materialization whose table has been dropped is
//! invalidated on the spot and the query keeps its unsubstituted plan.

use crate::leaf_join::{rewrite_subtrees, LeafJoin};
use crate::registry::{MaterializationRegistry, ValidMaterialization};
use crate::star::first_star_match;
use relopt_core::catalog::Catalog;
use relopt_core::rel::RelNode;
use relopt_core::rule::Substitution;
use std::sync::Arc;
use tracing::debug;

/// `query` rewritten to read `view`'s table, or `None` if the view cannot
/// answer any part of it.
pub fn substitute_view(query: &RelNode, view: &ValidMaterialization) -> Option<RelNode> {
    rewrite_over(query, &view.query, &view.table_rel)
}

/// Like [`substitute_view`], for a query already rewritten over a star table:
/// matched against the view's own star form.
pub fn substitute_view_over_star(star_query: &RelNode, view: &ValidMaterialization) -> Option<RelNode> {
    rewrite_over(star_query, view.star_rel.as_ref()?, &view.table_rel)
}

fn rewrite_over(query: &RelNode, definition: &RelNode, table_rel: &RelNode) -> Option<RelNode> {
    let view_form = LeafJoin::from_rel(definition)?;
    rewrite_subtrees(query, &|form| {
        form.rewrite_using(&view_form, table_rel.clone())?.to_rel()
    })
}

pub struct MaterializedViewSubstitution {
    registry: Arc<MaterializationRegistry>,
}

impl MaterializedViewSubstitution {
    pub fn new(registry: Arc<MaterializationRegistry>) -> Self {
        Self { registry }
    }
}

impl Substitution for MaterializedViewSubstitution {
    fn name(&self) -> &str {
        "MaterializedViewSubstitution"
    }

    fn substitute(&self, root: &RelNode, catalog: &dyn Catalog) -> Vec<RelNode> {
        let mut schemas: Vec<&str> = root.tables().iter().map(|t| t.schema.as_str()).collect();
        schemas.sort_unstable();
        schemas.dedup();
        let star_query = schemas.into_iter().find_map(|schema| {
            let stars = catalog.star_tables(schema);
            first_star_match(root, &stars).map(|(rewritten, index)| {
                debug!("Query rewritten over star table {}", stars[index].table);
                rewritten
            })
        });

        let mut rewrites = Vec::new();
        for materialization in self.registry.valid_materializations() {
            if self.registry.check_valid(materialization.key, catalog).is_none() {
                debug!(
                    "Skipping materialization {}: table {} is gone",
                    materialization.key, materialization.table
                );
                continue;
            }
            let Some(valid) = materialization.valid() else {
                continue;
            };
            let rewritten = substitute_view(root, valid).or_else(|| {
                star_query
                    .as_ref()
                    .and_then(|star_query| substitute_view_over_star(star_query, valid))
            });
            if let Some(rewritten) = rewritten {
                debug!("Query rewritten over materialization {}", materialization.key);
                rewrites.push(rewritten);
            }
        }
        rewrites.extend(star_query);
        rewrites
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::star::try_use_star;
    use relopt_core::catalog::{InMemoryCatalog, StarTable, TableHandle};
    use relopt_core::expr::{BinaryOp, Expr};
    use relopt_core::operator::{JoinType, TableRef};
    use relopt_core::types::{DataType, Field, RowType};

    /// emps(empid, deptno, name)
    fn emps() -> RelNode {
        RelNode::scan(
            TableRef::new("hr", "emps"),
            RowType::new(vec![
                Field::new("empid", DataType::Int64, false),
                Field::new("deptno", DataType::Int64, false),
                Field::new("name", DataType::Utf8, true),
            ]),
        )
    }

    fn view(query: RelNode) -> ValidMaterialization {
        let table = TableRef::new("hr", "m");
        ValidMaterialization {
            table_rel: RelNode::scan(table.clone(), query.row_type().unwrap()),
            table: TableHandle { table, id: 1 },
            query,
            star_rel: None,
        }
    }

    #[test]
    fn test_projection_over_view_columns() {
        // M = SELECT deptno, empid FROM emps
        let m = view(emps().project(vec![Expr::col(1), Expr::col(0)]));
        // SELECT empid + 1 FROM emps WHERE deptno = 10
        let query = emps()
            .filter(Expr::eq(Expr::col(1), Expr::int(10)))
            .project(vec![Expr::binary(BinaryOp::Add, Expr::col(0), Expr::int(1))]);

        let rewritten = substitute_view(&query, &m).unwrap();
        let expected = m
            .table_rel
            .clone()
            .filter(Expr::eq(Expr::col(0), Expr::int(10)))
            .project_named(
                vec![Expr::binary(BinaryOp::Add, Expr::col(1), Expr::int(1))],
                &["$f0"],
            );
        assert_eq!(rewritten, expected);
    }

    #[test]
    fn test_residual_filter_is_kept() {
        // M = SELECT * FROM emps WHERE deptno = 10
        let m = view(emps().filter(Expr::eq(Expr::col(1), Expr::int(10))));
        let query = emps().filter(Expr::and_all([
            Expr::eq(Expr::col(1), Expr::int(10)),
            Expr::lt(Expr::col(0), Expr::int(150)),
        ]));

        let rewritten = substitute_view(&query, &m).unwrap();
        let LeafJoin { filters, .. } = LeafJoin::from_rel(&rewritten).unwrap();
        assert_eq!(filters, vec![Expr::lt(Expr::col(0), Expr::int(150))]);
    }

    #[test]
    fn test_view_missing_column_is_not_used() {
        // M = SELECT empid FROM emps; the query needs name
        let m = view(emps().project(vec![Expr::col(0)]));
        let query = emps().project(vec![Expr::col(2)]);
        assert!(substitute_view(&query, &m).is_none());
    }

    #[test]
    fn test_dropped_table_falls_back() {
        let registry = Arc::new(MaterializationRegistry::new());
        let mut catalog = InMemoryCatalog::new();
        let row_type = emps().row_type().unwrap();
        catalog.add_table(&TableRef::new("hr", "emps"), row_type.clone(), None);
        catalog.add_table(&TableRef::new("hr", "m"), row_type, None);

        struct Identity;
        impl crate::registry::QueryConverter for Identity {
            fn convert(&self, _schema: &str, _sql: &str) -> Result<RelNode, String> {
                Ok(emps())
            }
        }
        let key = registry.define("hr", "select * from emps", TableRef::new("hr", "m"));
        registry.populate(key, &Identity, &catalog).unwrap();

        let substitution = MaterializedViewSubstitution::new(Arc::clone(&registry));
        assert_eq!(substitution.substitute(&emps(), &catalog).len(), 1);

        catalog.drop_table(&TableRef::new("hr", "m"));
        assert!(substitution.substitute(&emps(), &catalog).is_empty());
        assert!(registry.valid_materializations().is_empty());
    }

    #[test]
    fn test_view_matches_star_rewritten_query() {
        let keyed = |name: &str| {
            RelNode::scan(
                TableRef::new("dw", name),
                RowType::new(vec![
                    Field::new("id", DataType::Int64, false),
                    Field::new("fk", DataType::Int64, true),
                ]),
            )
        };
        let join = || keyed("sales").join(keyed("product"), JoinType::Inner, Expr::eq(Expr::col(1), Expr::col(2)));
        let star = StarTable {
            table: TableRef::new("dw", "sales_product"),
            definition: join(),
        };

        // M = SELECT sales.id, product.fk FROM sales JOIN product ON sales.fk = product.id
        let view_query = join().project(vec![Expr::col(0), Expr::col(3)]);
        let table = TableRef::new("dw", "m");
        let m = ValidMaterialization {
            table_rel: RelNode::scan(table.clone(), view_query.row_type().unwrap()),
            table: TableHandle { table, id: 7 },
            star_rel: try_use_star(&view_query, &star),
            query: view_query,
        };
        assert!(m.star_rel.is_some());

        let query = join()
            .filter(Expr::eq(Expr::col(3), Expr::int(5)))
            .project(vec![Expr::col(0)]);
        let star_query = try_use_star(&query, &star).unwrap();

        // The star scan is not one of the view's tables.
        assert!(substitute_view(&star_query, &m).is_none());
        let rewritten = substitute_view_over_star(&star_query, &m).unwrap();
        let tables: Vec<String> = rewritten.tables().iter().map(|t| t.name.clone()).collect();
        assert_eq!(tables, vec!["m"]);
        let LeafJoin { filters, .. } = LeafJoin::from_rel(&rewritten).unwrap();
        assert_eq!(filters, vec![Expr::eq(Expr::col(1), Expr::int(5))]);
    }
}
