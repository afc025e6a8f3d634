//! # relopt-materialize: Materialized Views and Star Tables
//!
//! Lets the planner answer a query from precomputed results.
//!
//! - **`registry`**: the process-wide materialization registry and the
//!   `Defined → Valid → Invalidated` lifecycle of each view.
//! - **`leaf_join`**: the leaf-join normal form both matchers work on.
//! - **`star`**: rewriting part of a join graph over a star table.
//! - **`substitute`**: view matching, and the [`MaterializedViewSubstitution`]
//!   hook that offers both kinds of rewrite to the planner.
//!
//! ```ignore
//! let registry = Arc::new(MaterializationRegistry::new());
//! let key = registry.define("hr", "SELECT deptno, empid FROM emps", TableRef::new("hr", "m"));
//! registry.populate(key, &converter, &catalog)?;
//! planner.add_substitution(Arc::new(MaterializedViewSubstitution::new(registry)));
//! ```

pub mod leaf_join;
pub mod registry;
pub mod star;
pub mod substitute;

pub use registry::{
    Materialization, MaterializationKey, MaterializationRegistry, MaterializationState, MaterializeError,
    QueryConverter, ValidMaterialization,
};
pub use star::try_use_star;
pub use substitute::{substitute_view, substitute_view_over_star, MaterializedViewSubstitution};
