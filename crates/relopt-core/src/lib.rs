//! # relopt-core: Volcano-Style Query Optimizer Core
//!
//! This crate implements the core data structures and algorithms of a
//! rule-driven, cost-based relational optimizer.
//!
//! ## Module Overview
//!
//! - **`memo`**: the equivalence-class memo. Sets of equivalent expressions,
//!   per-trait subsets holding the cheapest physical alternative, and set merge.
//! - **`search`**: the planner loop (rule queue, eager costing, budget).
//! - **`rule`**: the Rule trait, rule calls and the RuleRegistry.
//! - **`pattern`**: operand patterns and binding against the memo.
//! - **`predicates`**: predicate pull-up and equality-based inference.
//! - **`operator`** / **`expr`** / **`rel`**: logical and physical operators,
//!   scalar expressions, and logical trees.
//! - **`types`** / **`mapping`**: row types, column mappings and permutations.
//! - **`cost`**: cost triple, its preorder, and the default cost model.
//! - **`stats`**: statistics and row-count derivation.
//! - **`properties`**: trait sets (convention and collation).
//! - **`catalog`**: Catalog trait for table metadata, statistics and star tables.
//! - **`testing`**: in-memory reference evaluator used as a correctness oracle.

pub mod catalog;
pub mod cost;
pub mod error;
pub mod expr;
pub mod mapping;
pub mod memo;
pub mod operator;
pub mod pattern;
pub mod predicates;
pub mod properties;
pub mod rel;
pub mod rule;
pub mod search;
pub mod stats;
pub mod testing;
pub mod types;

pub use error::{PlanError, PlanResult};
