//! # Rule System
//!
//! This module defines the rule trait and rule registry that drive the planner.
//!
//! ## Rule Types
//!
//! - **Transformation rules** (`RuleType::Transformation`): rewrite logical
//!   operators into equivalent logical operators, e.g. pushing a filter below a
//!   join. They expand the search space.
//!
//! - **Implementation rules** (`RuleType::Implementation`): map a logical
//!   operator to a physical one, e.g. a logical join to a hash join. These
//!   produce the candidates that get costed.
//!
//! ## Firing
//!
//! A rule is attempted only when a change to the memo creates a new binding of
//! its [`Pattern`]. [`Rule::on_match`] receives a [`RuleCall`] with the bound
//! expressions in pattern order and reports alternatives through
//! [`RuleCall::transform_to`]. Matched expressions are shared and immutable; a
//! rule whose precondition fails after matching simply reports nothing.
//!
//! ## Rule Registry
//!
//! The `RuleRegistry` collects all rules and can include connector-specific
//! rule sets, keyed by `source_type`, that only fire for their data source.

use crate::catalog::Catalog;
use crate::memo::{ExprId, Memo, MemoExpr, SetId};
use crate::operator::Operator;
use crate::pattern::Pattern;
use crate::predicates::MetadataQuery;
use crate::rel::RelNode;
use crate::types::RowType;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// Classification of optimization rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleType {
    /// Logical → Logical transformation (e.g., join commutativity).
    Transformation,
    /// Logical → Physical implementation (e.g., join → hash join).
    Implementation,
}

/// Context passed to rules during application.
pub struct OptContext<'a> {
    pub catalog: &'a dyn Catalog,
    pub metadata: MetadataQuery<'a>,
}

/// A child reference in a rule result: an existing set or a new sub-expression.
///
/// Reassociating `(A ⋈ B) ⋈ C` into `(A ⋈ C) ⋈ B` needs a set for `A ⋈ C`,
/// which the rule expresses as `RuleChild::NewExpr(Join, [Set(A), Set(C)])`.
/// The planner registers new expressions bottom-up; de-duplication reuses an
/// existing set when the expression is already known.
#[derive(Debug, Clone)]
pub enum RuleChild {
    Set(SetId),
    NewExpr(Operator, Vec<RuleChild>),
}

impl RuleChild {
    pub fn expr(op: Operator, children: Vec<RuleChild>) -> Self {
        RuleChild::NewExpr(op, children)
    }
}

/// An alternative for the matched root expression's set.
#[derive(Debug, Clone)]
pub enum RuleResult {
    /// A new expression over existing input sets.
    Substitution(Operator, Vec<SetId>),
    /// A new expression some of whose inputs are themselves new.
    NewChildren(Operator, Vec<RuleChild>),
    /// The matched root's set is equivalent to an existing set; the two are
    /// merged.
    Equivalent(SetId),
}

/// The bound expressions of one rule match plus the alternatives the rule
/// reports for them.
pub struct RuleCall<'a> {
    pub memo: &'a Memo,
    pub ctx: &'a OptContext<'a>,
    bindings: &'a [ExprId],
    results: Vec<RuleResult>,
}

impl<'a> RuleCall<'a> {
    pub fn new(memo: &'a Memo, ctx: &'a OptContext<'a>, bindings: &'a [ExprId]) -> Self {
        Self {
            memo,
            ctx,
            bindings,
            results: Vec::new(),
        }
    }

    /// The expression bound at pattern position `i` (pre-order, root is 0).
    pub fn rel(&self, i: usize) -> &'a MemoExpr {
        self.memo.expr(self.bindings[i])
    }

    pub fn bindings(&self) -> &[ExprId] {
        self.bindings
    }

    /// Canonical input sets of the expression bound at position `i`.
    pub fn inputs(&self, i: usize) -> Vec<SetId> {
        self.memo.children(self.bindings[i])
    }

    /// Set of the expression bound at position `i`.
    pub fn set_of(&self, i: usize) -> SetId {
        self.memo.set_of(self.bindings[i])
    }

    pub fn row_type(&self, set: SetId) -> &'a RowType {
        &self.memo.set(set).row_type
    }

    pub fn transform_to(&mut self, result: RuleResult) {
        self.results.push(result);
    }

    pub fn results(&self) -> &[RuleResult] {
        &self.results
    }

    pub fn into_results(self) -> Vec<RuleResult> {
        self.results
    }
}

/// A rule transforms or implements expressions.
pub trait Rule: Send + Sync {
    /// Unique name of this rule.
    fn name(&self) -> &str;

    /// Whether this rule is a transformation or implementation rule.
    fn rule_type(&self) -> RuleType;

    /// Pattern that this rule matches against.
    fn pattern(&self) -> Pattern;

    /// Called once per new binding of [`Rule::pattern`].
    fn on_match(&self, call: &mut RuleCall);

    /// Hash for fingerprinting.
    fn rule_hash(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.name().hash(&mut hasher);
        hasher.finish()
    }
}

/// Whole-tree rewrites offered to the planner alongside the root, such as
/// materialized-view substitution. Every returned tree must be equivalent to
/// `root` and is registered into the root's set.
pub trait Substitution: Send + Sync {
    fn name(&self) -> &str;

    fn substitute(&self, root: &RelNode, catalog: &dyn Catalog) -> Vec<RelNode>;
}

/// A named set of rules (e.g., for a specific connector).
pub struct RuleSet {
    pub name: String,
    pub rules: Vec<Box<dyn Rule>>,
}

/// Registry of optimization rules.
pub struct RuleRegistry {
    pub base_rules: Vec<Box<dyn Rule>>,
    pub source_rules: HashMap<String, RuleSet>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self {
            base_rules: Vec::new(),
            source_rules: HashMap::new(),
        }
    }

    pub fn add_rule(&mut self, rule: Box<dyn Rule>) {
        self.base_rules.push(rule);
    }

    pub fn add_source_rule_set(&mut self, name: impl Into<String>, rule_set: RuleSet) {
        self.source_rules.insert(name.into(), rule_set);
    }

    /// Get all active rules for a given source type.
    pub fn active_rules(&self, source: Option<&str>) -> Vec<&dyn Rule> {
        let mut rules: Vec<&dyn Rule> = self.base_rules.iter().map(|r| r.as_ref()).collect();
        if let Some(rs) = source.and_then(|s| self.source_rules.get(s)) {
            rules.extend(rs.rules.iter().map(|r| r.as_ref()));
        }
        rules
    }

    /// Get all transformation rules.
    pub fn transformation_rules(&self, source: Option<&str>) -> Vec<&dyn Rule> {
        self.active_rules(source)
            .into_iter()
            .filter(|r| r.rule_type() == RuleType::Transformation)
            .collect()
    }

    /// Get all implementation rules.
    pub fn implementation_rules(&self, source: Option<&str>) -> Vec<&dyn Rule> {
        self.active_rules(source)
            .into_iter()
            .filter(|r| r.rule_type() == RuleType::Implementation)
            .collect()
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
