//! # Operand Patterns
//!
//! Each rule declares a [`Pattern`] describing the operator tree it fires on.
//! The planner binds patterns against the memo: a binding is the list of
//! concrete expressions matched by the pattern's operator nodes, in pre-order.
//! Because an input set holds many equivalent expressions, one root expression
//! can produce several bindings (one per combination of matching inputs).
//!
//! - `Pattern::Operator(matcher, children)`: an expression whose operator
//!   satisfies `matcher` and whose inputs match `children`.
//! - `Pattern::Variadic(matcher)`: an expression whose operator satisfies
//!   `matcher`, over any number of inputs (set operations).
//! - `Pattern::Any`: any input set. Binds nothing.
//! - `Pattern::Leaf`: an expression with no inputs.

use crate::memo::{ExprId, Memo};
use crate::operator::{LogicalOpKind, Operator, PhysicalOpKind};

/// Pattern for matching expressions in the memo.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Match an operator with child patterns.
    Operator(OpMatcher, Vec<Pattern>),
    /// Match an operator regardless of its arity; inputs are not bound.
    Variadic(OpMatcher),
    /// Match any subtree (set).
    Any,
    /// Match a leaf node (no children).
    Leaf,
}

/// Matcher for operator types (without data).
#[derive(Debug, Clone, Copy)]
pub enum OpMatcher {
    LogicalOp(LogicalOpKind),
    PhysicalOp(PhysicalOpKind),
    AnyLogical,
    AnyPhysical,
}

impl OpMatcher {
    pub fn accepts(&self, op: &Operator) -> bool {
        match (op, self) {
            (Operator::Logical(l), OpMatcher::LogicalOp(kind)) => l.kind() == *kind,
            (Operator::Physical(p), OpMatcher::PhysicalOp(kind)) => p.kind() == *kind,
            (Operator::Logical(_), OpMatcher::AnyLogical) => true,
            (Operator::Physical(_), OpMatcher::AnyPhysical) => true,
            _ => false,
        }
    }
}

fn logical(kind: LogicalOpKind, children: Vec<Pattern>) -> Pattern {
    Pattern::Operator(OpMatcher::LogicalOp(kind), children)
}

impl Pattern {
    /// A logical operator of `kind` over `arity` arbitrary inputs.
    pub fn logical(kind: LogicalOpKind, arity: usize) -> Self {
        logical(kind, vec![Pattern::Any; arity])
    }

    pub fn join() -> Self {
        Self::logical(LogicalOpKind::Join, 2)
    }

    pub fn scan() -> Self {
        logical(LogicalOpKind::Scan, vec![])
    }

    pub fn filter() -> Self {
        Self::logical(LogicalOpKind::Filter, 1)
    }

    pub fn project() -> Self {
        Self::logical(LogicalOpKind::Project, 1)
    }

    pub fn aggregate() -> Self {
        Self::logical(LogicalOpKind::Aggregate, 1)
    }

    pub fn sort() -> Self {
        Self::logical(LogicalOpKind::Sort, 1)
    }

    /// `Join(Join(_, _), _)`
    pub fn join_join_left() -> Self {
        logical(LogicalOpKind::Join, vec![Self::join(), Pattern::Any])
    }

    /// `Join(_, Join(_, _))`
    pub fn join_join_right() -> Self {
        logical(LogicalOpKind::Join, vec![Pattern::Any, Self::join()])
    }

    /// Match a filter on top of a join.
    pub fn filter_join() -> Self {
        logical(LogicalOpKind::Filter, vec![Self::join()])
    }

    pub fn filter_project() -> Self {
        logical(LogicalOpKind::Filter, vec![Self::project()])
    }

    pub fn filter_aggregate() -> Self {
        logical(LogicalOpKind::Filter, vec![Self::aggregate()])
    }

    pub fn filter_filter() -> Self {
        logical(LogicalOpKind::Filter, vec![Self::filter()])
    }

    pub fn project_project() -> Self {
        logical(LogicalOpKind::Project, vec![Self::project()])
    }

    /// Number of operator levels; `Any` counts for nothing.
    pub fn depth(&self) -> usize {
        match self {
            Pattern::Any => 0,
            Pattern::Leaf | Pattern::Variadic(_) => 1,
            Pattern::Operator(_, children) => {
                1 + children.iter().map(Pattern::depth).max().unwrap_or(0)
            }
        }
    }
}

/// Check if a memo expression matches a pattern.
pub fn matches(memo: &Memo, expr_id: ExprId, pattern: &Pattern) -> bool {
    !bind(memo, expr_id, pattern).is_empty()
}

/// All bindings of `pattern` rooted at `expr_id`. Each binding lists the
/// matched expressions in pre-order, root first.
pub fn bind(memo: &Memo, expr_id: ExprId, pattern: &Pattern) -> Vec<Vec<ExprId>> {
    let expr = memo.expr(expr_id);
    match pattern {
        Pattern::Any => vec![vec![]],
        Pattern::Leaf => {
            if expr.children.is_empty() {
                vec![vec![expr_id]]
            } else {
                vec![]
            }
        }
        Pattern::Variadic(matcher) => {
            if matcher.accepts(&expr.op) {
                vec![vec![expr_id]]
            } else {
                vec![]
            }
        }
        Pattern::Operator(matcher, child_patterns) => {
            if !matcher.accepts(&expr.op) || expr.children.len() != child_patterns.len() {
                return vec![];
            }
            let mut bindings = vec![vec![expr_id]];
            for (child, child_pattern) in memo.children(expr_id).into_iter().zip(child_patterns) {
                if matches!(child_pattern, Pattern::Any) {
                    continue;
                }
                // Every expression of the input set is a candidate.
                let options: Vec<Vec<ExprId>> = memo
                    .set(child)
                    .exprs()
                    .filter(|&e| e != expr_id)
                    .flat_map(|e| bind(memo, e, child_pattern))
                    .collect();
                if options.is_empty() {
                    return vec![];
                }
                bindings = bindings
                    .into_iter()
                    .flat_map(|prefix| {
                        options.iter().map(move |tail| {
                            let mut b = prefix.clone();
                            b.extend(tail);
                            b
                        })
                    })
                    .collect();
            }
            bindings
        }
    }
}
