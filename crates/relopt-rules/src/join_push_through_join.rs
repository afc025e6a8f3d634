//! # Join Push-Through-Join Rule
//!
//! This rule reorders a two-level inner join tree by pushing one input of the
//! bottom join above the top join:
//!
//! ```text
//! right variant:  (A ⋈ B) ⋈ C  ->  (A ⋈ C) ⋈ B
//! left variant:   (A ⋈ B) ⋈ C  ->  (C ⋈ B) ⋈ A
//! ```
//!
//! ## Why It Matters
//!
//! Together with [`JoinCommuteRule`], the two variants reach every join order
//! of a multi-way inner join from the left-deep tree the query arrives as. For
//! star and snowflake queries, the best order typically joins the fact table
//! with its most selective dimension first, which the original tree rarely does.
//!
//! ## Condition Handling
//!
//! For inner joins, conjuncts can be redistributed freely as long as each one is
//! placed on a join where all of its columns are available. Conjuncts of both
//! original conditions are split by whether they reference the pushed input:
//!
//! 1. **Referencing the pushed input**: go to the new top join.
//! 2. **Everything else**: goes to the new bottom join.
//!
//! The rule only fires when the top condition contributes at least one conjunct
//! to the new bottom join; otherwise the new bottom would be a cross product,
//! which is rarely useful.
//!
//! ## Column Order
//!
//! The new tree emits its columns in a different order. Conditions are
//! renumbered through a [`Mapping`] and a Project on top restores `A, B, C`.
//!
//! ## Applicability
//!
//! Only fires when both joins are inner. Outer join associativity has ordering
//! constraints (e.g., `(A LEFT JOIN B) LEFT JOIN C` cannot always be regrouped)
//! that need null-rejection checks this rule does not perform.
//!
//! [`JoinCommuteRule`]: crate::join_commutativity::JoinCommuteRule

use crate::util::restoring_project;
use relopt_core::expr::Expr;
use relopt_core::mapping::{column_range, ColumnSet, Mapping};
use relopt_core::operator::{JoinType, LogicalOp, Operator};
use relopt_core::pattern::Pattern;
use relopt_core::rule::{Rule, RuleCall, RuleChild, RuleResult, RuleType};

/// Which input of the bottom join moves above the top join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pushed {
    /// `(A ⋈ B) ⋈ C -> (C ⋈ B) ⋈ A`
    Left,
    /// `(A ⋈ B) ⋈ C -> (A ⋈ C) ⋈ B`
    Right,
}

pub struct JoinPushThroughJoinRule {
    pushed: Pushed,
}

impl JoinPushThroughJoinRule {
    /// `(A ⋈ B) ⋈ C -> (A ⋈ C) ⋈ B`
    pub fn right() -> Self {
        Self {
            pushed: Pushed::Right,
        }
    }

    /// `(A ⋈ B) ⋈ C -> (C ⋈ B) ⋈ A`
    pub fn left() -> Self {
        Self {
            pushed: Pushed::Left,
        }
    }
}

impl Rule for JoinPushThroughJoinRule {
    fn name(&self) -> &str {
        match self.pushed {
            Pushed::Left => "JoinPushThroughJoin:left",
            Pushed::Right => "JoinPushThroughJoin:right",
        }
    }

    fn rule_type(&self) -> RuleType {
        RuleType::Transformation
    }

    fn pattern(&self) -> Pattern {
        Pattern::join_join_left()
    }

    fn on_match(&self, call: &mut RuleCall) {
        let (
            Operator::Logical(LogicalOp::Join {
                join_type: JoinType::Inner,
                condition: top_condition,
            }),
            Operator::Logical(LogicalOp::Join {
                join_type: JoinType::Inner,
                condition: bottom_condition,
            }),
        ) = (&call.rel(0).op, &call.rel(1).op)
        else {
            return;
        };

        let bottom_inputs = call.inputs(1);
        let (a, b, c) = (bottom_inputs[0], bottom_inputs[1], call.inputs(0)[1]);
        let a_count = call.row_type(a).field_count();
        let b_count = call.row_type(b).field_count();
        let c_count = call.row_type(c).field_count();
        let total = a_count + b_count + c_count;

        let (pushed_columns, mapping) = match self.pushed {
            // Old [A | B | C] -> new [A | C | B].
            Pushed::Right => (
                column_range(a_count, a_count + b_count),
                Mapping::create_shift(
                    total,
                    total,
                    &[
                        (0, 0, a_count),
                        (a_count + c_count, a_count, b_count),
                        (a_count, a_count + b_count, c_count),
                    ],
                ),
            ),
            // Old [A | B | C] -> new [C | B | A].
            Pushed::Left => (
                column_range(0, a_count),
                Mapping::create_shift(
                    total,
                    total,
                    &[
                        (c_count + b_count, 0, a_count),
                        (c_count, a_count, b_count),
                        (0, a_count + b_count, c_count),
                    ],
                ),
            ),
        };

        let (mut top, bottom) = split(top_condition, &pushed_columns);
        // If there's nothing to push down, it's not worth proceeding.
        if bottom.is_empty() {
            return;
        }
        let (top_from_bottom, bottom_from_bottom) = split(bottom_condition, &pushed_columns);
        top.extend(top_from_bottom);
        let new_bottom: Vec<Expr> = bottom.into_iter().chain(bottom_from_bottom).collect();

        let renumber = |conjuncts: Vec<Expr>| {
            conjuncts
                .iter()
                .map(|e| e.map_columns(&|i| mapping.target(i)))
                .collect::<Option<Vec<_>>>()
                .map(Expr::and_all)
        };
        let (Some(new_top_condition), Some(new_bottom_condition)) = (renumber(top), renumber(new_bottom))
        else {
            return;
        };
        let Some(project) = restoring_project(&mapping, call.row_type(call.set_of(0))) else {
            return;
        };

        let (bottom_left, bottom_right, top_right) = match self.pushed {
            Pushed::Right => (a, c, b),
            Pushed::Left => (c, b, a),
        };
        let new_bottom_join = RuleChild::expr(
            Operator::Logical(LogicalOp::Join {
                join_type: JoinType::Inner,
                condition: new_bottom_condition,
            }),
            vec![RuleChild::Set(bottom_left), RuleChild::Set(bottom_right)],
        );
        let new_top_join = RuleChild::expr(
            Operator::Logical(LogicalOp::Join {
                join_type: JoinType::Inner,
                condition: new_top_condition,
            }),
            vec![new_bottom_join, RuleChild::Set(top_right)],
        );
        call.transform_to(RuleResult::NewChildren(project, vec![new_top_join]));
    }
}

/// Splits conjuncts into those that reference `columns` and those that don't.
fn split(condition: &Expr, columns: &ColumnSet) -> (Vec<Expr>, Vec<Expr>) {
    condition
        .conjuncts()
        .into_iter()
        .cloned()
        .partition(|e| !e.input_refs().is_disjoint(columns))
}
