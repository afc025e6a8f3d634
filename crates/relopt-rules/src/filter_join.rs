//! # Filter Into Join / Join Condition Push Rules
//!
//! Predicate pushdown is one of the most impactful optimization rules because
//! it reduces the amount of data flowing through the plan as early as possible.
//!
//! ## What It Does
//!
//! Every conjunct of a Filter above a Join, and of the join's own ON clause,
//! is moved as far down as the join type allows:
//!
//! ```text
//! Before: Filter(a.y > 5 AND a.x + b.x > 1, Join(A, B, a.x = b.x))
//! After:  Join(Filter(a.y > 5, A), B, a.x = b.x AND a.x + b.x > 1)
//! ```
//!
//! - A conjunct over the left input only becomes a filter on the left input.
//! - A conjunct over the right input only becomes a filter on the right input,
//!   renumbered relative to it.
//! - A filter conjunct spanning both inputs joins the ON clause where the join
//!   type allows it, and otherwise stays in a Filter above the join.
//!
//! Which moves are legal depends on the join type: a WHERE conjunct on the
//! null-generating side of an outer join cannot be evaluated below it, nor can
//! an ON conjunct on the preserved side.
//!
//! ## Outer Join Simplification
//!
//! A WHERE conjunct that can only be true for non-null values of one side
//! (e.g. `b.y = 3`) discards exactly the null-padded rows of that side, so an
//! outer join that would generate them is first weakened: LEFT becomes INNER
//! and FULL becomes RIGHT (and symmetrically). The weakened join type then
//! decides where conjuncts may go.
//!
//! ## Memo-Based Approach
//!
//! The rewritten join (plus any Filter left above it) is registered as a new
//! equivalent expression of the matched set. The original Filter-over-Join
//! remains in the memo and the cost model chooses between them.

use relopt_core::expr::Expr;
use relopt_core::mapping::{column_range, ColumnSet};
use relopt_core::memo::SetId;
use relopt_core::operator::{JoinType, LogicalOp, Operator};
use relopt_core::pattern::Pattern;
use relopt_core::predicates::rejects_nulls_on;
use relopt_core::rule::{Rule, RuleCall, RuleChild, RuleResult, RuleType};

/// Push filter and join-condition conjuncts into or below a join.
pub struct FilterJoinRule {
    /// Matches `Filter(Join)` when set, a bare Join otherwise.
    with_filter: bool,
}

impl FilterJoinRule {
    /// `Filter(Join(A, B))`: push WHERE conjuncts and the ON clause.
    pub fn filter_into_join() -> Self {
        Self { with_filter: true }
    }

    /// `Join(A, B)`: push ON-clause conjuncts into the inputs.
    pub fn join_condition_push() -> Self {
        Self { with_filter: false }
    }
}

impl Rule for FilterJoinRule {
    fn name(&self) -> &str {
        if self.with_filter {
            "FilterIntoJoin"
        } else {
            "JoinConditionPush"
        }
    }

    fn rule_type(&self) -> RuleType {
        RuleType::Transformation
    }

    fn pattern(&self) -> Pattern {
        if self.with_filter {
            Pattern::filter_join()
        } else {
            Pattern::join()
        }
    }

    fn on_match(&self, call: &mut RuleCall) {
        let (above, join_pos): (Vec<Expr>, usize) = if self.with_filter {
            let Operator::Logical(LogicalOp::Filter { condition }) = &call.rel(0).op else {
                return;
            };
            let conjuncts: Vec<Expr> = condition.conjuncts().into_iter().cloned().collect();
            // A filter of only TRUE terms has nothing left to push.
            if conjuncts.is_empty() {
                return;
            }
            (conjuncts, 1)
        } else {
            (vec![], 0)
        };
        let Operator::Logical(LogicalOp::Join {
            join_type,
            condition,
        }) = &call.rel(join_pos).op
        else {
            return;
        };

        let inputs = call.inputs(join_pos);
        let (left, right) = (inputs[0], inputs[1]);
        let n_left = call.row_type(left).field_count();
        let n_right = call.row_type(right).field_count();
        let left_columns = column_range(0, n_left);
        let right_columns = column_range(n_left, n_left + n_right);

        let original_type = *join_type;
        let join_type = simplify_join_type(original_type, &above, &left_columns, &right_columns);

        let mut left_filters = vec![];
        let mut right_filters = vec![];
        let mut join_filters = vec![];
        let mut remaining = vec![];
        let above_count = above.len();

        for conjunct in above {
            let refs = conjunct.input_refs();
            if refs.is_subset(&left_columns) && join_type.can_push_left_from_above() {
                left_filters.push(conjunct);
            } else if refs.is_subset(&right_columns) && join_type.can_push_right_from_above() {
                right_filters.push(conjunct);
            } else if join_type.can_push_into_from_above() {
                join_filters.push(conjunct);
            } else {
                remaining.push(conjunct);
            }
        }
        let moved_into_join = join_filters.len();

        for conjunct in condition.conjuncts() {
            let refs = conjunct.input_refs();
            if refs.is_subset(&left_columns) && join_type.can_push_left_from_within() {
                left_filters.push(conjunct.clone());
            } else if refs.is_subset(&right_columns) && join_type.can_push_right_from_within() {
                right_filters.push(conjunct.clone());
            } else {
                join_filters.push(conjunct.clone());
            }
        }

        let unchanged = left_filters.is_empty()
            && right_filters.is_empty()
            && moved_into_join == 0
            && remaining.len() == above_count
            && join_type == original_type;
        if unchanged {
            return;
        }

        let shift = -(n_left as isize);
        let new_left = filtered(left, left_filters);
        let new_right = filtered(right, right_filters.iter().map(|e| e.shift(shift)).collect());
        let join = Operator::Logical(LogicalOp::Join {
            join_type,
            condition: Expr::and_all(join_filters),
        });

        let result = if remaining.is_empty() {
            RuleResult::NewChildren(join, vec![new_left, new_right])
        } else {
            RuleResult::NewChildren(
                Operator::Logical(LogicalOp::Filter {
                    condition: Expr::and_all(remaining),
                }),
                vec![RuleChild::expr(join, vec![new_left, new_right])],
            )
        };
        call.transform_to(result);
    }
}

/// Weakens an outer join whose null-padded rows the filter would discard.
fn simplify_join_type(
    join_type: JoinType,
    above: &[Expr],
    left_columns: &ColumnSet,
    right_columns: &ColumnSet,
) -> JoinType {
    if above.is_empty() {
        return join_type;
    }
    let filter = Expr::and_all(above.iter().cloned());
    let mut join_type = join_type;
    if join_type.generates_nulls_on_right() && rejects_nulls_on(&filter, right_columns) {
        join_type = match join_type {
            JoinType::Left => JoinType::Inner,
            JoinType::Full => JoinType::Right,
            other => other,
        };
    }
    if join_type.generates_nulls_on_left() && rejects_nulls_on(&filter, left_columns) {
        join_type = match join_type {
            JoinType::Right => JoinType::Inner,
            JoinType::Full => JoinType::Left,
            other => other,
        };
    }
    join_type
}

fn filtered(set: SetId, conjuncts: Vec<Expr>) -> RuleChild {
    if conjuncts.is_empty() {
        RuleChild::Set(set)
    } else {
        RuleChild::expr(
            Operator::Logical(LogicalOp::Filter {
                condition: Expr::and_all(conjuncts),
            }),
            vec![RuleChild::Set(set)],
        )
    }
}
