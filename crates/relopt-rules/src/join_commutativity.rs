//! # Join Commutativity Rule
//!
//! This rule implements the algebraic identity `A JOIN B = B JOIN A`.
//!
//! ## Why Commutativity Matters
//!
//! - **Hash join build side**: the cost model sees both orientations and can
//!   build on whichever input is smaller.
//! - **Join reordering**: combined with [`JoinPushThroughJoinRule`], swapping
//!   the inputs of every join reaches bushy and right-deep orders from a
//!   left-deep tree.
//!
//! ## Column Order
//!
//! Swapping the inputs moves the right input's columns in front of the left
//! input's. The condition is renumbered accordingly and a Project on top puts
//! the columns back in their original order, so the rewritten expression still
//! produces the row type of the matched join's set.
//!
//! ## Applicability
//!
//! Inner joins always commute. Outer joins commute only with `swap_outer`, which
//! also mirrors the join type (LEFT becomes RIGHT). Semi and anti joins project
//! only their left input and never commute.
//!
//! [`JoinPushThroughJoinRule`]: crate::join_push_through_join::JoinPushThroughJoinRule

use crate::util::restoring_project;
use relopt_core::mapping::Permutation;
use relopt_core::operator::{JoinType, LogicalOp, Operator};
use relopt_core::pattern::Pattern;
use relopt_core::rule::{Rule, RuleCall, RuleChild, RuleResult, RuleType};

/// Join commutativity: A JOIN B -> Project(B JOIN A).
#[derive(Default)]
pub struct JoinCommuteRule {
    swap_outer: bool,
}

impl JoinCommuteRule {
    /// A variant that also swaps LEFT, RIGHT and FULL joins.
    pub fn swap_outer() -> Self {
        Self { swap_outer: true }
    }
}

impl Rule for JoinCommuteRule {
    fn name(&self) -> &str {
        if self.swap_outer {
            "JoinCommuteOuter"
        } else {
            "JoinCommute"
        }
    }

    fn rule_type(&self) -> RuleType {
        RuleType::Transformation
    }

    fn pattern(&self) -> Pattern {
        Pattern::join()
    }

    fn on_match(&self, call: &mut RuleCall) {
        let Operator::Logical(LogicalOp::Join {
            join_type,
            condition,
        }) = &call.rel(0).op
        else {
            return;
        };
        if *join_type != JoinType::Inner && !self.swap_outer {
            return;
        }
        let Some(swapped_type) = join_type.swap() else {
            return;
        };

        let inputs = call.inputs(0);
        let (left, right) = (inputs[0], inputs[1]);
        let n_left = call.row_type(left).field_count();
        let n_right = call.row_type(right).field_count();

        // Old [A | B] -> new [B | A].
        let mapping = Permutation::swap_blocks(n_left, n_right).to_mapping();
        let Some(swapped_condition) = condition.map_columns(&|i| mapping.target(i)) else {
            return;
        };
        let Some(project) = restoring_project(&mapping, call.row_type(call.set_of(0))) else {
            return;
        };

        let swapped = RuleChild::expr(
            Operator::Logical(LogicalOp::Join {
                join_type: swapped_type,
                condition: swapped_condition,
            }),
            vec![RuleChild::Set(right), RuleChild::Set(left)],
        );
        call.transform_to(RuleResult::NewChildren(project, vec![swapped]));
    }
}
