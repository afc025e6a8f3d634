//! # Scan, Filter and Project Implementation Rules
//!
//! Maps the leaf Scan and the per-row operators to their physical
//! counterparts.
//!
//! ## Sequential Scan
//!
//! A sequential scan reads every row of the table. A materialization's backing
//! table is scanned the same way, so substituting a view into a plan needs no
//! extra physical operator: the cheaper scan simply wins.
//!
//! ## Filter and Project
//!
//! Both stream rows one at a time and never require an input ordering, so each
//! has exactly one physical form.

use relopt_core::operator::{LogicalOp, Operator, PhysicalOp};
use relopt_core::pattern::Pattern;
use relopt_core::rule::{Rule, RuleCall, RuleResult, RuleType};

/// Implement logical scan as a sequential scan.
pub struct ImplSeqScanRule;

impl Rule for ImplSeqScanRule {
    fn name(&self) -> &str {
        "ImplSeqScan"
    }

    fn rule_type(&self) -> RuleType {
        RuleType::Implementation
    }

    fn pattern(&self) -> Pattern {
        Pattern::scan()
    }

    fn on_match(&self, call: &mut RuleCall) {
        let Operator::Logical(LogicalOp::Scan { table, row_type }) = &call.rel(0).op else {
            return;
        };

        call.transform_to(RuleResult::Substitution(
            Operator::Physical(PhysicalOp::SeqScan {
                table: table.clone(),
                row_type: row_type.clone(),
            }),
            vec![],
        ));
    }
}

pub struct ImplFilterRule;

impl Rule for ImplFilterRule {
    fn name(&self) -> &str {
        "ImplFilter"
    }

    fn rule_type(&self) -> RuleType {
        RuleType::Implementation
    }

    fn pattern(&self) -> Pattern {
        Pattern::filter()
    }

    fn on_match(&self, call: &mut RuleCall) {
        let Operator::Logical(LogicalOp::Filter { condition }) = &call.rel(0).op else {
            return;
        };

        call.transform_to(RuleResult::Substitution(
            Operator::Physical(PhysicalOp::Filter {
                condition: condition.clone(),
            }),
            call.inputs(0),
        ));
    }
}

pub struct ImplProjectRule;

impl Rule for ImplProjectRule {
    fn name(&self) -> &str {
        "ImplProject"
    }

    fn rule_type(&self) -> RuleType {
        RuleType::Implementation
    }

    fn pattern(&self) -> Pattern {
        Pattern::project()
    }

    fn on_match(&self, call: &mut RuleCall) {
        let Operator::Logical(LogicalOp::Project { exprs, names }) = &call.rel(0).op else {
            return;
        };

        call.transform_to(RuleResult::Substitution(
            Operator::Physical(PhysicalOp::Project {
                exprs: exprs.clone(),
                names: names.clone(),
            }),
            call.inputs(0),
        ));
    }
}
