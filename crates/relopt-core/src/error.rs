//! Error types surfaced by the planner.
//!
//! Only [`PlanError::UnresolvableReference`] and [`PlanError::NoImplementationFound`]
//! are expected to reach an end user. The remaining variants signal internal
//! invariant violations.

use crate::memo::SetId;

pub type PlanResult<T> = Result<T, PlanError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum PlanError {
    #[error("query could not be planned: table '{table}' could not be resolved")]
    UnresolvableReference { table: String },

    #[error("query could not be planned: no implementation found for {operator} in set {set} with traits {traits}")]
    NoImplementationFound {
        set: SetId,
        operator: String,
        traits: String,
    },

    #[error("invalid rewrite by '{rule}': produced row type {actual}, expected {expected}")]
    InvalidRewrite {
        rule: String,
        expected: String,
        actual: String,
    },

    #[error("cannot compose mappings: left has {left_targets} targets, right has {right_sources} sources")]
    MappingMismatch {
        left_targets: usize,
        right_sources: usize,
    },
}

impl PlanError {
    /// Whether the error is one a caller should report as a planning failure
    /// rather than an internal bug.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            PlanError::UnresolvableReference { .. } | PlanError::NoImplementationFound { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_facing_messages_name_the_culprit() {
        let err = PlanError::UnresolvableReference {
            table: "hr.emps".into(),
        };
        assert!(err.is_user_facing());
        assert_eq!(
            err.to_string(),
            "query could not be planned: table 'hr.emps' could not be resolved"
        );

        let err = PlanError::NoImplementationFound {
            set: 3,
            operator: "LogicalCollect".into(),
            traits: "PHYSICAL".into(),
        };
        assert!(err.is_user_facing());
        assert!(err.to_string().contains("LogicalCollect"));

        let err = PlanError::MappingMismatch {
            left_targets: 2,
            right_sources: 3,
        };
        assert!(!err.is_user_facing());
    }
}
