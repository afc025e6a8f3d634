//! Trait sets: the physical properties attached to an expression.
//!
//! Every memo expression delivers a [`TraitSet`], and every subset of an
//! equivalence set is keyed by one. A consumer that needs sorted input asks its
//! child set for a subset whose traits carry the required collation; the planner
//! satisfies the request either with an expression that already delivers that
//! order or by adding a sort enforcer.

use crate::operator::SortKey;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Calling convention. Logical expressions cannot be executed; physical ones can.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Convention {
    Logical,
    Physical,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraitSet {
    pub convention: Convention,
    /// Required or delivered sort order. Empty means "any order".
    pub collation: Vec<SortKey>,
}

impl TraitSet {
    pub fn logical() -> Self {
        Self {
            convention: Convention::Logical,
            collation: vec![],
        }
    }

    pub fn physical() -> Self {
        Self {
            convention: Convention::Physical,
            collation: vec![],
        }
    }

    pub fn with_collation(mut self, collation: Vec<SortKey>) -> Self {
        self.collation = collation;
        self
    }

    /// Whether something delivering `self` can be used where `required` is asked
    /// for: same convention, and the required collation is a prefix of ours.
    pub fn satisfies(&self, required: &TraitSet) -> bool {
        self.convention == required.convention
            && required.collation.len() <= self.collation.len()
            && required
                .collation
                .iter()
                .zip(&self.collation)
                .all(|(r, p)| r == p)
    }
}

impl fmt::Display for TraitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.convention {
            Convention::Logical => write!(f, "LOGICAL")?,
            Convention::Physical => write!(f, "PHYSICAL")?,
        }
        if !self.collation.is_empty() {
            write!(f, ".[")?;
            for (i, key) in self.collation.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}")?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_satisfies_is_prefix_based() {
        let sorted = TraitSet::physical().with_collation(vec![SortKey::asc(0), SortKey::asc(1)]);
        assert!(sorted.satisfies(&TraitSet::physical()));
        assert!(sorted.satisfies(&TraitSet::physical().with_collation(vec![SortKey::asc(0)])));
        assert!(!sorted.satisfies(&TraitSet::physical().with_collation(vec![SortKey::asc(1)])));
        assert!(!TraitSet::physical().satisfies(&sorted));
        assert!(!TraitSet::logical().satisfies(&TraitSet::physical()));
        assert_eq!(sorted.to_string(), "PHYSICAL.[0, 1]");
    }
}
