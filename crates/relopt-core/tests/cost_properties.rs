//! Algebraic properties of the cost preorder.

use proptest::prelude::*;
use relopt_core::cost::Cost;

/// Few distinct values so that ties on each component are common.
fn cost() -> impl Strategy<Value = Cost> {
    (0u8..4, 0u8..4, 0u8..4).prop_map(|(r, c, i)| Cost::new(r as f64, c as f64 * 10.0, i as f64 * 100.0))
}

proptest! {
    #[test]
    fn is_lt_is_irreflexive(a in cost()) {
        prop_assert!(!a.is_lt(&a));
        prop_assert!(a.is_le(&a));
    }

    #[test]
    fn is_lt_is_transitive(a in cost(), b in cost(), c in cost()) {
        if a.is_lt(&b) && b.is_lt(&c) {
            prop_assert!(a.is_lt(&c), "{a} < {b} < {c}");
        }
    }

    #[test]
    fn is_lt_is_asymmetric(a in cost(), b in cost()) {
        prop_assert!(!(a.is_lt(&b) && b.is_lt(&a)));
    }

    #[test]
    fn is_lt_implies_is_le(a in cost(), b in cost()) {
        if a.is_lt(&b) {
            prop_assert!(a.is_le(&b));
        }
    }

    #[test]
    fn rows_dominate(a in cost(), b in cost()) {
        if a.rows < b.rows {
            prop_assert!(a.is_lt(&b));
        }
        if a.rows > b.rows {
            prop_assert!(!a.is_lt(&b));
        }
    }

    #[test]
    fn equal_rows_with_traded_components_are_incomparable(a in cost(), b in cost()) {
        if a.rows == b.rows && a.cpu < b.cpu && a.io > b.io {
            prop_assert!(!a.is_lt(&b));
            prop_assert!(!b.is_lt(&a));
        }
    }

    #[test]
    fn addition_preserves_order(a in cost(), b in cost(), c in cost()) {
        if a.is_le(&b) {
            prop_assert!(a.plus(&c).is_le(&b.plus(&c)));
        }
        if a.is_lt(&b) {
            prop_assert!(a.plus(&c).is_lt(&b.plus(&c)));
        }
    }
}

#[test]
fn infinity_is_never_lower() {
    let finite = Cost::new(1e12, 1e12, 1e12);
    assert!(finite.is_lt(&Cost::infinite()));
    assert!(!Cost::infinite().is_lt(&finite));
    assert!(Cost::infinite().plus(&finite).is_infinite());
}
