//! Column position bookkeeping.
//!
//! A [`Mapping`] sends source column positions to target column positions. It is a
//! partial function: some sources may be unmapped, and when it is injective it can
//! be inverted. Rules use mappings whenever an operator changes column order or
//! column count (join reordering, pushing through projects, aligning a
//! materialization's output with a query's output).
//!
//! [`ColumnSet`] is the bitset used for "which columns does this expression touch".

use crate::error::{PlanError, PlanResult};
use bit_set::BitSet;
use std::fmt;

/// Set of column ordinals.
pub type ColumnSet = BitSet;

/// Columns `[start, end)`.
pub fn column_range(start: usize, end: usize) -> ColumnSet {
    (start..end).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mapping {
    source_count: usize,
    target_count: usize,
    targets: Vec<Option<usize>>,
}

impl Mapping {
    /// Empty mapping; every source is unmapped.
    pub fn new(source_count: usize, target_count: usize) -> Self {
        Self {
            source_count,
            target_count,
            targets: vec![None; source_count],
        }
    }

    pub fn identity(n: usize) -> Self {
        Self {
            source_count: n,
            target_count: n,
            targets: (0..n).map(Some).collect(),
        }
    }

    /// Builds a mapping out of contiguous segments. Each segment is
    /// `(target_start, source_start, len)` and maps
    /// `source_start + i -> target_start + i` for `i < len`.
    pub fn create_shift(
        source_count: usize,
        target_count: usize,
        segments: &[(usize, usize, usize)],
    ) -> Self {
        let mut mapping = Self::new(source_count, target_count);
        for &(target_start, source_start, len) in segments {
            for i in 0..len {
                mapping.set(source_start + i, target_start + i);
            }
        }
        mapping
    }

    pub fn source_count(&self) -> usize {
        self.source_count
    }

    pub fn target_count(&self) -> usize {
        self.target_count
    }

    pub fn set(&mut self, source: usize, target: usize) {
        assert!(
            source < self.source_count && target < self.target_count,
            "mapping {source}->{target} out of bounds ({}x{})",
            self.source_count,
            self.target_count
        );
        self.targets[source] = Some(target);
    }

    pub fn target(&self, source: usize) -> Option<usize> {
        self.targets.get(source).copied().flatten()
    }

    /// First source that maps onto `target`.
    pub fn source(&self, target: usize) -> Option<usize> {
        self.targets.iter().position(|t| *t == Some(target))
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.targets
            .iter()
            .enumerate()
            .filter_map(|(s, t)| t.map(|t| (s, t)))
    }

    pub fn is_identity(&self) -> bool {
        self.source_count == self.target_count
            && self.targets.iter().enumerate().all(|(s, t)| *t == Some(s))
    }

    /// Reverses the mapping. When several sources share a target, the lowest
    /// source wins.
    pub fn inverse(&self) -> Mapping {
        let mut inverse = Mapping::new(self.target_count, self.source_count);
        for (s, t) in self.iter() {
            if inverse.target(t).is_none() {
                inverse.set(t, s);
            }
        }
        inverse
    }

    /// `self` followed by `next`.
    pub fn compose(&self, next: &Mapping) -> PlanResult<Mapping> {
        if self.target_count != next.source_count {
            return Err(PlanError::MappingMismatch {
                left_targets: self.target_count,
                right_sources: next.source_count,
            });
        }
        let mut composed = Mapping::new(self.source_count, next.target_count);
        for (s, t) in self.iter() {
            if let Some(u) = next.target(t) {
                composed.set(s, u);
            }
        }
        Ok(composed)
    }

    /// Image of a column set, or `None` if some column is unmapped.
    pub fn apply_to_set(&self, columns: &ColumnSet) -> Option<ColumnSet> {
        columns.iter().map(|c| self.target(c)).collect()
    }
}

impl fmt::Display for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, (s, t)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{s}:{t}")?;
        }
        write!(f, "]")
    }
}

/// A bijection over `0..n`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Permutation {
    targets: Vec<usize>,
}

impl Permutation {
    /// `targets[i]` is where source `i` goes. Returns `None` unless every
    /// position in `0..len` is hit exactly once.
    pub fn from_targets(targets: Vec<usize>) -> Option<Self> {
        let n = targets.len();
        let mut seen = ColumnSet::with_capacity(n);
        for &t in &targets {
            if t >= n || !seen.insert(t) {
                return None;
            }
        }
        Some(Self { targets })
    }

    /// Moves the block of `first` leading columns behind the remaining
    /// `second` columns: `[A | B]` becomes `[B | A]`.
    pub fn swap_blocks(first: usize, second: usize) -> Self {
        Self {
            targets: (0..first).map(|i| i + second).chain(0..second).collect(),
        }
    }

    pub fn size(&self) -> usize {
        self.targets.len()
    }

    pub fn target(&self, source: usize) -> usize {
        self.targets[source]
    }

    pub fn to_mapping(&self) -> Mapping {
        let n = self.size();
        let mut mapping = Mapping::new(n, n);
        for (s, &t) in self.targets.iter().enumerate() {
            mapping.set(s, t);
        }
        mapping
    }
}
