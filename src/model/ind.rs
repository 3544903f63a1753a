//! Inclusion Dependency Value Type
//!
//! An [`Ind`] is an immutable pair of equal-length column-id vectors in
//! positional correspondence: position `i` of the dependent side matches
//! position `i` of the referenced side. For arity >= 2 the dependent side
//! is strictly ascending; the referenced side is whatever permutation the
//! pairing dictates. Sorted dependent sides make equality, hashing and
//! implication checks canonical.
//!
//! Two orderings are provided:
//! - the standard ordering (`Ord`): arity, then dependent side, then
//!   referenced side;
//! - [`Ind::lexicographic_cmp`]: dependent side up to the shorter arity,
//!   shorter arity first on prefix equality, then referenced side. This is
//!   the ordering the candidate generator sorts by.

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

use crate::error::{DiscoveryError, Result};
use crate::model::column::ColumnId;

/// An inclusion dependency `dep[0..n] ⊆ ref[0..n]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Ind {
    dep: Vec<ColumnId>,
    #[serde(rename = "ref")]
    referenced: Vec<ColumnId>,
}

impl Ind {
    /// The distinguished empty IND `[] ⊆ []`, used as the left-hand side
    /// of 0-ary augmentation rules.
    pub fn empty() -> Ind {
        Ind {
            dep: Vec::new(),
            referenced: Vec::new(),
        }
    }

    /// A unary IND `dep ⊆ referenced`.
    pub fn unary(dep: ColumnId, referenced: ColumnId) -> Ind {
        Ind {
            dep: vec![dep],
            referenced: vec![referenced],
        }
    }

    /// Build an IND from parallel sides, checking the invariants.
    pub fn new(dep: Vec<ColumnId>, referenced: Vec<ColumnId>) -> Result<Ind> {
        if dep.len() != referenced.len() {
            return Err(DiscoveryError::InternalInvariant(format!(
                "IND sides differ in length: {} vs {}",
                dep.len(),
                referenced.len()
            )));
        }
        if !dep.windows(2).all(|w| w[0] < w[1]) {
            return Err(DiscoveryError::InternalInvariant(format!(
                "IND dependent side is not strictly ascending: {dep:?}"
            )));
        }
        Ok(Ind { dep, referenced })
    }

    /// Build an IND from `(dep, ref)` position pairs, normalising the
    /// position order by dependent column.
    pub fn from_pairs(mut pairs: Vec<(ColumnId, ColumnId)>) -> Result<Ind> {
        pairs.sort_unstable();
        let (dep, referenced) = pairs.into_iter().unzip();
        Ind::new(dep, referenced)
    }

    pub fn arity(&self) -> usize {
        self.dep.len()
    }

    pub fn dep(&self) -> &[ColumnId] {
        &self.dep
    }

    pub fn referenced(&self) -> &[ColumnId] {
        &self.referenced
    }

    /// Position pairs `(dep[i], ref[i])` in position order.
    pub fn positions(&self) -> impl Iterator<Item = (ColumnId, ColumnId)> + '_ {
        self.dep.iter().copied().zip(self.referenced.iter().copied())
    }

    /// The referenced side as a sorted column sequence, the key under
    /// which combination statistics are recorded.
    pub fn sorted_ref(&self) -> Vec<ColumnId> {
        let mut cols = self.referenced.clone();
        cols.sort_unstable();
        cols
    }

    /// True iff both sides are elementwise equal.
    pub fn is_trivial(&self) -> bool {
        self.dep == self.referenced
    }

    /// The unary IND at position `i`.
    pub fn project(&self, i: usize) -> Result<Ind> {
        if i >= self.arity() {
            return Err(DiscoveryError::InternalInvariant(format!(
                "project position {i} out of bounds for arity {}",
                self.arity()
            )));
        }
        Ok(Ind::unary(self.dep[i], self.referenced[i]))
    }

    /// The IND obtained by removing position `i` from both sides.
    pub fn coproject(&self, i: usize) -> Result<Ind> {
        if i >= self.arity() {
            return Err(DiscoveryError::InternalInvariant(format!(
                "coproject position {i} out of bounds for arity {}",
                self.arity()
            )));
        }
        let mut dep = self.dep.clone();
        let mut referenced = self.referenced.clone();
        dep.remove(i);
        referenced.remove(i);
        Ok(Ind { dep, referenced })
    }

    /// True iff `self`'s positions embed order-preservingly into `that`'s.
    ///
    /// Both position sequences are sorted by the `(dep, ref)` pair, so the
    /// check reduces to a linear two-pointer merge.
    pub fn is_implied_by(&self, that: &Ind) -> bool {
        if self.arity() > that.arity() {
            return false;
        }
        let mut j = 0;
        for this_pos in self.positions() {
            loop {
                if j == that.arity() {
                    return false;
                }
                let that_pos = (that.dep[j], that.referenced[j]);
                match that_pos.cmp(&this_pos) {
                    Ordering::Less => j += 1,
                    Ordering::Equal => {
                        j += 1;
                        break;
                    }
                    Ordering::Greater => return false,
                }
            }
        }
        true
    }

    /// Merge ordering for arity-comparable candidates: dependent side up
    /// to the shorter arity, shorter arity first on prefix equality, then
    /// referenced side.
    pub fn lexicographic_cmp(a: &Ind, b: &Ind) -> Ordering {
        let n = a.arity().min(b.arity());
        a.dep[..n]
            .cmp(&b.dep[..n])
            .then_with(|| a.arity().cmp(&b.arity()))
            .then_with(|| a.referenced.cmp(&b.referenced))
    }
}

impl Ord for Ind {
    fn cmp(&self, other: &Ind) -> Ordering {
        self.arity()
            .cmp(&other.arity())
            .then_with(|| self.dep.cmp(&other.dep))
            .then_with(|| self.referenced.cmp(&other.referenced))
    }
}

impl PartialOrd for Ind {
    fn partial_cmp(&self, other: &Ind) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Ind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn side(f: &mut fmt::Formatter<'_>, cols: &[ColumnId]) -> fmt::Result {
            write!(f, "[")?;
            for (i, c) in cols.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{c}")?;
            }
            write!(f, "]")
        }
        side(f, &self.dep)?;
        write!(f, " \u{2286} ")?;
        side(f, &self.referenced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ind(dep: &[u32], referenced: &[u32]) -> Ind {
        Ind::new(dep.to_vec(), referenced.to_vec()).unwrap()
    }

    #[test]
    fn rejects_mismatched_and_unsorted_sides() {
        assert!(Ind::new(vec![1, 2], vec![3]).is_err());
        assert!(Ind::new(vec![2, 1], vec![3, 4]).is_err());
        assert!(Ind::new(vec![1, 1], vec![3, 4]).is_err());
    }

    #[test]
    fn from_pairs_normalises_position_order() {
        let a = Ind::from_pairs(vec![(5, 9), (2, 7)]).unwrap();
        assert_eq!(a, ind(&[2, 5], &[7, 9]));
    }

    #[test]
    fn trivial_and_empty() {
        assert!(ind(&[1], &[1]).is_trivial());
        assert!(!ind(&[1], &[2]).is_trivial());
        assert!(Ind::empty().is_trivial());
        assert_eq!(Ind::empty().arity(), 0);
    }

    #[test]
    fn project_and_coproject() {
        let x = ind(&[1, 3, 5], &[9, 8, 7]);
        assert_eq!(x.project(1).unwrap(), ind(&[3], &[8]));
        assert_eq!(x.coproject(1).unwrap(), ind(&[1, 5], &[9, 7]));
        assert!(x.project(3).is_err());
        assert!(x.coproject(3).is_err());
    }

    #[test]
    fn implication_is_subsequence_of_position_pairs() {
        let big = ind(&[1, 3, 5], &[9, 8, 7]);
        assert!(ind(&[1, 5], &[9, 7]).is_implied_by(&big));
        assert!(ind(&[3], &[8]).is_implied_by(&big));
        assert!(Ind::empty().is_implied_by(&big));
        assert!(big.is_implied_by(&big));
        // same dep, wrong ref pairing
        assert!(!ind(&[1, 5], &[8, 7]).is_implied_by(&big));
        assert!(!ind(&[2], &[9]).is_implied_by(&big));
        assert!(!big.is_implied_by(&ind(&[1, 3], &[9, 8])));
    }

    #[test]
    fn standard_ordering_is_arity_then_sides() {
        let mut inds = vec![
            ind(&[2], &[3]),
            ind(&[1, 2], &[3, 4]),
            ind(&[1], &[9]),
            ind(&[1], &[2]),
        ];
        inds.sort();
        assert_eq!(
            inds,
            vec![
                ind(&[1], &[2]),
                ind(&[1], &[9]),
                ind(&[2], &[3]),
                ind(&[1, 2], &[3, 4]),
            ]
        );
    }

    #[test]
    fn lexicographic_ordering_prefers_shorter_on_prefix_equality() {
        let short = ind(&[1], &[7]);
        let long = ind(&[1, 2], &[7, 8]);
        assert_eq!(Ind::lexicographic_cmp(&short, &long), Ordering::Less);
        assert_eq!(Ind::lexicographic_cmp(&long, &short), Ordering::Greater);
        assert_eq!(
            Ind::lexicographic_cmp(&ind(&[1, 2], &[7, 8]), &ind(&[1, 2], &[7, 9])),
            Ordering::Less
        );
    }

    #[test]
    fn display_uses_inclusion_sign() {
        assert_eq!(ind(&[1, 2], &[4, 3]).to_string(), "[1, 2] \u{2286} [4, 3]");
    }
}
