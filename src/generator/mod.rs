//! Candidate Generation
//!
//! Apriori-style synthesis of arity-`k+1` candidates from the validated
//! INDs of arity `k`. INDs sharing their first `k-1` positions are merged
//! pairwise; a merge survives only if every arity-`k` coprojection of it
//! was validated, its per-side columns are distinct, the configured n-ary
//! restriction admits it, and (under void exclusion) none of its
//! generating sides is void.
//!
//! The three strategy variants share the merge rule and differ in their
//! void-exclusion default; they are a tagged variant, not a trait object.

pub mod augmentation;

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::column::ColumnId;
use crate::model::ind::Ind;
use crate::model::stats::Statistics;

/// Restriction on column repetitions in generated candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum NaryRestriction {
    /// No restriction beyond per-side distinctness.
    None,
    /// A column may appear at most once across both sides.
    NoRepetitions,
    /// Dependent and referenced columns must be disjoint.
    DepRefDisjoint,
}

/// Candidate-generation strategy variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorKind {
    Mind,
    Apriori,
    Binder,
}

impl GeneratorKind {
    /// Whether this strategy excludes void candidates by default.
    pub fn excludes_void_by_default(self) -> bool {
        matches!(self, GeneratorKind::Binder)
    }
}

/// Apriori candidate generator.
#[derive(Debug, Clone, Copy)]
pub struct CandidateGenerator {
    kind: GeneratorKind,
    restriction: NaryRestriction,
    exclude_void: bool,
}

impl CandidateGenerator {
    pub fn new(
        kind: GeneratorKind,
        restriction: NaryRestriction,
        exclude_void: Option<bool>,
    ) -> CandidateGenerator {
        CandidateGenerator {
            kind,
            restriction,
            exclude_void: exclude_void.unwrap_or_else(|| kind.excludes_void_by_default()),
        }
    }

    pub fn kind(&self) -> GeneratorKind {
        self.kind
    }

    pub fn restriction(&self) -> NaryRestriction {
        self.restriction
    }

    pub fn excludes_void(&self) -> bool {
        self.exclude_void
    }

    /// Generate the arity-`k+1` candidates from the arity-`k` INDs.
    pub fn generate(&self, inds: &[Ind], stats: &Statistics) -> Result<Vec<Ind>> {
        let Some(first) = inds.first() else {
            return Ok(Vec::new());
        };
        let k = first.arity();
        debug_assert!(inds.iter().all(|ind| ind.arity() == k));

        let mut sorted: Vec<&Ind> = inds.iter().collect();
        sorted.sort_by(|a, b| Ind::lexicographic_cmp(a, b));
        let known: HashSet<&Ind> = inds.iter().collect();

        // Siblings share their first k-1 (dep, ref) positions.
        let mut blocks: Vec<Vec<&Ind>> = Vec::new();
        let mut block_of: HashMap<(Vec<ColumnId>, Vec<ColumnId>), usize> = HashMap::new();
        for ind in sorted {
            let prefix = (
                ind.dep()[..k - 1].to_vec(),
                ind.referenced()[..k - 1].to_vec(),
            );
            match block_of.get(&prefix) {
                Some(&i) => blocks[i].push(ind),
                None => {
                    block_of.insert(prefix, blocks.len());
                    blocks.push(vec![ind]);
                }
            }
        }

        let mut seen: HashSet<Ind> = HashSet::new();
        let mut out = Vec::new();
        for block in blocks {
            for (i, a) in block.iter().enumerate() {
                for b in &block[i + 1..] {
                    let Some(candidate) = merge_siblings(a, b, k)? else {
                        continue;
                    };
                    if !self.closure_holds(&candidate, &known)? {
                        continue;
                    }
                    if !self.restriction_admits(&candidate) {
                        continue;
                    }
                    if self.exclude_void && self.has_void_side(&candidate, stats)? {
                        continue;
                    }
                    if seen.insert(candidate.clone()) {
                        out.push(candidate);
                    }
                }
            }
        }
        out.sort_unstable();
        Ok(out)
    }

    /// Every arity-`k` coprojection of the merge must have been validated.
    fn closure_holds(&self, candidate: &Ind, known: &HashSet<&Ind>) -> Result<bool> {
        for position in 0..candidate.arity() {
            let sub = candidate.coproject(position)?;
            if !known.contains(&sub) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn restriction_admits(&self, candidate: &Ind) -> bool {
        match self.restriction {
            NaryRestriction::None => true,
            NaryRestriction::NoRepetitions => {
                let mut all: Vec<ColumnId> = candidate
                    .dep()
                    .iter()
                    .chain(candidate.referenced())
                    .copied()
                    .collect();
                all.sort_unstable();
                all.windows(2).all(|w| w[0] != w[1])
            }
            NaryRestriction::DepRefDisjoint => {
                let referenced: HashSet<ColumnId> =
                    candidate.referenced().iter().copied().collect();
                candidate.dep().iter().all(|c| !referenced.contains(c))
            }
        }
    }

    /// A candidate side is void when one of its generating arity-`k`
    /// sides is; those are always recorded, by Apriori closure.
    fn has_void_side(&self, candidate: &Ind, stats: &Statistics) -> Result<bool> {
        for position in 0..candidate.arity() {
            let sub = candidate.coproject(position)?;
            if stats.is_void(sub.dep()) || stats.is_void(&sub.sorted_ref()) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Remove from `all` every IND implied by a newly validated one, then
    /// append the new INDs.
    pub fn consolidate(&self, all: &mut Vec<Ind>, mut new: Vec<Ind>) {
        all.retain(|ind| !new.iter().any(|n| ind != n && ind.is_implied_by(n)));
        all.append(&mut new);
    }
}

/// Merge two siblings into their arity-`k+1` candidate.
///
/// Returns `None` when the merge is degenerate: equal last dependent
/// columns, or a duplicate column on either side.
fn merge_siblings(a: &Ind, b: &Ind, k: usize) -> Result<Option<Ind>> {
    if a.dep()[k - 1] == b.dep()[k - 1] {
        return Ok(None);
    }
    let mut pairs: Vec<(ColumnId, ColumnId)> = a.positions().collect();
    pairs.push((b.dep()[k - 1], b.referenced()[k - 1]));
    pairs.sort_unstable();

    if pairs.windows(2).any(|w| w[0].0 == w[1].0) {
        return Ok(None);
    }
    let mut referenced: Vec<ColumnId> = pairs.iter().map(|&(_, r)| r).collect();
    referenced.sort_unstable();
    if referenced.windows(2).any(|w| w[0] == w[1]) {
        return Ok(None);
    }
    Ind::from_pairs(pairs).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ind(dep: &[u32], referenced: &[u32]) -> Ind {
        Ind::new(dep.to_vec(), referenced.to_vec()).unwrap()
    }

    fn generator(restriction: NaryRestriction) -> CandidateGenerator {
        CandidateGenerator::new(GeneratorKind::Apriori, restriction, None)
    }

    #[test]
    fn merges_unary_inds_into_binary_candidates() {
        let inds = vec![ind(&[0], &[10]), ind(&[1], &[11])];
        let candidates = generator(NaryRestriction::None)
            .generate(&inds, &Statistics::new())
            .unwrap();
        assert_eq!(candidates, vec![ind(&[0, 1], &[10, 11])]);
    }

    #[test]
    fn closure_check_blocks_merges_with_missing_subsets() {
        // {R(a,b) ⊆ S(x,y)} alone cannot grow: R(a,c) ⊆ S(x,z) is missing.
        let inds = vec![ind(&[0, 1], &[10, 11]), ind(&[1, 2], &[11, 12])];
        let candidates = generator(NaryRestriction::None)
            .generate(&inds, &Statistics::new())
            .unwrap();
        assert!(candidates.is_empty());
    }

    #[test]
    fn closure_admits_fully_supported_merges() {
        let inds = vec![
            ind(&[0, 1], &[10, 11]),
            ind(&[0, 2], &[10, 12]),
            ind(&[1, 2], &[11, 12]),
        ];
        let candidates = generator(NaryRestriction::None)
            .generate(&inds, &Statistics::new())
            .unwrap();
        assert_eq!(candidates, vec![ind(&[0, 1, 2], &[10, 11, 12])]);
    }

    #[test]
    fn per_side_duplicates_never_merge() {
        // would yield ref side (10, 10)
        let inds = vec![ind(&[0], &[10]), ind(&[1], &[10])];
        let candidates = generator(NaryRestriction::None)
            .generate(&inds, &Statistics::new())
            .unwrap();
        assert!(candidates.is_empty());
    }

    #[test]
    fn no_repetitions_rejects_columns_shared_across_sides() {
        // candidate would be (0,1) ⊆ (1,2): column 1 appears twice
        let inds = vec![ind(&[0], &[1]), ind(&[1], &[2])];
        assert!(generator(NaryRestriction::NoRepetitions)
            .generate(&inds, &Statistics::new())
            .unwrap()
            .is_empty());
        assert_eq!(
            generator(NaryRestriction::None)
                .generate(&inds, &Statistics::new())
                .unwrap(),
            vec![ind(&[0, 1], &[1, 2])]
        );
    }

    #[test]
    fn dep_ref_disjoint_rejects_overlapping_sides() {
        let gen = generator(NaryRestriction::DepRefDisjoint);
        assert!(!gen.restriction_admits(&ind(&[0, 1], &[1, 2])));
        assert!(gen.restriction_admits(&ind(&[0, 1], &[10, 11])));
    }

    #[test]
    fn void_exclusion_uses_generating_side_statistics() {
        let mut stats = Statistics::new();
        stats.record_distinct(vec![0], 0);
        stats.record_distinct(vec![1], 3);
        stats.record_distinct(vec![2], 3);
        let inds = vec![ind(&[0], &[10]), ind(&[1], &[11])];
        let binder = CandidateGenerator::new(
            GeneratorKind::Binder,
            NaryRestriction::NoRepetitions,
            None,
        );
        assert!(binder.generate(&inds, &stats).unwrap().is_empty());

        // the same merge passes without void exclusion
        let mind =
            CandidateGenerator::new(GeneratorKind::Mind, NaryRestriction::NoRepetitions, None);
        assert_eq!(mind.generate(&inds, &stats).unwrap().len(), 1);
    }

    #[test]
    fn consolidate_drops_implied_inds_and_appends() {
        let gen = generator(NaryRestriction::None);
        let mut all = vec![ind(&[0], &[10]), ind(&[1], &[11]), ind(&[2], &[12])];
        let new = vec![ind(&[0, 1], &[10, 11])];
        gen.consolidate(&mut all, new);
        assert_eq!(all, vec![ind(&[2], &[12]), ind(&[0, 1], &[10, 11])]);
    }

    #[test]
    fn strategy_void_defaults() {
        assert!(GeneratorKind::Binder.excludes_void_by_default());
        assert!(!GeneratorKind::Apriori.excludes_void_by_default());
        assert!(!GeneratorKind::Mind.excludes_void_by_default());
    }

    #[test]
    fn void_exclusion_default_can_be_overridden() {
        let gen = CandidateGenerator::new(GeneratorKind::Binder, NaryRestriction::None, None);
        assert_eq!(gen.kind(), GeneratorKind::Binder);
        assert_eq!(gen.restriction(), NaryRestriction::None);
        assert!(gen.excludes_void());
        let overridden =
            CandidateGenerator::new(GeneratorKind::Binder, NaryRestriction::None, Some(false));
        assert!(!overridden.excludes_void());
        let forced =
            CandidateGenerator::new(GeneratorKind::Mind, NaryRestriction::None, Some(true));
        assert!(forced.excludes_void());
    }
}
