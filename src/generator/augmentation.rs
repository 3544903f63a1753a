//! Augmentation Rules
//!
//! An IND augmentation rule `lhs ⇒ rhs` (rhs unary) states that any IND
//! combining `lhs` with the extra position of `rhs` holds whenever `lhs`
//! does. Rules compactly represent redundant INDs: void dependent sides
//! make every extension hold vacuously, and a referenced side whose
//! distinct and null counts do not change when a position is dropped makes
//! that position's extension free.
//!
//! Every IND removed here is recoverable by composing its rule with a
//! surviving lower-arity IND, so the consolidated result set stays
//! logically complete.

use std::fmt;

use serde::Serialize;

use crate::error::{DiscoveryError, Result};
use crate::model::column::{ColumnCodec, ColumnId};
use crate::model::ind::Ind;
use crate::model::stats::Statistics;

/// Rule `lhs ⇒ rhs`: if `lhs` holds, its 1-column extension by `rhs`
/// holds as well. A 0-ary rule has the empty IND as its left-hand side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AugmentationRule {
    lhs: Ind,
    rhs: Ind,
}

impl AugmentationRule {
    pub fn new(lhs: Ind, rhs: Ind) -> Result<AugmentationRule> {
        if rhs.arity() != 1 {
            return Err(DiscoveryError::InternalInvariant(format!(
                "augmentation rule right-hand side must be unary, got arity {}",
                rhs.arity()
            )));
        }
        Ok(AugmentationRule { lhs, rhs })
    }

    pub fn lhs(&self) -> &Ind {
        &self.lhs
    }

    pub fn rhs(&self) -> &Ind {
        &self.rhs
    }

    /// True for rules with the empty left-hand side.
    pub fn is_unconditional(&self) -> bool {
        self.lhs.arity() == 0
    }
}

impl fmt::Display for AugmentationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} \u{21D2} {}", self.lhs, self.rhs)
    }
}

/// INDs surviving rule extraction plus the rules themselves.
#[derive(Debug, Default)]
pub struct RuleExtraction {
    pub kept: Vec<Ind>,
    pub rules: Vec<AugmentationRule>,
}

/// Walk one pass's validated INDs and pull out augmentation rules.
///
/// INDs that produced a rule are removed from the kept set.
pub fn extract_rules(new_inds: Vec<Ind>, stats: &Statistics) -> Result<RuleExtraction> {
    let mut extraction = RuleExtraction::default();
    for ind in new_inds {
        match ind.arity() {
            0 => continue,
            1 => extract_unary(ind, stats, &mut extraction)?,
            _ => extract_nary(ind, stats, &mut extraction)?,
        }
    }
    Ok(extraction)
}

fn extract_unary(ind: Ind, stats: &Statistics, out: &mut RuleExtraction) -> Result<()> {
    let dep_distinct = stats.distinct_count(ind.dep()).unwrap_or(0);
    let ref_distinct = stats.distinct_count(ind.referenced());
    if dep_distinct == 0 || ref_distinct == Some(1) {
        out.rules.push(AugmentationRule::new(Ind::empty(), ind)?);
    } else {
        out.kept.push(ind);
    }
    Ok(())
}

fn extract_nary(ind: Ind, stats: &Statistics, out: &mut RuleExtraction) -> Result<()> {
    // Void dependent side: every position is implied by its coprojection.
    if stats.distinct_count(ind.dep()) == Some(0) {
        for position in 0..ind.arity() {
            out.rules.push(AugmentationRule::new(
                ind.coproject(position)?,
                ind.project(position)?,
            )?);
        }
        return Ok(());
    }

    // Distinct/null-count equivalence: dropping a position changes
    // neither count of the referenced projection.
    let ref_sorted = ind.sorted_ref();
    let ref_distinct = stats.distinct_count(&ref_sorted);
    let ref_nulls = stats.null_count(&ref_sorted);
    let mut embedded = false;
    for position in 0..ind.arity() {
        let generalisation = ind.coproject(position)?;
        let gen_sorted = generalisation.sorted_ref();
        let distinct_match = match (ref_distinct, stats.distinct_count(&gen_sorted)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        };
        let nulls_match = match (ref_nulls, stats.null_count(&gen_sorted)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        };
        if distinct_match && nulls_match {
            out.rules
                .push(AugmentationRule::new(generalisation, ind.project(position)?)?);
            embedded = true;
        }
    }
    if !embedded {
        out.kept.push(ind);
    }
    Ok(())
}

/// 0-ary rules for every void column: a column with no distinct non-null
/// value is included in every other column of every table. Keeping these
/// as rules avoids the quadratic blow-up inside the pipeline.
pub fn void_column_rules(stats: &Statistics, codec: &ColumnCodec) -> Result<Vec<AugmentationRule>> {
    let columns = stats.observed_columns(codec);
    let void: Vec<ColumnId> = stats.void_columns(codec);
    let mut rules = Vec::new();
    for &dep in &void {
        for &referenced in &columns {
            if referenced == dep {
                continue;
            }
            rules.push(AugmentationRule::new(
                Ind::empty(),
                Ind::unary(dep, referenced),
            )?);
        }
    }
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ind(dep: &[u32], referenced: &[u32]) -> Ind {
        Ind::new(dep.to_vec(), referenced.to_vec()).unwrap()
    }

    #[test]
    fn unary_void_dep_becomes_an_unconditional_rule() {
        let mut stats = Statistics::new();
        stats.record_distinct(vec![0], 0);
        stats.record_distinct(vec![10], 4);
        let extraction = extract_rules(vec![ind(&[0], &[10])], &stats).unwrap();
        assert!(extraction.kept.is_empty());
        assert_eq!(extraction.rules.len(), 1);
        assert!(extraction.rules[0].is_unconditional());
        assert_eq!(extraction.rules[0].rhs(), &ind(&[0], &[10]));
    }

    #[test]
    fn unary_single_valued_ref_becomes_a_rule() {
        let mut stats = Statistics::new();
        stats.record_distinct(vec![0], 3);
        stats.record_distinct(vec![10], 1);
        let extraction = extract_rules(vec![ind(&[0], &[10])], &stats).unwrap();
        assert!(extraction.kept.is_empty());
        assert!(extraction.rules[0].is_unconditional());
    }

    #[test]
    fn unary_ind_with_real_content_is_kept() {
        let mut stats = Statistics::new();
        stats.record_distinct(vec![0], 3);
        stats.record_distinct(vec![10], 4);
        let extraction = extract_rules(vec![ind(&[0], &[10])], &stats).unwrap();
        assert_eq!(extraction.kept, vec![ind(&[0], &[10])]);
        assert!(extraction.rules.is_empty());
    }

    #[test]
    fn nary_void_dep_yields_one_rule_per_position() {
        let mut stats = Statistics::new();
        stats.record_distinct(vec![0, 1], 0);
        let extraction =
            extract_rules(vec![ind(&[0, 1], &[10, 11])], &stats).unwrap();
        assert!(extraction.kept.is_empty());
        assert_eq!(
            extraction.rules,
            vec![
                AugmentationRule::new(ind(&[1], &[11]), ind(&[0], &[10])).unwrap(),
                AugmentationRule::new(ind(&[0], &[10]), ind(&[1], &[11])).unwrap(),
            ]
        );
    }

    #[test]
    fn distinct_null_equivalence_suppresses_the_ind() {
        // distinct(S.(x,y)) == distinct(S.x) and null counts match, so
        // R.a ⊆ S.x already carries R.(a,b) ⊆ S.(x,y).
        let mut stats = Statistics::new();
        stats.record_distinct(vec![0, 1], 3);
        stats.record_distinct(vec![10, 11], 3);
        stats.record_nulls(vec![10, 11], 0);
        stats.record_distinct(vec![10], 3);
        stats.record_nulls(vec![10], 0);
        stats.record_distinct(vec![11], 4);
        stats.record_nulls(vec![11], 1);
        let extraction =
            extract_rules(vec![ind(&[0, 1], &[10, 11])], &stats).unwrap();
        assert!(extraction.kept.is_empty());
        assert_eq!(
            extraction.rules,
            // dropping position 1 leaves ref (10); its counts match
            vec![AugmentationRule::new(ind(&[0], &[10]), ind(&[1], &[11])).unwrap()]
        );
    }

    #[test]
    fn inequivalent_counts_keep_the_ind() {
        let mut stats = Statistics::new();
        stats.record_distinct(vec![0, 1], 3);
        stats.record_distinct(vec![10, 11], 4);
        stats.record_nulls(vec![10, 11], 0);
        stats.record_distinct(vec![10], 3);
        stats.record_nulls(vec![10], 0);
        stats.record_distinct(vec![11], 3);
        stats.record_nulls(vec![11], 0);
        let extraction =
            extract_rules(vec![ind(&[0, 1], &[10, 11])], &stats).unwrap();
        assert_eq!(extraction.kept, vec![ind(&[0, 1], &[10, 11])]);
        assert!(extraction.rules.is_empty());
    }

    #[test]
    fn void_columns_imply_inclusion_in_every_other_column() {
        let codec = ColumnCodec::new(16).unwrap();
        let mut stats = Statistics::new();
        stats.record_width(codec.table_id(0).unwrap(), 2);
        stats.record_width(codec.table_id(1).unwrap(), 1);
        stats.record_distinct(vec![1], 2);
        stats.record_distinct(vec![0x10000], 1);
        stats.seal_unary(&codec);
        // column 0 is void
        let rules = void_column_rules(&stats, &codec).unwrap();
        let rhs: Vec<&Ind> = rules.iter().map(AugmentationRule::rhs).collect();
        assert_eq!(rhs, vec![&ind(&[0], &[1]), &ind(&[0], &[0x10000])]);
        assert!(rules.iter().all(AugmentationRule::is_unconditional));
    }
}
