//! N-ary IND Pipeline
//!
//! Validates a batch of arity-`k` candidates (`k >= 2`). Both sides of
//! every candidate are registered in a fresh [`CombinationIndex`]: the
//! dependent side as its (sorted) column sequence, the referenced side in
//! the candidate's positional order, aligned to the dependent side. Tuples
//! are read in registration order, so the reduction compares exactly the
//! projections the candidate pairs up — two candidates over the same
//! column sets but different pairings get different combination ids and
//! independent evidence.
//!
//! A reduced inclusion between two combination ids only becomes an IND if
//! some candidate maps onto that pair of sides; anything else is a
//! pseudo-IND and is dropped by the membership check.

use std::collections::HashMap;

use crate::engine::collect;
use crate::error::{DiscoveryError, Result};
use crate::input::{Field, InputCatalog, InputTable, Row};
use crate::model::attribute_set::{AttributeSet, InclusionSet};
use crate::model::column::ColumnId;
use crate::model::ind::Ind;
use crate::model::stats::Statistics;
use crate::pipeline::{
    source_plans, Delivery, PassConfig, PipelineOutcome, CH_DISTINCT, CH_NULLS,
};
use crate::substrate::{Accumulators, ShuffleJob, SourcePlan, Substrate};

/// A dense id drawn per pass for one ordered column combination.
pub type CombinationId = u32;

/// Bijection between ordered column combinations and dense ids.
///
/// Dependent sides arrive sorted; referenced sides keep their candidate's
/// positional order, so the id carries the pairing. Rebuilt for every
/// n-ary pass; ids live in their own namespace, so they can never collide
/// with plain column ids.
#[derive(Debug, Default)]
pub struct CombinationIndex {
    columns: Vec<Vec<ColumnId>>,
    ids: HashMap<Vec<ColumnId>, CombinationId>,
}

impl CombinationIndex {
    /// Register both sides of every candidate.
    pub fn from_candidates(candidates: &[Ind]) -> Result<CombinationIndex> {
        let mut index = CombinationIndex::default();
        for candidate in candidates {
            index.insert(candidate.dep().to_vec())?;
            index.insert(candidate.referenced().to_vec())?;
        }
        Ok(index)
    }

    fn insert(&mut self, combination: Vec<ColumnId>) -> Result<CombinationId> {
        let mut sorted = combination.clone();
        sorted.sort_unstable();
        if !sorted.windows(2).all(|w| w[0] < w[1]) {
            return Err(DiscoveryError::InternalInvariant(format!(
                "duplicate column in combination: {combination:?}"
            )));
        }
        if let Some(&id) = self.ids.get(&combination) {
            return Ok(id);
        }
        let id = self.columns.len() as CombinationId;
        self.columns.push(combination.clone());
        self.ids.insert(combination, id);
        Ok(id)
    }

    pub fn id_of(&self, combination: &[ColumnId]) -> Option<CombinationId> {
        self.ids.get(combination).copied()
    }

    pub fn columns_of(&self, id: CombinationId) -> &[ColumnId] {
        &self.columns[id as usize]
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CombinationId, &[ColumnId])> {
        self.columns
            .iter()
            .enumerate()
            .map(|(id, cols)| (id as CombinationId, cols.as_slice()))
    }
}

/// Run one n-ary validation pass over `candidates`.
pub fn run_nary<S: Substrate>(
    substrate: &S,
    tables: &[Box<dyn InputTable>],
    catalog: &InputCatalog,
    pass: PassConfig,
    candidates: &[Ind],
    delivery: Delivery,
) -> Result<PipelineOutcome> {
    let index = CombinationIndex::from_candidates(candidates)?;
    let universe_len = index.len();
    let rules = pass.rules;
    let codec = *catalog.codec();

    // Candidates addressed by their (dep, ref) combination-id pair; the
    // membership check that drops pseudo-INDs. Referenced ids are
    // pairing-ordered, so the pair identifies one positional pairing.
    let mut by_sides: HashMap<(CombinationId, CombinationId), Vec<usize>> = HashMap::new();
    for (i, candidate) in candidates.iter().enumerate() {
        let dep = index
            .id_of(candidate.dep())
            .ok_or_else(|| DiscoveryError::InternalInvariant(
                "candidate dependent side missing from combination index".to_string(),
            ))?;
        let referenced = index.id_of(candidate.referenced()).ok_or_else(|| {
            DiscoveryError::InternalInvariant(
                "candidate referenced side missing from combination index".to_string(),
            )
        })?;
        by_sides.entry((dep, referenced)).or_default().push(i);
    }

    // Combinations readable from one table, as positional indexes.
    let mut per_table: HashMap<u32, Vec<(CombinationId, Vec<usize>)>> = HashMap::new();
    for (id, cols) in index.iter() {
        let base = codec.base_of(cols[0]);
        if cols.iter().all(|&c| codec.base_of(c) == base) {
            let positions = cols.iter().map(|&c| (c - base) as usize).collect();
            per_table.entry(base).or_default().push((id, positions));
        }
    }

    let emit = move |plan: &SourcePlan<'_>,
                     row: &Row,
                     accs: &Accumulators,
                     out: &mut Vec<(Vec<Field>, CombinationId)>| {
        let declared = plan.table.column_names().len();
        if rules.drop_differing_lines && row.len() != declared {
            return;
        }
        let Some(combinations) = per_table.get(&plan.base_column_id) else {
            return;
        };
        let width = (plan.width as usize).min(row.len());
        for (id, positions) in combinations {
            if positions.iter().any(|&p| p >= width) {
                continue;
            }
            let tuple: Vec<Field> = positions.iter().map(|&p| row[p].clone()).collect();
            if tuple.iter().any(Field::is_null) {
                accs.add(CH_NULLS, *id, 1);
                if rules.drop_nulls {
                    continue;
                }
            }
            out.push((tuple, *id));
        }
    };

    let expand = move |tuple: &Vec<Field>,
                       members: &[CombinationId],
                       accs: &Accumulators,
                       out: &mut Vec<(CombinationId, InclusionSet)>| {
        let set = AttributeSet::from_unsorted(members.to_vec());
        if !tuple.iter().any(Field::is_null) {
            for &id in set.ids() {
                accs.add(CH_DISTINCT, id, 1);
            }
        }
        if set.len() == universe_len {
            for &id in set.ids() {
                out.push((id, InclusionSet::All));
            }
        } else {
            for &id in set.ids() {
                out.push((id, InclusionSet::Of(set.clone())));
            }
        }
    };

    let output = substrate.execute(ShuffleJob {
        name: "nary-inclusion",
        sources: source_plans(catalog, tables, pass.sample_rows),
        emit,
        expand,
        combine: |acc: &mut InclusionSet, next: InclusionSet| acc.intersect_with(next),
        sort_based: pass.sort_based,
    })?;

    // Statistics for every registered combination, zero when unobserved.
    // Counts are keyed by the sorted column sequence: the distinct and
    // null tuple counts of a projection do not depend on read order.
    let mut stats = Statistics::new();
    let distinct = output.accumulator(CH_DISTINCT);
    let nulls = output.accumulator(CH_NULLS);
    for (id, cols) in index.iter() {
        let mut key = cols.to_vec();
        key.sort_unstable();
        stats.record_distinct(key.clone(), distinct.get(&id).copied().unwrap_or(0));
        stats.record_nulls(key, nulls.get(&id).copied().unwrap_or(0));
    }

    let universe: Vec<CombinationId> = (0..universe_len as u32).collect();
    let mut inds = Vec::new();
    for (dep_id, inclusion) in output.records {
        let included_in = inclusion.resolve(&universe);
        for &ref_id in included_in.ids() {
            // equal ids mean identical ordered sides, a trivial candidate
            if pass.exclude_trivial && ref_id == dep_id {
                continue;
            }
            let Some(matches) = by_sides.get(&(dep_id, ref_id)) else {
                continue;
            };
            for &i in matches {
                let ind = candidates[i].clone();
                collect::deliver(delivery.token, &ind);
                inds.push(ind);
            }
        }
    }
    inds.sort_unstable();
    inds.dedup();

    Ok(PipelineOutcome { inds, stats })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_assigns_dense_ids_and_dedups() {
        let candidates = vec![
            Ind::new(vec![0, 1], vec![10, 11]).unwrap(),
            Ind::new(vec![0, 2], vec![10, 11]).unwrap(),
        ];
        let index = CombinationIndex::from_candidates(&candidates).unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.id_of(&[0, 1]), Some(0));
        assert_eq!(index.id_of(&[10, 11]), Some(1));
        assert_eq!(index.id_of(&[0, 2]), Some(2));
        assert_eq!(index.columns_of(1), &[10, 11]);
        assert_eq!(index.id_of(&[0, 3]), None);
    }

    #[test]
    fn index_preserves_referenced_pairing_order() {
        let candidates = vec![
            Ind::new(vec![0, 1], vec![11, 10]).unwrap(),
            Ind::new(vec![0, 1], vec![10, 11]).unwrap(),
        ];
        let index = CombinationIndex::from_candidates(&candidates).unwrap();
        // same column set, different pairings, distinct ids
        assert_eq!(index.id_of(&[11, 10]), Some(1));
        assert_eq!(index.id_of(&[10, 11]), Some(2));
        assert_eq!(index.columns_of(1), &[11, 10]);
    }

    #[test]
    fn index_rejects_duplicate_members() {
        let candidates = vec![Ind::new(vec![0, 1], vec![10, 10]).unwrap()];
        assert!(CombinationIndex::from_candidates(&candidates).is_err());
    }
}
