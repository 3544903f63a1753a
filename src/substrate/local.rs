//! Local Substrate
//!
//! In-process implementation of the shuffle substrate on a rayon worker
//! pool. Sources are read in parallel, grouping is either hash-based or
//! sort-based (the `sort_based` job flag carries the engine's
//! `no_group_operators` hint), and the second-stage reduction folds
//! per-worker maps that are then merged pairwise.
//!
//! Determinism: reducers see each group exactly once, and `combine` is
//! required to be associative and commutative by the substrate contract,
//! so the merge order across workers does not affect results.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;

use rayon::prelude::*;

use crate::error::{DiscoveryError, Result};
use crate::input::Row;
use crate::substrate::{Accumulators, JobOutput, ShuffleJob, SourcePlan, Substrate};

/// Rayon-backed substrate.
pub struct LocalSubstrate {
    pool: rayon::ThreadPool,
}

impl LocalSubstrate {
    /// Build a substrate with `num_threads` workers; `0` uses every core.
    pub fn new(num_threads: usize) -> Result<LocalSubstrate> {
        let threads = if num_threads == 0 {
            num_cpus::get()
        } else {
            num_threads
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("substrate-{i}"))
            .build()
            .map_err(|e| DiscoveryError::Substrate {
                job: "pool".to_string(),
                message: e.to_string(),
            })?;
        Ok(LocalSubstrate { pool })
    }
}

impl Substrate for LocalSubstrate {
    fn execute<K1, V1, K2, V2, Em, Ex, Cb>(
        &self,
        job: ShuffleJob<'_, Em, Ex, Cb>,
    ) -> Result<JobOutput<K2, V2>>
    where
        K1: Hash + Eq + Ord + Send,
        V1: Send,
        K2: Hash + Eq + Ord + Send,
        V2: Send,
        Em: Fn(&SourcePlan<'_>, &Row, &Accumulators, &mut Vec<(K1, V1)>) + Sync,
        Ex: Fn(&K1, &[V1], &Accumulators, &mut Vec<(K2, V2)>) + Sync,
        Cb: Fn(&mut V2, V2) + Sync,
    {
        let ShuffleJob {
            name,
            sources,
            emit,
            expand,
            combine,
            sort_based,
        } = job;
        let accumulators = Accumulators::new();

        self.pool.install(|| {
            // Stage 1: flat-map every source row into keyed records.
            let emitted: Vec<Vec<(K1, V1)>> = sources
                .par_iter()
                .map(|plan| -> Result<Vec<(K1, V1)>> {
                    let mut out = Vec::new();
                    let rows = plan.table.rows()?;
                    let rows: Box<dyn Iterator<Item = Result<Row>> + Send + '_> =
                        match plan.row_limit {
                            Some(limit) => Box::new(rows.take(limit as usize)),
                            None => rows,
                        };
                    for row in rows {
                        let row = row?;
                        emit(plan, &row, &accumulators, &mut out);
                    }
                    Ok(out)
                })
                .collect::<Result<Vec<_>>>()
                .map_err(|e| wrap(name, e))?;

            // Stage 2: group by the first-stage key.
            let groups = if sort_based {
                group_sorted(flatten(emitted))
            } else {
                group_hashed(flatten(emitted))
            };

            // Stage 3: expand groups and reduce by the second-stage key.
            let records = if sort_based {
                let expanded: Vec<(K2, V2)> = groups
                    .into_par_iter()
                    .flat_map_iter(|(key, values)| {
                        let mut out = Vec::new();
                        expand(&key, &values, &accumulators, &mut out);
                        out
                    })
                    .collect();
                combine_sorted(expanded, &combine)
            } else {
                groups
                    .into_par_iter()
                    .fold(HashMap::new, |mut acc: HashMap<K2, V2>, (key, values)| {
                        let mut out = Vec::new();
                        expand(&key, &values, &accumulators, &mut out);
                        for (k, v) in out {
                            combine_into(&mut acc, k, v, &combine);
                        }
                        acc
                    })
                    .reduce(HashMap::new, |mut left, right| {
                        for (k, v) in right {
                            combine_into(&mut left, k, v, &combine);
                        }
                        left
                    })
                    .into_iter()
                    .collect()
            };

            Ok(JobOutput::new(records, accumulators))
        })
    }
}

fn flatten<K, V>(batches: Vec<Vec<(K, V)>>) -> Vec<(K, V)> {
    let total = batches.iter().map(Vec::len).sum();
    let mut out = Vec::with_capacity(total);
    for batch in batches {
        out.extend(batch);
    }
    out
}

fn group_hashed<K: Hash + Eq, V>(records: Vec<(K, V)>) -> Vec<(K, Vec<V>)> {
    let mut groups: HashMap<K, Vec<V>> = HashMap::new();
    for (k, v) in records {
        groups.entry(k).or_default().push(v);
    }
    groups.into_iter().collect()
}

fn group_sorted<K: Ord + Eq + Send, V: Send>(mut records: Vec<(K, V)>) -> Vec<(K, Vec<V>)> {
    records.par_sort_unstable_by(|a, b| a.0.cmp(&b.0));
    let mut groups: Vec<(K, Vec<V>)> = Vec::new();
    for (k, v) in records {
        match groups.last_mut() {
            Some((last, values)) if *last == k => values.push(v),
            _ => groups.push((k, vec![v])),
        }
    }
    groups
}

fn combine_sorted<K: Ord + Eq + Send, V: Send, Cb: Fn(&mut V, V) + Sync>(
    mut records: Vec<(K, V)>,
    combine: &Cb,
) -> Vec<(K, V)> {
    records.par_sort_unstable_by(|a, b| a.0.cmp(&b.0));
    let mut out: Vec<(K, V)> = Vec::new();
    for (k, v) in records {
        match out.last_mut() {
            Some((last, acc)) if *last == k => combine(acc, v),
            _ => out.push((k, v)),
        }
    }
    out
}

fn combine_into<K: Hash + Eq, V, Cb: Fn(&mut V, V)>(
    map: &mut HashMap<K, V>,
    key: K,
    value: V,
    combine: &Cb,
) {
    match map.entry(key) {
        Entry::Occupied(mut entry) => combine(entry.get_mut(), value),
        Entry::Vacant(entry) => {
            entry.insert(value);
        }
    }
}

fn wrap(job: &str, error: DiscoveryError) -> DiscoveryError {
    match error {
        e @ (DiscoveryError::Input(_) | DiscoveryError::InputIo { .. }) => e,
        DiscoveryError::Substrate { message, .. } => DiscoveryError::Substrate {
            job: job.to_string(),
            message,
        },
        other => DiscoveryError::Substrate {
            job: job.to_string(),
            message: other.to_string(),
        },
    }
}
