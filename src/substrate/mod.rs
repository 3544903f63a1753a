//! Execution Substrate
//!
//! The seam to the data-parallel execution layer. A validation pass is one
//! bulk-synchronous shuffle job: flat-map rows of every source into keyed
//! records, group by key, expand each group into second-stage records,
//! reduce those by their key, and hand the reduced records back, together
//! with the contents of the broadcast-style accumulator channels.
//!
//! The substrate makes no ordering promise inside a group, but it delivers
//! every record of a group to exactly one `expand` invocation, and the
//! reducers must be deterministic for a given multiset of inputs. The
//! engine never assumes more than that, so a distributed implementation
//! can slot in behind the same trait.

pub mod local;

use std::collections::HashMap;
use std::hash::Hash;

use dashmap::DashMap;

use crate::error::Result;
use crate::input::{InputTable, Row};

pub use local::LocalSubstrate;

/// Named side-channel counters, readable once a job completes.
///
/// Channels map `u32` keys (column or combination ids, table ids) to
/// counters and support additive and maximum accumulation from any worker.
#[derive(Debug, Default)]
pub struct Accumulators {
    channels: DashMap<&'static str, DashMap<u32, u64>>,
}

impl Accumulators {
    pub fn new() -> Accumulators {
        Accumulators::default()
    }

    /// Add `delta` to the counter at `key` in `channel`.
    pub fn add(&self, channel: &'static str, key: u32, delta: u64) {
        let inner = self.channels.entry(channel).or_default();
        *inner.entry(key).or_insert(0) += delta;
    }

    /// Raise the counter at `key` in `channel` to at least `value`.
    pub fn record_max(&self, channel: &'static str, key: u32, value: u64) {
        let inner = self.channels.entry(channel).or_default();
        inner
            .entry(key)
            .and_modify(|v| *v = (*v).max(value))
            .or_insert(value);
    }

    /// Snapshot one channel. Unknown channels are empty.
    pub fn snapshot(&self, channel: &'static str) -> HashMap<u32, u64> {
        match self.channels.get(channel) {
            Some(inner) => inner.iter().map(|e| (*e.key(), *e.value())).collect(),
            None => HashMap::new(),
        }
    }
}

/// One input table bound to its place in the id space, as a job source.
pub struct SourcePlan<'a> {
    pub table: &'a dyn InputTable,
    pub table_id: u32,
    pub base_column_id: u32,
    /// Effective column count (declared width, capped by `max_columns`).
    pub width: u32,
    /// Emit only the first N rows when set.
    pub row_limit: Option<u64>,
}

/// A two-stage shuffle job.
///
/// `emit` turns one row into first-stage records, `expand` turns one
/// key group into second-stage records, `combine` folds second-stage
/// records that share a key. All three run on worker threads.
pub struct ShuffleJob<'a, Em, Ex, Cb> {
    pub name: &'a str,
    pub sources: Vec<SourcePlan<'a>>,
    pub emit: Em,
    pub expand: Ex,
    pub combine: Cb,
    /// Prefer sort-based grouping over hash-based group operators.
    pub sort_based: bool,
}

/// Reduced records plus the job's accumulator channels.
pub struct JobOutput<K, V> {
    pub records: Vec<(K, V)>,
    accumulators: Accumulators,
}

impl<K, V> JobOutput<K, V> {
    pub fn new(records: Vec<(K, V)>, accumulators: Accumulators) -> JobOutput<K, V> {
        JobOutput {
            records,
            accumulators,
        }
    }

    /// Read one accumulator channel of the completed job.
    pub fn accumulator(&self, channel: &'static str) -> HashMap<u32, u64> {
        self.accumulators.snapshot(channel)
    }
}

/// A bulk-synchronous execution layer for shuffle jobs.
pub trait Substrate: Send + Sync {
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
        Cb: Fn(&mut V2, V2) + Sync;
}
