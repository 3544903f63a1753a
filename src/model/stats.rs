//! Column and Combination Statistics
//!
//! Tracks, per sorted column combination, the number of distinct non-null
//! projected tuples and the number of tuples with at least one null
//! component, plus the width of every table (populated during the unary
//! pass and immutable thereafter). Arity is implicit in the key length, so
//! the unary and the n-ary passes share one store.
//!
//! The candidate generator and the augmentation-rule engine read these
//! tables to detect void projections and distinct/null-count equivalences.

use std::collections::HashMap;

use crate::model::column::{ColumnCodec, ColumnId};

/// Statistics accumulated across validation passes.
#[derive(Debug, Default, Clone)]
pub struct Statistics {
    distinct: HashMap<Vec<ColumnId>, u64>,
    nulls: HashMap<Vec<ColumnId>, u64>,
    widths: HashMap<u32, u32>,
}

impl Statistics {
    pub fn new() -> Statistics {
        Statistics::default()
    }

    /// Record the distinct non-null tuple count of a sorted combination.
    pub fn record_distinct(&mut self, columns: Vec<ColumnId>, count: u64) {
        self.distinct.insert(columns, count);
    }

    /// Record the null tuple count of a sorted combination.
    pub fn record_nulls(&mut self, columns: Vec<ColumnId>, count: u64) {
        self.nulls.insert(columns, count);
    }

    /// Record the observed width of a table; wider observations win.
    pub fn record_width(&mut self, table_id: u32, width: u32) {
        let entry = self.widths.entry(table_id).or_insert(0);
        *entry = (*entry).max(width);
    }

    pub fn distinct_count(&self, columns: &[ColumnId]) -> Option<u64> {
        self.distinct.get(columns).copied()
    }

    pub fn null_count(&self, columns: &[ColumnId]) -> Option<u64> {
        self.nulls.get(columns).copied()
    }

    pub fn width(&self, table_id: u32) -> Option<u32> {
        self.widths.get(&table_id).copied()
    }

    /// A recorded combination is void when it has no distinct non-null
    /// tuple. An unrecorded combination is conservatively void only if one
    /// of its member columns is void, since a projection with a void
    /// sub-projection is itself void.
    pub fn is_void(&self, columns: &[ColumnId]) -> bool {
        match self.distinct.get(columns) {
            Some(count) => *count == 0,
            None => columns
                .iter()
                .any(|&c| self.distinct.get([c].as_slice()) == Some(&0)),
        }
    }

    /// Every column id of every observed table, ascending.
    pub fn observed_columns(&self, codec: &ColumnCodec) -> Vec<ColumnId> {
        let mut out = Vec::new();
        for (&table_id, &width) in &self.widths {
            let base = codec.column_id(table_id, 0);
            out.extend((0..width).map(|i| base + i));
        }
        out.sort_unstable();
        out
    }

    /// Columns with zero distinct non-null values, ascending.
    pub fn void_columns(&self, codec: &ColumnCodec) -> Vec<ColumnId> {
        self.observed_columns(codec)
            .into_iter()
            .filter(|&c| self.distinct.get([c].as_slice()) == Some(&0))
            .collect()
    }

    /// Backfill zero distinct/null counts for every observed column, so
    /// unary lookups are total after the first pass.
    pub fn seal_unary(&mut self, codec: &ColumnCodec) {
        for column in self.observed_columns(codec) {
            self.distinct.entry(vec![column]).or_insert(0);
            self.nulls.entry(vec![column]).or_insert(0);
        }
    }

    /// Fold another pass's (or chunk's) statistics into this store.
    ///
    /// A combination recorded by both sides carries the same counts on
    /// both, so plain overwrite is sufficient.
    pub fn merge(&mut self, other: Statistics) {
        self.distinct.extend(other.distinct);
        self.nulls.extend(other.nulls);
        for (table_id, width) in other.widths {
            self.record_width(table_id, width);
        }
    }
}
