//! Validation Pipelines
//!
//! The shuffle-based IND validation passes. Both arities follow the same
//! shape: emit `(value, id)` records from the inputs, group by value into
//! attribute sets, re-key by member id, intersect, and read the surviving
//! inclusion sets back as INDs. The unary pass works on plain column ids,
//! the n-ary pass on dense per-pass combination ids.
//!
//! Cell emission rules (null policy, column caps, row sampling, the
//! differing-line drop) are shared between the passes and live here.

pub mod nary;
pub mod unary;

use crate::engine::collect::RunToken;
use crate::input::{InputCatalog, InputTable};
use crate::model::ind::Ind;
use crate::model::stats::Statistics;
use crate::substrate::SourcePlan;

/// Accumulator channel: null cells (unary) or null tuples (n-ary) per id.
pub const CH_NULLS: &str = "null_count";
/// Accumulator channel: distinct non-null values/tuples per id.
pub const CH_DISTINCT: &str = "distinct_count";
/// Accumulator channel: observed column count per table id.
pub const CH_WIDTH: &str = "table_width";

/// Null handling and row-shape rules applied during cell emission.
#[derive(Debug, Clone, Copy)]
pub struct EmissionRules {
    /// Discard null cells rather than emit them under the null sentinel.
    pub drop_nulls: bool,
    /// Silently skip rows whose arity differs from the declared schema.
    pub drop_differing_lines: bool,
}

/// Everything a validation pass needs besides its candidates.
#[derive(Debug, Clone, Copy)]
pub struct PassConfig {
    pub rules: EmissionRules,
    /// Emit only the first N rows of each table.
    pub sample_rows: Option<u64>,
    /// Prefer sort-based grouping (the `no_group_operators` hint).
    pub sort_based: bool,
    /// Suppress reflexive `c ⊆ c` INDs.
    pub exclude_trivial: bool,
}

/// INDs validated by one pass plus the statistics it accumulated.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub inds: Vec<Ind>,
    pub stats: Statistics,
}

/// Result delivery target of a pass: the registered collector of this run.
#[derive(Debug, Clone, Copy)]
pub struct Delivery {
    pub token: RunToken,
}

/// Bind every catalogued table into a job source plan.
pub(crate) fn source_plans<'a>(
    catalog: &InputCatalog,
    tables: &'a [Box<dyn InputTable>],
    sample_rows: Option<u64>,
) -> Vec<SourcePlan<'a>> {
    catalog
        .bindings()
        .iter()
        .zip(tables.iter())
        .map(|(binding, table)| SourcePlan {
            table: table.as_ref(),
            table_id: binding.table_id,
            base_column_id: binding.base_column_id,
            width: binding.width,
            row_limit: sample_rows,
        })
        .collect()
}
