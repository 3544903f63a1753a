//! Unary IND Pipeline
//!
//! One shuffle over every cell of every table. Cells group by value; each
//! group's attribute set (the columns containing that value) is re-keyed
//! per member column and intersected, so a column's reduced set is exactly
//! the set of columns that contain every one of its values.
//!
//! The same job accumulates the unary statistics: null cells per column,
//! distinct non-null values per column (one per value group), and the
//! observed width of every table.

use std::collections::HashMap;

use crate::engine::collect;
use crate::error::Result;
use crate::input::{Field, InputCatalog, InputTable, Row};
use crate::model::attribute_set::{AttributeSet, InclusionSet};
use crate::model::column::ColumnId;
use crate::model::ind::Ind;
use crate::model::stats::Statistics;
use crate::pipeline::{
    source_plans, Delivery, PassConfig, PipelineOutcome, CH_DISTINCT, CH_NULLS, CH_WIDTH,
};
use crate::substrate::{Accumulators, ShuffleJob, SourcePlan, Substrate};

/// Run the unary pass and stream every validated IND to the collector.
pub fn run_unary<S: Substrate>(
    substrate: &S,
    tables: &[Box<dyn InputTable>],
    catalog: &InputCatalog,
    pass: PassConfig,
    delivery: Delivery,
) -> Result<PipelineOutcome> {
    let universe = catalog.universe();
    let universe_len = universe.len();
    let rules = pass.rules;

    let emit = move |plan: &SourcePlan<'_>,
                     row: &Row,
                     accs: &Accumulators,
                     out: &mut Vec<(Field, ColumnId)>| {
        let declared = plan.table.column_names().len();
        if rules.drop_differing_lines && row.len() != declared {
            tracing::debug!(
                table = plan.table.relation_name(),
                expected = declared,
                got = row.len(),
                "dropping row with differing arity"
            );
            return;
        }
        let width = (plan.width as usize).min(row.len());
        accs.record_max(CH_WIDTH, plan.table_id, width as u64);
        for (index, field) in row.iter().take(width).enumerate() {
            let column = plan.base_column_id + index as u32;
            match field {
                Field::Null => {
                    accs.add(CH_NULLS, column, 1);
                    if !rules.drop_nulls {
                        out.push((Field::Null, column));
                    }
                }
                Field::Text(_) => out.push((field.clone(), column)),
            }
        }
    };

    let expand = move |value: &Field,
                       columns: &[ColumnId],
                       accs: &Accumulators,
                       out: &mut Vec<(ColumnId, InclusionSet)>| {
        let set = AttributeSet::from_unsorted(columns.to_vec());
        if !value.is_null() {
            for &column in set.ids() {
                accs.add(CH_DISTINCT, column, 1);
            }
        }
        // A set covering the whole universe reduces under the identity
        // element instead of one set clone per member.
        if set.len() == universe_len {
            for &column in set.ids() {
                out.push((column, InclusionSet::All));
            }
        } else {
            for &column in set.ids() {
                out.push((column, InclusionSet::Of(set.clone())));
            }
        }
    };

    let output = substrate.execute(ShuffleJob {
        name: "unary-inclusion",
        sources: source_plans(catalog, tables, pass.sample_rows),
        emit,
        expand,
        combine: |acc: &mut InclusionSet, next: InclusionSet| acc.intersect_with(next),
        sort_based: pass.sort_based,
    })?;

    let stats = unary_statistics(catalog, &output);
    let mut inds = Vec::new();
    for (column, inclusion) in output.records {
        let included_in = inclusion.resolve(&universe);
        for &referenced in included_in.ids() {
            if pass.exclude_trivial && referenced == column {
                continue;
            }
            let ind = Ind::unary(column, referenced);
            collect::deliver(delivery.token, &ind);
            inds.push(ind);
        }
    }
    inds.sort_unstable();

    Ok(PipelineOutcome { inds, stats })
}

fn unary_statistics<K, V>(
    catalog: &InputCatalog,
    output: &crate::substrate::JobOutput<K, V>,
) -> Statistics {
    let mut stats = Statistics::new();
    for (table_id, width) in output.accumulator(CH_WIDTH) {
        stats.record_width(table_id, width as u32);
    }
    let nulls: HashMap<u32, u64> = output.accumulator(CH_NULLS);
    for (column, count) in nulls {
        stats.record_nulls(vec![column], count);
    }
    for (column, count) in output.accumulator(CH_DISTINCT) {
        stats.record_distinct(vec![column], count);
    }
    stats.seal_unary(catalog.codec());
    stats
}
