//! Input Tables
//!
//! The boundary to the record sources. Each input table offers a
//! restartable row iterator plus a relation name and an ordered column-name
//! list; row values are strings normalised by the source (typed values
//! arrive in their textual form, nulls as [`Field::Null`]).
//!
//! [`InputCatalog`] binds a set of tables into the column-id space: table
//! ids are assigned in offer order, each table gets a contiguous block of
//! column ids, and the catalog resolves ids back to names for display.

pub mod csv;

use serde::Serialize;

use crate::error::{DiscoveryError, Result};
use crate::model::column::{ColumnCodec, ColumnId};
use crate::model::ind::Ind;

/// One cell of a row: null or its textual value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Null,
    Text(String),
}

impl Field {
    pub fn is_null(&self) -> bool {
        matches!(self, Field::Null)
    }

    /// Convenience constructor for tests and in-memory tables.
    pub fn from_option(value: Option<&str>) -> Field {
        match value {
            None => Field::Null,
            Some(s) => Field::Text(s.to_string()),
        }
    }
}

/// One row of ordered field values.
pub type Row = Vec<Field>;

/// A restartable stream of rows.
pub type RowStream<'a> = Box<dyn Iterator<Item = Result<Row>> + Send + 'a>;

/// A relational input source.
///
/// `rows()` must yield a fresh iterator from the start on every call; a
/// multi-pass run re-reads each table once per arity.
pub trait InputTable: Send + Sync {
    fn relation_name(&self) -> &str;

    fn column_names(&self) -> &[String];

    fn rows(&self) -> Result<RowStream<'_>>;
}

/// An in-memory table, mainly for tests and benchmarks.
#[derive(Debug, Clone)]
pub struct MemoryTable {
    name: String,
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl MemoryTable {
    pub fn new(
        name: impl Into<String>,
        columns: Vec<impl Into<String>>,
        rows: Vec<Row>,
    ) -> MemoryTable {
        MemoryTable {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            rows,
        }
    }

    /// Build a table from optional string cells; `None` becomes null.
    pub fn from_cells(
        name: impl Into<String>,
        columns: Vec<impl Into<String>>,
        rows: Vec<Vec<Option<&str>>>,
    ) -> MemoryTable {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(Field::from_option).collect())
            .collect();
        MemoryTable::new(name, columns, rows)
    }
}

impl InputTable for MemoryTable {
    fn relation_name(&self) -> &str {
        &self.name
    }

    fn column_names(&self) -> &[String] {
        &self.columns
    }

    fn rows(&self) -> Result<RowStream<'_>> {
        Ok(Box::new(self.rows.iter().cloned().map(Ok)))
    }
}

/// A table bound to its place in the column-id space.
#[derive(Debug, Clone, Copy)]
pub struct TableBinding {
    pub table_id: u32,
    pub base_column_id: u32,
    /// Declared column count, capped by `max_columns`.
    pub width: u32,
}

/// Assignment of table and column ids over a set of input tables.
#[derive(Debug, Clone)]
pub struct InputCatalog {
    codec: ColumnCodec,
    bindings: Vec<TableBinding>,
    names: Vec<(String, Vec<String>)>,
}

impl InputCatalog {
    /// Bind `tables` in offer order, assigning table ids and capping each
    /// table's width at `max_columns` when given.
    pub fn bind(
        codec: ColumnCodec,
        tables: &[Box<dyn InputTable>],
        max_columns: Option<u32>,
    ) -> Result<InputCatalog> {
        let mut bindings = Vec::with_capacity(tables.len());
        let mut names = Vec::with_capacity(tables.len());
        for (ordinal, table) in tables.iter().enumerate() {
            let table_id = codec.table_id(ordinal as u32)?;
            let declared = table.column_names().len() as u32;
            let width = match max_columns {
                Some(cap) => declared.min(cap),
                None => declared,
            };
            if width > codec.mask() {
                return Err(DiscoveryError::Configuration(format!(
                    "table '{}' has {width} columns, which does not fit \
                     {} column bits; raise num_column_bits or set max_columns",
                    table.relation_name(),
                    codec.num_column_bits()
                )));
            }
            bindings.push(TableBinding {
                table_id,
                base_column_id: codec.column_id(table_id, 0),
                width,
            });
            names.push((
                table.relation_name().to_string(),
                table.column_names().to_vec(),
            ));
        }
        Ok(InputCatalog {
            codec,
            bindings,
            names,
        })
    }

    pub fn codec(&self) -> &ColumnCodec {
        &self.codec
    }

    pub fn bindings(&self) -> &[TableBinding] {
        &self.bindings
    }

    /// Every bound column id, ascending.
    pub fn universe(&self) -> Vec<ColumnId> {
        let mut out = Vec::new();
        for binding in &self.bindings {
            out.extend((0..binding.width).map(|i| binding.base_column_id + i));
        }
        out.sort_unstable();
        out
    }

    /// Snapshot of the name assignment, for rendering results after the
    /// catalog itself is gone.
    pub fn name_table(&self) -> NameTable {
        NameTable {
            codec: self.codec,
            tables: self.names.clone(),
        }
    }
}

/// Resolves column ids back to `relation.column` labels.
#[derive(Debug, Clone, Serialize)]
pub struct NameTable {
    #[serde(skip)]
    codec: ColumnCodec,
    tables: Vec<(String, Vec<String>)>,
}

impl NameTable {
    pub fn column_label(&self, column_id: ColumnId) -> String {
        let ordinal = self.codec.table_ordinal(self.codec.table_of(column_id)) as usize;
        let index = self.codec.column_index(column_id) as usize;
        match self.tables.get(ordinal) {
            Some((relation, columns)) => match columns.get(index) {
                Some(column) => format!("{relation}.{column}"),
                None => format!("{relation}.col{index}"),
            },
            None => format!("#{column_id}"),
        }
    }

    /// Pretty form of an IND with names resolved.
    pub fn ind_label(&self, ind: &Ind) -> String {
        let side = |cols: &[ColumnId]| {
            cols.iter()
                .map(|&c| self.column_label(c))
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!(
            "[{}] \u{2286} [{}]",
            side(ind.dep()),
            side(ind.referenced())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> Vec<Box<dyn InputTable>> {
        vec![
            Box::new(MemoryTable::from_cells(
                "orders",
                vec!["id", "customer", "total"],
                vec![],
            )),
            Box::new(MemoryTable::from_cells("customers", vec!["id"], vec![])),
        ]
    }

    #[test]
    fn binding_assigns_contiguous_column_blocks() {
        let codec = ColumnCodec::new(16).unwrap();
        let catalog = InputCatalog::bind(codec, &tables(), None).unwrap();
        let bindings = catalog.bindings();
        assert_eq!(bindings[0].table_id, 0xFFFF);
        assert_eq!(bindings[0].base_column_id, 0);
        assert_eq!(bindings[0].width, 3);
        assert_eq!(bindings[1].table_id, 0x1FFFF);
        assert_eq!(bindings[1].base_column_id, 0x10000);
        assert_eq!(catalog.universe(), vec![0, 1, 2, 0x10000]);
    }

    #[test]
    fn max_columns_caps_the_width() {
        let codec = ColumnCodec::new(16).unwrap();
        let catalog = InputCatalog::bind(codec, &tables(), Some(2)).unwrap();
        assert_eq!(catalog.bindings()[0].width, 2);
        assert_eq!(catalog.universe(), vec![0, 1, 0x10000]);
    }

    #[test]
    fn width_must_fit_the_column_bits() {
        let codec = ColumnCodec::new(1).unwrap();
        assert!(InputCatalog::bind(codec, &tables(), None).is_err());
        assert!(InputCatalog::bind(codec, &tables(), Some(1)).is_ok());
    }

    #[test]
    fn name_table_resolves_labels() {
        let codec = ColumnCodec::new(16).unwrap();
        let names = InputCatalog::bind(codec, &tables(), None)
            .unwrap()
            .name_table();
        assert_eq!(names.column_label(1), "orders.customer");
        assert_eq!(names.column_label(0x10000), "customers.id");
        let ind = Ind::unary(1, 0x10000);
        assert_eq!(
            names.ind_label(&ind),
            "[orders.customer] \u{2286} [customers.id]"
        );
    }
}
