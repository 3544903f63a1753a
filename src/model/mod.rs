//! Core Data Model
//!
//! The value types everything else is built from: packed column ids, the
//! immutable IND value type, attribute sets with their reduction identity,
//! and the per-combination statistics tables.

pub mod attribute_set;
pub mod column;
pub mod ind;
pub mod stats;

pub use attribute_set::{AttributeSet, InclusionSet};
pub use column::{ColumnCodec, ColumnId};
pub use ind::Ind;
pub use stats::Statistics;
