//! # Incline
//!
//! A distributed-batch discovery engine for inclusion dependencies
//! (INDs) across tabular inputs: given a set of relations with named
//! columns, find every minimal `R[A₁…Aₙ] ⊆ S[B₁…Bₙ]` up to a configured
//! arity.
//!
//! ## Pipeline Architecture
//!
//! ```text
//! Input tables (CSV / in-memory)
//!     ↓
//! [Cell emitter]          → (value, columnId) records per row
//!     ↓
//! [Group by value]        → attribute sets (columns sharing the value)
//!     ↓
//! [Intersect per column]  → inclusion sets → unary INDs + statistics
//!     ↓
//! [Candidate generator]   → Apriori merge of arity-k INDs, pruned
//!     ↓
//! [N-ary pipeline]        → same shuffle over combination ids
//!     ↓
//! [Augmentation rules]    → void / count-equivalence rules, suppression
//!     ↓
//! [Run controller]        → consolidated maximal IND set
//! ```
//!
//! The shuffle stages run on an exchangeable execution substrate; the
//! crate ships an in-process rayon-backed implementation.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use incline::{Discovery, LocalSubstrate, MemoryTable, Settings, SinkCollector};
//! use incline::input::InputTable;
//!
//! let orders = MemoryTable::from_cells(
//!     "orders",
//!     vec!["customer"],
//!     vec![vec![Some("1")], vec![Some("2")]],
//! );
//! let customers = MemoryTable::from_cells(
//!     "customers",
//!     vec!["id"],
//!     vec![vec![Some("1")], vec![Some("2")], vec![Some("3")]],
//! );
//!
//! let mut settings = Settings::with_drop_nulls(true);
//! settings.max_arity = 1;
//!
//! let tables: Vec<Box<dyn InputTable>> = vec![Box::new(orders), Box::new(customers)];
//! let engine = Discovery::new(settings, tables, LocalSubstrate::new(0)?);
//! let collector = Arc::new(SinkCollector::new());
//! let outcome = engine.run(collector)?;
//!
//! for ind in &outcome.inds {
//!     println!("{}", outcome.names.ind_label(ind));
//! }
//! # Ok::<(), incline::DiscoveryError>(())
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod generator;
pub mod input;
pub mod model;
pub mod pipeline;
pub mod substrate;

pub use config::{CsvSettings, LoggingSettings, Settings};
pub use engine::collect::{CountingCollector, IndCollector, SinkCollector};
pub use engine::{Discovery, PassSummary, RunOutcome, RunSummary};
pub use error::{DiscoveryError, Result};
pub use generator::augmentation::AugmentationRule;
pub use generator::{CandidateGenerator, GeneratorKind, NaryRestriction};
pub use input::csv::{CsvOptions, CsvTable};
pub use input::{InputCatalog, InputTable, MemoryTable, NameTable};
pub use model::{AttributeSet, ColumnCodec, ColumnId, Ind, Statistics};
pub use substrate::{LocalSubstrate, Substrate};
