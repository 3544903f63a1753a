//! # Incline CLI
//!
//! Discover inclusion dependencies across CSV tables.
//!
//! ```bash
//! incline --drop-nulls true orders.csv customers.csv
//! incline --config profile.toml --max-arity 3 --output inds.jsonl *.csv
//! ```
//!
//! Settings come from `incline.toml` / `incline.local.toml`, `INCLINE_*`
//! environment variables and explicit flags, in ascending precedence.
//! Exits 0 on success, non-zero on configuration or execution failure.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use incline::{
    CsvTable, Discovery, GeneratorKind, InputTable, LocalSubstrate, NaryRestriction, RunOutcome,
    Settings, SinkCollector,
};

#[derive(Parser, Debug)]
#[command(
    name = "incline",
    version,
    about = "Discover inclusion dependencies across CSV tables"
)]
struct Cli {
    /// CSV table files
    #[arg(required_unless_present = "print_config")]
    tables: Vec<PathBuf>,

    /// Settings file (TOML); replaces the default incline.toml lookup
    #[arg(long)]
    config: Option<PathBuf>,

    /// Discard null cells rather than emit them.
    /// Required here unless set in the settings file or environment.
    #[arg(long)]
    drop_nulls: Option<bool>,

    /// Width of the column-index field in a column id
    #[arg(long)]
    num_column_bits: Option<u32>,

    /// Upper bound on discovered arity; -1 exhausts
    #[arg(long)]
    max_arity: Option<i64>,

    /// Stop after the unary pass and report the IND count only
    #[arg(long)]
    only_count_inds: bool,

    /// Cap on columns per table; -1 for no cap
    #[arg(long)]
    max_columns: Option<i64>,

    /// Emit only the first N rows of each table; -1 for all
    #[arg(long)]
    sample_rows: Option<i64>,

    /// Hint the substrate away from hash-group operators
    #[arg(long)]
    no_group_operators: bool,

    /// Override the strategy's void-exclusion default
    #[arg(long)]
    exclude_void_inds: Option<bool>,

    /// Column-repetition restriction for generated candidates
    #[arg(long, value_enum)]
    nary_restriction: Option<NaryRestriction>,

    /// Candidate-generation strategy
    #[arg(long, value_enum)]
    candidate_generator: Option<GeneratorKind>,

    /// Suppress reflexive INDs
    #[arg(long)]
    exclude_trivial_inds: Option<bool>,

    /// Validate at most this many candidates per n-ary job
    #[arg(long)]
    candidate_chunk_size: Option<usize>,

    /// Substrate worker threads; 0 uses every core
    #[arg(long)]
    num_threads: Option<usize>,

    /// CSV field separator
    #[arg(long)]
    field_separator: Option<char>,

    /// CSV quote character
    #[arg(long)]
    quote_char: Option<char>,

    /// CSV escape character
    #[arg(long)]
    escape_char: Option<char>,

    /// Textual null marker
    #[arg(long)]
    null_string: Option<String>,

    /// Tables have no header row
    #[arg(long)]
    no_header: bool,

    /// Silently skip rows whose arity differs from the header's
    #[arg(long)]
    drop_differing_lines: bool,

    /// Trim leading whitespace of unquoted fields
    #[arg(long)]
    ignore_leading_white_space: Option<bool>,

    /// Discard characters outside of quotes
    #[arg(long)]
    use_strict_quotes: bool,

    /// Write results as JSON lines to this file instead of stdout text
    #[arg(long)]
    output: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Print the effective settings as TOML and exit
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    /// Explicit flags as a settings override object.
    fn overrides(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        let mut set = |key: &str, value: serde_json::Value| {
            map.insert(key.to_string(), value);
        };
        if let Some(v) = self.drop_nulls {
            set("drop_nulls", v.into());
        }
        if let Some(v) = self.num_column_bits {
            set("num_column_bits", v.into());
        }
        if let Some(v) = self.max_arity {
            set("max_arity", v.into());
        }
        if self.only_count_inds {
            set("only_count_inds", true.into());
        }
        if let Some(v) = self.max_columns {
            set("max_columns", v.into());
        }
        if let Some(v) = self.sample_rows {
            set("sample_rows", v.into());
        }
        if self.no_group_operators {
            set("no_group_operators", true.into());
        }
        if let Some(v) = self.exclude_void_inds {
            set("exclude_void_inds_from_candidate_generation", v.into());
        }
        if let Some(v) = self.nary_restriction {
            set("nary_restriction", json!(v));
        }
        if let Some(v) = self.candidate_generator {
            set("candidate_generator", json!(v));
        }
        if let Some(v) = self.exclude_trivial_inds {
            set("exclude_trivial_inds", v.into());
        }
        if let Some(v) = self.candidate_chunk_size {
            set("candidate_chunk_size", v.into());
        }
        if let Some(v) = self.num_threads {
            set("num_threads", v.into());
        }

        let mut csv = serde_json::Map::new();
        if let Some(v) = self.field_separator {
            csv.insert("field_separator".to_string(), v.to_string().into());
        }
        if let Some(v) = self.quote_char {
            csv.insert("quote_char".to_string(), v.to_string().into());
        }
        if let Some(v) = self.escape_char {
            csv.insert("escape_char".to_string(), v.to_string().into());
        }
        if let Some(v) = &self.null_string {
            csv.insert("null_string".to_string(), v.clone().into());
        }
        if self.no_header {
            csv.insert("has_header".to_string(), false.into());
        }
        if self.drop_differing_lines {
            csv.insert("drop_differing_lines".to_string(), true.into());
        }
        if let Some(v) = self.ignore_leading_white_space {
            csv.insert("ignore_leading_white_space".to_string(), v.into());
        }
        if self.use_strict_quotes {
            csv.insert("use_strict_quotes".to_string(), true.into());
        }
        if !csv.is_empty() {
            map.insert("csv".to_string(), csv.into());
        }

        if let Some(level) = &self.log_level {
            map.insert("logging".to_string(), json!({ "level": level }));
        }
        serde_json::Value::Object(map)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load_with(cli.config.as_deref(), cli.overrides())
        .context("loading settings")?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if cli.print_config {
        print!("{}", toml::to_string_pretty(&settings)?);
        return Ok(());
    }

    let options = settings.csv.options();
    let mut tables: Vec<Box<dyn InputTable>> = Vec::with_capacity(cli.tables.len());
    for path in &cli.tables {
        let table = CsvTable::open(path, options.clone())
            .with_context(|| format!("opening {}", path.display()))?;
        tables.push(Box::new(table));
    }

    let substrate = LocalSubstrate::new(settings.num_threads)?;
    let engine = Discovery::new(settings, tables, substrate);
    let outcome = engine.run(Arc::new(SinkCollector::new()))?;

    report(&cli, &outcome)?;
    tracing::info!(
        passes = outcome.summary.passes.len(),
        inds = outcome.inds.len(),
        rules = outcome.rules.len(),
        elapsed_ms = outcome.summary.total_elapsed().as_millis() as u64,
        "run complete"
    );
    Ok(())
}

fn report(cli: &Cli, outcome: &RunOutcome) -> anyhow::Result<()> {
    if let Some(count) = outcome.summary.unary_ind_count {
        println!("{count}");
        return Ok(());
    }

    match &cli.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating {}", path.display()))?;
            let mut out = BufWriter::new(file);
            for ind in &outcome.inds {
                let record = json!({
                    "type": "ind",
                    "dep": ind.dep(),
                    "ref": ind.referenced(),
                    "pretty": outcome.names.ind_label(ind),
                });
                writeln!(out, "{record}")?;
            }
            for rule in &outcome.rules {
                let record = json!({
                    "type": "augmentation_rule",
                    "lhs": rule.lhs(),
                    "rhs": rule.rhs(),
                    "pretty": format!(
                        "{} \u{21D2} {}",
                        outcome.names.ind_label(rule.lhs()),
                        outcome.names.ind_label(rule.rhs())
                    ),
                });
                writeln!(out, "{record}")?;
            }
            out.flush()?;
        }
        None => {
            for ind in &outcome.inds {
                println!("{}", outcome.names.ind_label(ind));
            }
            if !outcome.rules.is_empty() {
                println!("-- augmentation rules --");
                for rule in &outcome.rules {
                    println!(
                        "{} \u{21D2} {}",
                        outcome.names.ind_label(rule.lhs()),
                        outcome.names.ind_label(rule.rhs())
                    );
                }
            }
        }
    }
    Ok(())
}
