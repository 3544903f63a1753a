//! Configuration System
//!
//! Hierarchical settings loading: `incline.toml`, then
//! `incline.local.toml` (git-ignored overrides), then `INCLINE_*`
//! environment variables with `__` section nesting, then programmatic
//! overrides (the CLI layer).
//!
//! ```toml
//! # incline.toml
//! drop_nulls = true
//! max_arity = 3
//! nary_restriction = "no_repetitions"
//! candidate_generator = "binder"
//!
//! [csv]
//! field_separator = ";"
//! null_string = "\\N"
//! ```
//!
//! `drop_nulls` deliberately has no default: the two historical facade
//! defaults disagreed, so the option is required from file, environment or
//! flag, and loading fails fast without it.

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{DiscoveryError, Result};
use crate::generator::{GeneratorKind, NaryRestriction};
use crate::input::csv::CsvOptions;
use crate::pipeline::{EmissionRules, PassConfig};

/// Engine settings, every recognised option of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Width of the column-index field in a packed column id.
    #[serde(default = "default_num_column_bits")]
    pub num_column_bits: u32,

    /// Upper bound on discovered arity; `-1` exhausts.
    #[serde(default = "default_unbounded")]
    pub max_arity: i64,

    /// Stop after the unary pass and report the IND count only.
    #[serde(default)]
    pub only_count_inds: bool,

    /// Cap on columns per table; `-1` for no cap.
    #[serde(default = "default_unbounded")]
    pub max_columns: i64,

    /// Emit only the first N rows of each table; `-1` for all.
    #[serde(default = "default_unbounded")]
    pub sample_rows: i64,

    /// Discard null cells rather than emit them. Required; see module doc.
    pub drop_nulls: bool,

    /// Hint the substrate away from hash-group operators.
    #[serde(default)]
    pub no_group_operators: bool,

    /// Override the strategy's void-exclusion default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_void_inds_from_candidate_generation: Option<bool>,

    /// Column-repetition restriction for generated candidates.
    /// Required whenever `max_arity != 1`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nary_restriction: Option<NaryRestriction>,

    /// Candidate-generation strategy. Required whenever `max_arity != 1`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_generator: Option<GeneratorKind>,

    /// Suppress reflexive `c ⊆ c` INDs.
    #[serde(default = "default_true")]
    pub exclude_trivial_inds: bool,

    /// Validate at most this many candidates per n-ary job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_chunk_size: Option<usize>,

    /// Substrate worker threads; `0` uses every core.
    #[serde(default)]
    pub num_threads: usize,

    #[serde(default)]
    pub csv: CsvSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

/// CSV controls, propagated to the input iterator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvSettings {
    #[serde(default = "default_separator")]
    pub field_separator: char,
    #[serde(default = "default_quote")]
    pub quote_char: char,
    #[serde(default = "default_escape")]
    pub escape_char: char,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub null_string: Option<String>,
    #[serde(default = "default_true")]
    pub has_header: bool,
    #[serde(default = "default_true")]
    pub ignore_leading_white_space: bool,
    #[serde(default)]
    pub use_strict_quotes: bool,
    #[serde(default)]
    pub drop_differing_lines: bool,
}

impl Default for CsvSettings {
    fn default() -> Self {
        CsvSettings {
            field_separator: ',',
            quote_char: '"',
            escape_char: '\\',
            null_string: None,
            has_header: true,
            ignore_leading_white_space: true,
            use_strict_quotes: false,
            drop_differing_lines: false,
        }
    }
}

impl CsvSettings {
    pub fn options(&self) -> CsvOptions {
        CsvOptions {
            field_separator: self.field_separator,
            quote_char: self.quote_char,
            escape_char: self.escape_char,
            null_string: self.null_string.clone(),
            has_header: self.has_header,
            ignore_leading_white_space: self.ignore_leading_white_space,
            use_strict_quotes: self.use_strict_quotes,
            drop_differing_lines: self.drop_differing_lines,
        }
    }
}

/// Logging configuration, consumed by the binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            level: "info".to_string(),
        }
    }
}

fn default_num_column_bits() -> u32 {
    16
}
fn default_unbounded() -> i64 {
    -1
}
fn default_true() -> bool {
    true
}
fn default_separator() -> char {
    ','
}
fn default_quote() -> char {
    '"'
}
fn default_escape() -> char {
    '\\'
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Settings {
    /// All-default settings apart from the required null policy.
    pub fn with_drop_nulls(drop_nulls: bool) -> Settings {
        Settings {
            num_column_bits: default_num_column_bits(),
            max_arity: -1,
            only_count_inds: false,
            max_columns: -1,
            sample_rows: -1,
            drop_nulls,
            no_group_operators: false,
            exclude_void_inds_from_candidate_generation: None,
            nary_restriction: None,
            candidate_generator: None,
            exclude_trivial_inds: true,
            candidate_chunk_size: None,
            num_threads: 0,
            csv: CsvSettings::default(),
            logging: LoggingSettings::default(),
        }
    }

    /// Load from the default locations plus environment overrides.
    pub fn load() -> Result<Settings> {
        Self::extract(
            Figment::new()
                .merge(Toml::file("incline.toml"))
                .merge(Toml::file("incline.local.toml"))
                .merge(Env::prefixed("INCLINE_").split("__")),
        )
    }

    /// Load from a specific file, environment and programmatic overrides.
    ///
    /// `overrides` is a (possibly empty) JSON object whose keys win over
    /// everything else; the CLI builds it from explicit flags.
    pub fn load_with(path: Option<&Path>, overrides: serde_json::Value) -> Result<Settings> {
        let mut figment = Figment::new();
        figment = match path {
            Some(path) => figment.merge(Toml::file(path)),
            None => figment
                .merge(Toml::file("incline.toml"))
                .merge(Toml::file("incline.local.toml")),
        };
        figment = figment.merge(Env::prefixed("INCLINE_").split("__"));
        let has_overrides =
            matches!(&overrides, serde_json::Value::Object(map) if !map.is_empty());
        if has_overrides {
            figment = figment.merge(Serialized::defaults(overrides));
        }
        Self::extract(figment)
    }

    fn extract(figment: Figment) -> Result<Settings> {
        figment
            .extract()
            .map_err(|e| DiscoveryError::Configuration(e.to_string()))
    }

    /// Check cross-option consistency; run before any pass.
    pub fn validate(&self) -> Result<()> {
        if !(1..=31).contains(&self.num_column_bits) {
            return Err(DiscoveryError::Configuration(format!(
                "num_column_bits must be in [1, 31], got {}",
                self.num_column_bits
            )));
        }
        if self.max_arity != -1 && self.max_arity < 1 {
            return Err(DiscoveryError::Configuration(format!(
                "max_arity must be -1 or >= 1, got {}",
                self.max_arity
            )));
        }
        if self.max_columns != -1 && self.max_columns < 1 {
            return Err(DiscoveryError::Configuration(format!(
                "max_columns must be -1 or >= 1, got {}",
                self.max_columns
            )));
        }
        if self.sample_rows < -1 {
            return Err(DiscoveryError::Configuration(format!(
                "sample_rows must be -1 or >= 0, got {}",
                self.sample_rows
            )));
        }
        if self.max_arity != 1 && !self.only_count_inds {
            if self.nary_restriction.is_none() {
                return Err(DiscoveryError::Configuration(
                    "nary_restriction is required when max_arity != 1".to_string(),
                ));
            }
            if self.candidate_generator.is_none() {
                return Err(DiscoveryError::Configuration(
                    "candidate_generator is required when max_arity != 1".to_string(),
                ));
            }
        }
        if self.candidate_chunk_size == Some(0) {
            return Err(DiscoveryError::Configuration(
                "candidate_chunk_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The column cap as an option.
    pub fn max_columns_cap(&self) -> Option<u32> {
        (self.max_columns >= 0).then_some(self.max_columns as u32)
    }

    /// The row sample cap as an option.
    pub fn sample_rows_cap(&self) -> Option<u64> {
        (self.sample_rows >= 0).then_some(self.sample_rows as u64)
    }

    /// The arity bound as an option.
    pub fn max_arity_cap(&self) -> Option<usize> {
        (self.max_arity >= 0).then_some(self.max_arity as usize)
    }

    pub(crate) fn pass_config(&self) -> PassConfig {
        PassConfig {
            rules: EmissionRules {
                drop_nulls: self.drop_nulls,
                drop_differing_lines: self.csv.drop_differing_lines,
            },
            sample_rows: self.sample_rows_cap(),
            sort_based: self.no_group_operators,
            exclude_trivial: self.exclude_trivial_inds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_option_table() {
        let settings = Settings::with_drop_nulls(true);
        assert_eq!(settings.num_column_bits, 16);
        assert_eq!(settings.max_arity, -1);
        assert_eq!(settings.max_columns, -1);
        assert_eq!(settings.sample_rows, -1);
        assert!(!settings.only_count_inds);
        assert!(settings.exclude_trivial_inds);
        assert_eq!(settings.csv.field_separator, ',');
        assert!(settings.csv.has_header);
    }

    #[test]
    fn nary_runs_require_restriction_and_generator() {
        let mut settings = Settings::with_drop_nulls(true);
        assert!(settings.validate().is_err());
        settings.nary_restriction = Some(NaryRestriction::NoRepetitions);
        assert!(settings.validate().is_err());
        settings.candidate_generator = Some(GeneratorKind::Apriori);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn unary_only_runs_need_no_generator() {
        let mut settings = Settings::with_drop_nulls(true);
        settings.max_arity = 1;
        assert!(settings.validate().is_ok());
        settings.max_arity = -1;
        settings.only_count_inds = true;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn caps_convert_to_options() {
        let mut settings = Settings::with_drop_nulls(true);
        assert_eq!(settings.max_columns_cap(), None);
        assert_eq!(settings.sample_rows_cap(), None);
        assert_eq!(settings.max_arity_cap(), None);
        settings.max_columns = 4;
        settings.sample_rows = 100;
        settings.max_arity = 3;
        assert_eq!(settings.max_columns_cap(), Some(4));
        assert_eq!(settings.sample_rows_cap(), Some(100));
        assert_eq!(settings.max_arity_cap(), Some(3));
    }

    #[test]
    fn invalid_bounds_are_rejected() {
        let mut settings = Settings::with_drop_nulls(true);
        settings.max_arity = 0;
        assert!(settings.validate().is_err());
        settings.max_arity = 1;
        settings.num_column_bits = 32;
        assert!(settings.validate().is_err());
        settings.num_column_bits = 16;
        settings.candidate_chunk_size = Some(0);
        assert!(settings.validate().is_err());
    }
}
