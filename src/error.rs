//! Engine Error Types
//!
//! One error enum for the whole discovery engine, mirroring the abstract
//! error kinds of the run controller: configuration, input, substrate,
//! internal invariant, cancellation. There is no local recovery except the
//! per-row `drop_differing_lines` case, which never surfaces an error at
//! all; everything else propagates to `run()`.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Discovery engine errors
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// Invalid or missing setting, surfaced before any pass runs
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Unreadable or malformed input source
    #[error("input error: {0}")]
    Input(String),

    /// I/O failure on an input source
    #[error("input error reading {path}: {source}")]
    InputIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failure reported by the execution substrate
    #[error("substrate failure in job '{job}': {message}")]
    Substrate { job: String, message: String },

    /// Violation of an IND or combination invariant; indicates a bug
    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),

    /// The run controller was aborted mid-run
    #[error("run cancelled")]
    Cancelled,
}

/// Result type for discovery operations
pub type Result<T> = std::result::Result<T, DiscoveryError>;
