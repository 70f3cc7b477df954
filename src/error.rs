//! Typed error taxonomy for the search core.
//!
//! Model-loading errors are fatal for the run; per-window errors
//! (`MatrixTooLarge`) are contained at the worker boundary and surfaced as
//! aggregate counts in the run statistics.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or checking a covariance model file.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("malformed model file {path}: {reason} (line {line})")]
    Format {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("model consistency check failed for {path}: {reason}")]
    Checksum { path: PathBuf, reason: String },

    #[error("unsupported model feature in {path}: {feature}")]
    UnsupportedFeature { path: PathBuf, feature: String },

    #[error("cannot read model file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while streaming database records.
#[derive(Debug, Error)]
pub enum SequenceError {
    #[error("cannot read sequence input {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed record {record} in {path}: {reason}")]
    Parse {
        path: PathBuf,
        record: String,
        reason: String,
    },
}

/// Per-window alignment failures. Recoverable: the caller skips the window
/// and keeps a degraded-region count.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(
        "DP matrix estimate {estimate_mb:.1} MB exceeds ceiling {limit_mb:.1} MB for window {start}..{end}"
    )]
    MatrixTooLarge {
        estimate_mb: f64,
        limit_mb: f64,
        start: usize,
        end: usize,
    },
}

/// Raised when E-value gating is requested against a model without
/// calibration parameters. Recoverable only by explicit score-only gating.
#[derive(Debug, Error)]
#[error("model '{model}' carries no calibration parameters; E-value gating requires a calibrated model (set a score threshold with -T to search anyway)")]
pub struct UncalibratedModelError {
    pub model: String,
}
