use std::path::PathBuf;

use thiserror::Error;

/// Rejected analysis configuration. Raised before any row is filtered or scanned.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("threshold must be a finite percentage within [0, 100], got {value}")]
    ThresholdOutOfRange { value: f64 },
    #[error("lookback window must be non-negative, got {months} months")]
    NegativeLookback { months: i64 },
    #[error("lookback window of {months} months is too large")]
    LookbackTooLarge { months: i64 },
    #[error("invalid series pattern '{pattern}', expected a code like GB or a prefix like W*")]
    InvalidSeriesPattern { pattern: String },
}

/// Failures reading or interpreting an input file as a whole.
///
/// Individual malformed rows never surface here; they are dropped and counted.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("header is missing required column '{column}'")]
    MissingColumn { column: &'static str },
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Umbrella error for the parse-then-analyze entry points.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Data(#[from] DataError),
}
