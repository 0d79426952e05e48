use thiserror::Error;

use crate::data::timestamp::DecodeError;

/// Every failure the analytic core can surface to its caller.
///
/// Row-local conditions (`DecodeFailure`, `FieldCountMismatch`) are produced
/// per row and tallied by the loader; they never abort a load on their own.
#[derive(Debug, Error)]
pub enum FlightError {
    #[error(transparent)]
    DecodeFailure(#[from] DecodeError),

    #[error("input contains no data rows")]
    EmptyInput,

    #[error("none of the {rows} data rows has the expected {expected} fields")]
    NoValidRows { rows: usize, expected: usize },

    #[error("line {line}: expected {expected} fields, found {found}")]
    FieldCountMismatch {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("spectral analysis needs at least 2 samples, got {found}")]
    InsufficientSamples { found: usize },

    #[error("anomaly threshold must be a positive number of standard deviations, got {0}")]
    InvalidThreshold(f64),

    #[error("sampling rate must be positive and finite, got {0} Hz")]
    InvalidSamplingRate(f64),

    #[error("delimiter {0:?} is not a single-byte ASCII character")]
    InvalidDelimiter(char),

    #[error("no channel named '{0}'")]
    UnknownChannel(String),

    #[error("FFT failed: {0}")]
    Transform(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),

    #[error(transparent)]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FlightError>;
