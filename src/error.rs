//! Error types for each stage of an optimization run

use std::path::PathBuf;
use thiserror::Error;

/// Failure to obtain a historical series. Fatal for the current run.
#[derive(Debug, Error)]
pub enum DataFetchError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned status {0}")]
    Status(u16),

    #[error("no candles returned for {symbol} {interval}")]
    Empty { symbol: String, interval: String },

    #[error("failed to read {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure of a single candidate. The sweep drops the candidate and continues.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("series has {got} bars, need at least {needed}")]
    InsufficientData { got: usize, needed: usize },

    #[error("invalid price at bar {0}")]
    InvalidPrice(usize),

    #[error("evaluation panicked: {0}")]
    Panicked(String),
}

/// Failure to write or read the cache file
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize cache record: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to parse cache file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Reasons a full optimization run produces nothing usable
#[derive(Debug, Error)]
pub enum RunError {
    #[error("data fetch failed: {0}")]
    DataFetch(#[from] DataFetchError),

    #[error("no candidate reached the trade floor ({tested} tested)")]
    NoQualifyingResults { tested: usize },
}
