//! Error types for data operations.

use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur during data operations.
#[derive(Debug, Error)]
pub enum DataError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Data parsing error
    #[error("Data parsing error: {0}")]
    Parse(String),

    /// Invalid date range
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        /// Start date of the range
        start: String,
        /// End date of the range
        end: String,
    },

    /// Unknown frequency code
    #[error("Invalid frequency '{0}': expected one of D, W, M, Q, A")]
    InvalidFrequency(String),

    /// A feed frame is missing a required column
    #[error("Feed '{feed}' is missing required column '{column}'")]
    Schema {
        /// Feed that was queried
        feed: String,
        /// Column that was expected
        column: String,
    },

    /// Missing data
    #[error("Missing data for {feed}: {reason}")]
    MissingData {
        /// Feed or dataset that was queried
        feed: String,
        /// Reason for missing data
        reason: String,
    },

    /// Table rows and columns disagree
    #[error("Row has {actual} values but the table has {expected} columns")]
    ShapeMismatch {
        /// Number of columns in the table
        expected: usize,
        /// Number of values supplied
        actual: usize,
    },

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
