//! Error types for reporting and export.

use hanover_data::Frequency;
use thiserror::Error;

/// Result type for output operations.
pub type Result<T> = std::result::Result<T, OutputError>;

/// Errors that can occur while comparing or exporting tables.
#[derive(Debug, Error)]
pub enum OutputError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Writer produced invalid UTF-8.
    #[error("Invalid UTF-8 output: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Tables at different frequencies cannot be compared.
    #[error("Cannot compare {ours} table with {reference} reference")]
    FrequencyMismatch {
        /// Frequency of the computed table
        ours: Frequency,
        /// Frequency of the reference table
        reference: Frequency,
    },
}

impl<W> From<csv::IntoInnerError<W>> for OutputError {
    fn from(e: csv::IntoInnerError<W>) -> Self {
        Self::Io(e.into_error())
    }
}
