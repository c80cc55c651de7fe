//! Error types for characteristic derivation.

use hanover_data::DataError;
use thiserror::Error;

/// Result type for characteristic operations.
pub type Result<T> = std::result::Result<T, CharacteristicError>;

/// Configuration errors raised while setting up a derivation.
///
/// Data insufficiency never raises; it produces missing values.
#[derive(Debug, Error)]
pub enum CharacteristicError {
    /// Characteristic code not in the registry
    #[error("Unknown characteristic '{0}'")]
    Unknown(String),

    /// Prior-return window with start after end or a zero start
    #[error("Invalid prior-return window {start}-{end}")]
    InvalidWindow {
        /// First period back
        start: u32,
        /// Last period back
        end: u32,
    },

    /// Prior-return window with no daily equivalent
    #[error("Prior-return window {start}-{end} has no daily equivalent; use 2-12, 1-1 or 13-60")]
    UnsupportedDailyWindow {
        /// First month back
        start: u32,
        /// Last month back
        end: u32,
    },

    /// Regression design does not match the response
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },

    /// Normal equations could not be solved
    #[error("Singular regression design")]
    SingularDesign,

    /// Rolling window parameters are inconsistent
    #[error("Invalid rolling window: length {length}, minimum {min_periods}")]
    InvalidRollingWindow {
        /// Window length
        length: usize,
        /// Minimum observations
        min_periods: usize,
    },

    /// Data layer error
    #[error(transparent)]
    Data(#[from] DataError),

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
}
