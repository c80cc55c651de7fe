//! Error types for portfolio sorts.

use hanover_characteristics::CharacteristicError;
use hanover_data::{DataError, Frequency};
use thiserror::Error;

/// Result type for portfolio operations.
pub type Result<T> = std::result::Result<T, PortfolioError>;

/// Errors raised while configuring or running a sort.
#[derive(Debug, Error)]
pub enum PortfolioError {
    /// Bucket count outside the supported set
    #[error("Unsupported bucket count {0}; use one of 2, 3, 4, 5, 6, 8, 10, 20, 25, 50, 100")]
    UnsupportedBucketCount(usize),

    /// Characteristic and bucket-count lists differ in length
    #[error("Dimension mismatch: {characteristics} characteristics but {counts} bucket counts")]
    DimensionMismatch {
        /// Number of characteristics
        characteristics: usize,
        /// Number of bucket counts
        counts: usize,
    },

    /// More than three sort dimensions
    #[error("Too many sort dimensions: {0} (at most 3)")]
    TooManyDimensions(usize),

    /// Sort without dimensions
    #[error("A sort needs at least one characteristic")]
    EmptySort,

    /// Same characteristic used twice
    #[error("Characteristic '{0}' appears more than once in the sort")]
    DuplicateCharacteristic(String),

    /// Weighting code other than `vw` or `ew`
    #[error("Unknown weighting '{0}'; use vw or ew")]
    UnknownWeighting(String),

    /// No reference observation in any period of the range
    #[error("Reference universe is empty for sort {sort} over {range}")]
    EmptyReferenceUniverse {
        /// Sort description
        sort: String,
        /// Requested range
        range: String,
    },

    /// Compounding target finer than, or unrelated to, the table frequency
    #[error("Cannot convert {from} data to {to}")]
    IncompatibleFrequency {
        /// Table frequency
        from: Frequency,
        /// Requested frequency
        to: Frequency,
    },

    /// Data layer error
    #[error(transparent)]
    Data(#[from] DataError),

    /// Characteristic error
    #[error(transparent)]
    Characteristic(#[from] CharacteristicError),

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
}
