//! Error types for factor composition.

use hanover_data::DataError;
use hanover_portfolios::PortfolioError;
use thiserror::Error;

/// Result type for factor operations.
pub type Result<T> = std::result::Result<T, FactorError>;

/// Errors raised while planning or composing factors.
#[derive(Debug, Error)]
pub enum FactorError {
    /// Factor code not in the registry
    #[error("Unknown factor '{0}'")]
    Unknown(String),

    /// No factors requested
    #[error("No factors requested")]
    EmptyPlan,

    /// Sort table is not a 2x3 grid
    #[error("Factor sort must have {expected} buckets, got {actual}")]
    GridShape {
        /// Expected bucket count
        expected: usize,
        /// Actual bucket count
        actual: usize,
    },

    /// A sort the plan needs was not supplied
    #[error("Missing sort on {0}")]
    MissingSort(String),

    /// Portfolio error
    #[error(transparent)]
    Portfolio(#[from] PortfolioError),

    /// Data layer error
    #[error(transparent)]
    Data(#[from] DataError),
}
