//! Engine errors.

use hanover_characteristics::{Characteristic, CharacteristicError};
use hanover_data::DataError;
use hanover_factors::FactorError;
use hanover_portfolios::PortfolioError;
use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced by the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Data layer error
    #[error(transparent)]
    Data(#[from] DataError),

    /// Characteristic derivation error
    #[error(transparent)]
    Characteristic(#[from] CharacteristicError),

    /// Sort or aggregation error
    #[error(transparent)]
    Portfolio(#[from] PortfolioError),

    /// Factor composition error
    #[error(transparent)]
    Factor(#[from] FactorError),

    /// An annual characteristic was requested as a periodic one
    #[error("{0} is not a periodic characteristic")]
    NotPeriodic(Characteristic),

    /// Configuration could not be parsed
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// Configuration file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
