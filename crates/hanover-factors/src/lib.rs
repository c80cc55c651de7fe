#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hanover/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod compose;
pub mod error;
pub mod market;
pub mod plan;
pub mod registry;

pub use compose::{FactorSeries, GRID_CELLS, average_series, compose, leg_value};
pub use error::{FactorError, Result};
pub use market::{market_excess_returns, market_returns};
pub use plan::FactorPlan;
pub use registry::{
    FactorCategory, FactorInfo, FactorName, LegRule, available_factors, factors_by_category,
    get_factor_info,
};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
