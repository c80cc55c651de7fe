#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hanover/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod aggregate;
pub mod breakpoints;
pub mod buckets;
pub mod compound;
pub mod config;
pub mod error;
pub mod formation;
pub mod sort;
pub mod table;

pub use aggregate::{
    BucketStats, Weighting, characteristic_tables, counts_table, returns_table, sort_stats,
};
pub use breakpoints::{
    BreakpointSet, BucketScheme, ReferenceRow, SUPPORTED_BUCKET_COUNTS, period_breakpoints,
};
pub use buckets::{BucketKey, MAX_DIMENSIONS, SortMode, SortSpec, assign_bucket};
pub use compound::{Rollup, average_to, compound_returns};
pub use config::{FormationConfig, UniverseConfig};
pub use error::{PortfolioError, Result};
pub use formation::{
    FormationRecord, WeightInfo, build_formation_records, compute_weights, lag_attach,
};
pub use sort::{Assignment, SortInputs, SortOutcome, run_sort};
pub use table::CharacteristicTables;

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
