#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hanover/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod compare;
pub mod error;
pub mod export;
pub mod summary;

pub use compare::{ColumnMatch, ComparisonReport, compare_tables};
pub use error::{OutputError, Result};
pub use export::{ExportFormat, Exporter};
pub use summary::{ColumnSummary, DEFAULT_PERCENTILES, SummaryTable};

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
