#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hanover/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cache;
pub mod calendar;
pub mod error;
pub mod feed;
pub mod frame;
pub mod fundamentals;
pub mod ids;
pub mod link;
pub mod panel;
pub mod reference;
pub mod riskfree;
pub mod source;
pub mod stats;
pub mod table;

pub use cache::{CacheStats, FeedStats, SqliteCache};
pub use calendar::{DateRange, Frequency};
pub use error::{DataError, Result};
pub use feed::Feed;
pub use fundamentals::{FundamentalRecord, FundamentalsPanel};
pub use ids::{CompanyId, CompanyKey, SecurityId};
pub use link::{Link, LinkTable};
pub use panel::{SecurityObservation, SecurityPanel};
pub use riskfree::RiskFreeSeries;
pub use source::{CsvDirectorySource, DataSource, InMemorySource, Session};
pub use table::{TableRow, TimeSeriesTable};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
