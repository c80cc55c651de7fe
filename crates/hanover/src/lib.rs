#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hanover/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod engine;
pub mod error;
pub mod memo;
pub mod regression;

// Re-export main types from sub-crates
pub use hanover_characteristics as characteristics;
pub use hanover_data as data;
pub use hanover_factors as factors;
pub use hanover_output as output;
pub use hanover_portfolios as portfolios;

pub use config::{EngineConfig, WindowConfig};
pub use engine::{Engine, EngineStats, lookback_months};
pub use error::{EngineError, Result};
pub use memo::{CachePolicy, MemoKey, MemoStats};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
