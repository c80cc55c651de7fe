#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hanover/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod fundamentals;
pub mod outliers;
pub mod prior_returns;
pub mod registry;
pub mod regression;
pub mod series;
pub mod variance;

pub use error::{CharacteristicError, Result};
pub use fundamentals::{AnnualSnapshot, DerivationConfig, book_equity, derive_snapshots};
pub use prior_returns::{PriorWindow, prior_returns};
pub use registry::{
    Bound, Characteristic, CharacteristicInfo, Domain, OutlierPolicy, Predicate, Refresh,
    available_characteristics, get_characteristic_info,
};
pub use regression::{
    OlsKernel, RollingEstimate, RollingKernel, RollingWindow, SecurityEstimates, project_panel,
    roll_panel,
};
pub use series::{CharacteristicSeries, SecuritySeries};
pub use variance::rolling_variance;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
