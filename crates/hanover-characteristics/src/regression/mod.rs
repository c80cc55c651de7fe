//! Rolling time-series regressions
//!
//! Market beta and residual variance come from rolling regressions of a security's excess
//! returns on factor returns. The numeric work sits behind the [`RollingKernel`] trait so it
//! can be swapped; [`OlsKernel`] is the default.

pub mod ols;
pub mod rolling;

pub use ols::OlsKernel;
pub use rolling::{RollingWindow, SecurityEstimates, project_panel, roll, roll_panel};

use crate::error::Result;
use ndarray::{Array1, ArrayView1, ArrayView2};

/// Coefficients and residual variance of one window.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingEstimate {
    /// Intercept followed by one slope per regressor
    pub coefficients: Array1<f64>,
    /// Residual variance with `n - p` degrees of freedom
    pub residual_variance: f64,
    /// Observations used
    pub observations: usize,
}

impl RollingEstimate {
    /// Slope on regressor `index` (zero-based, excluding the intercept).
    pub fn slope(&self, index: usize) -> Option<f64> {
        self.coefficients.get(index + 1).copied()
    }
}

/// Trait for regression kernels applied to one window of data
pub trait RollingKernel: Send + Sync {
    /// Fit `y` on the columns of `x` plus an intercept.
    ///
    /// # Arguments
    /// * `y` - Response, one entry per row
    /// * `x` - Regressors, one row per observation and one column per regressor
    ///
    /// Every entry is finite; rows with missing data are removed before the call.
    fn fit(&self, y: ArrayView1<'_, f64>, x: ArrayView2<'_, f64>) -> Result<RollingEstimate>;
}
