//! Rolling windows and the parallel panel driver.

use super::{RollingEstimate, RollingKernel};
use crate::error::{CharacteristicError, Result};
use crate::series::{CharacteristicSeries, SecuritySeries};
use chrono::NaiveDate;
use hanover_data::{Frequency, SecurityId};
use ndarray::parallel::prelude::*;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Trailing window length and the minimum usable observations inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollingWindow {
    /// Window length in periods
    pub length: usize,
    /// Minimum present observations
    pub min_periods: usize,
}

impl RollingWindow {
    /// Daily return variance and residual variance.
    pub const VARIANCE: Self = Self {
        length: 60,
        min_periods: 20,
    };

    /// Create a window; `min_periods` must be between 1 and `length`.
    pub fn new(length: usize, min_periods: usize) -> Result<Self> {
        let window = Self {
            length,
            min_periods,
        };
        window.validate()?;
        Ok(window)
    }

    /// Market beta window at a panel frequency.
    pub const fn beta(frequency: Frequency) -> Self {
        if frequency.is_daily_based() {
            Self {
                length: 60,
                min_periods: 20,
            }
        } else {
            Self {
                length: 60,
                min_periods: 24,
            }
        }
    }

    /// Check the window parameters.
    pub fn validate(&self) -> Result<()> {
        if self.length == 0 || self.min_periods == 0 || self.min_periods > self.length {
            return Err(CharacteristicError::InvalidRollingWindow {
                length: self.length,
                min_periods: self.min_periods,
            });
        }
        Ok(())
    }
}

/// Fit `kernel` over every trailing window of one series.
///
/// `y` holds one response per period; `x` holds the regressors of the same periods, or
/// `None` where they are unavailable. Windows with fewer usable rows than the minimum, or a
/// singular design, produce `None`.
pub fn roll<K: RollingKernel + ?Sized>(
    kernel: &K,
    y: &[Option<f64>],
    x: &[Option<&[f64]>],
    width: usize,
    window: RollingWindow,
) -> Result<Vec<Option<RollingEstimate>>> {
    window.validate()?;
    if x.len() != y.len() {
        return Err(CharacteristicError::DimensionMismatch {
            expected: y.len(),
            actual: x.len(),
        });
    }
    let usable: Vec<Option<(f64, &[f64])>> = y
        .iter()
        .zip(x)
        .map(|(y, x)| match (y, x) {
            (Some(y), Some(x))
                if y.is_finite() && x.len() == width && x.iter().all(|v| v.is_finite()) =>
            {
                Some((*y, *x))
            }
            _ => None,
        })
        .collect();
    let needed = window.min_periods.max(width + 2);

    let mut out = Vec::with_capacity(y.len());
    for s in 0..y.len() {
        let lo = (s + 1).saturating_sub(window.length);
        let rows: Vec<(f64, &[f64])> = usable[lo..=s].iter().flatten().copied().collect();
        if rows.len() < needed {
            out.push(None);
            continue;
        }
        let response = Array1::from_iter(rows.iter().map(|(y, _)| *y));
        let design = Array2::from_shape_fn((rows.len(), width), |(i, j)| rows[i].1[j]);
        match kernel.fit(response.view(), design.view()) {
            Ok(est) => out.push(Some(est)),
            Err(CharacteristicError::SingularDesign) => out.push(None),
            Err(e) => return Err(e),
        }
    }
    Ok(out)
}

/// Rolling estimates of one security.
#[derive(Debug, Clone)]
pub struct SecurityEstimates {
    /// Security
    pub security: SecurityId,
    /// Period dates
    pub dates: Vec<NaiveDate>,
    /// One estimate per date
    pub estimates: Vec<Option<RollingEstimate>>,
}

impl SecurityEstimates {
    /// Project one number out of every estimate.
    pub fn project(&self, f: impl Fn(&RollingEstimate) -> Option<f64>) -> SecuritySeries {
        SecuritySeries {
            security: self.security,
            dates: self.dates.clone(),
            values: self.estimates.iter().map(|e| e.as_ref().and_then(&f)).collect(),
        }
    }
}

/// Fit `kernel` over every security in parallel.
///
/// `responses` are per-security dated series; `regressors` maps each date to one row of
/// `width` regressor values.
pub fn roll_panel<K: RollingKernel + ?Sized>(
    kernel: &K,
    responses: &[SecuritySeries],
    regressors: &BTreeMap<NaiveDate, Vec<f64>>,
    width: usize,
    window: RollingWindow,
) -> Result<Vec<SecurityEstimates>> {
    window.validate()?;
    let estimates = responses
        .par_iter()
        .map(|series| {
            let x: Vec<Option<&[f64]>> = series
                .dates
                .iter()
                .map(|d| regressors.get(d).map(Vec::as_slice))
                .collect();
            let estimates = roll(kernel, &series.values, &x, width, window)?;
            Ok(SecurityEstimates {
                security: series.security,
                dates: series.dates.clone(),
                estimates,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    tracing::debug!(
        securities = estimates.len(),
        window = window.length,
        "fitted rolling regressions"
    );
    Ok(estimates)
}

/// Project a panel of estimates into a characteristic series.
pub fn project_panel(
    estimates: &[SecurityEstimates],
    f: impl Fn(&RollingEstimate) -> Option<f64>,
) -> CharacteristicSeries {
    CharacteristicSeries::new(estimates.iter().map(|e| e.project(&f)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regression::OlsKernel;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn d(i: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + chrono::Days::new(i)
    }

    #[test]
    fn test_window_validation() {
        assert!(RollingWindow::new(60, 20).is_ok());
        assert!(RollingWindow::new(10, 20).is_err());
        assert!(RollingWindow::new(0, 0).is_err());
        assert_eq!(RollingWindow::beta(Frequency::Monthly).min_periods, 24);
        assert_eq!(RollingWindow::beta(Frequency::Daily).min_periods, 20);
    }

    #[test]
    fn test_roll_recovers_beta() {
        let mut rng = StdRng::seed_from_u64(7);
        let market: Vec<[f64; 1]> = (0..80).map(|_| [rng.gen_range(-0.02..0.02)]).collect();
        let y: Vec<Option<f64>> = market.iter().map(|m| Some(0.001 + 1.5 * m[0])).collect();
        let x: Vec<Option<&[f64]>> = market.iter().map(|m| Some(&m[..])).collect();

        let out = roll(&OlsKernel::new(), &y, &x, 1, RollingWindow::new(60, 24).unwrap()).unwrap();
        assert!(out[22].is_none());
        let est = out[23].as_ref().unwrap();
        assert_eq!(est.observations, 24);
        assert_relative_eq!(est.slope(0).unwrap(), 1.5, epsilon = 1e-8);
        assert_eq!(out[79].as_ref().unwrap().observations, 60);
    }

    #[test]
    fn test_roll_skips_missing_rows() {
        let market: Vec<[f64; 1]> = (0..10).map(|i| [i as f64 * 0.01]).collect();
        let mut y: Vec<Option<f64>> = market.iter().map(|m| Some(2.0 * m[0])).collect();
        y[3] = None;
        let mut x: Vec<Option<&[f64]>> = market.iter().map(|m| Some(&m[..])).collect();
        x[5] = None;
        let out = roll(&OlsKernel::new(), &y, &x, 1, RollingWindow::new(10, 5).unwrap()).unwrap();
        // indices 0..=6 leave five usable rows
        assert!(out[5].is_none());
        assert_eq!(out[6].as_ref().unwrap().observations, 5);
    }

    #[test]
    fn test_roll_panel_dates_align() {
        let regressors: BTreeMap<NaiveDate, Vec<f64>> =
            (0..30).map(|i| (d(i), vec![(i % 7) as f64 * 0.01])).collect();
        let series = SecuritySeries {
            security: SecurityId(1),
            dates: (0..30).map(d).collect(),
            values: (0..30).map(|i| Some(-0.5 * (i % 7) as f64 * 0.01)).collect(),
        };
        let estimates = roll_panel(
            &OlsKernel::new(),
            &[series],
            &regressors,
            1,
            RollingWindow::new(20, 10).unwrap(),
        )
        .unwrap();
        let betas = project_panel(&estimates, |e| e.slope(0));
        let beta = betas.value_on_or_before(SecurityId(1), d(29)).unwrap();
        assert_relative_eq!(beta, -0.5, epsilon = 1e-8);
    }
}
