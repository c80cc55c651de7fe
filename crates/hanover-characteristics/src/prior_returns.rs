//! Compounded prior returns.

use crate::error::{CharacteristicError, Result};
use crate::series::{SecuritySeries, from_long_frame, to_long_frame};
use hanover_data::Frequency;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Window of prior periods, counted back from the sort date.
///
/// `PRIOR_2_12` skips the most recent month and compounds the eleven before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PriorWindow {
    /// First period back (1 = most recent)
    pub start: u32,
    /// Last period back
    pub end: u32,
}

/// Monthly windows with a daily equivalent, in trading days.
const DAILY_EQUIVALENTS: [((u32, u32), (u32, u32)); 3] =
    [((2, 12), (21, 250)), ((1, 1), (1, 20)), ((13, 60), (251, 1250))];

impl PriorWindow {
    /// Create a window; `start` must be at least one and not after `end`.
    pub fn new(start: u32, end: u32) -> Result<Self> {
        if start == 0 || start > end {
            return Err(CharacteristicError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Window expressed in periods of `frequency`'s base panel.
    ///
    /// Monthly windows map to fixed trading-day windows on daily panels; other windows have
    /// no daily equivalent.
    pub fn at_frequency(&self, frequency: Frequency) -> Result<(usize, usize)> {
        if !frequency.is_daily_based() {
            return Ok((self.start as usize, self.end as usize));
        }
        DAILY_EQUIVALENTS
            .iter()
            .find(|(monthly, _)| *monthly == (self.start, self.end))
            .map(|(_, (j, k))| (*j as usize, *k as usize))
            .ok_or(CharacteristicError::UnsupportedDailyWindow {
                start: self.start,
                end: self.end,
            })
    }
}

/// Compounded return over offsets `j - 1 ..= k - 1` back from each date, per security.
///
/// The value at index `s` compounds returns `s - (k - 1)` through `s - (j - 1)`, so once it is
/// attached to the following observation `t` it covers periods `t - k` through `t - j`. Any
/// missing return in the window yields a missing value.
pub fn prior_returns(
    returns: &[SecuritySeries],
    j: usize,
    k: usize,
) -> Result<Vec<SecuritySeries>> {
    if j == 0 || j > k {
        return Ok(returns
            .iter()
            .map(|s| s.with_values(vec![None; s.len()]))
            .collect());
    }
    let span = k - j + 1;
    let df = to_long_frame(returns)?
        .lazy()
        .with_columns([(col("value") + lit(1.0))
            .log(std::f64::consts::E)
            .shift(lit((j - 1) as i64))
            .over([col("security")])
            .alias("log_growth")])
        .with_columns([(col("log_growth")
            .rolling_sum(RollingOptionsFixedWindow {
                window_size: span,
                min_periods: span,
                ..Default::default()
            })
            .over([col("security")])
            .exp()
            - lit(1.0))
        .alias("prior")])
        .collect()?;
    from_long_frame(returns, &df, "prior")
}
