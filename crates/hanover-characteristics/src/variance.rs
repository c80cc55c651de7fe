//! Rolling return variance.

use crate::error::{CharacteristicError, Result};
use crate::regression::RollingWindow;
use crate::series::{SecuritySeries, from_long_frame, to_long_frame};
use polars::prelude::*;

/// Sample variance of the trailing `window.length` returns ending at each date, per security.
///
/// Missing returns are skipped; fewer than `window.min_periods` present returns yields a
/// missing value.
pub fn rolling_variance(
    returns: &[SecuritySeries],
    window: RollingWindow,
) -> Result<Vec<SecuritySeries>> {
    window.validate()?;
    if window.min_periods < 2 {
        return Err(CharacteristicError::InvalidRollingWindow {
            length: window.length,
            min_periods: window.min_periods,
        });
    }
    let df = to_long_frame(returns)?
        .lazy()
        .with_columns([col("value")
            .rolling_var(RollingOptionsFixedWindow {
                window_size: window.length,
                min_periods: window.min_periods,
                ..Default::default()
            })
            .over([col("security")])
            .alias("variance")])
        .collect()?;
    from_long_frame(returns, &df, "variance")
}
