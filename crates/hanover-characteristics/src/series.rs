//! Dated per-security value series.

use crate::error::{CharacteristicError, Result};
use chrono::NaiveDate;
use hanover_data::frame::{date_column, f64_values};
use hanover_data::{SecurityId, SecurityObservation, SecurityPanel};
use polars::prelude::*;
use std::collections::BTreeMap;

/// Values of one security in date order.
#[derive(Debug, Clone, PartialEq)]
pub struct SecuritySeries {
    /// Security
    pub security: SecurityId,
    /// Dates, ascending
    pub dates: Vec<NaiveDate>,
    /// One value per date
    pub values: Vec<Option<f64>>,
}

impl SecuritySeries {
    /// Extract one field from every security of a panel.
    pub fn from_panel(
        panel: &SecurityPanel,
        field: impl Fn(&SecurityObservation) -> Option<f64>,
    ) -> Vec<Self> {
        panel
            .by_security()
            .map(|obs| Self {
                security: obs[0].security,
                dates: obs.iter().map(|o| o.date).collect(),
                values: obs.iter().map(&field).collect(),
            })
            .collect()
    }

    /// Same dates, new values.
    pub fn with_values(&self, values: Vec<Option<f64>>) -> Self {
        Self {
            security: self.security,
            dates: self.dates.clone(),
            values,
        }
    }

    /// Latest value dated on or before `date`.
    pub fn value_on_or_before(&self, date: NaiveDate) -> Option<f64> {
        let idx = self.dates.partition_point(|d| *d <= date);
        idx.checked_sub(1).and_then(|i| self.values[i])
    }

    /// Number of dates.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Whether the series has no dates.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Stack series into one long frame with `security`, `date` and `value` columns.
///
/// Rows keep the order of `series`, so windowed expressions over `security` line up with
/// [`from_long_frame`].
pub fn to_long_frame(series: &[SecuritySeries]) -> Result<DataFrame> {
    let security: Vec<i64> = series
        .iter()
        .flat_map(|s| std::iter::repeat_n(s.security.0, s.len()))
        .collect();
    let dates: Vec<Option<NaiveDate>> = series
        .iter()
        .flat_map(|s| s.dates.iter().copied().map(Some))
        .collect();
    let values: Vec<Option<f64>> = series.iter().flat_map(|s| s.values.iter().copied()).collect();
    Ok(DataFrame::new(vec![
        Series::new("security".into(), security).into(),
        date_column("date", &dates)?,
        Series::new("value".into(), values).into(),
    ])?)
}

/// Read `column` of a frame built by [`to_long_frame`] back into the shape of `series`.
pub fn from_long_frame(
    series: &[SecuritySeries],
    df: &DataFrame,
    column: &str,
) -> Result<Vec<SecuritySeries>> {
    let mut values = f64_values(df, column)?.into_iter();
    let expected: usize = series.iter().map(SecuritySeries::len).sum();
    if values.len() != expected {
        return Err(CharacteristicError::DimensionMismatch {
            expected,
            actual: values.len(),
        });
    }
    Ok(series
        .iter()
        .map(|s| s.with_values(values.by_ref().take(s.len()).collect()))
        .collect())
}

/// A characteristic measured per security and date.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CharacteristicSeries {
    by_security: BTreeMap<SecurityId, SecuritySeries>,
}

impl CharacteristicSeries {
    /// Collect security series.
    pub fn new(series: impl IntoIterator<Item = SecuritySeries>) -> Self {
        Self {
            by_security: series.into_iter().map(|s| (s.security, s)).collect(),
        }
    }

    /// Series of one security.
    pub fn get(&self, security: SecurityId) -> Option<&SecuritySeries> {
        self.by_security.get(&security)
    }

    /// Latest value of `security` dated on or before `date`.
    pub fn value_on_or_before(&self, security: SecurityId, date: NaiveDate) -> Option<f64> {
        self.get(security)?.value_on_or_before(date)
    }

    /// Iterate over securities.
    pub fn iter(&self) -> impl Iterator<Item = &SecuritySeries> {
        self.by_security.values()
    }

    /// Number of securities.
    pub fn len(&self) -> usize {
        self.by_security.len()
    }

    /// Whether there are no securities.
    pub fn is_empty(&self) -> bool {
        self.by_security.is_empty()
    }
}
