//! Risk-free rate series.

use crate::calendar::Frequency;
use crate::error::Result;
use crate::frame::{date_values, f64_values};
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::BTreeMap;

/// Per-period risk-free rate keyed by period end at the base frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskFreeSeries {
    frequency: Frequency,
    rates: BTreeMap<NaiveDate, f64>,
}

impl RiskFreeSeries {
    /// Build from `(date, rate)` pairs.
    pub fn new(frequency: Frequency, rates: impl IntoIterator<Item = (NaiveDate, f64)>) -> Self {
        let frequency = frequency.base();
        Self {
            frequency,
            rates: rates
                .into_iter()
                .map(|(d, r)| (frequency.period_end(d), r))
                .collect(),
        }
    }

    /// Build from the risk-free feed.
    pub fn from_frame(frequency: Frequency, df: &DataFrame) -> Result<Self> {
        let dates = date_values(df, "date")?;
        let rates = f64_values(df, "rf")?;
        let pairs = dates
            .into_iter()
            .zip(rates)
            .filter_map(|(d, r)| Some((d?, r?)))
            .collect::<Vec<_>>();
        Ok(Self::new(frequency, pairs))
    }

    /// Rate of the period containing `date`.
    pub fn rate_for(&self, date: NaiveDate) -> Option<f64> {
        self.rates.get(&self.frequency.period_end(date)).copied()
    }

    /// Base frequency of the series.
    pub const fn frequency(&self) -> Frequency {
        self.frequency
    }

    /// Number of periods.
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    /// Whether the series is empty.
    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}
