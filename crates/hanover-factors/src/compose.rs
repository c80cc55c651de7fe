//! Leg arithmetic on 2x3 sort tables.

use crate::error::{FactorError, Result};
use crate::registry::LegRule;
use chrono::NaiveDate;
use hanover_data::TimeSeriesTable;
use std::collections::BTreeMap;

/// Size buckets of a factor sort.
pub const SIZE_BUCKETS: usize = 2;

/// Buckets on the second dimension of a factor sort.
pub const OTHER_BUCKETS: usize = 3;

/// Cells in a factor sort.
pub const GRID_CELLS: usize = SIZE_BUCKETS * OTHER_BUCKETS;

/// A factor series keyed by period end.
pub type FactorSeries = BTreeMap<NaiveDate, Option<f64>>;

const fn cell(size: usize, other: usize) -> usize {
    size * OTHER_BUCKETS + other
}

fn mean_of(row: &[Option<f64>], cells: impl IntoIterator<Item = usize>) -> Option<f64> {
    let values = cells
        .into_iter()
        .map(|c| row[c])
        .collect::<Option<Vec<f64>>>()?;
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Apply `rule` to one period of a 2x3 grid in row-major order (size first).
///
/// Returns `None` when any leg is missing. `MarketExcess` has no legs and always yields `None`.
pub fn leg_value(rule: LegRule, row: &[Option<f64>]) -> Option<f64> {
    if row.len() != GRID_CELLS {
        return None;
    }
    let high_minus_low = || {
        let high = mean_of(row, (0..SIZE_BUCKETS).map(|s| cell(s, OTHER_BUCKETS - 1)))?;
        let low = mean_of(row, (0..SIZE_BUCKETS).map(|s| cell(s, 0)))?;
        Some(high - low)
    };
    match rule {
        LegRule::SmallMinusBig => {
            let small = mean_of(row, (0..OTHER_BUCKETS).map(|o| cell(0, o)))?;
            let big = mean_of(row, (0..OTHER_BUCKETS).map(|o| cell(1, o)))?;
            Some(small - big)
        }
        LegRule::HighMinusLow => high_minus_low(),
        LegRule::LowMinusHigh => high_minus_low().map(|v| -v),
        LegRule::MarketExcess => None,
    }
}

/// Apply `rule` to every row of a 2x3 returns table.
pub fn compose(rule: LegRule, table: &TimeSeriesTable) -> Result<FactorSeries> {
    let width = table.columns().len();
    if width != GRID_CELLS {
        return Err(FactorError::GridShape {
            expected: GRID_CELLS,
            actual: width,
        });
    }
    Ok(table
        .rows()
        .iter()
        .map(|row| (row.date, leg_value(rule, &row.values)))
        .collect())
}

/// Period-by-period mean of several estimates; missing when any estimate is missing.
pub fn average_series(series: &[FactorSeries]) -> FactorSeries {
    let dates: std::collections::BTreeSet<NaiveDate> =
        series.iter().flat_map(|s| s.keys().copied()).collect();
    dates
        .into_iter()
        .map(|date| {
            let values = series
                .iter()
                .map(|s| s.get(&date).copied().flatten())
                .collect::<Option<Vec<f64>>>();
            let mean = values
                .filter(|v| !v.is_empty())
                .map(|v| v.iter().sum::<f64>() / v.len() as f64);
            (date, mean)
        })
        .collect()
}
