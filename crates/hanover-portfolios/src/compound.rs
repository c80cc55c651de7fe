//! Frequency conversion of bucket tables.

use crate::error::{PortfolioError, Result};
use chrono::NaiveDate;
use hanover_data::{DateRange, Frequency, TimeSeriesTable};
use std::collections::BTreeMap;

/// How sub-period values combine into one period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rollup {
    /// `exp(sum(ln(1 + r))) - 1`
    Compound,
    /// Arithmetic mean
    Average,
}

fn combine(rollup: Rollup, values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(match rollup {
        Rollup::Compound => values.iter().map(|r| (1.0 + r).ln()).sum::<f64>().exp() - 1.0,
        Rollup::Average => values.iter().sum::<f64>() / values.len() as f64,
    })
}

/// Whether `from` rows can be grouped into `to` periods.
fn can_roll(from: Frequency, to: Frequency) -> bool {
    from == to || from == Frequency::Daily || (from < to && from != Frequency::Weekly)
}

/// Whether the annual period ending at `period_end` is cut off by the end of `range`.
fn incomplete(target: Frequency, period_end: NaiveDate, range: &DateRange) -> bool {
    target == Frequency::Annual && range.end() < period_end
}

/// Convert `table` to `target` frequency.
///
/// Rows are grouped by the calendar period end of `target`; each column combines its present
/// sub-period values and is missing when none are present. An annual period that extends
/// past the end of `range` is dropped.
pub fn rollup(
    table: &TimeSeriesTable,
    target: Frequency,
    range: &DateRange,
    how: Rollup,
) -> Result<TimeSeriesTable> {
    let from = table.frequency();
    if !can_roll(from, target) {
        return Err(PortfolioError::IncompatibleFrequency { from, to: target });
    }
    let mut out = TimeSeriesTable::new(target, table.columns().to_vec());
    if target == from {
        for row in table.rows() {
            out.push_row(row.date, row.values.clone())?;
        }
        return Ok(out);
    }

    let width = table.columns().len();
    let mut groups: BTreeMap<NaiveDate, Vec<Vec<f64>>> = BTreeMap::new();
    for row in table.rows() {
        let present = groups
            .entry(target.period_end(row.date))
            .or_insert_with(|| vec![Vec::new(); width]);
        for (col, value) in row.values.iter().enumerate() {
            if let Some(v) = value {
                present[col].push(*v);
            }
        }
    }
    for (period_end, columns) in groups {
        if incomplete(target, period_end, range) {
            tracing::debug!(%period_end, "dropping incomplete annual period");
            continue;
        }
        let values = columns.iter().map(|v| combine(how, v)).collect();
        out.push_row(period_end, values)?;
    }
    Ok(out)
}

/// Compound returns to `target` frequency.
pub fn compound_returns(
    table: &TimeSeriesTable,
    target: Frequency,
    range: &DateRange,
) -> Result<TimeSeriesTable> {
    rollup(table, target, range, Rollup::Compound)
}

/// Average counts or characteristics to `target` frequency.
pub fn average_to(
    table: &TimeSeriesTable,
    target: Frequency,
    range: &DateRange,
) -> Result<TimeSeriesTable> {
    rollup(table, target, range, Rollup::Average)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::Datelike;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn monthly(values: &[(NaiveDate, Option<f64>)]) -> TimeSeriesTable {
        let mut t = TimeSeriesTable::new(Frequency::Monthly, vec!["p".into()]);
        for (date, v) in values {
            t.push_row(*date, vec![*v]).unwrap();
        }
        t
    }

    #[test]
    fn test_quarterly_compounding_skips_missing() {
        let table = monthly(&[
            (d(2020, 1, 31), Some(0.1)),
            (d(2020, 2, 29), None),
            (d(2020, 3, 31), Some(-0.1)),
            (d(2020, 4, 30), None),
        ]);
        let range = DateRange::new(d(2020, 1, 1), d(2020, 6, 30)).unwrap();
        let q = compound_returns(&table, Frequency::Quarterly, &range).unwrap();
        assert_eq!(q.dates(), vec![d(2020, 3, 31), d(2020, 6, 30)]);
        assert_relative_eq!(q.get(d(2020, 3, 31), "p").unwrap(), 1.1 * 0.9 - 1.0, epsilon = 1e-12);
        assert_eq!(q.get(d(2020, 6, 30), "p"), None);
    }

    #[test]
    fn test_incomplete_annual_period_dropped() {
        let table = monthly(&[(d(2019, 12, 31), Some(0.01)), (d(2020, 1, 31), Some(0.02))]);
        let range = DateRange::new(d(2019, 1, 1), d(2020, 6, 30)).unwrap();
        let a = compound_returns(&table, Frequency::Annual, &range).unwrap();
        assert_eq!(a.dates(), vec![d(2019, 12, 31)]);
    }

    #[test]
    fn test_average_counts() {
        let table = monthly(&[(d(2020, 1, 31), Some(10.0)), (d(2020, 2, 29), Some(20.0))]);
        let range = DateRange::new(d(2020, 1, 1), d(2020, 3, 31)).unwrap();
        let q = average_to(&table, Frequency::Quarterly, &range).unwrap();
        assert_relative_eq!(q.get(d(2020, 3, 31), "p").unwrap(), 15.0);
    }

    #[test]
    fn test_incompatible_frequency() {
        let table = monthly(&[]);
        let range = DateRange::new(d(2020, 1, 1), d(2020, 3, 31)).unwrap();
        assert!(matches!(
            compound_returns(&table, Frequency::Weekly, &range),
            Err(PortfolioError::IncompatibleFrequency { .. })
        ));
        assert!(matches!(
            compound_returns(&table, Frequency::Daily, &range),
            Err(PortfolioError::IncompatibleFrequency { .. })
        ));
    }

    #[test]
    fn test_compounding_idempotent_randomized() {
        let mut rng = StdRng::seed_from_u64(11);
        let start = d(2018, 1, 1);
        let mut daily = TimeSeriesTable::new(Frequency::Daily, vec!["p".into()]);
        let mut date = start;
        while date.year() < 2020 {
            let v = (rng.gen_range(0.0..1.0) > 0.05).then(|| rng.gen_range(-0.03..0.03));
            daily.push_row(date, vec![v]).unwrap();
            date = date.succ_opt().unwrap();
        }
        let range = DateRange::new(start, d(2019, 12, 31)).unwrap();

        let direct = compound_returns(&daily, Frequency::Annual, &range).unwrap();
        let by_month = compound_returns(&daily, Frequency::Monthly, &range).unwrap();
        let via_monthly = compound_returns(&by_month, Frequency::Annual, &range).unwrap();

        assert_eq!(direct.dates(), via_monthly.dates());
        for date in direct.dates() {
            assert_relative_eq!(
                direct.get(date, "p").unwrap(),
                via_monthly.get(date, "p").unwrap(),
                epsilon = 1e-10
            );
        }
    }
}
