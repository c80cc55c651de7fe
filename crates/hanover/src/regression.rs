//! Inputs of the rolling beta and residual-variance regressions.

use chrono::NaiveDate;
use hanover_characteristics::SecuritySeries;
use hanover_data::{RiskFreeSeries, SecurityPanel, TimeSeriesTable};
use std::collections::BTreeMap;

/// Delisting-adjusted returns in excess of the risk-free rate, one series per security.
///
/// A period without a risk-free rate has no excess return.
pub fn excess_returns(panel: &SecurityPanel, risk_free: &RiskFreeSeries) -> Vec<SecuritySeries> {
    SecuritySeries::from_panel(panel, |o| {
        let ret = o.ret_adj?;
        Some(ret - risk_free.rate_for(o.date)?)
    })
}

/// Regressor rows keyed by every observation date of `panel`.
///
/// Each observation date takes the factor row of its period end; rows with any missing
/// factor are left out.
pub fn regressor_rows(
    panel: &SecurityPanel,
    factors: &TimeSeriesTable,
) -> BTreeMap<NaiveDate, Vec<f64>> {
    let frequency = panel.frequency();
    let by_period: BTreeMap<NaiveDate, &[Option<f64>]> = factors
        .rows()
        .iter()
        .map(|row| (row.date, row.values.as_slice()))
        .collect();
    panel
        .dates()
        .into_iter()
        .filter_map(|date| {
            let row = by_period.get(&frequency.period_end(date))?;
            let values = row.iter().copied().collect::<Option<Vec<f64>>>()?;
            Some((date, values))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use hanover_data::{CompanyId, Frequency, SecurityId, SecurityObservation};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn panel() -> SecurityPanel {
        let obs = [
            (d(2020, 7, 30), Some(0.05)),
            (d(2020, 8, 31), None),
            (d(2020, 9, 30), Some(0.01)),
        ]
        .into_iter()
        .map(|(date, ret)| {
            let mut o = SecurityObservation::new(SecurityId(1), CompanyId(1), date);
            o.ret_adj = ret;
            o
        })
        .collect();
        SecurityPanel::from_observations(Frequency::Monthly, obs)
    }

    #[test]
    fn test_excess_returns() {
        let rf = RiskFreeSeries::new(Frequency::Monthly, [(d(2020, 7, 31), 0.001)]);
        let series = excess_returns(&panel(), &rf);
        assert_eq!(series.len(), 1);
        assert_relative_eq!(series[0].values[0].unwrap(), 0.049, epsilon = 1e-12);
        assert_eq!(series[0].values[1], None);
        // no rate for September
        assert_eq!(series[0].values[2], None);
    }

    #[test]
    fn test_regressor_rows_map_to_period_end() {
        let mut factors = TimeSeriesTable::new(Frequency::Monthly, vec!["MKT-RF".into()]);
        factors.push_row(d(2020, 7, 31), vec![Some(0.02)]).unwrap();
        factors.push_row(d(2020, 8, 31), vec![None]).unwrap();
        factors.push_row(d(2020, 9, 30), vec![Some(-0.01)]).unwrap();

        let rows = regressor_rows(&panel(), &factors);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[&d(2020, 7, 30)], vec![0.02]);
        assert_eq!(rows[&d(2020, 9, 30)], vec![-0.01]);
    }
}
