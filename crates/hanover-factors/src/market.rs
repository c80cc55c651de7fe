//! Market excess return.

use crate::compose::FactorSeries;
use crate::error::Result;
use hanover_data::{DataError, DateRange, RiskFreeSeries, SecurityPanel};
use hanover_portfolios::{UniverseConfig, WeightInfo};
use std::collections::BTreeMap;

/// Value-weighted return of the sample universe per period in `range`.
///
/// Each observation contributes its delisting-adjusted return weighted by `lagged_me`.
/// Periods without a contributing observation are missing.
pub fn market_returns(
    panel: &SecurityPanel,
    weights: &[WeightInfo],
    universe: &UniverseConfig,
    range: &DateRange,
) -> Result<FactorSeries> {
    if weights.len() != panel.len() {
        return Err(DataError::ShapeMismatch {
            expected: panel.len(),
            actual: weights.len(),
        }
        .into());
    }
    let frequency = panel.frequency();
    let mut sums: BTreeMap<_, (f64, f64)> = BTreeMap::new();
    for (o, w) in panel.observations().iter().zip(weights) {
        let period = frequency.period_end(o.date);
        if !range.contains(period) {
            continue;
        }
        let entry = sums.entry(period).or_insert((0.0, 0.0));
        if !universe.is_sample(o.exchcd, o.shrcd) {
            continue;
        }
        if let (Some(r), Some(me)) = (o.ret_adj, w.lagged_me)
            && me > 0.0
        {
            entry.0 += me * r;
            entry.1 += me;
        }
    }
    Ok(sums
        .into_iter()
        .map(|(date, (weighted, total))| (date, (total > 0.0).then(|| weighted / total)))
        .collect())
}

/// Market return minus the risk-free rate of the same period.
pub fn market_excess_returns(
    panel: &SecurityPanel,
    weights: &[WeightInfo],
    universe: &UniverseConfig,
    risk_free: &RiskFreeSeries,
    range: &DateRange,
) -> Result<FactorSeries> {
    let market = market_returns(panel, weights, universe, range)?;
    tracing::debug!(periods = market.len(), "market excess return");
    Ok(market
        .into_iter()
        .map(|(date, r)| (date, r.zip(risk_free.rate_for(date)).map(|(r, rf)| r - rf)))
        .collect())
}
