//! Annual characteristics derived from fundamentals line items.

use crate::error::Result;
use crate::outliers;
use crate::registry::Characteristic;
use chrono::NaiveDate;
use hanover_data::frame::f64_values;
use hanover_data::{CompanyKey, FundamentalRecord, FundamentalsPanel};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Derivation settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivationConfig {
    /// Deferred taxes count toward book equity only for fiscal years before this one
    pub deferred_tax_cutoff_year: i32,
}

impl Default for DerivationConfig {
    fn default() -> Self {
        Self {
            deferred_tax_cutoff_year: 1993,
        }
    }
}

/// Annual characteristics of one company for one fiscal year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualSnapshot {
    /// Company key
    pub gvkey: CompanyKey,
    /// Fiscal period end
    pub datadate: NaiveDate,
    /// Fiscal year
    pub fyear: i32,
    /// Book equity
    pub be: Option<f64>,
    /// Operating profitability
    pub op: Option<f64>,
    /// Investment
    pub inv: Option<f64>,
    /// Accruals
    pub ac: Option<f64>,
    /// Net share issuance
    pub ni: Option<f64>,
    /// Earnings numerator
    pub earnings: Option<f64>,
    /// Cash flow numerator
    pub cashflow: Option<f64>,
    /// Dividends numerator
    pub dividends: Option<f64>,
    /// Fiscal years of this company seen so far, including this one
    pub history_years: u32,
}

impl AnnualSnapshot {
    /// Value of an annual fundamental characteristic, if this snapshot carries one.
    pub const fn value(&self, characteristic: Characteristic) -> Option<f64> {
        match characteristic {
            Characteristic::Be => self.be,
            Characteristic::Op => self.op,
            Characteristic::Inv => self.inv,
            Characteristic::Ac => self.ac,
            Characteristic::Ni => self.ni,
            _ => None,
        }
    }
}

fn zero(v: Option<f64>) -> f64 {
    v.unwrap_or(0.0)
}

/// Book equity, or `None` when not positive.
pub fn book_equity(rec: &FundamentalRecord, config: &DerivationConfig) -> Option<f64> {
    let stockholders = rec
        .seq
        .or_else(|| Some(rec.ceq? + rec.pstk?))
        .or_else(|| Some(rec.at? - rec.lt?))?;
    let deferred = if rec.fyear < config.deferred_tax_cutoff_year {
        rec.txditc
            .or_else(|| match (rec.txdb, rec.itcb) {
                (None, None) => None,
                (txdb, itcb) => Some(zero(txdb) + zero(itcb)),
            })
            .unwrap_or(0.0)
    } else {
        0.0
    };
    let preferred = rec.pstkrv.or(rec.pstkl).or(rec.pstk).unwrap_or(0.0);
    let be = stockholders + deferred - preferred;
    (be.is_finite() && be > 0.0).then_some(be)
}

fn operating_profitability(rec: &FundamentalRecord, be: Option<f64>) -> Option<f64> {
    let be = be?;
    let revt = rec.revt?;
    if rec.cogs.is_none() && rec.xint.is_none() && rec.xsga.is_none() {
        return None;
    }
    let denominator = be + zero(rec.mib);
    if denominator <= 0.0 {
        return None;
    }
    let profit = revt - zero(rec.cogs) - zero(rec.xint) - zero(rec.xsga);
    Some(profit / denominator).filter(|v| v.is_finite())
}

fn adjusted_shares(rec: &FundamentalRecord) -> Option<f64> {
    let adj = rec.csho? * rec.ajex?;
    (adj > 0.0).then_some(adj)
}

fn working_capital(rec: &FundamentalRecord) -> Option<f64> {
    Some((rec.act? - zero(rec.che)) - (rec.lct? - zero(rec.dlc) - zero(rec.txp)))
}

fn lagged(name: &str) -> Expr {
    when((col("fyear") - col("fyear").shift(lit(1)).over([col("gvkey")])).eq(lit(1)))
        .then(col(name).shift(lit(1)).over([col("gvkey")]))
        .otherwise(lit(NULL))
        .alias(format!("lag_{name}"))
}

fn investment() -> Expr {
    when(col("at").gt(lit(0.0)).and(col("lag_at").gt(lit(0.0))))
        .then((col("at") / col("lag_at")).log(std::f64::consts::E))
        .when(col("lag_at").eq(lit(0.0)))
        .then(lit(NULL))
        .otherwise((col("at") - col("lag_at")) / col("lag_at"))
        .alias("inv")
}

fn accruals() -> Expr {
    ((col("wc") / col("shares") - col("lag_wc") / col("lag_shares"))
        / (col("be") / col("shares")))
    .alias("ac")
}

fn net_issuance() -> Expr {
    (col("shares") / col("lag_shares") - lit(1.0)).alias("ni")
}

/// Derive one snapshot per (company, fiscal year).
///
/// Lagged items come from the same company's record for the immediately preceding fiscal
/// year; a gap in fiscal years leaves the lagged measures missing. Outlier policies from the
/// registry are applied per fiscal-year cross-section.
pub fn derive_snapshots(
    panel: &FundamentalsPanel,
    config: &DerivationConfig,
) -> Result<Vec<AnnualSnapshot>> {
    let records: Vec<(usize, &FundamentalRecord)> = panel
        .by_company()
        .flat_map(|company| company.iter().enumerate())
        .collect();
    let be: Vec<Option<f64>> = records.iter().map(|(_, r)| book_equity(r, config)).collect();
    let op: Vec<Option<f64>> = records
        .iter()
        .zip(&be)
        .map(|((_, r), be)| operating_profitability(r, *be))
        .collect();

    let df = DataFrame::new(vec![
        Series::new("row".into(), (0..records.len() as u64).collect::<Vec<_>>()).into(),
        Series::new(
            "gvkey".into(),
            records.iter().map(|(_, r)| r.gvkey.0.as_str()).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "fyear".into(),
            records.iter().map(|(_, r)| r.fyear).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "at".into(),
            records.iter().map(|(_, r)| r.at).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "shares".into(),
            records.iter().map(|(_, r)| adjusted_shares(r)).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "wc".into(),
            records.iter().map(|(_, r)| working_capital(r)).collect::<Vec<_>>(),
        )
        .into(),
        Series::new("be".into(), be.clone()).into(),
        Series::new("op".into(), op).into(),
    ])?;

    let treated = df
        .lazy()
        .sort(["gvkey", "fyear"], Default::default())
        .with_columns([lagged("at"), lagged("shares"), lagged("wc")])
        .with_columns([investment(), accruals(), net_issuance()])
        .with_columns(
            [
                (Characteristic::Op, "op"),
                (Characteristic::Inv, "inv"),
                (Characteristic::Ac, "ac"),
                (Characteristic::Ni, "ni"),
            ]
            .map(|(c, name)| outliers::treat(c.info().outliers, name, "fyear")),
        )
        .sort(["row"], Default::default())
        .collect()?;

    let op = f64_values(&treated, "op")?;
    let inv = f64_values(&treated, "inv")?;
    let ac = f64_values(&treated, "ac")?;
    let ni = f64_values(&treated, "ni")?;

    let snapshots: Vec<AnnualSnapshot> = records
        .iter()
        .enumerate()
        .map(|(row, (i, rec))| AnnualSnapshot {
            gvkey: rec.gvkey.clone(),
            datadate: rec.datadate,
            fyear: rec.fyear,
            be: be[row],
            op: op[row],
            inv: inv[row],
            ac: ac[row],
            ni: ni[row],
            earnings: rec.ib,
            cashflow: rec.ib.map(|ib| ib + zero(rec.dp) + zero(rec.txdi)),
            dividends: rec.dvc,
            history_years: *i as u32 + 1,
        })
        .collect();
    tracing::debug!(snapshots = snapshots.len(), "derived annual snapshots");
    Ok(snapshots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn record(gvkey: &str, fyear: i32) -> FundamentalRecord {
        let datadate = NaiveDate::from_ymd_opt(fyear, 12, 31).unwrap();
        FundamentalRecord::new(gvkey.into(), datadate, fyear)
    }

    #[test]
    fn test_book_equity_fallbacks() {
        let config = DerivationConfig::default();
        let mut rec = record("001", 2000);
        rec.ceq = Some(80.0);
        rec.pstk = Some(10.0);
        // ceq + pstk - pstk
        assert_relative_eq!(book_equity(&rec, &config).unwrap(), 80.0);

        rec.ceq = None;
        rec.at = Some(200.0);
        rec.lt = Some(150.0);
        rec.pstkrv = Some(5.0);
        assert_relative_eq!(book_equity(&rec, &config).unwrap(), 45.0);

        rec.seq = Some(100.0);
        assert_relative_eq!(book_equity(&rec, &config).unwrap(), 95.0);
    }

    #[test]
    fn test_book_equity_deferred_taxes_before_cutoff() {
        let config = DerivationConfig::default();
        let mut early = record("001", 1990);
        early.seq = Some(100.0);
        early.txdb = Some(4.0);
        early.itcb = Some(1.0);
        assert_relative_eq!(book_equity(&early, &config).unwrap(), 105.0);

        let mut late = early.clone();
        late.fyear = 1995;
        assert_relative_eq!(book_equity(&late, &config).unwrap(), 100.0);
    }

    #[test]
    fn test_book_equity_non_positive_is_missing() {
        let mut rec = record("001", 2000);
        rec.seq = Some(10.0);
        rec.pstk = Some(10.0);
        assert_eq!(book_equity(&rec, &DerivationConfig::default()), None);
    }

    #[test]
    fn test_operating_profitability_rules() {
        let mut rec = record("001", 2000);
        rec.revt = Some(100.0);
        assert_eq!(operating_profitability(&rec, Some(50.0)), None);

        rec.cogs = Some(60.0);
        rec.mib = Some(10.0);
        assert_relative_eq!(
            operating_profitability(&rec, Some(50.0)).unwrap(),
            40.0 / 60.0
        );
        assert_eq!(operating_profitability(&rec, None), None);

        rec.revt = None;
        assert_eq!(operating_profitability(&rec, Some(50.0)), None);
    }

    #[test]
    fn test_snapshots_lag_and_history() {
        let mut a0 = record("001", 2000);
        a0.seq = Some(100.0);
        a0.at = Some(100.0);
        a0.csho = Some(10.0);
        a0.ajex = Some(1.0);
        a0.act = Some(50.0);
        a0.lct = Some(30.0);
        let mut a1 = record("001", 2001);
        a1.seq = Some(120.0);
        a1.at = Some(120.0);
        a1.csho = Some(11.0);
        a1.ajex = Some(1.0);
        a1.act = Some(60.0);
        a1.lct = Some(30.0);
        a1.ib = Some(12.0);
        a1.dp = Some(3.0);
        // a gap: 2003 has no lagged year
        let mut a3 = record("001", 2003);
        a3.at = Some(150.0);

        let panel = FundamentalsPanel::from_records(vec![a3, a1, a0]);
        let snaps = derive_snapshots(&panel, &DerivationConfig::default()).unwrap();
        assert_eq!(snaps.len(), 3);

        assert_eq!(snaps[0].history_years, 1);
        assert_eq!(snaps[0].inv, None);

        let s = &snaps[1];
        assert_eq!(s.history_years, 2);
        assert_relative_eq!(s.inv.unwrap(), 1.2f64.ln(), epsilon = 1e-12);
        assert_relative_eq!(s.ni.unwrap(), 0.1, epsilon = 1e-12);
        // (30/11 - 20/10) / (120/11)
        assert_relative_eq!(s.ac.unwrap(), (30.0 / 11.0 - 2.0) / (120.0 / 11.0), epsilon = 1e-12);
        assert_relative_eq!(s.cashflow.unwrap(), 15.0);
        assert_eq!(s.dividends, None);

        assert_eq!(snaps[2].history_years, 3);
        assert_eq!(snaps[2].inv, None);
    }

    fn investment_of(at: Option<f64>, lag_at: Option<f64>) -> Option<f64> {
        let mut prev = record("002", 2000);
        prev.at = lag_at;
        let mut cur = record("002", 2001);
        cur.at = at;
        let panel = FundamentalsPanel::from_records(vec![prev, cur]);
        derive_snapshots(&panel, &DerivationConfig::default()).unwrap()[1].inv
    }

    #[test]
    fn test_investment_fallback() {
        assert_relative_eq!(investment_of(Some(110.0), Some(100.0)).unwrap(), 1.1f64.ln());
        assert_relative_eq!(investment_of(Some(-10.0), Some(100.0)).unwrap(), -1.1);
        assert_eq!(investment_of(Some(10.0), Some(0.0)), None);
        assert_eq!(investment_of(Some(10.0), None), None);
    }

    #[test]
    fn test_snapshots_lag_stays_within_company() {
        let mut a = record("001", 2000);
        a.at = Some(100.0);
        let mut b = record("002", 2001);
        b.at = Some(100.0);
        let panel = FundamentalsPanel::from_records(vec![a, b]);
        let snaps = derive_snapshots(&panel, &DerivationConfig::default()).unwrap();
        assert!(snaps.iter().all(|s| s.inv.is_none() && s.history_years == 1));
    }
}
