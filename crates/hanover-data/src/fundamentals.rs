//! Annual fundamentals records.

use crate::error::Result;
use crate::frame::{date_values, f64_values, i64_values, optional_f64_values, str_values};
use crate::ids::CompanyKey;
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Line items of one company for one fiscal year.
///
/// Field names follow the fundamentals feed columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct FundamentalRecord {
    pub gvkey: CompanyKey,
    /// Fiscal period end
    pub datadate: NaiveDate,
    pub fyear: i32,
    pub at: Option<f64>,
    pub seq: Option<f64>,
    pub ceq: Option<f64>,
    pub pstk: Option<f64>,
    pub pstkrv: Option<f64>,
    pub pstkl: Option<f64>,
    pub lt: Option<f64>,
    pub txditc: Option<f64>,
    pub txdb: Option<f64>,
    pub itcb: Option<f64>,
    pub revt: Option<f64>,
    pub cogs: Option<f64>,
    pub xint: Option<f64>,
    pub xsga: Option<f64>,
    pub mib: Option<f64>,
    pub ib: Option<f64>,
    pub dp: Option<f64>,
    pub txdi: Option<f64>,
    pub dvc: Option<f64>,
    pub act: Option<f64>,
    pub che: Option<f64>,
    pub lct: Option<f64>,
    pub dlc: Option<f64>,
    pub txp: Option<f64>,
    pub csho: Option<f64>,
    pub ajex: Option<f64>,
}

impl FundamentalRecord {
    /// Record with every line item missing.
    pub const fn new(gvkey: CompanyKey, datadate: NaiveDate, fyear: i32) -> Self {
        Self {
            gvkey,
            datadate,
            fyear,
            at: None,
            seq: None,
            ceq: None,
            pstk: None,
            pstkrv: None,
            pstkl: None,
            lt: None,
            txditc: None,
            txdb: None,
            itcb: None,
            revt: None,
            cogs: None,
            xint: None,
            xsga: None,
            mib: None,
            ib: None,
            dp: None,
            txdi: None,
            dvc: None,
            act: None,
            che: None,
            lct: None,
            dlc: None,
            txp: None,
            csho: None,
            ajex: None,
        }
    }
}

/// Fundamentals sorted by company and fiscal year, unique per (company, fiscal year).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FundamentalsPanel {
    records: Vec<FundamentalRecord>,
}

impl FundamentalsPanel {
    /// Build from records. Duplicate (company, fiscal year) pairs keep the latest period end.
    pub fn from_records(mut records: Vec<FundamentalRecord>) -> Self {
        records.sort_by(|a, b| {
            (&a.gvkey, a.fyear, a.datadate).cmp(&(&b.gvkey, b.fyear, b.datadate))
        });
        let mut out: Vec<FundamentalRecord> = Vec::with_capacity(records.len());
        for rec in records {
            match out.last_mut() {
                Some(last) if last.gvkey == rec.gvkey && last.fyear == rec.fyear => *last = rec,
                _ => out.push(rec),
            }
        }
        Self { records: out }
    }

    /// Build from the fundamentals feed.
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let gvkeys = str_values(df, "gvkey")?;
        let datadates = date_values(df, "datadate")?;
        let fyears = i64_values(df, "fyear")?;
        let at = f64_values(df, "at")?;
        let item = |name: &str| optional_f64_values(df, name);
        let (seq, ceq, pstk, pstkrv, pstkl) =
            (item("seq")?, item("ceq")?, item("pstk")?, item("pstkrv")?, item("pstkl")?);
        let (lt, txditc, txdb, itcb) = (item("lt")?, item("txditc")?, item("txdb")?, item("itcb")?);
        let (revt, cogs, xint, xsga, mib) =
            (item("revt")?, item("cogs")?, item("xint")?, item("xsga")?, item("mib")?);
        let (ib, dp, txdi, dvc) = (item("ib")?, item("dp")?, item("txdi")?, item("dvc")?);
        let (act, che, lct, dlc, txp) =
            (item("act")?, item("che")?, item("lct")?, item("dlc")?, item("txp")?);
        let (csho, ajex) = (item("csho")?, item("ajex")?);

        let mut records = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            let (Some(gvkey), Some(datadate), Some(fyear)) =
                (gvkeys[i].as_ref(), datadates[i], fyears[i])
            else {
                continue;
            };
            records.push(FundamentalRecord {
                gvkey: CompanyKey(gvkey.clone()),
                datadate,
                fyear: fyear as i32,
                at: at[i],
                seq: seq[i],
                ceq: ceq[i],
                pstk: pstk[i],
                pstkrv: pstkrv[i],
                pstkl: pstkl[i],
                lt: lt[i],
                txditc: txditc[i],
                txdb: txdb[i],
                itcb: itcb[i],
                revt: revt[i],
                cogs: cogs[i],
                xint: xint[i],
                xsga: xsga[i],
                mib: mib[i],
                ib: ib[i],
                dp: dp[i],
                txdi: txdi[i],
                dvc: dvc[i],
                act: act[i],
                che: che[i],
                lct: lct[i],
                dlc: dlc[i],
                txp: txp[i],
                csho: csho[i],
                ajex: ajex[i],
            });
        }
        tracing::debug!(rows = records.len(), "built fundamentals panel");
        Ok(Self::from_records(records))
    }

    /// All records.
    pub fn records(&self) -> &[FundamentalRecord] {
        &self.records
    }

    /// Records grouped per company, each slice in fiscal-year order.
    pub fn by_company(&self) -> impl Iterator<Item = &[FundamentalRecord]> {
        self.records.chunk_by(|a, b| a.gvkey == b.gvkey)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether there are no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
