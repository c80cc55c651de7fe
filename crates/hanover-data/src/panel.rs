//! Security panel: one observation per security and trading date.

use crate::calendar::{Frequency, is_weekend};
use crate::error::{DataError, Result};
use crate::frame::{date_values, f64_values, i64_values};
use crate::ids::{CompanyId, SecurityId};
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// One security on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityObservation {
    /// Security identifier
    pub security: SecurityId,
    /// Company identifier
    pub company: CompanyId,
    /// Trading date
    pub date: NaiveDate,
    /// Exchange code
    pub exchcd: Option<i64>,
    /// Share code
    pub shrcd: Option<i64>,
    /// Holding period return
    pub ret: Option<f64>,
    /// Holding period return adjusted for delisting
    pub ret_adj: Option<f64>,
    /// Return without dividends
    pub retx: Option<f64>,
    /// Shares outstanding
    pub shrout: Option<f64>,
    /// Price (negative values are bid/ask averages)
    pub prc: Option<f64>,
    /// Company-level market equity on the primary share class, `None` on siblings
    pub me: Option<f64>,
}

impl SecurityObservation {
    /// Observation with the identifying fields set and everything else missing.
    pub const fn new(security: SecurityId, company: CompanyId, date: NaiveDate) -> Self {
        Self {
            security,
            company,
            date,
            exchcd: None,
            shrcd: None,
            ret: None,
            ret_adj: None,
            retx: None,
            shrout: None,
            prc: None,
            me: None,
        }
    }

    /// Market equity of this share class alone.
    pub fn security_me(&self) -> Option<f64> {
        match (self.prc, self.shrout) {
            (Some(p), Some(s)) => Some(p.abs() * s),
            _ => None,
        }
    }
}

/// Combine a holding period return with a delisting return.
pub fn delisting_adjusted(ret: Option<f64>, dlret: Option<f64>) -> Option<f64> {
    match (ret, dlret) {
        (Some(r), Some(d)) => Some((1.0 + r) * (1.0 + d) - 1.0),
        (None, Some(d)) => Some(d),
        (r, None) => r,
    }
}

/// Panel of security observations sorted by security then date.
///
/// Rows are unique per (security, date) and never weekend-dated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityPanel {
    frequency: Frequency,
    observations: Vec<SecurityObservation>,
}

impl SecurityPanel {
    /// Build from already-derived observations.
    ///
    /// Weekend rows are dropped and duplicates by (security, date) keep the last row.
    pub fn from_observations(frequency: Frequency, observations: Vec<SecurityObservation>) -> Self {
        Self {
            frequency: frequency.base(),
            observations: normalize(observations),
        }
    }

    /// Build from the security and delisting feeds.
    ///
    /// Delisting returns are matched by exact date for daily panels and by calendar month
    /// otherwise. Market equity is summed across the share classes of a company and assigned
    /// to the class with the largest market equity.
    pub fn from_frames(
        frequency: Frequency,
        securities: &DataFrame,
        delistings: &DataFrame,
    ) -> Result<Self> {
        let frequency = frequency.base();
        let permnos = i64_values(securities, "permno")?;
        let permcos = i64_values(securities, "permco")?;
        let dates = date_values(securities, "date")?;
        let exchcds = i64_values(securities, "exchcd")?;
        let shrcds = i64_values(securities, "shrcd")?;
        let rets = f64_values(securities, "ret")?;
        let retxs = f64_values(securities, "retx")?;
        let shrouts = f64_values(securities, "shrout")?;
        let prcs = f64_values(securities, "prc")?;

        let delisting_returns = delisting_lookup(frequency, delistings)?;

        let mut observations = Vec::with_capacity(securities.height());
        for i in 0..securities.height() {
            let (Some(permno), Some(date)) = (permnos[i], dates[i]) else {
                continue;
            };
            let security = SecurityId(permno);
            let company = CompanyId(permcos[i].unwrap_or(permno));
            let dlret = delisting_returns
                .get(&(security, delisting_key(frequency, date)))
                .copied();
            let mut obs = SecurityObservation::new(security, company, date);
            obs.exchcd = exchcds[i];
            obs.shrcd = shrcds[i];
            obs.ret = rets[i];
            obs.ret_adj = delisting_adjusted(rets[i], dlret);
            obs.retx = retxs[i];
            obs.shrout = shrouts[i];
            obs.prc = prcs[i];
            observations.push(obs);
        }

        let mut observations = normalize(observations);
        assign_company_me(&mut observations);
        tracing::debug!(
            rows = observations.len(),
            frequency = %frequency,
            "built security panel"
        );
        Ok(Self {
            frequency,
            observations,
        })
    }

    /// Base frequency of the panel.
    pub const fn frequency(&self) -> Frequency {
        self.frequency
    }

    /// All observations.
    pub fn observations(&self) -> &[SecurityObservation] {
        &self.observations
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Whether the panel is empty.
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Observations grouped per security, each slice in date order.
    pub fn by_security(&self) -> impl Iterator<Item = &[SecurityObservation]> {
        self.observations
            .chunk_by(|a, b| a.security == b.security)
    }

    /// Distinct observation dates.
    pub fn dates(&self) -> BTreeSet<NaiveDate> {
        self.observations.iter().map(|o| o.date).collect()
    }

    /// Union with a newer panel; rows of `newer` replace rows with the same key.
    pub fn union(&self, newer: &Self) -> Result<Self> {
        if self.frequency != newer.frequency {
            return Err(DataError::Parse(format!(
                "cannot union {} and {} panels",
                self.frequency, newer.frequency
            )));
        }
        let mut rows = self.observations.clone();
        rows.extend(newer.observations.iter().cloned());
        Ok(Self {
            frequency: self.frequency,
            observations: normalize(rows),
        })
    }
}

fn normalize(mut observations: Vec<SecurityObservation>) -> Vec<SecurityObservation> {
    observations.retain(|o| !is_weekend(o.date));
    // Stable sort keeps insertion order within a key, so the last duplicate is the newest.
    observations.sort_by_key(|o| (o.security, o.date));
    let mut out: Vec<SecurityObservation> = Vec::with_capacity(observations.len());
    for obs in observations {
        match out.last_mut() {
            Some(last) if last.security == obs.security && last.date == obs.date => *last = obs,
            _ => out.push(obs),
        }
    }
    out
}

fn assign_company_me(observations: &mut [SecurityObservation]) {
    let mut groups: HashMap<(CompanyId, NaiveDate), Vec<usize>> = HashMap::new();
    for (idx, obs) in observations.iter().enumerate() {
        groups.entry((obs.company, obs.date)).or_default().push(idx);
    }
    for members in groups.values() {
        let mut total = 0.0;
        let mut primary: Option<(usize, f64)> = None;
        for &idx in members {
            if let Some(me) = observations[idx].security_me() {
                total += me;
                if primary.is_none_or(|(_, best)| me > best) {
                    primary = Some((idx, me));
                }
            }
        }
        for &idx in members {
            observations[idx].me = match primary {
                Some((p, _)) if p == idx => Some(total),
                _ => None,
            };
        }
    }
}

type DelistingKey = (i32, u32, u32);

fn delisting_key(frequency: Frequency, date: NaiveDate) -> DelistingKey {
    if frequency.is_daily_based() {
        (date.year(), date.month(), date.day())
    } else {
        (date.year(), date.month(), 0)
    }
}

fn delisting_lookup(
    frequency: Frequency,
    delistings: &DataFrame,
) -> Result<HashMap<(SecurityId, DelistingKey), f64>> {
    let permnos = i64_values(delistings, "permno")?;
    let dates = date_values(delistings, "dlstdt")?;
    let dlrets = f64_values(delistings, "dlret")?;
    let mut lookup = HashMap::new();
    for i in 0..delistings.height() {
        if let (Some(permno), Some(date), Some(dlret)) = (permnos[i], dates[i], dlrets[i]) {
            lookup.insert((SecurityId(permno), delisting_key(frequency, date)), dlret);
        }
    }
    Ok(lookup)
}
