//! Point-in-time alignment of characteristics and weights.
//!
//! Annual portfolios are formed at the end of June of year `y` and held from July `y` through
//! June `y + 1`. Size is June market equity, price ratios use December `y - 1` market equity
//! and fundamentals come from the fiscal year ending in calendar year `y - 1`.

use crate::config::FormationConfig;
use chrono::{Datelike, NaiveDate};
use hanover_characteristics::{AnnualSnapshot, Characteristic, CharacteristicSeries};
use hanover_data::calendar::ff_year_of;
use hanover_data::{CompanyKey, LinkTable, SecurityId, SecurityObservation, SecurityPanel};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Portfolio weights of one observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightInfo {
    /// Formation year the observation belongs to
    pub ff_year: i32,
    /// Market equity at the previous observation
    pub lagged_me: Option<f64>,
    /// Value weight compounded from the start of the formation year
    pub weight: Option<f64>,
}

/// Weights for every observation of a panel, aligned with `panel.observations()`.
///
/// `lagged_me` is the previous observation's market equity; the first observation of a
/// security seeds it with `me / (1 + retx)`. The first observation of each formation year
/// takes `lagged_me` as the base weight and later observations grow it by the cumulative
/// price return through the previous observation. A missing price return counts as zero.
pub fn compute_weights(panel: &SecurityPanel, formation_month: u32) -> Vec<WeightInfo> {
    let mut out = Vec::with_capacity(panel.len());
    for obs in panel.by_security() {
        let mut current_year = None;
        let mut base = None;
        let mut cumretx = 1.0;
        for (i, o) in obs.iter().enumerate() {
            let ff_year = ff_year_of(o.date, formation_month);
            let lagged_me = match i {
                0 => o.me.map(|me| me / (1.0 + o.retx.unwrap_or(0.0))),
                _ => obs[i - 1].me,
            };
            let weight = if current_year == Some(ff_year) {
                base.map(|b| b * cumretx)
            } else {
                current_year = Some(ff_year);
                base = lagged_me;
                cumretx = 1.0;
                lagged_me
            };
            cumretx *= 1.0 + o.retx.unwrap_or(0.0);
            out.push(WeightInfo {
                ff_year,
                lagged_me,
                weight,
            });
        }
    }
    out
}

/// Attach a periodic characteristic to the observations of a panel.
///
/// Each observation receives the latest value dated on or before the security's previous
/// observation; the first observation receives `None`.
pub fn lag_attach(panel: &SecurityPanel, series: &CharacteristicSeries) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(panel.len());
    for obs in panel.by_security() {
        out.push(None);
        for pair in obs.windows(2) {
            out.push(series.value_on_or_before(pair[1].security, pair[0].date));
        }
    }
    out
}

/// Annual characteristics of one security for one formation year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormationRecord {
    /// Security
    pub security: SecurityId,
    /// Formation year
    pub year: i32,
    /// Market equity at the end of the formation month
    pub me_june: f64,
    /// Market equity at the end of December of the prior year
    pub me_dec: Option<f64>,
    /// Exchange code at formation
    pub exchcd: Option<i64>,
    /// Share code at formation
    pub shrcd: Option<i64>,
    /// Fundamentals company the values came from
    pub gvkey: Option<CompanyKey>,
    /// Annual characteristic values that passed their predicates
    pub values: BTreeMap<Characteristic, f64>,
}

impl FormationRecord {
    /// Value of an annual characteristic.
    pub fn value(&self, characteristic: Characteristic) -> Option<f64> {
        match characteristic {
            Characteristic::Me => Some(self.me_june),
            c => self.values.get(&c).copied(),
        }
    }
}

fn last_in_month(
    obs: &[SecurityObservation],
    year: i32,
    month: u32,
) -> Option<&SecurityObservation> {
    obs.iter()
        .rev()
        .find(|o| o.date.year() == year && o.date.month() == month)
}

/// Snapshots indexed by (company, calendar year of the fiscal period end).
fn snapshot_index(snapshots: &[AnnualSnapshot]) -> HashMap<(&CompanyKey, i32), &AnnualSnapshot> {
    let mut index: HashMap<(&CompanyKey, i32), &AnnualSnapshot> = HashMap::new();
    for s in snapshots {
        let key = (&s.gvkey, s.datadate.year());
        match index.get(&key) {
            Some(existing) if existing.datadate >= s.datadate => {}
            _ => {
                index.insert(key, s);
            }
        }
    }
    index
}

fn insert_if(values: &mut BTreeMap<Characteristic, f64>, c: Characteristic, value: Option<f64>) {
    if let Some(v) = value.filter(|v| c.info().predicate.accepts(*v)) {
        values.insert(c, v);
    }
}

/// Build one formation record per security and year with positive June market equity.
pub fn build_formation_records(
    panel: &SecurityPanel,
    snapshots: &[AnnualSnapshot],
    links: &LinkTable,
    config: &FormationConfig,
) -> Vec<FormationRecord> {
    let index = snapshot_index(snapshots);
    let mut records = Vec::new();

    for obs in panel.by_security() {
        let mut years: Vec<i32> = obs
            .iter()
            .filter(|o| o.date.month() == config.formation_month)
            .map(|o| o.date.year())
            .collect();
        years.dedup();

        for year in years {
            let Some(june) = last_in_month(obs, year, config.formation_month) else {
                continue;
            };
            let Some(me_june) = june.me.filter(|me| *me > 0.0) else {
                continue;
            };
            let me_dec = last_in_month(obs, year - 1, 12)
                .and_then(|o| o.me)
                .filter(|me| *me > 0.0);

            let snapshot = links
                .companies_for(june.security, june.date)
                .filter_map(|gvkey| index.get(&(gvkey, year - 1)).copied())
                .max_by_key(|s| s.datadate)
                .filter(|s| s.history_years >= config.min_history_years);

            let mut values = BTreeMap::new();
            if let Some(s) = snapshot {
                for c in [
                    Characteristic::Be,
                    Characteristic::Op,
                    Characteristic::Inv,
                    Characteristic::Ac,
                    Characteristic::Ni,
                ] {
                    insert_if(&mut values, c, s.value(c));
                }
                if let Some(dec) = me_dec {
                    insert_if(&mut values, Characteristic::Bm, s.be.map(|be| be / dec));
                    insert_if(&mut values, Characteristic::Ep, s.earnings.map(|e| e / dec));
                    insert_if(&mut values, Characteristic::Cfp, s.cashflow.map(|c| c / dec));
                    insert_if(&mut values, Characteristic::Dp, s.dividends.map(|d| d / dec));
                }
            }

            records.push(FormationRecord {
                security: june.security,
                year,
                me_june,
                me_dec,
                exchcd: june.exchcd,
                shrcd: june.shrcd,
                gvkey: snapshot.map(|s| s.gvkey.clone()),
                values,
            });
        }
    }
    tracing::info!(records = records.len(), "built formation records");
    records
}

/// Formation date of year `y`.
pub fn formation_date(year: i32, formation_month: u32) -> Option<NaiveDate> {
    hanover_data::calendar::month_end(year, formation_month)
}
