//! Bucket returns, firm counts and average characteristics.

use crate::buckets::BucketKey;
use crate::error::{PortfolioError, Result};
use crate::sort::{Assignment, SortOutcome};
use crate::table::{CharacteristicTables, bucket_table};
use chrono::NaiveDate;
use hanover_characteristics::Characteristic;
use hanover_data::TimeSeriesTable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Return weighting within a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Weighting {
    /// Weighted by market equity
    #[default]
    Value,
    /// Equally weighted
    Equal,
}

impl Weighting {
    /// Short code, `vw` or `ew`.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Value => "vw",
            Self::Equal => "ew",
        }
    }
}

impl fmt::Display for Weighting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Weighting {
    type Err = PortfolioError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vw" | "value" => Ok(Self::Value),
            "ew" | "equal" => Ok(Self::Equal),
            _ => Err(PortfolioError::UnknownWeighting(s.to_string())),
        }
    }
}

/// Aggregates of one bucket in one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketStats {
    /// Firms in the aggregate
    pub count: usize,
    /// Bucket return
    pub ret: Option<f64>,
    /// Sum of the weights of the counted firms
    pub weight_sum: f64,
    /// Average sort characteristics in dimension order
    pub characteristics: Vec<Option<f64>>,
}

fn positive_weight(a: &Assignment) -> Option<f64> {
    a.weight.filter(|w| w.is_finite() && *w > 0.0)
}

fn weighted_mean(pairs: impl Iterator<Item = (f64, f64)>) -> Option<f64> {
    let (num, den) = pairs.fold((0.0, 0.0), |(n, d), (w, x)| (n + w * x, d + w));
    (den > 0.0).then(|| num / den)
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), x| (s + x, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Aggregate the members of one bucket.
///
/// Value weighting aggregates firms with a present return and a positive weight; equal
/// weighting aggregates firms with a present return. The return, the count and every
/// characteristic average use the same firms.
pub fn bucket_stats(
    members: &[&Assignment],
    characteristics: &[Characteristic],
    weighting: Weighting,
) -> BucketStats {
    let contributing: Vec<(&Assignment, f64, f64)> = members
        .iter()
        .filter_map(|a| {
            let ret = a.ret?;
            let weight = match weighting {
                Weighting::Value => positive_weight(a)?,
                Weighting::Equal => 1.0,
            };
            Some((*a, ret, weight))
        })
        .collect();

    let ret = weighted_mean(contributing.iter().map(|(_, r, w)| (*w, *r)));
    let averages = characteristics
        .iter()
        .enumerate()
        .map(|(d, c)| match c {
            Characteristic::Me => mean(contributing.iter().map(|(a, _, _)| a.values[d])),
            _ => weighted_mean(contributing.iter().map(|(a, _, w)| (*w, a.values[d]))),
        })
        .collect();

    BucketStats {
        count: contributing.len(),
        ret,
        weight_sum: contributing.iter().map(|(_, _, w)| w).sum(),
        characteristics: averages,
    }
}

/// Stats of every bucket in every period that had breakpoints.
pub fn sort_stats(
    outcome: &SortOutcome,
    weighting: Weighting,
) -> BTreeMap<NaiveDate, BTreeMap<BucketKey, BucketStats>> {
    let keys = outcome.spec.bucket_keys();
    outcome
        .assignments
        .iter()
        .map(|(date, assigned)| {
            let mut groups: BTreeMap<&BucketKey, Vec<&Assignment>> = BTreeMap::new();
            for a in assigned {
                groups.entry(&a.bucket).or_default().push(a);
            }
            let stats = keys
                .iter()
                .map(|key| {
                    let members = groups.get(key).map(Vec::as_slice).unwrap_or(&[]);
                    let stats =
                        bucket_stats(members, outcome.spec.characteristics(), weighting);
                    (key.clone(), stats)
                })
                .collect();
            (*date, stats)
        })
        .collect()
}

fn table_from_stats(
    outcome: &SortOutcome,
    stats: &BTreeMap<NaiveDate, BTreeMap<BucketKey, BucketStats>>,
    field: impl Fn(&BucketStats) -> Option<f64>,
) -> Result<TimeSeriesTable> {
    let keys = outcome.spec.bucket_keys();
    bucket_table(
        outcome.frequency,
        &outcome.spec.labels(),
        &outcome.dates,
        |date, col| stats.get(&date)?.get(&keys[col]).and_then(&field),
    )
}

/// Bucket returns, one column per bucket label.
pub fn returns_table(outcome: &SortOutcome, weighting: Weighting) -> Result<TimeSeriesTable> {
    let stats = sort_stats(outcome, weighting);
    table_from_stats(outcome, &stats, |s| s.ret)
}

/// Firm counts, one column per bucket label.
///
/// Counts firms with a present return and a positive weight.
pub fn counts_table(outcome: &SortOutcome) -> Result<TimeSeriesTable> {
    let stats = sort_stats(outcome, Weighting::Value);
    table_from_stats(outcome, &stats, |s| Some(s.count as f64))
}

/// Average sort characteristics, one table per sort dimension.
pub fn characteristic_tables(
    outcome: &SortOutcome,
    weighting: Weighting,
) -> Result<CharacteristicTables> {
    let stats = sort_stats(outcome, weighting);
    outcome
        .spec
        .characteristics()
        .iter()
        .enumerate()
        .map(|(d, &c)| {
            let table = table_from_stats(outcome, &stats, |s| s.characteristics[d])?;
            Ok((c, table))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use hanover_data::SecurityId;

    fn member(ret: Option<f64>, weight: Option<f64>, values: Vec<f64>) -> Assignment {
        Assignment {
            security: SecurityId(1),
            bucket: BucketKey(vec![0]),
            ret,
            weight,
            values,
        }
    }

    #[test]
    fn test_weighting_codes() {
        assert_eq!("VW".parse::<Weighting>().unwrap(), Weighting::Value);
        assert_eq!("ew".parse::<Weighting>().unwrap(), Weighting::Equal);
        assert!("xw".parse::<Weighting>().is_err());
    }

    #[test]
    fn test_value_weighted_bucket() {
        let a = member(Some(0.10), Some(10.0), vec![10.0, 1.0]);
        let b = member(Some(0.20), Some(20.0), vec![20.0, 2.0]);
        let c = member(None, Some(50.0), vec![50.0, 5.0]);
        let d = member(Some(0.50), Some(0.0), vec![1.0, 9.0]);
        let members = [&a, &b, &c, &d];
        let chars = [Characteristic::Me, Characteristic::Bm];

        let vw = bucket_stats(&members, &chars, Weighting::Value);
        assert_eq!(vw.count, 2);
        assert_relative_eq!(vw.ret.unwrap(), 5.0 / 30.0, epsilon = 1e-12);
        assert_relative_eq!(vw.weight_sum, 30.0);
        // ME averages are equal-weighted over the same firms
        assert_relative_eq!(vw.characteristics[0].unwrap(), 15.0, epsilon = 1e-12);
        assert_relative_eq!(vw.characteristics[1].unwrap(), 5.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_equal_weighted_bucket_counts_firms_without_weight() {
        let a = member(Some(0.10), Some(10.0), vec![10.0, 1.0]);
        let b = member(Some(0.20), Some(20.0), vec![20.0, 2.0]);
        let c = member(None, Some(50.0), vec![50.0, 5.0]);
        // a return but no usable weight
        let d = member(Some(0.50), None, vec![3.0, 9.0]);
        let members = [&a, &b, &c, &d];
        let chars = [Characteristic::Me, Characteristic::Bm];

        let ew = bucket_stats(&members, &chars, Weighting::Equal);
        assert_eq!(ew.count, 3);
        assert_relative_eq!(ew.ret.unwrap(), 0.8 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(ew.weight_sum, 3.0);
        assert_relative_eq!(ew.characteristics[0].unwrap(), 11.0, epsilon = 1e-12);
        assert_relative_eq!(ew.characteristics[1].unwrap(), 4.0, epsilon = 1e-12);

        // the same bucket under value weighting leaves d out everywhere
        let vw = bucket_stats(&members, &chars, Weighting::Value);
        assert_eq!(vw.count, 2);
        assert_relative_eq!(vw.characteristics[0].unwrap(), 15.0, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_bucket() {
        let stats = bucket_stats(&[], &[Characteristic::Me], Weighting::Value);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.ret, None);
        assert_eq!(stats.characteristics, vec![None]);
    }
}
