//! Percentile breakpoints.

use crate::buckets::SortSpec;
use crate::error::{PortfolioError, Result};
use chrono::NaiveDate;
use hanover_characteristics::Characteristic;
use hanover_data::frame::{date_column, date_values, f64_values, i64_values};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bucket counts a sort dimension may use.
pub const SUPPORTED_BUCKET_COUNTS: [usize; 11] = [2, 3, 4, 5, 6, 8, 10, 20, 25, 50, 100];

/// Cut points of one sort dimension.
///
/// Two buckets split at the median; three use the 30th and 70th percentiles; any other count
/// uses equal percentile steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketScheme {
    count: usize,
    percentiles: Vec<f64>,
}

impl BucketScheme {
    /// Scheme for `count` buckets.
    pub fn new(count: usize) -> Result<Self> {
        if !SUPPORTED_BUCKET_COUNTS.contains(&count) {
            return Err(PortfolioError::UnsupportedBucketCount(count));
        }
        let percentiles = match count {
            2 => vec![50.0],
            3 => vec![30.0, 70.0],
            k => (1..k).map(|i| 100.0 * i as f64 / k as f64).collect(),
        };
        Ok(Self { count, percentiles })
    }

    /// Number of buckets.
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Interior cut points in percent.
    pub fn percentiles(&self) -> &[f64] {
        &self.percentiles
    }

    /// Lower and upper percentile of bucket `index`.
    pub fn edges(&self, index: usize) -> (f64, f64) {
        let lo = index
            .checked_sub(1)
            .and_then(|i| self.percentiles.get(i))
            .copied()
            .unwrap_or(0.0);
        let hi = self.percentiles.get(index).copied().unwrap_or(100.0);
        (lo, hi)
    }
}

/// Breakpoints of one characteristic in one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakpointSet {
    /// Formation date of the breakpoints
    pub period: NaiveDate,
    /// Characteristic
    pub characteristic: Characteristic,
    /// Cut points in percent
    pub percentiles: Vec<f64>,
    /// Values at the cut points, non-decreasing
    pub boundaries: Vec<f64>,
    /// Reference firms the breakpoints were computed from
    pub observations: usize,
}

/// Reference values of one firm in one period, in dimension order.
pub type ReferenceRow = (NaiveDate, Vec<Option<f64>>);

fn dimension(d: usize) -> String {
    format!("d{d}")
}

/// Breakpoints of `spec` for every period of `reference` at once.
///
/// Values a characteristic does not accept are ignored. Periods where some dimension has no
/// values get no breakpoints.
pub fn period_breakpoints(
    spec: &SortSpec,
    reference: &[ReferenceRow],
) -> Result<BTreeMap<NaiveDate, Vec<BreakpointSet>>> {
    let periods: Vec<Option<NaiveDate>> = reference.iter().map(|(p, _)| Some(*p)).collect();
    let mut columns = vec![date_column("period", &periods)?];
    let mut aggs = Vec::new();
    for (d, (&c, scheme)) in spec.characteristics().iter().zip(spec.schemes()).enumerate() {
        let name = dimension(d);
        let values: Vec<Option<f64>> = reference
            .iter()
            .map(|(_, row)| row.get(d).copied().flatten().filter(|v| c.accepts(*v)))
            .collect();
        columns.push(Series::new(name.as_str().into(), values).into());
        for (i, &p) in scheme.percentiles().iter().enumerate() {
            aggs.push(
                col(name.as_str())
                    .quantile(lit(p / 100.0), QuantileMethod::Linear)
                    .alias(format!("{name}_p{i}")),
            );
        }
        aggs.push(col(name.as_str()).count().alias(format!("{name}_n")));
    }

    let df = DataFrame::new(columns)?
        .lazy()
        .group_by([col("period")])
        .agg(aggs)
        .sort(["period"], Default::default())
        .collect()?;

    let periods = date_values(&df, "period")?;
    let mut counts = Vec::new();
    let mut cuts = Vec::new();
    for (d, scheme) in spec.schemes().iter().enumerate() {
        let name = dimension(d);
        counts.push(i64_values(&df, &format!("{name}_n"))?);
        cuts.push(
            (0..scheme.percentiles().len())
                .map(|i| f64_values(&df, &format!("{name}_p{i}")))
                .collect::<hanover_data::Result<Vec<_>>>()?,
        );
    }

    let mut out = BTreeMap::new();
    for (row, period) in periods.into_iter().enumerate() {
        let Some(period) = period else { continue };
        let sets: Option<Vec<BreakpointSet>> = spec
            .characteristics()
            .iter()
            .zip(spec.schemes())
            .enumerate()
            .map(|(d, (&c, scheme))| {
                let observations = counts[d][row].filter(|&n| n > 0)? as usize;
                let boundaries = cuts[d]
                    .iter()
                    .map(|cut| cut[row])
                    .collect::<Option<Vec<f64>>>()?;
                Some(BreakpointSet {
                    period,
                    characteristic: c,
                    percentiles: scheme.percentiles().to_vec(),
                    boundaries,
                    observations,
                })
            })
            .collect();
        if let Some(sets) = sets {
            out.insert(period, sets);
        }
    }
    Ok(out)
}
