//! Annual and periodic portfolio sorts.

use crate::breakpoints::{BreakpointSet, ReferenceRow, period_breakpoints};
use crate::buckets::{BucketKey, SortMode, SortSpec, assign_bucket};
use crate::config::UniverseConfig;
use crate::error::{PortfolioError, Result};
use crate::formation::{FormationRecord, WeightInfo, formation_date};
use chrono::NaiveDate;
use hanover_characteristics::Characteristic;
use hanover_data::{DataError, DateRange, Frequency, SecurityId, SecurityPanel};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Aligned inputs of a sort.
#[derive(Debug, Clone, Copy)]
pub struct SortInputs<'a> {
    /// Security panel at base frequency
    pub panel: &'a SecurityPanel,
    /// Weights aligned with the panel observations
    pub weights: &'a [WeightInfo],
    /// Formation records of every year in range
    pub records: &'a [FormationRecord],
    /// Lag-attached periodic characteristics aligned with the panel observations
    pub periodic: &'a BTreeMap<Characteristic, Vec<Option<f64>>>,
    /// Universe filters
    pub universe: &'a UniverseConfig,
    /// Formation month
    pub formation_month: u32,
}

/// One firm in one bucket in one period.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Security
    pub security: SecurityId,
    /// Bucket
    pub bucket: BucketKey,
    /// Delisting-adjusted return of the period
    pub ret: Option<f64>,
    /// Portfolio weight
    pub weight: Option<f64>,
    /// Sort characteristic values in dimension order
    pub values: Vec<f64>,
}

/// Result of a sort over a date range.
#[derive(Debug, Clone)]
pub struct SortOutcome {
    /// Sort that produced the outcome
    pub spec: SortSpec,
    /// Panel frequency
    pub frequency: Frequency,
    /// Period-end dates of the range at panel frequency
    pub dates: Vec<NaiveDate>,
    /// Assignments per period end
    pub assignments: BTreeMap<NaiveDate, Vec<Assignment>>,
    /// Breakpoints of every period that had a reference universe
    pub breakpoints: Vec<BreakpointSet>,
}

fn assign(
    spec: &SortSpec,
    sets: &[BreakpointSet],
    values: &[Option<f64>],
) -> Option<(BucketKey, Vec<f64>)> {
    let mut key = Vec::with_capacity(sets.len());
    let mut present = Vec::with_capacity(sets.len());
    for ((c, set), value) in spec.characteristics().iter().zip(sets).zip(values) {
        let v = value.filter(|v| c.accepts(*v))?;
        key.push(assign_bucket(v, c.info().domain.lower_bound(), &set.boundaries)?);
        present.push(v);
    }
    Some((BucketKey(key), present))
}

/// Run `spec` over `range`.
///
/// Annual sorts compute breakpoints once per formation year from formation records and carry
/// the labels through the following twelve months with compounded weights. Periodic sorts
/// recompute breakpoints every period and weight by lagged market equity. Periods without a
/// reference universe keep their date but have no assignments.
pub fn run_sort(
    spec: &SortSpec,
    inputs: &SortInputs<'_>,
    range: &DateRange,
) -> Result<SortOutcome> {
    let observations = inputs.panel.observations();
    if inputs.weights.len() != observations.len() {
        return Err(DataError::ShapeMismatch {
            expected: observations.len(),
            actual: inputs.weights.len(),
        }
        .into());
    }
    let base = inputs.panel.frequency();
    let in_range: Vec<usize> = (0..observations.len())
        .filter(|&i| range.contains(observations[i].date))
        .collect();
    let dates: BTreeSet<NaiveDate> = in_range
        .iter()
        .map(|&i| base.period_end(observations[i].date))
        .collect();

    let (assignments, breakpoints) = match spec.mode() {
        SortMode::Annual => annual_sort(spec, inputs, &in_range)?,
        SortMode::Periodic => periodic_sort(spec, inputs, &in_range)?,
    };

    if breakpoints.is_empty() {
        return Err(PortfolioError::EmptyReferenceUniverse {
            sort: spec.to_string(),
            range: range.to_string(),
        });
    }
    tracing::debug!(
        sort = %spec,
        periods = dates.len(),
        assigned_periods = assignments.len(),
        "ran portfolio sort"
    );
    Ok(SortOutcome {
        spec: spec.clone(),
        frequency: base,
        dates: dates.into_iter().collect(),
        assignments,
        breakpoints,
    })
}

type Assigned = (BTreeMap<NaiveDate, Vec<Assignment>>, Vec<BreakpointSet>);

fn annual_sort(
    spec: &SortSpec,
    inputs: &SortInputs<'_>,
    in_range: &[usize],
) -> Result<Assigned> {
    let observations = inputs.panel.observations();
    let base = inputs.panel.frequency();
    let years: BTreeSet<i32> = in_range.iter().map(|&i| inputs.weights[i].ff_year).collect();

    let mut by_year: HashMap<i32, Vec<&FormationRecord>> = HashMap::new();
    for r in inputs.records {
        by_year.entry(r.year).or_default().push(r);
    }
    let row = |r: &FormationRecord| -> Vec<Option<f64>> {
        spec.characteristics().iter().map(|&c| r.value(c)).collect()
    };

    let formations: Vec<(i32, NaiveDate, &[&FormationRecord])> = years
        .into_iter()
        .filter_map(|year| {
            let records = by_year.get(&year)?;
            let period = formation_date(year, inputs.formation_month)?;
            Some((year, period, records.as_slice()))
        })
        .collect();
    let reference: Vec<ReferenceRow> = formations
        .iter()
        .flat_map(move |&(_, period, records)| {
            records
                .iter()
                .filter(move |r| inputs.universe.is_reference(r.exchcd, r.shrcd))
                .map(move |&r| (period, row(r)))
        })
        .collect();
    let mut sets_by_period = period_breakpoints(spec, &reference)?;

    let mut breakpoints = Vec::new();
    let mut labels: HashMap<(SecurityId, i32), (BucketKey, Vec<f64>)> = HashMap::new();
    for (year, period, records) in formations {
        let Some(sets) = sets_by_period.remove(&period) else {
            tracing::debug!(year, "no reference firms for formation year");
            continue;
        };
        for &r in records
            .iter()
            .filter(|r| inputs.universe.is_sample(r.exchcd, r.shrcd))
        {
            if let Some(label) = assign(spec, &sets, &row(r)) {
                labels.insert((r.security, year), label);
            }
        }
        breakpoints.extend(sets);
    }

    let mut assignments: BTreeMap<NaiveDate, Vec<Assignment>> = BTreeMap::new();
    for &i in in_range {
        let o = &observations[i];
        let w = &inputs.weights[i];
        if let Some((bucket, values)) = labels.get(&(o.security, w.ff_year)) {
            assignments
                .entry(base.period_end(o.date))
                .or_default()
                .push(Assignment {
                    security: o.security,
                    bucket: bucket.clone(),
                    ret: o.ret_adj,
                    weight: w.weight,
                    values: values.clone(),
                });
        }
    }
    Ok((assignments, breakpoints))
}

fn periodic_sort(
    spec: &SortSpec,
    inputs: &SortInputs<'_>,
    in_range: &[usize],
) -> Result<Assigned> {
    let observations = inputs.panel.observations();
    let base = inputs.panel.frequency();
    let records: HashMap<(SecurityId, i32), &FormationRecord> = inputs
        .records
        .iter()
        .map(|r| ((r.security, r.year), r))
        .collect();

    let mut periods: BTreeMap<NaiveDate, Vec<usize>> = BTreeMap::new();
    for &i in in_range {
        periods
            .entry(base.period_end(observations[i].date))
            .or_default()
            .push(i);
    }

    let value = |c: Characteristic, i: usize| -> Option<f64> {
        let o = &observations[i];
        let w = &inputs.weights[i];
        match c {
            Characteristic::Me => w.lagged_me,
            c if c.is_periodic() => inputs
                .periodic
                .get(&c)
                .and_then(|v| v.get(i).copied().flatten()),
            c => records.get(&(o.security, w.ff_year)).and_then(|r| r.value(c)),
        }
    };
    let rows: HashMap<usize, Vec<Option<f64>>> = in_range
        .iter()
        .map(|&i| (i, spec.characteristics().iter().map(|&c| value(c, i)).collect()))
        .collect();

    let rows = &rows;
    let reference: Vec<ReferenceRow> = periods
        .iter()
        .flat_map(move |(&period, members)| {
            members
                .iter()
                .filter(move |&&i| {
                    let o = &observations[i];
                    inputs.universe.is_reference(o.exchcd, o.shrcd)
                })
                .map(move |i| (period, rows[i].clone()))
        })
        .collect();
    let mut sets_by_period = period_breakpoints(spec, &reference)?;

    let mut assignments = BTreeMap::new();
    let mut breakpoints = Vec::new();
    for (period, members) in periods {
        let Some(sets) = sets_by_period.remove(&period) else {
            continue;
        };
        let assigned: Vec<Assignment> = members
            .iter()
            .filter_map(|&i| {
                let o = &observations[i];
                if !inputs.universe.is_sample(o.exchcd, o.shrcd) {
                    return None;
                }
                let (bucket, values) = assign(spec, &sets, &rows[&i])?;
                Some(Assignment {
                    security: o.security,
                    bucket,
                    ret: o.ret_adj,
                    weight: inputs.weights[i].lagged_me,
                    values,
                })
            })
            .collect();
        assignments.insert(period, assigned);
        breakpoints.extend(sets);
    }
    Ok((assignments, breakpoints))
}
