//! Factor plans: which sorts a factor request needs and how their legs combine.

use crate::compose::{FactorSeries, OTHER_BUCKETS, SIZE_BUCKETS, average_series, compose};
use crate::error::{FactorError, Result};
use crate::registry::{FactorName, LegRule};
use hanover_characteristics::Characteristic;
use hanover_data::{Frequency, TimeSeriesTable};
use hanover_portfolios::SortSpec;
use std::collections::{BTreeMap, BTreeSet};

/// A deduplicated factor request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactorPlan {
    factors: Vec<FactorName>,
}

impl FactorPlan {
    /// Plan for `names`, keeping the first occurrence of each factor.
    pub fn new(names: &[FactorName]) -> Result<Self> {
        let mut seen = BTreeSet::new();
        let factors: Vec<FactorName> = names.iter().copied().filter(|f| seen.insert(*f)).collect();
        if factors.is_empty() {
            return Err(FactorError::EmptyPlan);
        }
        Ok(Self { factors })
    }

    /// Plan from factor codes.
    pub fn parse<S: AsRef<str>>(codes: &[S]) -> Result<Self> {
        let names = codes
            .iter()
            .map(|c| c.as_ref().parse())
            .collect::<Result<Vec<FactorName>>>()?;
        Self::new(&names)
    }

    /// Requested factors in request order.
    pub fn factors(&self) -> &[FactorName] {
        &self.factors
    }

    fn requests(&self, name: FactorName) -> bool {
        self.factors.contains(&name)
    }

    /// Whether the market factor is requested.
    pub fn needs_market(&self) -> bool {
        self.requests(FactorName::MktRf)
    }

    /// Sorts whose SMB estimates are averaged into SMB.
    pub fn smb_sources(&self) -> Vec<Characteristic> {
        if self.requests(FactorName::Rmw) || self.requests(FactorName::Cma) {
            vec![Characteristic::Bm, Characteristic::Op, Characteristic::Inv]
        } else {
            vec![Characteristic::Bm]
        }
    }

    /// Second dimensions of every sort the plan needs, each once.
    pub fn sorts(&self) -> Vec<Characteristic> {
        let mut out = Vec::new();
        for &name in &self.factors {
            let needed = match name {
                FactorName::Smb => self.smb_sources(),
                other => other.info().sort.into_iter().collect(),
            };
            for c in needed {
                if !out.contains(&c) {
                    out.push(c);
                }
            }
        }
        out
    }

    /// The 2x3 sort on size and `characteristic`.
    pub fn sort_spec(characteristic: Characteristic) -> Result<SortSpec> {
        Ok(SortSpec::new(
            &[Characteristic::Me, characteristic],
            &[SIZE_BUCKETS, OTHER_BUCKETS],
        )?)
    }

    /// Compose the requested factors from value-weighted sort returns.
    ///
    /// `sort_returns` holds one returns table per entry of [`sorts`](Self::sorts). `market`
    /// is required when the plan includes MKT-RF. Columns follow request order.
    pub fn compose(
        &self,
        frequency: Frequency,
        sort_returns: &BTreeMap<Characteristic, TimeSeriesTable>,
        market: Option<&FactorSeries>,
    ) -> Result<TimeSeriesTable> {
        let sort_table = |c: Characteristic| {
            sort_returns
                .get(&c)
                .ok_or_else(|| FactorError::MissingSort(c.to_string()))
        };
        let mut columns = Vec::with_capacity(self.factors.len());
        for &name in &self.factors {
            let info = name.info();
            let series = match (name, info.rule) {
                (FactorName::Smb, rule) => {
                    let estimates = self
                        .smb_sources()
                        .into_iter()
                        .map(|c| compose(rule, sort_table(c)?))
                        .collect::<Result<Vec<_>>>()?;
                    average_series(&estimates)
                }
                (_, LegRule::MarketExcess) => market
                    .cloned()
                    .ok_or_else(|| FactorError::MissingSort(name.to_string()))?,
                (_, rule) => {
                    let c = info.sort.ok_or_else(|| FactorError::MissingSort(name.to_string()))?;
                    compose(rule, sort_table(c)?)?
                }
            };
            columns.push(series);
        }

        let dates: BTreeSet<_> = columns.iter().flat_map(|s| s.keys().copied()).collect();
        let mut table = TimeSeriesTable::new(
            frequency,
            self.factors.iter().map(|f| f.code().to_string()).collect(),
        );
        for date in dates {
            let values = columns
                .iter()
                .map(|s| s.get(&date).copied().flatten())
                .collect();
            table.push_row(date, values)?;
        }
        tracing::debug!(factors = self.factors.len(), periods = table.len(), "composed factors");
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn grid(values: [f64; 6]) -> TimeSeriesTable {
        let d = NaiveDate::from_ymd_opt(2020, 7, 31).unwrap();
        let columns = (0..6).map(|i| format!("p{i}")).collect();
        let mut t = TimeSeriesTable::new(Frequency::Monthly, columns);
        t.push_row(d, values.iter().map(|v| Some(*v)).collect()).unwrap();
        t
    }

    #[test]
    fn test_shared_sorts() {
        let plan = FactorPlan::parse(&["SMB", "HML", "hml"]).unwrap();
        assert_eq!(plan.factors(), &[FactorName::Smb, FactorName::Hml]);
        assert_eq!(plan.sorts(), vec![Characteristic::Bm]);

        let plan = FactorPlan::parse(&["MKT-RF", "SMB", "HML", "RMW", "CMA", "UMD"]).unwrap();
        assert_eq!(
            plan.sorts(),
            vec![
                Characteristic::Bm,
                Characteristic::Op,
                Characteristic::Inv,
                Characteristic::MOM
            ]
        );
        assert!(plan.needs_market());
    }

    #[test]
    fn test_empty_and_unknown() {
        assert!(matches!(FactorPlan::new(&[]), Err(FactorError::EmptyPlan)));
        assert!(matches!(
            FactorPlan::parse(&["SMB", "XYZ"]),
            Err(FactorError::Unknown(_))
        ));
    }

    #[test]
    fn test_smb_averages_three_sorts() {
        let plan = FactorPlan::new(&[FactorName::Smb, FactorName::Rmw, FactorName::Cma]).unwrap();
        let mut sorts = BTreeMap::new();
        sorts.insert(Characteristic::Bm, grid([0.03, 0.03, 0.03, 0.0, 0.0, 0.0]));
        sorts.insert(Characteristic::Op, grid([0.02, 0.02, 0.02, 0.0, 0.0, 0.0]));
        sorts.insert(Characteristic::Inv, grid([0.01, 0.02, 0.03, 0.0, 0.0, 0.0]));
        let table = plan.compose(Frequency::Monthly, &sorts, None).unwrap();
        let d = NaiveDate::from_ymd_opt(2020, 7, 31).unwrap();
        assert_eq!(table.columns(), &["SMB", "RMW", "CMA"]);
        assert_relative_eq!(table.get(d, "SMB").unwrap(), 0.02, epsilon = 1e-12);
        // RMW: (0.02 + 0) / 2 - (0.02 + 0) / 2
        assert_relative_eq!(table.get(d, "RMW").unwrap(), 0.0, epsilon = 1e-12);
        // CMA: low minus high on the investment sort
        assert_relative_eq!(table.get(d, "CMA").unwrap(), -0.01, epsilon = 1e-12);
    }

    #[test]
    fn test_missing_inputs() {
        let plan = FactorPlan::new(&[FactorName::Hml]).unwrap();
        assert!(matches!(
            plan.compose(Frequency::Monthly, &BTreeMap::new(), None),
            Err(FactorError::MissingSort(_))
        ));
        let plan = FactorPlan::new(&[FactorName::MktRf]).unwrap();
        assert!(plan.compose(Frequency::Monthly, &BTreeMap::new(), None).is_err());
    }

    #[test]
    fn test_sort_spec_shape() {
        let spec = FactorPlan::sort_spec(Characteristic::MOM).unwrap();
        assert_eq!(spec.bucket_keys().len(), 6);
    }
}
