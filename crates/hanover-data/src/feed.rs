//! Feeds requested from a data source and the columns each must carry.

use crate::calendar::Frequency;
use crate::error::{DataError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage type of a feed column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Free text (identifiers such as gvkey)
    Text,
    /// Integer codes and identifiers
    Int,
    /// Floating point values
    Float,
    /// Calendar dates
    Date,
}

/// Column of a feed schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Column name
    pub name: &'static str,
    /// Storage type
    pub kind: ColumnKind,
    /// Whether the feed is rejected without it
    pub required: bool,
}

const fn required(name: &'static str, kind: ColumnKind) -> ColumnSpec {
    ColumnSpec {
        name,
        kind,
        required: true,
    }
}

const fn optional(name: &'static str) -> ColumnSpec {
    ColumnSpec {
        name,
        kind: ColumnKind::Float,
        required: false,
    }
}

const FUNDAMENTALS: &[ColumnSpec] = &[
    required("gvkey", ColumnKind::Text),
    required("datadate", ColumnKind::Date),
    required("fyear", ColumnKind::Int),
    required("at", ColumnKind::Float),
    optional("seq"),
    optional("ceq"),
    optional("pstk"),
    optional("pstkrv"),
    optional("pstkl"),
    optional("lt"),
    optional("txditc"),
    optional("txdb"),
    optional("itcb"),
    optional("revt"),
    optional("cogs"),
    optional("xint"),
    optional("xsga"),
    optional("mib"),
    optional("ib"),
    optional("dp"),
    optional("txdi"),
    optional("dvc"),
    optional("act"),
    optional("che"),
    optional("lct"),
    optional("dlc"),
    optional("txp"),
    optional("csho"),
    optional("ajex"),
];

const SECURITIES: &[ColumnSpec] = &[
    required("permno", ColumnKind::Int),
    required("permco", ColumnKind::Int),
    required("date", ColumnKind::Date),
    required("exchcd", ColumnKind::Int),
    required("shrcd", ColumnKind::Int),
    required("ret", ColumnKind::Float),
    required("retx", ColumnKind::Float),
    required("shrout", ColumnKind::Float),
    required("prc", ColumnKind::Float),
];

const DELISTINGS: &[ColumnSpec] = &[
    required("permno", ColumnKind::Int),
    required("dlstdt", ColumnKind::Date),
    required("dlret", ColumnKind::Float),
];

const RISK_FREE: &[ColumnSpec] = &[
    required("date", ColumnKind::Date),
    required("rf", ColumnKind::Float),
];

const LINKS: &[ColumnSpec] = &[
    required("gvkey", ColumnKind::Text),
    required("permno", ColumnKind::Int),
    required("linkdt", ColumnKind::Date),
    required("linkenddt", ColumnKind::Date),
];

/// A tabular feed the engine requests from a [`DataSource`](crate::source::DataSource).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feed {
    /// Annual fundamentals, one row per company and fiscal year
    Fundamentals,
    /// Security returns, prices and shares at daily or monthly frequency
    Securities(Frequency),
    /// Delisting returns
    Delistings,
    /// Risk-free rate per period at daily or monthly frequency
    RiskFree(Frequency),
    /// Company key to security links with validity ranges
    Links,
}

impl Feed {
    /// Security feed at the base frequency of `frequency`.
    pub const fn securities(frequency: Frequency) -> Self {
        Self::Securities(frequency.base())
    }

    /// Risk-free feed at the base frequency of `frequency`.
    pub const fn risk_free(frequency: Frequency) -> Self {
        Self::RiskFree(frequency.base())
    }

    /// Stable feed name, also used as the CSV file stem and cache key prefix.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Fundamentals => "fundamentals",
            Self::Securities(f) if f.is_daily_based() => "securities_daily",
            Self::Securities(_) => "securities_monthly",
            Self::Delistings => "delistings",
            Self::RiskFree(f) if f.is_daily_based() => "riskfree_daily",
            Self::RiskFree(_) => "riskfree_monthly",
            Self::Links => "links",
        }
    }

    /// Column schema of the feed.
    pub const fn columns(&self) -> &'static [ColumnSpec] {
        match self {
            Self::Fundamentals => FUNDAMENTALS,
            Self::Securities(_) => SECURITIES,
            Self::Delistings => DELISTINGS,
            Self::RiskFree(_) => RISK_FREE,
            Self::Links => LINKS,
        }
    }

    /// Column used to restrict the feed to a date range, if any.
    pub const fn date_column(&self) -> Option<&'static str> {
        match self {
            Self::Fundamentals => Some("datadate"),
            Self::Securities(_) | Self::RiskFree(_) => Some("date"),
            Self::Delistings => Some("dlstdt"),
            Self::Links => None,
        }
    }

    /// Look up a column spec by name.
    pub fn column(&self, name: &str) -> Option<&'static ColumnSpec> {
        self.columns().iter().find(|c| c.name == name)
    }

    /// Reject a frame missing any required column.
    pub fn validate(&self, df: &DataFrame) -> Result<()> {
        for spec in self.columns().iter().filter(|c| c.required) {
            if df.column(spec.name).is_err() {
                return Err(DataError::Schema {
                    feed: self.name().to_string(),
                    column: spec.name.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Zero-row frame carrying the required columns.
    pub fn empty_frame(&self) -> Result<DataFrame> {
        let columns = self
            .columns()
            .iter()
            .filter(|c| c.required)
            .map(|c| {
                let dtype = match c.kind {
                    ColumnKind::Text => DataType::String,
                    ColumnKind::Int => DataType::Int64,
                    ColumnKind::Float => DataType::Float64,
                    ColumnKind::Date => DataType::Date,
                };
                Series::new_empty(c.name.into(), &dtype).into()
            })
            .collect::<Vec<Column>>();
        Ok(DataFrame::new(columns)?)
    }
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_names_follow_base_frequency() {
        assert_eq!(Feed::securities(Frequency::Weekly).name(), "securities_daily");
        assert_eq!(Feed::securities(Frequency::Annual).name(), "securities_monthly");
        assert_eq!(Feed::risk_free(Frequency::Quarterly), Feed::RiskFree(Frequency::Monthly));
    }

    #[test]
    fn test_validate_reports_missing_column() {
        let df = DataFrame::new(vec![
            Series::new("date".into(), vec!["2020-01-31"]).into(),
        ])
        .unwrap();
        let err = Feed::RiskFree(Frequency::Monthly).validate(&df).unwrap_err();
        assert!(matches!(err, DataError::Schema { ref column, .. } if column == "rf"));
    }

    #[test]
    fn test_empty_frame_validates() {
        let feeds = [
            Feed::Fundamentals,
            Feed::Securities(Frequency::Daily),
            Feed::Delistings,
            Feed::RiskFree(Frequency::Monthly),
            Feed::Links,
        ];
        for feed in feeds {
            let df = feed.empty_frame().unwrap();
            assert_eq!(df.height(), 0);
            feed.validate(&df).unwrap();
        }
    }
}
