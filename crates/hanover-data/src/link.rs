//! Links from fundamentals companies to securities.

use crate::error::Result;
use crate::frame::{date_values, i64_values, str_values};
use crate::ids::{CompanyKey, SecurityId};
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::HashMap;

/// A company key linked to a security over a date span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Fundamentals company
    pub gvkey: CompanyKey,
    /// Security
    pub security: SecurityId,
    /// First valid date, open when `None`
    pub start: Option<NaiveDate>,
    /// Last valid date, open when `None`
    pub end: Option<NaiveDate>,
}

impl Link {
    /// Whether the link is valid on `date`.
    pub fn is_valid_on(&self, date: NaiveDate) -> bool {
        self.start.is_none_or(|s| s <= date) && self.end.is_none_or(|e| date <= e)
    }
}

/// Links indexed by security.
#[derive(Debug, Clone, Default)]
pub struct LinkTable {
    by_security: HashMap<SecurityId, Vec<Link>>,
}

impl LinkTable {
    /// Build from links.
    pub fn new(links: impl IntoIterator<Item = Link>) -> Self {
        let mut by_security: HashMap<SecurityId, Vec<Link>> = HashMap::new();
        for link in links {
            by_security.entry(link.security).or_default().push(link);
        }
        Self { by_security }
    }

    /// Build from the links feed. A missing end date means the link is still active.
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let gvkeys = str_values(df, "gvkey")?;
        let permnos = i64_values(df, "permno")?;
        let starts = date_values(df, "linkdt")?;
        let ends = date_values(df, "linkenddt")?;
        let links = (0..df.height()).filter_map(|i| {
            Some(Link {
                gvkey: CompanyKey(gvkeys[i].clone()?),
                security: SecurityId(permnos[i]?),
                start: starts[i],
                end: ends[i],
            })
        });
        Ok(Self::new(links.collect::<Vec<_>>()))
    }

    /// Companies linked to `security` on `date`.
    pub fn companies_for(
        &self,
        security: SecurityId,
        date: NaiveDate,
    ) -> impl Iterator<Item = &CompanyKey> {
        self.by_security
            .get(&security)
            .into_iter()
            .flatten()
            .filter(move |l| l.is_valid_on(date))
            .map(|l| &l.gvkey)
    }

    /// Number of linked securities.
    pub fn len(&self) -> usize {
        self.by_security.len()
    }

    /// Whether the table holds no links.
    pub fn is_empty(&self) -> bool {
        self.by_security.is_empty()
    }
}
