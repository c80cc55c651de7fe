//! Universe and formation settings.

use serde::{Deserialize, Serialize};

/// Exchange and share-code filters for the two universes of a sort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniverseConfig {
    /// Exchanges whose firms set the breakpoints (NYSE)
    pub reference_exchanges: Vec<i64>,
    /// Exchanges whose firms are assigned to buckets (NYSE, AMEX, NASDAQ)
    pub sample_exchanges: Vec<i64>,
    /// Share codes of ordinary common stock
    pub share_codes: Vec<i64>,
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            reference_exchanges: vec![1],
            sample_exchanges: vec![1, 2, 3],
            share_codes: vec![10, 11],
        }
    }
}

impl UniverseConfig {
    fn matches(
        exchanges: &[i64],
        share_codes: &[i64],
        exchcd: Option<i64>,
        shrcd: Option<i64>,
    ) -> bool {
        exchcd.is_some_and(|e| exchanges.contains(&e))
            && shrcd.is_some_and(|s| share_codes.contains(&s))
    }

    /// Whether a firm belongs to the breakpoint universe.
    pub fn is_reference(&self, exchcd: Option<i64>, shrcd: Option<i64>) -> bool {
        Self::matches(&self.reference_exchanges, &self.share_codes, exchcd, shrcd)
    }

    /// Whether a firm belongs to the sample universe.
    pub fn is_sample(&self, exchcd: Option<i64>, shrcd: Option<i64>) -> bool {
        Self::matches(&self.sample_exchanges, &self.share_codes, exchcd, shrcd)
    }
}

/// Annual formation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormationConfig {
    /// Month in which annual portfolios are formed
    pub formation_month: u32,
    /// Fiscal years of history required before fundamentals are used
    pub min_history_years: u32,
}

impl Default for FormationConfig {
    fn default() -> Self {
        Self {
            formation_month: 6,
            min_history_years: 2,
        }
    }
}
