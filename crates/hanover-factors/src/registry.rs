//! Factor Registry
//!
//! Central registry of the published long-short factors and the sorts they come from.

use crate::error::{FactorError, Result};
use hanover_characteristics::Characteristic;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Available factor categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FactorCategory {
    /// Market excess return
    Market,
    /// Size
    Size,
    /// Value
    Value,
    /// Profitability
    Profitability,
    /// Investment
    Investment,
    /// Momentum
    Momentum,
    /// Short- and long-term reversal
    Reversal,
}

/// A published factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FactorName {
    /// Market minus risk-free
    MktRf,
    /// Small minus big
    Smb,
    /// High minus low book-to-market
    Hml,
    /// Robust minus weak profitability
    Rmw,
    /// Conservative minus aggressive investment
    Cma,
    /// Winners minus losers
    Mom,
    /// Short-term reversal
    StRev,
    /// Long-term reversal
    LtRev,
}

/// How the six cells of a 2x3 sort combine into a factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegRule {
    /// Mean of the three small cells minus the mean of the three big cells
    SmallMinusBig,
    /// Mean of the two high cells minus the mean of the two low cells
    HighMinusLow,
    /// Negation of `HighMinusLow`
    LowMinusHigh,
    /// Value-weighted market return minus the risk-free rate
    MarketExcess,
}

/// Factor metadata
#[derive(Debug, Clone, PartialEq)]
pub struct FactorInfo {
    /// Factor
    pub name: FactorName,
    /// Factor category
    pub category: FactorCategory,
    /// Brief description of what the factor measures
    pub description: &'static str,
    /// Non-size dimension of the 2x3 sort, `None` for the market factor
    pub sort: Option<Characteristic>,
    /// Leg rule
    pub rule: LegRule,
}

impl FactorName {
    /// All factors in publication order.
    pub const ALL: [Self; 8] = [
        Self::MktRf,
        Self::Smb,
        Self::Hml,
        Self::Rmw,
        Self::Cma,
        Self::Mom,
        Self::StRev,
        Self::LtRev,
    ];

    /// Column name, e.g. `MKT-RF`.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MktRf => "MKT-RF",
            Self::Smb => "SMB",
            Self::Hml => "HML",
            Self::Rmw => "RMW",
            Self::Cma => "CMA",
            Self::Mom => "MOM",
            Self::StRev => "ST_Rev",
            Self::LtRev => "LT_Rev",
        }
    }

    /// Registry entry.
    pub const fn info(&self) -> FactorInfo {
        let (category, description, sort, rule) = match self {
            Self::MktRf => (
                FactorCategory::Market,
                "Value-weighted return of the sample universe minus the risk-free rate",
                None,
                LegRule::MarketExcess,
            ),
            Self::Smb => (
                FactorCategory::Size,
                "Small minus big market equity",
                Some(Characteristic::Bm),
                LegRule::SmallMinusBig,
            ),
            Self::Hml => (
                FactorCategory::Value,
                "High minus low book-to-market",
                Some(Characteristic::Bm),
                LegRule::HighMinusLow,
            ),
            Self::Rmw => (
                FactorCategory::Profitability,
                "Robust minus weak operating profitability",
                Some(Characteristic::Op),
                LegRule::HighMinusLow,
            ),
            Self::Cma => (
                FactorCategory::Investment,
                "Conservative minus aggressive asset growth",
                Some(Characteristic::Inv),
                LegRule::LowMinusHigh,
            ),
            Self::Mom => (
                FactorCategory::Momentum,
                "High minus low prior 2-12 month return",
                Some(Characteristic::MOM),
                LegRule::HighMinusLow,
            ),
            Self::StRev => (
                FactorCategory::Reversal,
                "Low minus high prior month return",
                Some(Characteristic::ST_REV),
                LegRule::LowMinusHigh,
            ),
            Self::LtRev => (
                FactorCategory::Reversal,
                "Low minus high prior 13-60 month return",
                Some(Characteristic::LT_REV),
                LegRule::LowMinusHigh,
            ),
        };
        FactorInfo {
            name: *self,
            category,
            description,
            sort,
            rule,
        }
    }
}

impl fmt::Display for FactorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for FactorName {
    type Err = FactorError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_uppercase();
        match normalized.as_str() {
            "MKTRF" | "MKT" => Ok(Self::MktRf),
            "SMB" => Ok(Self::Smb),
            "HML" => Ok(Self::Hml),
            "RMW" => Ok(Self::Rmw),
            "CMA" => Ok(Self::Cma),
            "MOM" | "UMD" => Ok(Self::Mom),
            "STREV" => Ok(Self::StRev),
            "LTREV" => Ok(Self::LtRev),
            _ => Err(FactorError::Unknown(s.to_string())),
        }
    }
}

/// Get all available factor info
pub fn available_factors() -> Vec<FactorInfo> {
    FactorName::ALL.iter().map(FactorName::info).collect()
}

/// Get factor info by code
pub fn get_factor_info(code: &str) -> Option<FactorInfo> {
    code.parse::<FactorName>().ok().map(|f| f.info())
}

/// Get factors by category
pub fn factors_by_category(category: FactorCategory) -> Vec<FactorInfo> {
    available_factors()
        .into_iter()
        .filter(|f| f.category == category)
        .collect()
}
