//! Characteristic Registry
//!
//! Central registry for every characteristic a sort can use. Each entry says how often the
//! characteristic refreshes, where its lowest bucket starts, which values are valid and how
//! cross-sectional outliers are treated.

use crate::error::{CharacteristicError, Result};
use crate::prior_returns::PriorWindow;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A firm characteristic usable as a sort dimension.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Characteristic {
    /// Market equity
    Me,
    /// Book equity
    Be,
    /// Book-to-market equity
    Bm,
    /// Operating profitability
    Op,
    /// Investment (asset growth)
    Inv,
    /// Earnings-to-price
    Ep,
    /// Cash flow-to-price
    Cfp,
    /// Dividend yield
    Dp,
    /// Accruals
    Ac,
    /// Net share issuance
    Ni,
    /// Compounded return over a window of prior periods
    Prior(PriorWindow),
    /// Rolling return variance
    Var,
    /// Rolling residual variance from a three-factor regression
    ResVar,
    /// Rolling market beta
    Beta,
}

/// How often a characteristic is re-measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Refresh {
    /// Once per formation year from June and December data
    Annual,
    /// Every period from trailing returns
    Periodic,
}

/// Lower bound of the lowest bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Domain {
    /// Lowest bucket starts at zero; negative values are unassigned
    NonNegative,
    /// Lowest bucket starts at negative infinity
    Real,
}

impl Domain {
    /// Numeric lower bound.
    pub const fn lower_bound(&self) -> f64 {
        match self {
            Self::NonNegative => 0.0,
            Self::Real => f64::NEG_INFINITY,
        }
    }
}

/// Validity predicate applied before a value enters a sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Predicate {
    /// Finite and strictly positive
    Positive,
    /// Any finite value
    Finite,
}

impl Predicate {
    /// Whether `value` passes.
    pub const fn accepts(&self, value: f64) -> bool {
        match self {
            Self::Positive => value.is_finite() && value > 0.0,
            Self::Finite => value.is_finite(),
        }
    }
}

/// Bound of a clamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Bound {
    /// No bound
    Unbounded,
    /// Cross-sectional percentile (0-100)
    Percentile(f64),
    /// Fixed value
    Absolute(f64),
}

/// Cross-sectional outlier treatment, applied per fiscal year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OutlierPolicy {
    /// Leave values untouched
    None,
    /// Set values above the percentile to missing
    TrimAbove(f64),
    /// Clamp values into the bounds
    Clamp {
        /// Lower bound
        lower: Bound,
        /// Upper bound
        upper: Bound,
    },
}

/// Characteristic metadata
#[derive(Debug, Clone, PartialEq)]
pub struct CharacteristicInfo {
    /// Characteristic
    pub characteristic: Characteristic,
    /// Brief description of what the characteristic measures
    pub description: &'static str,
    /// Refresh cadence
    pub refresh: Refresh,
    /// Lower bound of the lowest bucket
    pub domain: Domain,
    /// Validity predicate
    pub predicate: Predicate,
    /// Outlier treatment
    pub outliers: OutlierPolicy,
    /// Feed columns the derivation reads
    pub required_inputs: &'static [&'static str],
}

const PRICE_INPUTS: &[&str] = &["permno", "permco", "date", "prc", "shrout"];
const RETURN_INPUTS: &[&str] = &["permno", "date", "ret"];

impl Characteristic {
    /// Momentum window, months 2 through 12.
    pub const MOM: Self = Self::Prior(PriorWindow { start: 2, end: 12 });
    /// Short-term reversal window, month 1.
    pub const ST_REV: Self = Self::Prior(PriorWindow { start: 1, end: 1 });
    /// Long-term reversal window, months 13 through 60.
    pub const LT_REV: Self = Self::Prior(PriorWindow { start: 13, end: 60 });

    /// Code used in requests, e.g. `BM` or `PRIOR_2_12`.
    pub fn code(&self) -> String {
        match self {
            Self::Me => "ME".into(),
            Self::Be => "BE".into(),
            Self::Bm => "BM".into(),
            Self::Op => "OP".into(),
            Self::Inv => "INV".into(),
            Self::Ep => "EP".into(),
            Self::Cfp => "CFP".into(),
            Self::Dp => "DP".into(),
            Self::Ac => "AC".into(),
            Self::Ni => "NI".into(),
            Self::Prior(w) => format!("PRIOR_{}_{}", w.start, w.end),
            Self::Var => "VAR".into(),
            Self::ResVar => "RESVAR".into(),
            Self::Beta => "BETA".into(),
        }
    }

    /// Prefix used in bucket labels, e.g. `bm` in `bm70-100`.
    pub fn label(&self) -> String {
        match self {
            Self::Prior(w) => match (w.start, w.end) {
                (2, 12) => "mom".into(),
                (1, 1) => "strev".into(),
                (13, 60) => "ltrev".into(),
                (j, k) => format!("prior{j}_{k}"),
            },
            other => other.code().to_lowercase(),
        }
    }

    /// Registry entry.
    pub fn info(&self) -> CharacteristicInfo {
        use Bound::{Absolute, Percentile, Unbounded};
        let (description, refresh, domain, predicate, outliers, required_inputs): (
            &'static str,
            _,
            _,
            _,
            _,
            &'static [&'static str],
        ) = match self {
            Self::Me => (
                "Market equity, summed across share classes",
                Refresh::Annual,
                Domain::NonNegative,
                Predicate::Positive,
                OutlierPolicy::None,
                PRICE_INPUTS,
            ),
            Self::Be => (
                "Book equity",
                Refresh::Annual,
                Domain::NonNegative,
                Predicate::Positive,
                OutlierPolicy::None,
                &["seq", "ceq", "pstk", "at", "lt", "txditc", "pstkrv", "pstkl"],
            ),
            Self::Bm => (
                "Book equity over December market equity",
                Refresh::Annual,
                Domain::NonNegative,
                Predicate::Positive,
                OutlierPolicy::None,
                &["seq", "ceq", "pstk", "at", "lt", "txditc", "prc", "shrout"],
            ),
            Self::Op => (
                "Operating profitability over book equity",
                Refresh::Annual,
                Domain::Real,
                Predicate::Finite,
                OutlierPolicy::TrimAbove(99.0),
                &["revt", "cogs", "xint", "xsga", "mib"],
            ),
            Self::Inv => (
                "Growth of total assets",
                Refresh::Annual,
                Domain::Real,
                Predicate::Finite,
                OutlierPolicy::Clamp {
                    lower: Percentile(15.0),
                    upper: Percentile(99.0),
                },
                &["at"],
            ),
            Self::Ep => (
                "Earnings over December market equity, positive earnings only",
                Refresh::Annual,
                Domain::Real,
                Predicate::Positive,
                OutlierPolicy::None,
                &["ib", "prc", "shrout"],
            ),
            Self::Cfp => (
                "Cash flow over December market equity, positive cash flow only",
                Refresh::Annual,
                Domain::Real,
                Predicate::Positive,
                OutlierPolicy::None,
                &["ib", "dp", "txdi", "prc", "shrout"],
            ),
            Self::Dp => (
                "Dividends over December market equity",
                Refresh::Annual,
                Domain::NonNegative,
                Predicate::Finite,
                OutlierPolicy::None,
                &["dvc", "prc", "shrout"],
            ),
            Self::Ac => (
                "Change in operating working capital per share over book equity per share",
                Refresh::Annual,
                Domain::Real,
                Predicate::Finite,
                OutlierPolicy::Clamp {
                    lower: Absolute(-200.0),
                    upper: Absolute(200.0),
                },
                &["act", "che", "lct", "dlc", "txp", "csho", "ajex"],
            ),
            Self::Ni => (
                "Growth of split-adjusted shares outstanding",
                Refresh::Annual,
                Domain::NonNegative,
                Predicate::Finite,
                OutlierPolicy::Clamp {
                    lower: Unbounded,
                    upper: Percentile(99.9),
                },
                &["csho", "ajex"],
            ),
            Self::Prior(_) => (
                "Compounded return over prior periods",
                Refresh::Periodic,
                Domain::Real,
                Predicate::Finite,
                OutlierPolicy::None,
                RETURN_INPUTS,
            ),
            Self::Var => (
                "Variance of daily returns over a trailing window",
                Refresh::Periodic,
                Domain::NonNegative,
                Predicate::Finite,
                OutlierPolicy::None,
                RETURN_INPUTS,
            ),
            Self::ResVar => (
                "Residual variance of daily three-factor regressions over a trailing window",
                Refresh::Periodic,
                Domain::NonNegative,
                Predicate::Finite,
                OutlierPolicy::None,
                RETURN_INPUTS,
            ),
            Self::Beta => (
                "Slope on the market excess return over a trailing window",
                Refresh::Periodic,
                Domain::Real,
                Predicate::Finite,
                OutlierPolicy::None,
                RETURN_INPUTS,
            ),
        };
        CharacteristicInfo {
            characteristic: *self,
            description,
            refresh,
            domain,
            predicate,
            outliers,
            required_inputs,
        }
    }

    /// Refresh cadence.
    pub const fn refresh(&self) -> Refresh {
        match self {
            Self::Prior(_) | Self::Var | Self::ResVar | Self::Beta => Refresh::Periodic,
            _ => Refresh::Annual,
        }
    }

    /// Whether the characteristic is re-measured every period.
    pub const fn is_periodic(&self) -> bool {
        matches!(self.refresh(), Refresh::Periodic)
    }

    /// Whether a value can enter a sort on this characteristic.
    pub fn accepts(&self, value: f64) -> bool {
        let info = self.info();
        info.predicate.accepts(value) && value >= info.domain.lower_bound()
    }
}

impl fmt::Display for Characteristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

impl FromStr for Characteristic {
    type Err = CharacteristicError;

    fn from_str(s: &str) -> Result<Self> {
        let code = s.trim().to_ascii_uppercase();
        let parsed = match code.as_str() {
            "ME" => Self::Me,
            "BE" => Self::Be,
            "BM" | "BE/ME" => Self::Bm,
            "OP" => Self::Op,
            "INV" => Self::Inv,
            "EP" | "E/P" => Self::Ep,
            "CFP" | "CF/P" => Self::Cfp,
            "DP" | "D/P" => Self::Dp,
            "AC" => Self::Ac,
            "NI" => Self::Ni,
            "VAR" => Self::Var,
            "RESVAR" => Self::ResVar,
            "BETA" => Self::Beta,
            other => {
                let Some(rest) = other.strip_prefix("PRIOR_") else {
                    return Err(CharacteristicError::Unknown(s.to_string()));
                };
                let (start, end) = rest
                    .split_once('_')
                    .ok_or_else(|| CharacteristicError::Unknown(s.to_string()))?;
                let start = start
                    .parse()
                    .map_err(|_| CharacteristicError::Unknown(s.to_string()))?;
                let end = end
                    .parse()
                    .map_err(|_| CharacteristicError::Unknown(s.to_string()))?;
                Self::Prior(PriorWindow::new(start, end)?)
            }
        };
        Ok(parsed)
    }
}

/// Registry entries for every standard characteristic.
pub fn available_characteristics() -> Vec<CharacteristicInfo> {
    [
        Characteristic::Me,
        Characteristic::Be,
        Characteristic::Bm,
        Characteristic::Op,
        Characteristic::Inv,
        Characteristic::Ep,
        Characteristic::Cfp,
        Characteristic::Dp,
        Characteristic::Ac,
        Characteristic::Ni,
        Characteristic::MOM,
        Characteristic::ST_REV,
        Characteristic::LT_REV,
        Characteristic::Var,
        Characteristic::ResVar,
        Characteristic::Beta,
    ]
    .iter()
    .map(Characteristic::info)
    .collect()
}

/// Get characteristic info by code
pub fn get_characteristic_info(code: &str) -> Option<CharacteristicInfo> {
    code.parse::<Characteristic>().ok().map(|c| c.info())
}
