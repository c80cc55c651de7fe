//! Frequencies, calendar period ends and date ranges.

use crate::error::{DataError, Result};
use chrono::{Datelike, Months, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sampling frequency of a panel or an output table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Frequency {
    /// Trading days
    Daily,
    /// ISO weeks ending on Friday
    Weekly,
    /// Calendar months
    Monthly,
    /// Calendar quarters
    Quarterly,
    /// Calendar years
    Annual,
}

impl Frequency {
    /// All frequencies from finest to coarsest.
    pub const ALL: [Self; 5] = [
        Self::Daily,
        Self::Weekly,
        Self::Monthly,
        Self::Quarterly,
        Self::Annual,
    ];

    /// Single-letter code.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Daily => "D",
            Self::Weekly => "W",
            Self::Monthly => "M",
            Self::Quarterly => "Q",
            Self::Annual => "A",
        }
    }

    /// Frequency at which panels are built and portfolios computed before compounding.
    ///
    /// Daily and weekly outputs compound daily data; everything else compounds monthly data.
    pub const fn base(&self) -> Self {
        match self {
            Self::Daily | Self::Weekly => Self::Daily,
            Self::Monthly | Self::Quarterly | Self::Annual => Self::Monthly,
        }
    }

    /// Whether this is a daily-based frequency.
    pub const fn is_daily_based(&self) -> bool {
        matches!(self.base(), Self::Daily)
    }

    /// Calendar end of the period containing `date`.
    pub fn period_end(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Self::Daily => date,
            Self::Weekly => {
                let offset = 4 - i64::from(date.weekday().num_days_from_monday());
                date + chrono::Duration::days(offset)
            }
            Self::Monthly => month_end(date.year(), date.month()).unwrap_or(date),
            Self::Quarterly => {
                let quarter_month = date.month().div_ceil(3) * 3;
                month_end(date.year(), quarter_month).unwrap_or(date)
            }
            Self::Annual => NaiveDate::from_ymd_opt(date.year(), 12, 31).unwrap_or(date),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Frequency {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "D" => Ok(Self::Daily),
            "W" => Ok(Self::Weekly),
            "M" => Ok(Self::Monthly),
            "Q" => Ok(Self::Quarterly),
            "A" | "Y" => Ok(Self::Annual),
            _ => Err(DataError::InvalidFrequency(s.to_string())),
        }
    }
}

/// Last calendar day of a month.
pub fn month_end(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

/// Whether a date falls on Saturday or Sunday.
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Portfolio year a date belongs to.
///
/// Portfolios formed at the end of `formation_month` of year `y` are held from the following
/// month through `formation_month` of `y + 1`; every date in that span maps to `y`.
pub const fn ff_year(year: i32, month: u32, formation_month: u32) -> i32 {
    if month > formation_month { year } else { year - 1 }
}

/// Portfolio year of a date with the given formation month.
pub fn ff_year_of(date: NaiveDate, formation_month: u32) -> i32 {
    ff_year(date.year(), date.month(), formation_month)
}

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Create a range, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(DataError::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// First date of the range.
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last date of the range.
    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    /// Whether `date` lies inside the range.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Range with the start moved back by `months`.
    pub fn extend_back(&self, months: u32) -> Self {
        let start = self
            .start
            .checked_sub_months(Months::new(months))
            .unwrap_or(NaiveDate::MIN);
        Self {
            start,
            end: self.end,
        }
    }

    /// Smallest range covering both ranges.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Whether `other` lies entirely inside this range.
    pub fn covers(&self, other: &Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}
