//! Typed column extraction and construction for polars frames.
//!
//! Every reader casts before extracting, so integer, float and string inputs of the
//! same logical column are accepted alike.

use crate::calendar::DateRange;
use crate::error::{DataError, Result};
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;

/// Days between 0001-01-01 and 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Whether the frame has a column with this name.
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.column(name).is_ok()
}

/// Read a column as floats.
pub fn f64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    Ok(column.f64()?.into_iter().collect())
}

/// Read a column as floats, or all missing when the column is absent.
pub fn optional_f64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    if has_column(df, name) {
        f64_values(df, name)
    } else {
        Ok(vec![None; df.height()])
    }
}

/// Read a column as integers.
pub fn i64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>> {
    let column = df.column(name)?.cast(&DataType::Int64)?;
    Ok(column.i64()?.into_iter().collect())
}

/// Read a column as strings.
pub fn str_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df.column(name)?.cast(&DataType::String)?;
    Ok(column
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Read a date column stored either as `Date` or as ISO strings.
pub fn date_values(df: &DataFrame, name: &str) -> Result<Vec<Option<NaiveDate>>> {
    str_values(df, name)?
        .into_iter()
        .map(|v| v.map(|s| parse_date(&s)).transpose())
        .collect()
}

/// Parse `YYYY-MM-DD` or `YYYYMMDD`.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y%m%d"))
        .map_err(|e| DataError::Parse(format!("invalid date '{s}': {e}")))
}

fn epoch_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

/// Build a `Date` column from optional dates.
pub fn date_column(name: &str, dates: &[Option<NaiveDate>]) -> Result<Column> {
    let days: Vec<Option<i32>> = dates.iter().map(|d| d.map(epoch_days)).collect();
    Ok(Series::new(name.into(), days)
        .cast(&DataType::Date)?
        .into())
}

/// Keep rows whose date column falls inside `range`.
///
/// Rows with a missing date are dropped.
pub fn filter_dates(df: &DataFrame, column: &str, range: &DateRange) -> Result<DataFrame> {
    let mask: Vec<bool> = date_values(df, column)?
        .into_iter()
        .map(|d| d.is_some_and(|d| range.contains(d)))
        .collect();
    let mask = BooleanChunked::from_slice("mask".into(), &mask);
    Ok(df.filter(&mask)?)
}
