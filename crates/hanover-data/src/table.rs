//! Calendar-indexed tables with named columns.

use crate::calendar::{DateRange, Frequency};
use crate::error::{DataError, Result};
use crate::frame::date_column;
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// One dated row of a [`TimeSeriesTable`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    /// Period end date
    pub date: NaiveDate,
    /// One value per column, `None` when missing
    pub values: Vec<Option<f64>>,
}

/// Time series table: one row per period, one column per portfolio, factor or statistic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesTable {
    frequency: Frequency,
    columns: Vec<String>,
    rows: Vec<TableRow>,
}

impl TimeSeriesTable {
    /// Create an empty table.
    pub const fn new(frequency: Frequency, columns: Vec<String>) -> Self {
        Self {
            frequency,
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row. Rows are expected in date order.
    pub fn push_row(&mut self, date: NaiveDate, values: Vec<Option<f64>>) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(DataError::ShapeMismatch {
                expected: self.columns.len(),
                actual: values.len(),
            });
        }
        self.rows.push(TableRow { date, values });
        Ok(())
    }

    /// Frequency of the row index.
    pub const fn frequency(&self) -> Frequency {
        self.frequency
    }

    /// Column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows in date order.
    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row dates.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|r| r.date).collect()
    }

    /// Position of a column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All values of a column.
    pub fn column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| r.values[idx]).collect())
    }

    /// Value at a date and column.
    pub fn get(&self, date: NaiveDate, name: &str) -> Option<f64> {
        let idx = self.column_index(name)?;
        self.rows
            .iter()
            .find(|r| r.date == date)
            .and_then(|r| r.values[idx])
    }

    /// Rows inside `range`.
    pub fn filter_range(&self, range: &DateRange) -> Self {
        Self {
            frequency: self.frequency,
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|r| range.contains(r.date))
                .cloned()
                .collect(),
        }
    }

    /// Keep the named columns, in the given order. Unknown names are skipped.
    pub fn select(&self, names: &[&str]) -> Self {
        let picks: Vec<(usize, String)> = names
            .iter()
            .filter_map(|n| self.column_index(n).map(|i| (i, (*n).to_string())))
            .collect();
        Self {
            frequency: self.frequency,
            columns: picks.iter().map(|(_, n)| n.clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|r| TableRow {
                    date: r.date,
                    values: picks.iter().map(|(i, _)| r.values[*i]).collect(),
                })
                .collect(),
        }
    }

    /// Rename columns positionally.
    pub fn with_columns(mut self, columns: Vec<String>) -> Result<Self> {
        if columns.len() != self.columns.len() {
            return Err(DataError::ShapeMismatch {
                expected: self.columns.len(),
                actual: columns.len(),
            });
        }
        self.columns = columns;
        Ok(self)
    }

    /// Convert to a polars frame with a leading `date` column.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let dates: Vec<Option<NaiveDate>> = self.rows.iter().map(|r| Some(r.date)).collect();
        let mut columns = vec![date_column("date", &dates)?];
        for (idx, name) in self.columns.iter().enumerate() {
            let values: Vec<Option<f64>> = self.rows.iter().map(|r| r.values[idx]).collect();
            columns.push(Series::new(name.as_str().into(), values).into());
        }
        Ok(DataFrame::new(columns)?)
    }
}
