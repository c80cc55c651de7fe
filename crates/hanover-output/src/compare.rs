//! Comparison of computed tables with published reference tables.

use crate::error::{OutputError, Result};
use hanover_data::TimeSeriesTable;
use hanover_data::stats::{correlation, mean};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Agreement of one column with its reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMatch {
    /// Column name
    pub column: String,
    /// Periods where both tables have a value
    pub overlap: usize,
    /// Mean of `ours - reference`
    pub mean_diff: Option<f64>,
    /// Mean absolute difference
    pub mean_abs_diff: Option<f64>,
    /// Largest absolute difference
    pub max_abs_diff: Option<f64>,
    /// Pearson correlation over the overlap
    pub correlation: Option<f64>,
}

/// Column-by-column comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    /// Columns present in both tables, in the order of the computed table
    pub columns: Vec<ColumnMatch>,
    /// Computed columns without a reference counterpart
    pub unmatched: Vec<String>,
}

impl ComparisonReport {
    /// Match for the named column.
    pub fn column(&self, name: &str) -> Option<&ColumnMatch> {
        self.columns.iter().find(|c| c.column == name)
    }
}

/// Align `ours` with `reference` by column name and date, and measure the differences.
pub fn compare_tables(
    ours: &TimeSeriesTable,
    reference: &TimeSeriesTable,
) -> Result<ComparisonReport> {
    if ours.frequency() != reference.frequency() {
        return Err(OutputError::FrequencyMismatch {
            ours: ours.frequency(),
            reference: reference.frequency(),
        });
    }
    let mut columns = Vec::new();
    let mut unmatched = Vec::new();
    for (i, name) in ours.columns().iter().enumerate() {
        let Some(j) = reference.column_index(name) else {
            unmatched.push(name.clone());
            continue;
        };
        let pairs: Vec<(f64, f64)> = ours
            .rows()
            .iter()
            .filter_map(|row| {
                let ours = row.values[i]?;
                let theirs = reference
                    .rows()
                    .binary_search_by_key(&row.date, |r| r.date)
                    .ok()
                    .and_then(|k| reference.rows()[k].values[j])?;
                Some((ours, theirs))
            })
            .collect();
        let diffs: Vec<f64> = pairs.iter().map(|(a, b)| a - b).collect();
        let abs: Vec<f64> = diffs.iter().map(|d| d.abs()).collect();
        columns.push(ColumnMatch {
            column: name.clone(),
            overlap: pairs.len(),
            mean_diff: mean(&diffs),
            mean_abs_diff: mean(&abs),
            max_abs_diff: abs.iter().copied().reduce(f64::max),
            correlation: correlation(&pairs),
        });
    }
    Ok(ComparisonReport { columns, unmatched })
}

impl fmt::Display for ComparisonReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let num = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{v:.6}"));
        writeln!(
            f,
            "{:<20} {:>8} {:>12} {:>12} {:>12} {:>8}",
            "Column", "Overlap", "Mean Diff", "Mean |Diff|", "Max |Diff|", "Corr"
        )?;
        writeln!(f, "{}", "-".repeat(77))?;
        for c in &self.columns {
            writeln!(
                f,
                "{:<20} {:>8} {:>12} {:>12} {:>12} {:>8}",
                c.column,
                c.overlap,
                num(c.mean_diff),
                num(c.mean_abs_diff),
                num(c.max_abs_diff),
                c.correlation
                    .map_or_else(|| "-".to_string(), |v| format!("{v:.4}"))
            )?;
        }
        if !self.unmatched.is_empty() {
            writeln!(f, "No reference for: {}", self.unmatched.join(", "))?;
        }
        Ok(())
    }
}
