//! Descriptive statistics of return tables.
//!
//! Skewness and excess kurtosis use the bias-corrected sample estimators, so they line up with
//! the figures spreadsheet and dataframe tools report for the same series.

use chrono::NaiveDate;
use hanover_data::stats::{mean, percentile_sorted, sample_variance, sorted_finite};
use hanover_data::{Frequency, TimeSeriesTable};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Percentiles reported when the caller does not choose any.
pub const DEFAULT_PERCENTILES: [f64; 7] = [1.0, 10.0, 25.0, 50.0, 75.0, 90.0, 99.0];

/// Statistics of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    /// Column name
    pub name: String,
    /// First date with a value
    pub start: Option<NaiveDate>,
    /// Last date with a value
    pub end: Option<NaiveDate>,
    /// Number of present values
    pub count: usize,
    /// Arithmetic mean
    pub mean: Option<f64>,
    /// Sample standard deviation
    pub std: Option<f64>,
    /// Minimum
    pub min: Option<f64>,
    /// Maximum
    pub max: Option<f64>,
    /// Bias-corrected skewness, needs three values
    pub skew: Option<f64>,
    /// Bias-corrected excess kurtosis, needs four values
    pub kurtosis: Option<f64>,
    /// Mean absolute deviation around the mean
    pub mad: Option<f64>,
    /// `(percent, value)` pairs
    pub percentiles: Vec<(f64, Option<f64>)>,
}

fn skewness(values: &[f64], m: f64) -> Option<f64> {
    let n = values.len() as f64;
    if values.len() < 3 {
        return None;
    }
    let m2 = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n;
    let m3 = values.iter().map(|v| (v - m).powi(3)).sum::<f64>() / n;
    if m2 <= 0.0 {
        return Some(0.0);
    }
    Some((n * (n - 1.0)).sqrt() / (n - 2.0) * m3 / m2.powf(1.5))
}

fn excess_kurtosis(values: &[f64], m: f64) -> Option<f64> {
    let n = values.len() as f64;
    if values.len() < 4 {
        return None;
    }
    let m2 = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n;
    let m4 = values.iter().map(|v| (v - m).powi(4)).sum::<f64>() / n;
    if m2 <= 0.0 {
        return Some(0.0);
    }
    let g2 = m4 / (m2 * m2) - 3.0;
    Some((n - 1.0) / ((n - 2.0) * (n - 3.0)) * ((n + 1.0) * g2 + 6.0))
}

impl ColumnSummary {
    /// Summarize the present values of `column` in `table`.
    pub fn from_column(table: &TimeSeriesTable, column: usize, percentiles: &[f64]) -> Self {
        let present: Vec<(NaiveDate, f64)> = table
            .rows()
            .iter()
            .filter_map(|row| row.values[column].map(|v| (row.date, v)))
            .filter(|(_, v)| v.is_finite())
            .collect();
        let values: Vec<f64> = present.iter().map(|(_, v)| *v).collect();
        let sorted = sorted_finite(values.iter().copied());
        let m = mean(&values);

        Self {
            name: table.columns()[column].clone(),
            start: present.first().map(|(d, _)| *d),
            end: present.last().map(|(d, _)| *d),
            count: values.len(),
            mean: m,
            std: sample_variance(&values).map(f64::sqrt),
            min: sorted.first().copied(),
            max: sorted.last().copied(),
            skew: m.and_then(|m| skewness(&values, m)),
            kurtosis: m.and_then(|m| excess_kurtosis(&values, m)),
            mad: m.map(|m| values.iter().map(|v| (v - m).abs()).sum::<f64>() / values.len() as f64),
            percentiles: percentiles
                .iter()
                .map(|&p| (p, percentile_sorted(&sorted, p)))
                .collect(),
        }
    }
}

/// Column-by-column description of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryTable {
    /// Frequency of the summarized table
    pub frequency: Frequency,
    /// One summary per column
    pub columns: Vec<ColumnSummary>,
}

fn cell(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.4}"))
}

fn date_cell(value: Option<NaiveDate>) -> String {
    value.map_or_else(|| "-".to_string(), |d| d.to_string())
}

impl SummaryTable {
    /// Summarize every column of `table`.
    pub fn from_table(table: &TimeSeriesTable, percentiles: &[f64]) -> Self {
        Self {
            frequency: table.frequency(),
            columns: (0..table.columns().len())
                .map(|c| ColumnSummary::from_column(table, c, percentiles))
                .collect(),
        }
    }

    /// Summary of the named column.
    pub fn column(&self, name: &str) -> Option<&ColumnSummary> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Row labels and formatted cells, one row per statistic.
    fn rows(&self) -> Vec<(String, Vec<String>)> {
        let stat = |label: &str, f: &dyn Fn(&ColumnSummary) -> String| -> (String, Vec<String>) {
            (label.to_string(), self.columns.iter().map(f).collect())
        };
        let mut rows = vec![
            stat("start", &|c| date_cell(c.start)),
            stat("end", &|c| date_cell(c.end)),
            stat("count", &|c| c.count.to_string()),
            stat("mean", &|c| cell(c.mean)),
            stat("std", &|c| cell(c.std)),
            stat("min", &|c| cell(c.min)),
            stat("max", &|c| cell(c.max)),
            stat("skew", &|c| cell(c.skew)),
            stat("kurtosis", &|c| cell(c.kurtosis)),
            stat("mad", &|c| cell(c.mad)),
        ];
        if let Some(first) = self.columns.first() {
            for (i, (p, _)) in first.percentiles.iter().enumerate() {
                rows.push((
                    format!("{p}%"),
                    self.columns.iter().map(|c| cell(c.percentiles[i].1)).collect(),
                ));
            }
        }
        rows
    }

    /// Format as ASCII table for terminal display.
    pub fn to_ascii_table(&self) -> String {
        let rows = self.rows();
        let width = self
            .columns
            .iter()
            .map(|c| c.name.len())
            .chain(rows.iter().flat_map(|(_, cells)| cells.iter().map(String::len)))
            .max()
            .unwrap_or(8)
            .max(8);
        let rule = "-".repeat(10 + (width + 1) * self.columns.len());

        let mut output = String::new();
        output.push_str(&format!("\nSummary ({} frequency)\n", self.frequency));
        output.push_str(&"=".repeat(rule.len()));
        output.push('\n');
        output.push_str(&format!("{:<10}", ""));
        for c in &self.columns {
            output.push_str(&format!(" {:>width$}", c.name));
        }
        output.push('\n');
        output.push_str(&rule);
        output.push('\n');
        for (label, cells) in rows {
            output.push_str(&format!("{label:<10}"));
            for value in cells {
                output.push_str(&format!(" {value:>width$}"));
            }
            output.push('\n');
        }
        output.push_str(&"=".repeat(rule.len()));
        output.push('\n');
        output
    }

    /// Format as Markdown for documentation.
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();
        output.push_str("| statistic |");
        for c in &self.columns {
            output.push_str(&format!(" {} |", c.name));
        }
        output.push('\n');
        output.push_str("|-----------|");
        for _ in &self.columns {
            output.push_str("------|");
        }
        output.push('\n');
        for (label, cells) in self.rows() {
            output.push_str(&format!("| {label} |"));
            for value in cells {
                output.push_str(&format!(" {value} |"));
            }
            output.push('\n');
        }
        output
    }
}

impl fmt::Display for SummaryTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_ascii_table())
    }
}
