//! CSV and JSON export of tables, breakpoints and summaries.

use crate::compare::ComparisonReport;
use crate::error::Result;
use crate::summary::SummaryTable;
use hanover_data::TimeSeriesTable;
use hanover_portfolios::BreakpointSet;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values format.
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }

    /// Format implied by a file extension, defaulting to CSV.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::PrettyJson,
            _ => Self::Csv,
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "pretty-json" | "pretty" => Ok(Self::PrettyJson),
            other => Err(format!("unknown export format '{other}'")),
        }
    }
}

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn export_to_string(&self, format: ExportFormat) -> Result<String>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<()> {
        let content = self.export_to_string(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

fn json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String> {
    Ok(if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    })
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    Ok(String::from_utf8(wtr.into_inner()?)?)
}

fn opt(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Tables export as one record per date; missing values are empty CSV fields or JSON nulls.
impl Exporter for TimeSeriesTable {
    fn export_to_string(&self, format: ExportFormat) -> Result<String> {
        match format {
            ExportFormat::Csv => {
                let mut wtr = csv::Writer::from_writer(vec![]);
                let mut header = vec!["date".to_string()];
                header.extend(self.columns().iter().cloned());
                wtr.write_record(&header)?;
                for row in self.rows() {
                    let mut record = vec![row.date.to_string()];
                    record.extend(row.values.iter().map(|v| opt(*v)));
                    wtr.write_record(&record)?;
                }
                finish(wtr)
            }
            ExportFormat::Json | ExportFormat::PrettyJson => {
                let records: Vec<serde_json::Map<String, serde_json::Value>> = self
                    .rows()
                    .iter()
                    .map(|row| {
                        let mut record = serde_json::Map::new();
                        record.insert("date".into(), row.date.to_string().into());
                        for (name, value) in self.columns().iter().zip(&row.values) {
                            record.insert(name.clone(), (*value).into());
                        }
                        record
                    })
                    .collect();
                json(&records, format == ExportFormat::PrettyJson)
            }
        }
    }
}

/// Flattened breakpoint for CSV export.
#[derive(Debug, Serialize)]
struct BreakpointFlat {
    period: String,
    characteristic: String,
    percentile: f64,
    boundary: f64,
    observations: usize,
}

impl Exporter for Vec<BreakpointSet> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String> {
        match format {
            ExportFormat::Csv => {
                let mut wtr = csv::Writer::from_writer(vec![]);
                for set in self {
                    for (p, b) in set.percentiles.iter().zip(&set.boundaries) {
                        wtr.serialize(BreakpointFlat {
                            period: set.period.to_string(),
                            characteristic: set.characteristic.to_string(),
                            percentile: *p,
                            boundary: *b,
                            observations: set.observations,
                        })?;
                    }
                }
                finish(wtr)
            }
            ExportFormat::Json => json(self, false),
            ExportFormat::PrettyJson => json(self, true),
        }
    }
}

impl Exporter for SummaryTable {
    fn export_to_string(&self, format: ExportFormat) -> Result<String> {
        match format {
            ExportFormat::Csv => {
                let mut wtr = csv::Writer::from_writer(vec![]);
                let mut header: Vec<String> = [
                    "column", "start", "end", "count", "mean", "std", "min", "max", "skew",
                    "kurtosis", "mad",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect();
                if let Some(first) = self.columns.first() {
                    header.extend(first.percentiles.iter().map(|(p, _)| format!("p{p}")));
                }
                wtr.write_record(&header)?;
                for c in &self.columns {
                    let mut record = vec![
                        c.name.clone(),
                        c.start.map(|d| d.to_string()).unwrap_or_default(),
                        c.end.map(|d| d.to_string()).unwrap_or_default(),
                        c.count.to_string(),
                    ];
                    record.extend(
                        [c.mean, c.std, c.min, c.max, c.skew, c.kurtosis, c.mad]
                            .into_iter()
                            .map(opt),
                    );
                    record.extend(c.percentiles.iter().map(|(_, v)| opt(*v)));
                    wtr.write_record(&record)?;
                }
                finish(wtr)
            }
            ExportFormat::Json => json(self, false),
            ExportFormat::PrettyJson => json(self, true),
        }
    }
}

impl Exporter for ComparisonReport {
    fn export_to_string(&self, format: ExportFormat) -> Result<String> {
        match format {
            ExportFormat::Csv => {
                let mut wtr = csv::Writer::from_writer(vec![]);
                for c in &self.columns {
                    wtr.serialize(c)?;
                }
                finish(wtr)
            }
            ExportFormat::Json => json(self, false),
            ExportFormat::PrettyJson => json(self, true),
        }
    }
}
