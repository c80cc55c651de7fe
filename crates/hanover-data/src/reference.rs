//! Published reference datasets.
//!
//! The Ken French data library distributes each dataset as a CSV file made of a free-text
//! preamble followed by one or more blocks. Each block starts with a header row whose first
//! cell is empty, followed by rows keyed by `YYYYMMDD`, `YYYYMM` or `YYYY`. Values are in
//! percent, and `-99.99` or `-999` mark missing observations.

use crate::calendar::{DateRange, Frequency, month_end};
use crate::error::{DataError, Result};
use crate::table::TimeSeriesTable;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// How reference values are scaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueScale {
    /// Values are percentages and are divided by 100
    #[default]
    Percent,
    /// Values are used as published (firm counts, average sizes)
    Level,
}

/// Which table of a reference dataset to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceQuery {
    /// Dataset name (file stem)
    pub dataset: String,
    /// Frequency of the block to select
    pub frequency: Frequency,
    /// Index among the blocks of that frequency
    pub block: usize,
    /// Value scaling
    pub scale: ValueScale,
}

impl ReferenceQuery {
    /// Query the first percent-valued block of `dataset` at `frequency`.
    pub fn new(dataset: impl Into<String>, frequency: Frequency) -> Self {
        Self {
            dataset: dataset.into(),
            frequency,
            block: 0,
            scale: ValueScale::Percent,
        }
    }
}

/// Port for published reference series.
pub trait ReferenceSource {
    /// Human-readable source name.
    fn name(&self) -> &str;

    /// Load one table of a reference dataset.
    fn table(&self, query: &ReferenceQuery) -> Result<TimeSeriesTable>;

    /// Load one table restricted to `range`.
    fn table_in_range(
        &self,
        query: &ReferenceQuery,
        range: &DateRange,
    ) -> Result<TimeSeriesTable> {
        Ok(self.table(query)?.filter_range(range))
    }
}

/// One block of a reference file.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceBlock {
    /// Nearest non-empty text line above the header, if any
    pub title: Option<String>,
    /// Block data
    pub table: TimeSeriesTable,
}

fn is_missing(value: f64) -> bool {
    (value + 99.99).abs() < 1e-9 || (value + 999.0).abs() < 1e-9
}

fn parse_key(key: &str) -> Option<(Frequency, NaiveDate)> {
    if !key.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let number: u32 = key.parse().ok()?;
    match key.len() {
        8 => {
            let (year, month, day) = ((number / 10_000) as i32, (number / 100) % 100, number % 100);
            Some((Frequency::Daily, NaiveDate::from_ymd_opt(year, month, day)?))
        }
        6 => Some((Frequency::Monthly, month_end((number / 100) as i32, number % 100)?)),
        4 => Some((Frequency::Annual, NaiveDate::from_ymd_opt(number as i32, 12, 31)?)),
        _ => None,
    }
}

/// Parse the text of a reference file into its blocks.
pub fn parse_blocks(text: &str, scale: ValueScale) -> Result<Vec<ReferenceBlock>> {
    let mut blocks: Vec<ReferenceBlock> = Vec::new();
    let mut last_text: Option<String> = None;
    let mut header: Option<Vec<String>> = None;
    let mut pending_title: Option<String> = None;
    let mut new_block = false;

    for line in text.lines() {
        let cells: Vec<&str> = line.split(',').map(str::trim).collect();
        let first = cells.first().copied().unwrap_or("");

        if let Some((frequency, date)) = parse_key(first) {
            let Some(columns) = header.as_ref() else {
                continue;
            };
            if new_block || blocks.last().is_none_or(|b| b.table.frequency() != frequency) {
                blocks.push(ReferenceBlock {
                    title: pending_title.take(),
                    table: TimeSeriesTable::new(frequency, columns.clone()),
                });
                new_block = false;
            }
            let values = (0..columns.len())
                .map(|idx| {
                    cells
                        .get(idx + 1)
                        .and_then(|c| c.parse::<f64>().ok())
                        .filter(|v| !is_missing(*v))
                        .map(|v| match scale {
                            ValueScale::Percent => v / 100.0,
                            ValueScale::Level => v,
                        })
                })
                .collect();
            if let Some(block) = blocks.last_mut() {
                block.table.push_row(date, values)?;
            }
        } else if first.is_empty() && cells.iter().skip(1).any(|c| !c.is_empty()) {
            header = Some(cells[1..].iter().map(|c| (*c).to_string()).collect());
            pending_title = last_text.take();
            new_block = true;
        } else if !line.trim().is_empty() {
            last_text = Some(line.trim().trim_matches(',').trim().to_string());
        }
    }

    Ok(blocks)
}

/// Reference datasets from a local copy of the Ken French data library.
#[derive(Debug, Clone)]
pub struct KenFrenchLibrary {
    dir: PathBuf,
}

impl KenFrenchLibrary {
    /// Library rooted at `dir`, holding unzipped `<dataset>.csv` files.
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, dataset: &str) -> Result<PathBuf> {
        ["csv", "CSV"]
            .iter()
            .map(|ext| self.dir.join(format!("{dataset}.{ext}")))
            .find(|p| p.exists())
            .ok_or_else(|| DataError::MissingData {
                feed: dataset.to_string(),
                reason: format!("no CSV file in {}", self.dir.display()),
            })
    }
}

impl ReferenceSource for KenFrenchLibrary {
    fn name(&self) -> &str {
        "ken-french"
    }

    fn table(&self, query: &ReferenceQuery) -> Result<TimeSeriesTable> {
        let text = std::fs::read_to_string(self.path_for(&query.dataset)?)?;
        let target = published_frequency(query.frequency);
        parse_blocks(&text, query.scale)?
            .into_iter()
            .filter(|b| b.table.frequency() == target)
            .nth(query.block)
            .map(|b| b.table)
            .ok_or_else(|| DataError::MissingData {
                feed: query.dataset.clone(),
                reason: format!("no block {} at frequency {}", query.block, query.frequency),
            })
    }
}

/// Row-key frequency under which the library publishes `frequency`.
///
/// Weekly files use daily `YYYYMMDD` keys; quarterly data is not published and maps to
/// monthly blocks.
const fn published_frequency(frequency: Frequency) -> Frequency {
    match frequency {
        Frequency::Daily | Frequency::Weekly => Frequency::Daily,
        Frequency::Monthly | Frequency::Quarterly => Frequency::Monthly,
        Frequency::Annual => Frequency::Annual,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SAMPLE: &str = "This file was created by CMPT_ME_BEME_RETS using the 202001 CRSP database.
The 1-month TBill return is from Ibbotson and Associates, Inc.

  Average Value Weighted Returns -- Monthly
,SMALL LoBM,ME1 BM2,BIG HiBM
192607,   1.2000,  -99.99,   0.5000
192608,  -0.5000,   2.0000,   1.0000

  Average Equal Weighted Returns -- Monthly
,SMALL LoBM,ME1 BM2,BIG HiBM
192607,   3.0000,   1.0000,   0.2500

 Annual Factors: January-December
,SMALL LoBM,ME1 BM2,BIG HiBM
  1927,  10.0000,   5.0000,  -999
";

    #[test]
    fn test_parse_blocks() {
        let blocks = parse_blocks(SAMPLE, ValueScale::Percent).unwrap();
        assert_eq!(blocks.len(), 3);
        assert_eq!(
            blocks[0].title.as_deref(),
            Some("Average Value Weighted Returns -- Monthly")
        );
        let vw = &blocks[0].table;
        assert_eq!(vw.frequency(), Frequency::Monthly);
        assert_eq!(vw.columns().len(), 3);
        assert_eq!(vw.len(), 2);
        let july = NaiveDate::from_ymd_opt(1926, 7, 31).unwrap();
        assert_relative_eq!(vw.get(july, "SMALL LoBM").unwrap(), 0.012);
        assert_eq!(vw.get(july, "ME1 BM2"), None);

        let annual = &blocks[2].table;
        assert_eq!(annual.frequency(), Frequency::Annual);
        let y1927 = NaiveDate::from_ymd_opt(1927, 12, 31).unwrap();
        assert_relative_eq!(annual.get(y1927, "SMALL LoBM").unwrap(), 0.10);
        assert_eq!(annual.get(y1927, "BIG HiBM"), None);
    }

    #[test]
    fn test_level_scale() {
        let blocks = parse_blocks(SAMPLE, ValueScale::Level).unwrap();
        let july = NaiveDate::from_ymd_opt(1926, 7, 31).unwrap();
        assert_relative_eq!(blocks[1].table.get(july, "SMALL LoBM").unwrap(), 3.0);
    }

    #[test]
    fn test_library_selects_block_by_frequency() {
        let dir = std::env::temp_dir().join(format!("hanover-kf-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("Portfolios_Formed_on_ME.CSV"), SAMPLE).unwrap();
        let library = KenFrenchLibrary::new(&dir);

        let mut query = ReferenceQuery::new("Portfolios_Formed_on_ME", Frequency::Monthly);
        query.block = 1;
        let ew = library.table(&query).unwrap();
        assert_eq!(ew.len(), 1);

        let annual = library
            .table(&ReferenceQuery::new("Portfolios_Formed_on_ME", Frequency::Annual))
            .unwrap();
        assert_eq!(annual.len(), 1);

        query.block = 5;
        assert!(library.table(&query).is_err());
        assert!(library
            .table(&ReferenceQuery::new("Missing", Frequency::Monthly))
            .is_err());
        std::fs::remove_dir_all(dir).ok();
    }
}
