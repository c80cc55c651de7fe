//! Data source port and adapters.

use crate::calendar::DateRange;
use crate::error::{DataError, Result};
use crate::feed::{ColumnKind, Feed};
use crate::frame::{date_column, filter_dates, parse_date};
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A provider of tabular feeds.
///
/// Implementations return frames carrying at least the feed's required columns; the
/// returned frame is validated against the feed schema by [`Session::query`].
pub trait DataSource {
    /// Human-readable source name.
    fn name(&self) -> &str;

    /// Fetch `feed` restricted to `range` where the feed is dated.
    fn query(&self, feed: Feed, range: &DateRange) -> Result<DataFrame>;
}

/// Source backed by frames held in memory. Feeds never inserted come back empty.
#[derive(Debug, Default, Clone)]
pub struct InMemorySource {
    frames: HashMap<&'static str, DataFrame>,
}

impl InMemorySource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the frame served for `feed`.
    pub fn insert(&mut self, feed: Feed, df: DataFrame) {
        self.frames.insert(feed.name(), df);
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, feed: Feed, df: DataFrame) -> Self {
        self.insert(feed, df);
        self
    }
}

impl DataSource for InMemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    fn query(&self, feed: Feed, range: &DateRange) -> Result<DataFrame> {
        let Some(df) = self.frames.get(feed.name()) else {
            return feed.empty_frame();
        };
        match feed.date_column() {
            Some(column) => filter_dates(df, column, range),
            None => Ok(df.clone()),
        }
    }
}

/// Source reading `<dir>/<feed name>.csv` files.
///
/// Columns named in the feed schema are typed by the schema; other columns are ignored.
/// Empty cells and unparsable numbers read as missing. A feed without a file comes back empty.
#[derive(Debug, Clone)]
pub struct CsvDirectorySource {
    dir: PathBuf,
}

impl CsvDirectorySource {
    /// Source rooted at `dir`.
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Path of the CSV file for `feed`.
    pub fn path_for(&self, feed: Feed) -> PathBuf {
        self.dir.join(format!("{}.csv", feed.name()))
    }

    fn read(&self, feed: Feed) -> Result<DataFrame> {
        let path = self.path_for(feed);
        if !path.exists() {
            tracing::warn!(path = %path.display(), "feed file not found, treating as empty");
            return feed.empty_frame();
        }
        let mut reader = csv::Reader::from_path(&path)?;
        let headers = reader.headers()?.clone();
        let positions: Vec<(usize, ColumnKind, &'static str)> = headers
            .iter()
            .enumerate()
            .filter_map(|(i, h)| feed.column(h.trim()).map(|spec| (i, spec.kind, spec.name)))
            .collect();

        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); positions.len()];
        for record in reader.records() {
            let record = record?;
            for (slot, (idx, _, _)) in positions.iter().enumerate() {
                let cell = record.get(*idx).map(str::trim).filter(|s| !s.is_empty());
                cells[slot].push(cell.map(str::to_string));
            }
        }

        let mut columns = Vec::with_capacity(positions.len());
        for ((_, kind, name), values) in positions.iter().zip(cells) {
            columns.push(typed_column(name, *kind, values)?);
        }
        let df = DataFrame::new(columns)?;
        feed.validate(&df)?;
        Ok(df)
    }
}

fn typed_column(name: &str, kind: ColumnKind, values: Vec<Option<String>>) -> Result<Column> {
    let column = match kind {
        ColumnKind::Text => Series::new(name.into(), values).into(),
        ColumnKind::Int => {
            let parsed: Vec<Option<i64>> = values
                .iter()
                .map(|v| v.as_deref().and_then(|s| s.parse::<f64>().ok()).map(|f| f as i64))
                .collect();
            Series::new(name.into(), parsed).into()
        }
        ColumnKind::Float => {
            let parsed: Vec<Option<f64>> = values
                .iter()
                .map(|v| v.as_deref().and_then(|s| s.parse::<f64>().ok()))
                .collect();
            Series::new(name.into(), parsed).into()
        }
        ColumnKind::Date => {
            let parsed: Vec<Option<NaiveDate>> = values
                .iter()
                .map(|v| v.as_deref().map(parse_date).transpose())
                .collect::<Result<_>>()?;
            date_column(name, &parsed)?
        }
    };
    Ok(column)
}

impl DataSource for CsvDirectorySource {
    fn name(&self) -> &str {
        "csv"
    }

    fn query(&self, feed: Feed, range: &DateRange) -> Result<DataFrame> {
        let df = self.read(feed)?;
        match feed.date_column() {
            Some(column) => filter_dates(&df, column, range),
            None => Ok(df),
        }
    }
}

/// An open connection to a data source.
///
/// Every feed query goes through the session, which validates the returned frame against
/// the feed schema. Closing the session hands the source back.
#[derive(Debug)]
pub struct Session<S> {
    source: S,
}

impl<S: DataSource> Session<S> {
    /// Open a session on `source`.
    pub fn open(source: S) -> Self {
        tracing::info!(source = source.name(), "opened data source session");
        Self { source }
    }

    /// Query a feed and check its schema.
    pub fn query(&self, feed: Feed, range: &DateRange) -> Result<DataFrame> {
        let df = self.source.query(feed, range)?;
        feed.validate(&df)?;
        tracing::debug!(
            feed = feed.name(),
            range = %range,
            rows = df.height(),
            "queried feed"
        );
        Ok(df)
    }

    /// Query a feed that must not be empty.
    pub fn query_non_empty(&self, feed: Feed, range: &DateRange) -> Result<DataFrame> {
        let df = self.query(feed, range)?;
        if df.height() == 0 {
            return Err(DataError::MissingData {
                feed: feed.name().to_string(),
                reason: format!("no rows between {} and {}", range.start(), range.end()),
            });
        }
        Ok(df)
    }

    /// Borrow the underlying source.
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Close the session and return the source.
    pub fn close(self) -> S {
        tracing::info!(source = self.source.name(), "closed data source session");
        self.source
    }
}
