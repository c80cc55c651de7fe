//! Bucket tables.

use crate::error::Result;
use chrono::NaiveDate;
use hanover_characteristics::Characteristic;
use hanover_data::{Frequency, TimeSeriesTable};
use std::collections::BTreeMap;

/// Average-characteristic tables keyed by characteristic, one column per bucket.
pub type CharacteristicTables = BTreeMap<Characteristic, TimeSeriesTable>;

/// Build a table with one row per date and one column per label.
pub fn bucket_table(
    frequency: Frequency,
    labels: &[String],
    dates: &[NaiveDate],
    cell: impl Fn(NaiveDate, usize) -> Option<f64>,
) -> Result<TimeSeriesTable> {
    let mut table = TimeSeriesTable::new(frequency, labels.to_vec());
    for &date in dates {
        let values = (0..labels.len()).map(|col| cell(date, col)).collect();
        table.push_row(date, values)?;
    }
    Ok(table)
}

/// Apply `f` to every table of a characteristic map.
pub fn map_tables(
    tables: &CharacteristicTables,
    mut f: impl FnMut(&TimeSeriesTable) -> Result<TimeSeriesTable>,
) -> Result<CharacteristicTables> {
    tables
        .iter()
        .map(|(c, table)| Ok((*c, f(table)?)))
        .collect()
}
