//! Parsing of sort, factor and date arguments.

use chrono::NaiveDate;
use hanover_characteristics::Characteristic;
use hanover_data::DateRange;
use hanover_factors::FactorName;
use hanover_portfolios::SortSpec;
use thiserror::Error;

/// Argument errors.
#[derive(Debug, Error)]
pub(crate) enum ArgError {
    /// A sort dimension is not `CODE:COUNT`
    #[error("invalid sort dimension '{0}', expected CODE:COUNT such as ME:2")]
    SortDimension(String),

    /// A date is not `YYYY-MM-DD`
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    Date(String),

    /// Characteristic registry rejected a code
    #[error(transparent)]
    Characteristic(#[from] hanover_characteristics::CharacteristicError),

    /// Sort construction failed
    #[error(transparent)]
    Portfolio(#[from] hanover_portfolios::PortfolioError),

    /// Factor registry rejected a code
    #[error(transparent)]
    Factor(#[from] hanover_factors::FactorError),

    /// Date range is empty
    #[error(transparent)]
    Data(#[from] hanover_data::DataError),
}

/// Parse `ME:2,BM:3` into a sort.
pub(crate) fn parse_sort(text: &str) -> Result<SortSpec, ArgError> {
    let mut characteristics = Vec::new();
    let mut counts = Vec::new();
    for part in text.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (code, count) = part
            .rsplit_once(':')
            .ok_or_else(|| ArgError::SortDimension(part.to_string()))?;
        let count = count
            .trim()
            .parse::<usize>()
            .map_err(|_| ArgError::SortDimension(part.to_string()))?;
        characteristics.push(code.trim().parse::<Characteristic>()?);
        counts.push(count);
    }
    Ok(SortSpec::new(&characteristics, &counts)?)
}

/// Parse a comma-separated factor list.
pub(crate) fn parse_factors(text: &str) -> Result<Vec<FactorName>, ArgError> {
    text.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(|c| Ok(c.parse::<FactorName>()?))
        .collect()
}

fn parse_date(text: &str) -> Result<NaiveDate, ArgError> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").map_err(|_| ArgError::Date(text.to_string()))
}

/// Parse an inclusive date range.
pub(crate) fn parse_range(start: &str, end: &str) -> Result<DateRange, ArgError> {
    Ok(DateRange::new(parse_date(start)?, parse_date(end)?)?)
}
