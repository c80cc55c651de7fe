//! Periodic characteristics and daily panels over synthetic return histories.
//!
//! Every firm keeps a constant price, so market equity never moves and value weights equal
//! the fixed market equity. Returns are a firm loading times a common market series plus a
//! firm-specific pattern, so rolling statistics can be recomputed directly in the tests.

use approx::assert_relative_eq;
use chrono::{Datelike, Days, Months, NaiveDate, Weekday};
use hanover::characteristics::Characteristic;
use hanover::data::{CsvDirectorySource, DateRange, Frequency, SqliteCache};
use hanover::portfolios::{SortSpec, Weighting};
use hanover::{CachePolicy, Engine, EngineConfig};
use std::path::PathBuf;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn weekdays(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start
        .iter_days()
        .take_while(|date| *date <= end)
        .filter(|date| !is_weekend(*date))
        .collect()
}

fn last_weekday(first_of_month: NaiveDate) -> NaiveDate {
    let mut date = first_of_month + Months::new(1) - Days::new(1);
    while is_weekend(date) {
        date = date - Days::new(1);
    }
    date
}

fn fixture_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("hanover-periodic-{name}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn sample_variance(xs: &[f64]) -> f64 {
    let mean = xs.iter().sum::<f64>() / xs.len() as f64;
    xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (xs.len() - 1) as f64
}

/// Median of the four NYSE values followed by the mean of all values at or below it.
fn low_bucket_mean(values: &[f64; 6]) -> (f64, f64) {
    let mut nyse = values[..4].to_vec();
    nyse.sort_by(f64::total_cmp);
    let median = (nyse[1] + nyse[2]) / 2.0;
    let low: Vec<f64> = values.iter().copied().filter(|v| *v <= median).collect();
    (median, low.iter().sum::<f64>() / low.len() as f64)
}

// Monthly history: (permno, market loading), all NYSE with market equity 10
const MONTHLY_FIRMS: [(i64, f64); 4] = [(30001, 0.5), (30002, 0.8), (30003, 1.2), (30004, 1.5)];

/// Month-end dates from January 2018 through August 2020.
fn month_ends() -> Vec<NaiveDate> {
    (0..32)
        .map(|i| last_weekday(d(2018, 1, 1) + Months::new(i)))
        .collect()
}

fn market_return(t: usize) -> f64 {
    if t == 0 { 0.0 } else { 0.01 + 0.005 * (t % 3) as f64 }
}

fn write_monthly_history(name: &str) -> PathBuf {
    let dir = fixture_dir(name);
    let mut securities = String::from("permno,permco,date,exchcd,shrcd,ret,retx,shrout,prc\n");
    for (permno, beta) in MONTHLY_FIRMS {
        let permco = permno - 30000;
        for (t, date) in month_ends().into_iter().enumerate() {
            let ret = beta * market_return(t);
            securities.push_str(&format!("{permno},{permco},{date},1,10,{ret},{ret},1,10\n"));
        }
    }
    let mut riskfree = String::from("date,rf\n");
    for date in month_ends() {
        riskfree.push_str(&format!("{date},0\n"));
    }
    std::fs::write(dir.join("securities_monthly.csv"), securities).unwrap();
    std::fs::write(dir.join("riskfree_monthly.csv"), riskfree).unwrap();
    dir
}

fn summer() -> DateRange {
    DateRange::new(d(2020, 7, 1), d(2020, 8, 31)).unwrap()
}

#[test]
fn test_monthly_momentum_sort() {
    let dir = write_monthly_history("mom");
    let mut engine = Engine::new(CsvDirectorySource::new(&dir), EngineConfig::default());
    let range = summer();
    let spec = SortSpec::new(&[Characteristic::MOM], &[2]).unwrap();

    // July uses returns from July 2019 through May 2020, skipping June
    let mom = |beta: f64| {
        (18..=28).map(|t| 1.0 + beta * market_return(t)).product::<f64>() - 1.0
    };
    let breakpoints = engine.breakpoints(&spec, &range, CachePolicy::default()).unwrap();
    assert_eq!(breakpoints.len(), 2);
    assert_eq!(breakpoints[0].period, d(2020, 7, 31));
    assert_eq!(breakpoints[0].observations, 4);
    assert_relative_eq!(breakpoints[0].boundaries[0], (mom(0.8) + mom(1.2)) / 2.0, epsilon = 1e-12);

    let vw = engine
        .portfolio_returns(
            &spec,
            Weighting::Value,
            Frequency::Monthly,
            &range,
            CachePolicy::default(),
        )
        .unwrap();
    assert_eq!(vw.columns(), ["mom0-50", "mom50-100"]);
    assert_relative_eq!(vw.get(d(2020, 7, 31), "mom0-50").unwrap(), 0.65 * 0.01, epsilon = 1e-12);
    assert_relative_eq!(vw.get(d(2020, 7, 31), "mom50-100").unwrap(), 1.35 * 0.01, epsilon = 1e-12);
    assert_relative_eq!(vw.get(d(2020, 8, 31), "mom0-50").unwrap(), 0.65 * 0.015, epsilon = 1e-12);
    assert_relative_eq!(
        vw.get(d(2020, 8, 31), "mom50-100").unwrap(),
        1.35 * 0.015,
        epsilon = 1e-12
    );
}

#[test]
fn test_monthly_beta_sort_loads_five_years() {
    let dir = write_monthly_history("beta");
    let mut engine = Engine::new(CsvDirectorySource::new(&dir), EngineConfig::default())
        .with_cache(SqliteCache::in_memory().unwrap());
    let range = summer();
    let spec = SortSpec::new(&[Characteristic::Beta], &[2]).unwrap();

    // the market is exactly the common series, so each estimate recovers the loading
    let breakpoints = engine.breakpoints(&spec, &range, CachePolicy::default()).unwrap();
    assert_eq!(breakpoints.len(), 2);
    assert_relative_eq!(breakpoints[0].boundaries[0], 1.0, epsilon = 1e-9);

    let counts = engine
        .firm_counts(&spec, Frequency::Monthly, &range, CachePolicy::default())
        .unwrap();
    for row in counts.rows() {
        assert_eq!(row.values, vec![Some(2.0), Some(2.0)]);
    }
    let characteristics = engine
        .characteristics(
            &spec,
            Weighting::Equal,
            Frequency::Monthly,
            &range,
            CachePolicy::default(),
        )
        .unwrap();
    let beta = &characteristics[&Characteristic::Beta];
    assert_relative_eq!(beta.get(d(2020, 7, 31), "beta0-50").unwrap(), 0.65, epsilon = 1e-9);
    assert_relative_eq!(beta.get(d(2020, 7, 31), "beta50-100").unwrap(), 1.35, epsilon = 1e-9);

    let cache = engine.cache().unwrap();
    assert!(
        cache
            .get_security_panel(Frequency::Monthly, &range.extend_back(61))
            .unwrap()
            .is_some()
    );

    // a size sort only reaches back two years
    let mut size = Engine::new(CsvDirectorySource::new(&dir), EngineConfig::default())
        .with_cache(SqliteCache::in_memory().unwrap());
    let spec = SortSpec::new(&[Characteristic::Me], &[2]).unwrap();
    size.portfolio_returns(
        &spec,
        Weighting::Value,
        Frequency::Monthly,
        &range,
        CachePolicy::default(),
    )
    .unwrap();
    let cache = size.cache().unwrap();
    let panel = |months| {
        cache
            .get_security_panel(Frequency::Monthly, &range.extend_back(months))
            .unwrap()
    };
    assert!(panel(24).is_some());
    assert!(panel(61).is_none());
}

// Daily history: (permno, exchcd, market equity, book equity, market loading)
const DAILY_FIRMS: [(i64, i64, f64, f64, f64); 6] = [
    (20001, 1, 10.0, 10.0, 0.6),
    (20002, 1, 20.0, 40.0, 0.9),
    (20003, 1, 30.0, 90.0, 1.1),
    (20004, 1, 40.0, 160.0, 1.4),
    (20005, 3, 100.0, 150.0, 1.0),
    (20006, 3, 5.0, 25.0, 1.2),
];

fn trading_days() -> Vec<NaiveDate> {
    weekdays(d(2018, 12, 3), d(2020, 7, 31))
}

fn daily_return(firm: usize, t: usize) -> f64 {
    let market = (((t * 7) % 11) as f64 - 5.0) * 0.002;
    let own = (((t * (firm + 1) + firm) % 7) as f64 - 3.0) * 0.001;
    DAILY_FIRMS[firm].4 * market + own
}

fn write_daily_fixture(name: &str) -> PathBuf {
    let dir = fixture_dir(name);
    let days = trading_days();

    let header = "permno,permco,date,exchcd,shrcd,ret,retx,shrout,prc\n";
    let mut securities = String::from(header);
    let mut monthly = String::from(header);
    let mut fundamentals = String::from("gvkey,datadate,fyear,at,seq\n");
    let mut links = String::from("gvkey,permno,linkdt,linkenddt\n");
    for (firm, (permno, exchcd, me, be, _)) in DAILY_FIRMS.into_iter().enumerate() {
        let permco = permno - 20000;
        for month in 1..=7 {
            let date = last_weekday(d(2020, month, 1));
            let ret = 0.01 * (firm + 1) as f64;
            monthly.push_str(&format!("{permno},{permco},{date},{exchcd},10,{ret},{ret},1,{me}\n"));
        }
        for (t, date) in days.iter().enumerate() {
            let ret = daily_return(firm, t);
            securities.push_str(
                &format!("{permno},{permco},{date},{exchcd},10,{ret},{ret},1,{me}\n"),
            );
        }
        // a stray Saturday record that must never reach a portfolio
        securities.push_str(&format!("{permno},{permco},2020-07-11,{exchcd},10,0.5,0.5,1,{me}\n"));

        let gvkey = format!("{permco:06}");
        for fyear in 2016..=2019 {
            fundamentals.push_str(&format!("{gvkey},{fyear}-12-31,{fyear},100,{be}\n"));
        }
        links.push_str(&format!("{gvkey},{permno},1990-01-01,\n"));
    }
    let mut riskfree = String::from("date,rf\n");
    for date in &days {
        riskfree.push_str(&format!("{date},0\n"));
    }
    std::fs::write(dir.join("securities_daily.csv"), securities).unwrap();
    std::fs::write(dir.join("securities_monthly.csv"), monthly).unwrap();
    std::fs::write(dir.join("fundamentals.csv"), fundamentals).unwrap();
    std::fs::write(dir.join("links.csv"), links).unwrap();
    std::fs::write(dir.join("riskfree_daily.csv"), riskfree).unwrap();
    dir
}

fn july_week() -> DateRange {
    DateRange::new(d(2020, 7, 6), d(2020, 7, 10)).unwrap()
}

/// Index of the last trading day before the first week of July 2020.
fn july_third() -> usize {
    trading_days().iter().position(|date| *date == d(2020, 7, 3)).unwrap()
}

#[test]
fn test_daily_and_weekly_size_returns() {
    let dir = write_daily_fixture("weekly");
    let mut engine = Engine::new(CsvDirectorySource::new(&dir), EngineConfig::default());
    let range = DateRange::new(d(2020, 7, 6), d(2020, 7, 17)).unwrap();
    let spec = SortSpec::new(&[Characteristic::Me], &[2]).unwrap();

    let daily = engine
        .portfolio_returns(
            &spec,
            Weighting::Equal,
            Frequency::Daily,
            &range,
            CachePolicy::default(),
        )
        .unwrap();
    assert_eq!(daily.len(), 10);
    assert!(!daily.dates().contains(&d(2020, 7, 11)));
    // small: A, B and F
    let t = july_third() + 1;
    let small = (daily_return(0, t) + daily_return(1, t) + daily_return(5, t)) / 3.0;
    assert_relative_eq!(daily.get(d(2020, 7, 6), "me0-50").unwrap(), small, epsilon = 1e-12);

    let weekly = engine
        .portfolio_returns(
            &spec,
            Weighting::Equal,
            Frequency::Weekly,
            &range,
            CachePolicy::default(),
        )
        .unwrap();
    assert_eq!(weekly.dates(), vec![d(2020, 7, 10), d(2020, 7, 17)]);
    let dates = daily.dates();
    for label in ["me0-50", "me50-100"] {
        for (week, days) in weekly.dates().into_iter().zip(dates.chunks(5)) {
            let compounded = days
                .iter()
                .map(|date| 1.0 + daily.get(*date, label).unwrap())
                .product::<f64>()
                - 1.0;
            assert_relative_eq!(weekly.get(week, label).unwrap(), compounded, epsilon = 1e-12);
        }
    }
}

#[test]
fn test_daily_variance_sort() {
    let dir = write_daily_fixture("variance");
    let mut engine = Engine::new(CsvDirectorySource::new(&dir), EngineConfig::default());
    let spec = SortSpec::new(&[Characteristic::Var], &[2]).unwrap();

    // sixty trading days ending the day before formation
    let s = july_third();
    let variances: [f64; 6] = std::array::from_fn(|firm| {
        let window: Vec<f64> = (s - 59..=s).map(|t| daily_return(firm, t)).collect();
        sample_variance(&window)
    });
    let (median, low) = low_bucket_mean(&variances);

    let characteristics = engine
        .characteristics(
            &spec,
            Weighting::Equal,
            Frequency::Daily,
            &july_week(),
            CachePolicy::default(),
        )
        .unwrap();
    let var = &characteristics[&Characteristic::Var];
    assert_relative_eq!(var.get(d(2020, 7, 6), "var0-50").unwrap(), low, epsilon = 1e-12);

    let counts = engine
        .firm_counts(&spec, Frequency::Daily, &july_week(), CachePolicy::default())
        .unwrap();
    let below = variances.iter().filter(|v| **v <= median).count() as f64;
    assert_eq!(counts.rows()[0].values, vec![Some(below), Some(6.0 - below)]);
}

#[test]
fn test_monthly_variance_sort_reads_daily_returns() {
    let dir = write_daily_fixture("monthly-variance");
    let mut engine = Engine::new(CsvDirectorySource::new(&dir), EngineConfig::default());
    let spec = SortSpec::new(&[Characteristic::Var], &[2]).unwrap();
    let july = DateRange::new(d(2020, 7, 1), d(2020, 7, 31)).unwrap();

    // July portfolios use the daily variance as of the June month end
    let s = trading_days().iter().position(|date| *date == d(2020, 6, 30)).unwrap();
    let variances: [f64; 6] = std::array::from_fn(|firm| {
        let window: Vec<f64> = (s - 59..=s).map(|t| daily_return(firm, t)).collect();
        sample_variance(&window)
    });
    let (_, low) = low_bucket_mean(&variances);

    let characteristics = engine
        .characteristics(&spec, Weighting::Equal, Frequency::Monthly, &july, CachePolicy::default())
        .unwrap();
    let var = &characteristics[&Characteristic::Var];
    assert_eq!(var.dates(), vec![d(2020, 7, 31)]);
    assert_relative_eq!(var.get(d(2020, 7, 31), "var0-50").unwrap(), low, epsilon = 1e-12);
}

#[test]
fn test_daily_momentum_uses_trading_day_window() {
    let dir = write_daily_fixture("mom");
    let mut engine = Engine::new(CsvDirectorySource::new(&dir), EngineConfig::default());
    let spec = SortSpec::new(&[Characteristic::MOM], &[2]).unwrap();

    // months 2 through 12 become trading days 21 through 250
    let s = july_third();
    let moms: [f64; 6] = std::array::from_fn(|firm| {
        (s - 249..=s - 20)
            .map(|t| 1.0 + daily_return(firm, t))
            .product::<f64>()
            - 1.0
    });
    let (_, low) = low_bucket_mean(&moms);

    let characteristics = engine
        .characteristics(
            &spec,
            Weighting::Equal,
            Frequency::Daily,
            &july_week(),
            CachePolicy::default(),
        )
        .unwrap();
    let mom = &characteristics[&Characteristic::MOM];
    assert_relative_eq!(mom.get(d(2020, 7, 6), "mom0-50").unwrap(), low, epsilon = 1e-12);
}

#[test]
fn test_daily_regression_characteristics() {
    let dir = write_daily_fixture("regression");
    let mut engine = Engine::new(CsvDirectorySource::new(&dir), EngineConfig::default());

    for characteristic in [Characteristic::Beta, Characteristic::ResVar] {
        let spec = SortSpec::new(&[characteristic], &[2]).unwrap();
        let counts = engine
            .firm_counts(&spec, Frequency::Daily, &july_week(), CachePolicy::default())
            .unwrap();
        assert_eq!(counts.len(), 5);
        for row in counts.rows() {
            assert_eq!(row.values.iter().flatten().sum::<f64>(), 6.0);
        }

        let characteristics = engine
            .characteristics(
                &spec,
                Weighting::Equal,
                Frequency::Daily,
                &july_week(),
                CachePolicy::default(),
            )
            .unwrap();
        let table = &characteristics[&characteristic];
        for row in table.rows() {
            for value in row.values.iter().flatten() {
                assert!(value.is_finite());
                if characteristic == Characteristic::ResVar {
                    assert!(*value > 0.0);
                }
            }
        }
    }
}
