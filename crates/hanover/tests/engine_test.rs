//! End-to-end sorts and factors over a six-firm CSV fixture.
//!
//! Firms A-D trade on NYSE and set the breakpoints; E and F trade on NASDAQ. June 2020
//! market equity is A 10, B 20, C 30, D 40, E 100, F 5 and every firm had December 2019
//! market equity of 10, so book-to-market is book equity over 10.

use approx::assert_relative_eq;
use chrono::NaiveDate;
use hanover::characteristics::Characteristic;
use hanover::data::{CsvDirectorySource, DateRange, Frequency, SqliteCache, TimeSeriesTable};
use hanover::factors::FactorName;
use hanover::portfolios::{PortfolioError, SortSpec, Weighting};
use hanover::{CachePolicy, Engine, EngineConfig, EngineError};
use std::path::PathBuf;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

// (permno, exchcd, June ME, book equity, July return, August return)
const FIRMS: [(i64, i64, f64, f64, f64, f64); 6] = [
    (10001, 1, 10.0, 10.0, 0.05, 0.0),
    (10002, 1, 20.0, 20.0, 0.02, 0.01),
    (10003, 1, 30.0, 30.0, 0.03, 0.0),
    (10004, 1, 40.0, 40.0, 0.04, 0.01),
    (10005, 3, 100.0, 15.0, -0.01, 0.02),
    (10006, 3, 5.0, 50.0, 0.08, -0.02),
];

fn write_fixture(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("hanover-engine-{name}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let mut securities = String::from("permno,permco,date,exchcd,shrcd,ret,retx,shrout,prc\n");
    let mut fundamentals = String::from("gvkey,datadate,fyear,at,seq\n");
    let mut links = String::from("gvkey,permno,linkdt,linkenddt\n");
    for (permno, exchcd, june_me, be, july, august) in FIRMS {
        let permco = permno - 10000;
        let july_me = june_me * (1.0 + july);
        let rows = [
            ("2019-12-31", 0.0, 10.0),
            ("2020-06-30", 0.0, june_me),
            ("2020-07-31", july, july_me),
            ("2020-08-31", august, july_me * (1.0 + august)),
        ];
        for (date, ret, prc) in rows {
            securities.push_str(&format!(
                "{permno},{permco},{date},{exchcd},10,{ret},{ret},1,{prc}\n"
            ));
        }
        let gvkey = format!("{permco:06}");
        fundamentals.push_str(&format!("{gvkey},2018-12-31,2018,100,{}\n", be - 1.0));
        fundamentals.push_str(&format!("{gvkey},2019-12-31,2019,110,{be}\n"));
        links.push_str(&format!("{gvkey},{permno},1990-01-01,\n"));
    }
    std::fs::write(dir.join("securities_monthly.csv"), securities).unwrap();
    std::fs::write(dir.join("fundamentals.csv"), fundamentals).unwrap();
    std::fs::write(dir.join("links.csv"), links).unwrap();
    std::fs::write(
        dir.join("riskfree_monthly.csv"),
        "date,rf\n2020-07-31,0.001\n2020-08-31,0.001\n",
    )
    .unwrap();
    dir
}

fn summer() -> DateRange {
    DateRange::new(d(2020, 7, 1), d(2020, 8, 31)).unwrap()
}

fn returns(
    engine: &mut Engine<CsvDirectorySource>,
    spec: &SortSpec,
    weighting: Weighting,
    frequency: Frequency,
    range: &DateRange,
) -> TimeSeriesTable {
    engine
        .portfolio_returns(spec, weighting, frequency, range, CachePolicy::default())
        .unwrap()
}

fn size_sort() -> SortSpec {
    SortSpec::new(&[Characteristic::Me], &[2]).unwrap()
}

fn size_value_sort() -> SortSpec {
    SortSpec::new(&[Characteristic::Me, Characteristic::Bm], &[2, 3]).unwrap()
}

#[test]
fn test_size_portfolio_returns() {
    let dir = write_fixture("size");
    let mut engine = Engine::new(CsvDirectorySource::new(&dir), EngineConfig::default());
    let range = summer();

    let vw = returns(&mut engine, &size_sort(), Weighting::Value, Frequency::Monthly, &range);
    assert_eq!(vw.columns(), ["me0-50", "me50-100"]);
    assert_eq!(vw.dates(), vec![d(2020, 7, 31), d(2020, 8, 31)]);
    // small: A, B, F at June weights 10, 20, 5
    assert_relative_eq!(vw.get(d(2020, 7, 31), "me0-50").unwrap(), 1.3 / 35.0, epsilon = 1e-12);
    assert_relative_eq!(vw.get(d(2020, 7, 31), "me50-100").unwrap(), 1.5 / 170.0, epsilon = 1e-12);
    // August weights compound with July returns
    assert_relative_eq!(
        vw.get(d(2020, 8, 31), "me0-50").unwrap(),
        0.002644628099173553,
        epsilon = 1e-9
    );
    assert_relative_eq!(
        vw.get(d(2020, 8, 31), "me50-100").unwrap(),
        0.013970845481049562,
        epsilon = 1e-9
    );

    let ew = returns(&mut engine, &size_sort(), Weighting::Equal, Frequency::Monthly, &range);
    assert_relative_eq!(ew.get(d(2020, 7, 31), "me0-50").unwrap(), 0.05, epsilon = 1e-12);
    assert_relative_eq!(ew.get(d(2020, 7, 31), "me50-100").unwrap(), 0.02, epsilon = 1e-12);
}

#[test]
fn test_quarterly_returns_compound() {
    let dir = write_fixture("quarterly");
    let mut engine = Engine::new(CsvDirectorySource::new(&dir), EngineConfig::default());
    let range = DateRange::new(d(2020, 7, 1), d(2020, 9, 30)).unwrap();

    let q = returns(&mut engine, &size_sort(), Weighting::Value, Frequency::Quarterly, &range);
    assert_eq!(q.dates(), vec![d(2020, 9, 30)]);
    assert_relative_eq!(
        q.get(d(2020, 9, 30), "me0-50").unwrap(),
        0.0398857142857143,
        epsilon = 1e-9
    );
    assert_relative_eq!(
        q.get(d(2020, 9, 30), "me50-100").unwrap(),
        0.022917647058823487,
        epsilon = 1e-9
    );

    // the annual period of 2020 is cut off by the range and dropped
    let a = returns(&mut engine, &size_sort(), Weighting::Value, Frequency::Annual, &range);
    assert!(a.is_empty());
}

#[test]
fn test_two_by_three_sort() {
    let dir = write_fixture("grid");
    let mut engine = Engine::new(CsvDirectorySource::new(&dir), EngineConfig::default());
    let range = summer();
    let spec = size_value_sort();

    let breakpoints = engine.breakpoints(&spec, &range, CachePolicy::default()).unwrap();
    assert_eq!(breakpoints.len(), 2);
    let me = breakpoints.iter().find(|b| b.characteristic == Characteristic::Me).unwrap();
    assert_eq!(me.period, d(2020, 6, 30));
    assert_relative_eq!(me.boundaries[0], 25.0, epsilon = 1e-12);
    let bm = breakpoints.iter().find(|b| b.characteristic == Characteristic::Bm).unwrap();
    assert_relative_eq!(bm.boundaries[0], 1.9, epsilon = 1e-12);
    assert_relative_eq!(bm.boundaries[1], 3.1, epsilon = 1e-12);

    let counts = engine
        .firm_counts(&spec, Frequency::Monthly, &range, CachePolicy::default())
        .unwrap();
    let july: Vec<Option<f64>> = counts.rows()[0].values.clone();
    assert_eq!(july, vec![Some(1.0); 6]);

    let grid = returns(&mut engine, &spec, Weighting::Value, Frequency::Monthly, &range);
    // one firm per cell: A, B, F small and E, C, D big
    let expected = [0.05, 0.02, 0.08, -0.01, 0.03, 0.04];
    for (label, r) in spec.labels().iter().zip(expected) {
        assert_relative_eq!(grid.get(d(2020, 7, 31), label).unwrap(), r, epsilon = 1e-12);
    }
    assert_eq!(grid.columns()[2], "me0-50_bm70-100");

    let characteristics = engine
        .characteristics(
            &spec,
            Weighting::Value,
            Frequency::Monthly,
            &range,
            CachePolicy::default(),
        )
        .unwrap();
    let bm_avg = &characteristics[&Characteristic::Bm];
    assert_relative_eq!(
        bm_avg.get(d(2020, 8, 31), "me50-100_bm70-100").unwrap(),
        4.0,
        epsilon = 1e-12
    );
    let me_avg = &characteristics[&Characteristic::Me];
    assert_relative_eq!(
        me_avg.get(d(2020, 7, 31), "me50-100_bm0-30").unwrap(),
        100.0,
        epsilon = 1e-12
    );
}

#[test]
fn test_factors() {
    let dir = write_fixture("factors");
    let mut engine = Engine::new(CsvDirectorySource::new(&dir), EngineConfig::default());
    let range = summer();

    let factors = engine
        .factors(
            &[FactorName::MktRf, FactorName::Smb, FactorName::Hml],
            Frequency::Monthly,
            &range,
            CachePolicy::default(),
        )
        .unwrap();
    assert_eq!(factors.columns(), ["MKT-RF", "SMB", "HML"]);
    assert_relative_eq!(
        factors.get(d(2020, 7, 31), "MKT-RF").unwrap(),
        2.8 / 205.0 - 0.001,
        epsilon = 1e-12
    );
    assert_relative_eq!(
        factors.get(d(2020, 8, 31), "MKT-RF").unwrap(),
        0.010992300288739171,
        epsilon = 1e-9
    );
    assert_relative_eq!(factors.get(d(2020, 7, 31), "SMB").unwrap(), 0.03, epsilon = 1e-12);
    assert_relative_eq!(factors.get(d(2020, 7, 31), "HML").unwrap(), 0.04, epsilon = 1e-12);
    assert_relative_eq!(factors.get(d(2020, 8, 31), "SMB").unwrap(), -0.04 / 3.0, epsilon = 1e-12);
    assert_relative_eq!(factors.get(d(2020, 8, 31), "HML").unwrap(), -0.015, epsilon = 1e-12);
}

#[test]
fn test_memoization_and_policy() {
    let dir = write_fixture("memo");
    let mut engine = Engine::new(CsvDirectorySource::new(&dir), EngineConfig::default());
    let range = summer();
    let spec = size_sort();

    let first = returns(&mut engine, &spec, Weighting::Value, Frequency::Monthly, &range);
    assert_eq!(engine.stats().panel_loads, 1);

    engine
        .firm_counts(&spec, Frequency::Monthly, &range, CachePolicy::default())
        .unwrap();
    let stats = engine.stats();
    assert_eq!(stats.panel_loads, 1);
    assert_eq!(stats.sorts.hits, 1);

    let reestimated = engine
        .portfolio_returns(
            &spec,
            Weighting::Value,
            Frequency::Monthly,
            &range,
            CachePolicy::reestimate(),
        )
        .unwrap();
    assert_eq!(reestimated, first);
    let stats = engine.stats();
    assert_eq!(stats.panel_loads, 1);
    assert_eq!(stats.sorts.misses, 2);

    let refreshed = engine
        .portfolio_returns(
            &spec,
            Weighting::Value,
            Frequency::Monthly,
            &range,
            CachePolicy::refresh(),
        )
        .unwrap();
    assert_eq!(refreshed, first);
    assert_eq!(engine.stats().panel_loads, 2);
    engine.close();
}

#[test]
fn test_panel_cache_serves_later_engines() {
    let dir = write_fixture("cache");
    let db = dir.join("hanover.db");
    let range = summer();

    let mut engine = Engine::new(CsvDirectorySource::new(&dir), EngineConfig::default())
        .with_cache(SqliteCache::new(&db).unwrap());
    let expected = returns(&mut engine, &size_sort(), Weighting::Value, Frequency::Monthly, &range);
    let stats = engine.cache().unwrap().get_stats().unwrap();
    assert_eq!(stats.total_entries(), 2);
    engine.close();

    // an empty source still answers from the cached panels
    let empty = std::env::temp_dir().join(format!("hanover-engine-empty-{}", std::process::id()));
    std::fs::create_dir_all(&empty).unwrap();
    let mut cached = Engine::new(CsvDirectorySource::new(&empty), EngineConfig::default())
        .with_cache(SqliteCache::new(&db).unwrap());
    let actual = returns(&mut cached, &size_sort(), Weighting::Value, Frequency::Monthly, &range);
    assert_eq!(actual, expected);
}

#[test]
fn test_missing_characteristic_empties_reference_universe() {
    let dir = write_fixture("missing");
    let mut engine = Engine::new(CsvDirectorySource::new(&dir), EngineConfig::default());
    // no revenue in the fixture, so operating profitability is missing for every firm
    let spec = SortSpec::new(&[Characteristic::Me, Characteristic::Op], &[2, 3]).unwrap();
    let err = engine
        .portfolio_returns(
            &spec,
            Weighting::Value,
            Frequency::Monthly,
            &summer(),
            CachePolicy::default(),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Portfolio(PortfolioError::EmptyReferenceUniverse { .. })
    ));
}

#[test]
fn test_firm_without_book_equity_sits_out_value_sorts() {
    let dir = write_fixture("exclusion");
    // a big NASDAQ firm with no fundamentals or links
    let mut securities = std::fs::read_to_string(dir.join("securities_monthly.csv")).unwrap();
    for (date, ret, prc) in [
        ("2019-12-31", 0.0, 10.0),
        ("2020-06-30", 0.0, 50.0),
        ("2020-07-31", 0.01, 50.5),
        ("2020-08-31", 0.0, 50.5),
    ] {
        securities.push_str(&format!("10007,7,{date},3,10,{ret},{ret},1,{prc}\n"));
    }
    std::fs::write(dir.join("securities_monthly.csv"), securities).unwrap();

    let mut engine = Engine::new(CsvDirectorySource::new(&dir), EngineConfig::default());
    let range = summer();

    let size = engine
        .firm_counts(&size_sort(), Frequency::Monthly, &range, CachePolicy::default())
        .unwrap();
    assert_eq!(size.rows()[0].values, vec![Some(3.0), Some(4.0)]);

    let grid = engine
        .firm_counts(&size_value_sort(), Frequency::Monthly, &range, CachePolicy::default())
        .unwrap();
    for row in grid.rows() {
        assert_eq!(row.values, vec![Some(1.0); 6]);
    }
}
