//! The portfolio-sort engine.
//!
//! An [`Engine`] owns a data-source session and drives the whole pipeline: raw panels are
//! loaded with enough history for the requested characteristics, formation records and
//! weights are built once per panel, and sorts are run at the base frequency of the request
//! before being converted to the requested frequency.

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::memo::{CachePolicy, Memo, MemoKey, MemoStats};
use crate::regression::{excess_returns, regressor_rows};
use hanover_characteristics::{
    Characteristic, CharacteristicSeries, OlsKernel, RollingKernel, SecuritySeries,
    derive_snapshots, prior_returns, project_panel, roll_panel, rolling_variance,
};
use hanover_data::reference::{ReferenceQuery, ReferenceSource};
use hanover_data::{
    DataSource, DateRange, Feed, Frequency, FundamentalsPanel, LinkTable, RiskFreeSeries,
    SecurityPanel, Session, SqliteCache, TimeSeriesTable,
};
use hanover_factors::{FactorName, FactorPlan, market_excess_returns};
use hanover_portfolios::table::map_tables;
use hanover_portfolios::{
    BreakpointSet, CharacteristicTables, FormationRecord, SortInputs, SortOutcome, SortSpec,
    WeightInfo, Weighting, average_to, build_formation_records, characteristic_tables,
    compound_returns, compute_weights, counts_table, lag_attach, returns_table, run_sort,
};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Months of history loaded before every request; covers the December and June market
/// equity of the first formation year.
pub const BASE_LOOKBACK_MONTHS: u32 = 24;

/// Months of daily history loaded for daily rolling windows.
pub const DAILY_LOOKBACK_MONTHS: u32 = 4;

/// Extra months of fundamentals before the panel start, for history counts and growth rates.
pub const FUNDAMENTALS_LOOKBACK_MONTHS: u32 = 36;

/// Months of history a sort on `characteristics` needs at base frequency `base`.
pub fn lookback_months(characteristics: &[Characteristic], base: Frequency) -> u32 {
    characteristics
        .iter()
        .map(|c| match c {
            Characteristic::Prior(window) => window.end + 1,
            Characteristic::Beta if !base.is_daily_based() => 61,
            Characteristic::Var | Characteristic::ResVar | Characteristic::Beta => {
                DAILY_LOOKBACK_MONTHS
            }
            _ => 0,
        })
        .fold(BASE_LOOKBACK_MONTHS, u32::max)
}

/// A security panel with its formation weights and records.
///
/// Every periodic characteristic and sort derived from a formation is keyed by its `id`, so
/// results built on a superseded panel are never mixed with a newer one.
#[derive(Debug)]
struct Formation {
    id: u64,
    panel: Arc<SecurityPanel>,
    weights: Vec<WeightInfo>,
    records: Vec<FormationRecord>,
}

/// Memo and load counters of an engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Security panels built from the data source
    pub panel_loads: usize,
    /// Formation lookups
    pub formations: MemoStats,
    /// Periodic characteristic lookups
    pub periodic: MemoStats,
    /// Rolling regression and variance lookups
    pub estimates: MemoStats,
    /// Sort lookups
    pub sorts: MemoStats,
    /// Factor table lookups
    pub factors: MemoStats,
}

/// Portfolio-sort and factor engine over a data source.
pub struct Engine<S: DataSource> {
    session: Session<S>,
    config: EngineConfig,
    cache: Option<SqliteCache>,
    kernel: Box<dyn RollingKernel>,
    panels: HashMap<Frequency, (DateRange, Arc<SecurityPanel>)>,
    panel_loads: usize,
    fundamentals: Memo<FundamentalsPanel>,
    links: Memo<LinkTable>,
    risk_free: Memo<RiskFreeSeries>,
    formations: Memo<Formation>,
    periodic: Memo<Vec<Option<f64>>>,
    estimates: Memo<CharacteristicSeries>,
    sorts: Memo<SortOutcome>,
    factors: Memo<TimeSeriesTable>,
}

impl<S: DataSource> fmt::Debug for Engine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("source", &self.session.source().name())
            .field("config", &self.config)
            .field("cache", &self.cache.is_some())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl<S: DataSource> Engine<S> {
    /// Open a session on `source`.
    pub fn new(source: S, config: EngineConfig) -> Self {
        Self {
            session: Session::open(source),
            config,
            cache: None,
            kernel: Box::new(OlsKernel::new()),
            panels: HashMap::new(),
            panel_loads: 0,
            fundamentals: Memo::default(),
            links: Memo::default(),
            risk_free: Memo::default(),
            formations: Memo::default(),
            periodic: Memo::default(),
            estimates: Memo::default(),
            sorts: Memo::default(),
            factors: Memo::default(),
        }
    }

    /// Persist built panels in `cache`.
    pub fn with_cache(mut self, cache: SqliteCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Replace the rolling regression kernel.
    pub fn with_kernel(mut self, kernel: impl RollingKernel + 'static) -> Self {
        self.kernel = Box::new(kernel);
        self
    }

    /// Engine configuration.
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Panel cache, if one is attached.
    pub const fn cache(&self) -> Option<&SqliteCache> {
        self.cache.as_ref()
    }

    /// Memo and load counters.
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            panel_loads: self.panel_loads,
            formations: self.formations.stats(),
            periodic: self.periodic.stats(),
            estimates: self.estimates.stats(),
            sorts: self.sorts.stats(),
            factors: self.factors.stats(),
        }
    }

    /// Close the session and hand the source back.
    pub fn close(self) -> S {
        tracing::debug!(sorts = self.sorts.len(), factors = self.factors.len(), "closing engine");
        self.session.close()
    }

    /// Portfolio returns of `sort` at `frequency`, one column per bucket.
    pub fn portfolio_returns(
        &mut self,
        sort: &SortSpec,
        weighting: Weighting,
        frequency: Frequency,
        range: &DateRange,
        policy: CachePolicy,
    ) -> Result<TimeSeriesTable> {
        let outcome = self.sort(sort, frequency.base(), range, policy)?;
        let table = returns_table(&outcome, weighting)?;
        Ok(compound_returns(&table, frequency, range)?)
    }

    /// Number of firms per bucket, averaged to `frequency`.
    pub fn firm_counts(
        &mut self,
        sort: &SortSpec,
        frequency: Frequency,
        range: &DateRange,
        policy: CachePolicy,
    ) -> Result<TimeSeriesTable> {
        let outcome = self.sort(sort, frequency.base(), range, policy)?;
        let table = counts_table(&outcome)?;
        Ok(average_to(&table, frequency, range)?)
    }

    /// Average sort characteristics per bucket, averaged to `frequency`.
    pub fn characteristics(
        &mut self,
        sort: &SortSpec,
        weighting: Weighting,
        frequency: Frequency,
        range: &DateRange,
        policy: CachePolicy,
    ) -> Result<CharacteristicTables> {
        let outcome = self.sort(sort, frequency.base(), range, policy)?;
        let tables = characteristic_tables(&outcome, weighting)?;
        Ok(map_tables(&tables, |t| average_to(t, frequency, range))?)
    }

    /// Breakpoints of `sort` on the monthly panel.
    pub fn breakpoints(
        &mut self,
        sort: &SortSpec,
        range: &DateRange,
        policy: CachePolicy,
    ) -> Result<Vec<BreakpointSet>> {
        let outcome = self.sort(sort, Frequency::Monthly, range, policy)?;
        Ok(outcome.breakpoints.clone())
    }

    /// Factor returns at `frequency`, one column per requested factor.
    pub fn factors(
        &mut self,
        names: &[FactorName],
        frequency: Frequency,
        range: &DateRange,
        policy: CachePolicy,
    ) -> Result<TimeSeriesTable> {
        let plan = FactorPlan::new(names)?;
        let table = self.factor_table(&plan, frequency.base(), range, policy)?;
        Ok(compound_returns(&table, frequency, range)?)
    }

    /// A published dataset at `frequency`, restricted to `range`.
    pub fn reference_table<R: ReferenceSource + ?Sized>(
        &self,
        source: &R,
        dataset: &str,
        frequency: Frequency,
        range: &DateRange,
    ) -> Result<TimeSeriesTable> {
        let query = ReferenceQuery::new(dataset, frequency);
        tracing::debug!(source = source.name(), dataset, %frequency, "reference table");
        Ok(source.table_in_range(&query, range)?)
    }

    /// Security panel at `base` covering `range`.
    ///
    /// The current panel is reused when it covers the range. Otherwise the range is loaded
    /// from the panel cache or the source and unioned with the current panel when the two
    /// overlap, newer rows winning.
    fn security_panel(
        &mut self,
        base: Frequency,
        range: &DateRange,
        policy: CachePolicy,
    ) -> Result<Arc<SecurityPanel>> {
        if !policy.requery
            && let Some((covered, panel)) = self.panels.get(&base)
            && covered.covers(range)
        {
            return Ok(Arc::clone(panel));
        }

        let cached = match &self.cache {
            Some(cache) if !policy.requery => cache.get_security_panel(base, range)?,
            _ => None,
        };
        let fresh = match cached {
            Some(panel) => panel,
            None => {
                let securities = self.session.query(Feed::securities(base), range)?;
                let delistings = self.session.query(Feed::Delistings, range)?;
                let panel = SecurityPanel::from_frames(base, &securities, &delistings)?;
                if let Some(cache) = &self.cache {
                    cache.put_security_panel(range, &panel)?;
                }
                panel
            }
        };
        self.panel_loads += 1;

        let (covered, panel) = match self.panels.get(&base) {
            Some((current, panel))
                if current.start() <= range.end() && range.start() <= current.end() =>
            {
                (current.union(range), panel.union(&fresh)?)
            }
            _ => (*range, fresh),
        };
        tracing::info!(
            frequency = %base,
            range = %covered,
            observations = panel.len(),
            "security panel ready"
        );
        let panel = Arc::new(panel);
        self.panels.insert(base, (covered, Arc::clone(&panel)));
        Ok(panel)
    }

    fn fundamentals_panel(
        &mut self,
        range: &DateRange,
        policy: CachePolicy,
    ) -> Result<Arc<FundamentalsPanel>> {
        let key = MemoKey::new("fundamentals", range, Frequency::Annual, "");
        if let Some(hit) = self.fundamentals.lookup(&key, policy.requery) {
            return Ok(hit);
        }
        let cached = match &self.cache {
            Some(cache) if !policy.requery => cache.get_fundamentals(range)?,
            _ => None,
        };
        let panel = match cached {
            Some(panel) => panel,
            None => {
                let df = self.session.query(Feed::Fundamentals, range)?;
                let panel = FundamentalsPanel::from_frame(&df)?;
                if let Some(cache) = &self.cache {
                    cache.put_fundamentals(range, &panel)?;
                }
                panel
            }
        };
        tracing::debug!(records = panel.len(), range = %range, "fundamentals ready");
        Ok(self.fundamentals.store(key, panel))
    }

    fn link_table(&mut self, range: &DateRange, policy: CachePolicy) -> Result<Arc<LinkTable>> {
        let key = MemoKey::new("links", range, Frequency::Annual, "");
        if let Some(hit) = self.links.lookup(&key, policy.requery) {
            return Ok(hit);
        }
        let df = self.session.query(Feed::Links, range)?;
        let links = LinkTable::from_frame(&df)?;
        Ok(self.links.store(key, links))
    }

    fn risk_free_series(
        &mut self,
        base: Frequency,
        range: &DateRange,
        policy: CachePolicy,
    ) -> Result<Arc<RiskFreeSeries>> {
        let key = MemoKey::new("risk_free", range, base, "");
        if let Some(hit) = self.risk_free.lookup(&key, policy.requery) {
            return Ok(hit);
        }
        let df = self.session.query(Feed::risk_free(base), range)?;
        let series = RiskFreeSeries::from_frame(base, &df)?;
        Ok(self.risk_free.store(key, series))
    }

    /// Weights and formation records on the panel loaded over `load`.
    fn formation(
        &mut self,
        base: Frequency,
        load: &DateRange,
        policy: CachePolicy,
    ) -> Result<Arc<Formation>> {
        let key = MemoKey::new("formation", load, base, "");
        if let Some(hit) = self.formations.lookup(&key, policy.requery) {
            return Ok(hit);
        }
        let panel = self.security_panel(base, load, policy)?;
        let fundamentals =
            self.fundamentals_panel(&load.extend_back(FUNDAMENTALS_LOOKBACK_MONTHS), policy)?;
        let links = self.link_table(load, policy)?;

        let snapshots = derive_snapshots(&fundamentals, &self.config.derivation)?;
        let weights = compute_weights(&panel, self.config.formation.formation_month);
        let records = build_formation_records(&panel, &snapshots, &links, &self.config.formation);
        tracing::info!(
            frequency = %base,
            snapshots = snapshots.len(),
            records = records.len(),
            "built formation records"
        );
        let formation = Formation {
            id: self.panel_loads as u64,
            panel,
            weights,
            records,
        };
        Ok(self.formations.store(key, formation))
    }

    /// Sort outcome at base frequency `base`.
    fn sort(
        &mut self,
        spec: &SortSpec,
        base: Frequency,
        range: &DateRange,
        policy: CachePolicy,
    ) -> Result<Arc<SortOutcome>> {
        let load = range.extend_back(lookback_months(spec.characteristics(), base));
        let formation = self.formation(base, &load, policy)?;
        let key = MemoKey::new("sort", range, base, format!("{spec}#{}", formation.id));
        if let Some(hit) = self.sorts.lookup(&key, policy.recompute()) {
            return Ok(hit);
        }

        let mut periodic = BTreeMap::new();
        for &c in spec.characteristics().iter().filter(|c| c.is_periodic()) {
            let values = self.periodic_values(c, &formation, range, &load, policy)?;
            periodic.insert(c, values.as_ref().clone());
        }
        let inputs = SortInputs {
            panel: &formation.panel,
            weights: &formation.weights,
            records: &formation.records,
            periodic: &periodic,
            universe: &self.config.universe,
            formation_month: self.config.formation.formation_month,
        };
        let outcome = run_sort(spec, &inputs, range)?;
        tracing::info!(sort = %spec, frequency = %base, range = %range, "sort complete");
        Ok(self.sorts.store(key, outcome))
    }

    /// A periodic characteristic lagged onto the observations of `formation`.
    fn periodic_values(
        &mut self,
        characteristic: Characteristic,
        formation: &Formation,
        range: &DateRange,
        load: &DateRange,
        policy: CachePolicy,
    ) -> Result<Arc<Vec<Option<f64>>>> {
        let base = formation.panel.frequency();
        let key = MemoKey::new(
            "periodic",
            load,
            base,
            format!("{characteristic}#{}", formation.id),
        );
        if let Some(hit) = self.periodic.lookup(&key, policy.recompute()) {
            return Ok(hit);
        }

        let daily = range.extend_back(DAILY_LOOKBACK_MONTHS);
        let series = match characteristic {
            Characteristic::Prior(window) => {
                let (j, k) = window.at_frequency(base)?;
                let returns = SecuritySeries::from_panel(&formation.panel, |o| o.ret_adj);
                Arc::new(CharacteristicSeries::new(prior_returns(&returns, j, k)?))
            }
            Characteristic::Var => self.variance_series(&daily, policy)?,
            Characteristic::ResVar => self.residual_variance_series(&daily, policy)?,
            Characteristic::Beta if base.is_daily_based() => {
                self.beta_series(Frequency::Daily, &daily, policy)?
            }
            Characteristic::Beta => self.beta_series(base, load, policy)?,
            other => return Err(EngineError::NotPeriodic(other)),
        };
        let values = lag_attach(&formation.panel, &series);
        tracing::debug!(
            characteristic = %characteristic,
            present = values.iter().flatten().count(),
            "attached periodic characteristic"
        );
        Ok(self.periodic.store(key, values))
    }

    /// Rolling variance of daily returns.
    fn variance_series(
        &mut self,
        range: &DateRange,
        policy: CachePolicy,
    ) -> Result<Arc<CharacteristicSeries>> {
        let formation = self.formation(Frequency::Daily, range, policy)?;
        let key = MemoKey::new("variance", range, Frequency::Daily, formation.id);
        if let Some(hit) = self.estimates.lookup(&key, policy.recompute()) {
            return Ok(hit);
        }
        let window = self.config.windows.variance;
        let returns = SecuritySeries::from_panel(&formation.panel, |o| o.ret_adj);
        let series = rolling_variance(&returns, window)?;
        Ok(self.estimates.store(key, CharacteristicSeries::new(series)))
    }

    /// Rolling market beta at base frequency `base`.
    fn beta_series(
        &mut self,
        base: Frequency,
        range: &DateRange,
        policy: CachePolicy,
    ) -> Result<Arc<CharacteristicSeries>> {
        let formation = self.formation(base, range, policy)?;
        let key = MemoKey::new("beta", range, base, formation.id);
        if let Some(hit) = self.estimates.lookup(&key, policy.recompute()) {
            return Ok(hit);
        }
        let plan = FactorPlan::new(&[FactorName::MktRf])?;
        let market = self.factor_table(&plan, base, range, policy)?;
        let risk_free = self.risk_free_series(base, range, policy)?;

        let responses = excess_returns(&formation.panel, &risk_free);
        let regressors = regressor_rows(&formation.panel, &market);
        let estimates = roll_panel(
            self.kernel.as_ref(),
            &responses,
            &regressors,
            1,
            self.config.windows.beta(base),
        )?;
        tracing::info!(frequency = %base, securities = estimates.len(), "estimated market betas");
        Ok(self.estimates.store(key, project_panel(&estimates, |e| e.slope(0))))
    }

    /// Residual variance of a rolling daily three-factor regression.
    fn residual_variance_series(
        &mut self,
        range: &DateRange,
        policy: CachePolicy,
    ) -> Result<Arc<CharacteristicSeries>> {
        let formation = self.formation(Frequency::Daily, range, policy)?;
        let key = MemoKey::new("residual_variance", range, Frequency::Daily, formation.id);
        if let Some(hit) = self.estimates.lookup(&key, policy.recompute()) {
            return Ok(hit);
        }
        let plan = FactorPlan::new(&[FactorName::MktRf, FactorName::Smb, FactorName::Hml])?;
        let factors = self.factor_table(&plan, Frequency::Daily, range, policy)?;
        let risk_free = self.risk_free_series(Frequency::Daily, range, policy)?;

        let responses = excess_returns(&formation.panel, &risk_free);
        let regressors = regressor_rows(&formation.panel, &factors);
        let estimates = roll_panel(
            self.kernel.as_ref(),
            &responses,
            &regressors,
            plan.factors().len(),
            self.config.windows.variance,
        )?;
        tracing::info!(securities = estimates.len(), "estimated residual variances");
        Ok(self.estimates.store(key, project_panel(&estimates, |e| Some(e.residual_variance))))
    }

    /// Factor returns at base frequency `base`.
    fn factor_table(
        &mut self,
        plan: &FactorPlan,
        base: Frequency,
        range: &DateRange,
        policy: CachePolicy,
    ) -> Result<Arc<TimeSeriesTable>> {
        let codes: Vec<&str> = plan.factors().iter().map(FactorName::code).collect();
        let label = codes.join(",");
        let key = MemoKey::new("factors", range, base, &label);
        if let Some(hit) = self.factors.lookup(&key, policy.recompute()) {
            return Ok(hit);
        }

        let mut sort_returns = BTreeMap::new();
        for characteristic in plan.sorts() {
            let spec = FactorPlan::sort_spec(characteristic)?;
            let outcome = self.sort(&spec, base, range, policy)?;
            sort_returns.insert(characteristic, returns_table(&outcome, Weighting::Value)?);
        }
        let market = if plan.needs_market() {
            let load = range.extend_back(lookback_months(&[], base));
            let formation = self.formation(base, &load, policy)?;
            let risk_free = self.risk_free_series(base, range, policy)?;
            Some(market_excess_returns(
                &formation.panel,
                &formation.weights,
                &self.config.universe,
                &risk_free,
                range,
            )?)
        } else {
            None
        };
        let table = plan.compose(base, &sort_returns, market.as_ref())?;
        tracing::info!(
            factors = %label,
            frequency = %base,
            periods = table.len(),
            "factors composed"
        );
        Ok(self.factors.store(key, table))
    }
}
