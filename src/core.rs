//! # Core Facade
//! Wires the collaborator interfaces to the pure analytics functions and
//! exposes the four public operations: `score_trends`, `detect_alerts`,
//! `forecast` and `check_drift`. Every unit of work — one window, one
//! category — is an independent, bounded, synchronous computation;
//! callers may run units on whatever threads they like.

use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDate, Utc};
use tracing::{info, warn};

use crate::aggregate::{aggregate_events, ExactMatcher, KeywordMatcher};
use crate::alert::{detect_alerts, Alert};
use crate::config::CoreConfig;
use crate::drift::{DriftMonitor, DriftReport};
use crate::error::CoreResult;
use crate::event::AnalysisWindow;
use crate::forecast::{backtest, forecast, ForecastResult, ModelChoice};
use crate::provider::{ActualsFeed, EventFeed, SeriesStore};
use crate::scoring::{score_trends, TrendSignal};

/// The analytics core over its three collaborators.
///
/// Holds no model caches and no global state: the only mutable pieces are
/// the per-category drift windows and the map of issued forecasts pending
/// their actuals.
pub struct MarketMood<E, S, A> {
    events: E,
    series: S,
    actuals: A,
    cfg: CoreConfig,
    matcher: Box<dyn KeywordMatcher + Send + Sync>,
    monitors: HashMap<String, DriftMonitor>,
    /// Point estimates issued per category, awaiting realized actuals.
    pending: HashMap<String, BTreeMap<NaiveDate, f64>>,
}

impl<E, S, A> MarketMood<E, S, A>
where
    E: EventFeed,
    S: SeriesStore,
    A: ActualsFeed,
{
    pub fn new(events: E, series: S, actuals: A, cfg: CoreConfig) -> CoreResult<Self> {
        cfg.validate()?;
        Ok(Self {
            events,
            series,
            actuals,
            cfg,
            matcher: Box::new(ExactMatcher),
            monitors: HashMap::new(),
            pending: HashMap::new(),
        })
    }

    /// Swap in a different keyword canonicalization strategy.
    pub fn with_matcher(mut self, matcher: Box<dyn KeywordMatcher + Send + Sync>) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    /// Fetch the window's events, aggregate them and score every keyword.
    pub fn score_trends(&self, window: &AnalysisWindow) -> CoreResult<Vec<TrendSignal>> {
        let events = self.events.fetch_events(window)?;
        let series = aggregate_events(
            &events,
            window,
            self.cfg.scoring.bucket_hours,
            self.matcher.as_ref(),
        )?;
        score_trends(&series, &self.cfg.scoring, Utc::now())
    }

    /// Threshold signals into alerts; pure pass-through to the filter.
    pub fn detect_alerts(&self, signals: &[TrendSignal], min_strength: f64) -> Vec<Alert> {
        detect_alerts(signals, min_strength)
    }

    /// Forecast one category. A successful ensemble run refreshes the
    /// category's drift baseline from the backtest, and the issued point
    /// estimates are kept pending until actuals arrive.
    pub fn forecast(
        &mut self,
        category: &str,
        horizon_days: u32,
        choice: ModelChoice,
    ) -> CoreResult<ForecastResult> {
        let history = self
            .series
            .fetch_category_series(category, self.cfg.forecast.lookback_days)?;
        let result = forecast(&history, horizon_days, choice, &self.cfg.forecast)?;

        // Baseline from the same cycle's backtest, preferring the rung
        // that actually produced this forecast. The backtest prefix can
        // be too short for that rung (an ensemble forecast on a series
        // just past the seasonal minimum backtests without an "ensemble"
        // row); fall back to the best-scoring model so the category
        // still gets a baseline.
        if let Ok(reports) = backtest(&history, &self.cfg.forecast) {
            let exact = reports
                .iter()
                .find(|r| r.model_name == result.model_name)
                .and_then(|r| r.mape);
            let baseline = exact.or_else(|| {
                reports
                    .iter()
                    .filter_map(|r| r.mape)
                    .min_by(|a, b| a.total_cmp(b))
            });
            if let Some(b) = baseline {
                self.monitor_mut(category).set_baseline(b);
            }
        }

        let pending = self.pending.entry(category.to_string()).or_default();
        for p in &result.points {
            pending.insert(p.date, p.point_estimate);
        }
        Ok(result)
    }

    /// Forecast a batch of categories, collecting per-category failures
    /// instead of aborting the whole batch.
    pub fn forecast_all(
        &mut self,
        categories: &[&str],
        horizon_days: u32,
    ) -> Vec<(String, CoreResult<ForecastResult>)> {
        categories
            .iter()
            .map(|&cat| {
                let res = self.forecast(cat, horizon_days, ModelChoice::Ensemble);
                if let Err(e) = &res {
                    warn!(category = cat, error = %e, "category forecast failed");
                }
                (cat.to_string(), res)
            })
            .collect()
    }

    /// Pull realized actuals for the window, match them to previously
    /// issued forecasts, and evaluate the category's drift state.
    pub fn check_drift(
        &mut self,
        category: &str,
        window: &AnalysisWindow,
    ) -> CoreResult<DriftReport> {
        let actuals = self.actuals.fetch_actuals(category, window)?;
        let matched: Vec<(f64, f64)> = {
            let pending = self.pending.entry(category.to_string()).or_default();
            let matched = actuals
                .iter()
                .filter_map(|&(date, actual)| {
                    pending.remove(&date).map(|forecast| (forecast, actual))
                })
                .collect();
            // Dates the evaluation has moved past will never get an
            // actual; drop them so the map stays bounded across cycles.
            let cutoff = window.start.date_naive();
            pending.retain(|&date, _| date >= cutoff);
            matched
        };
        info!(
            category,
            actuals = actuals.len(),
            matched = matched.len(),
            "drift evaluation input"
        );
        let monitor = self.monitor_mut(category);
        for (forecast, actual) in matched {
            monitor.record(forecast, actual);
        }
        Ok(monitor.evaluate(Utc::now()))
    }

    fn monitor_mut(&mut self, category: &str) -> &mut DriftMonitor {
        let cfg = self.cfg.drift.clone();
        self.monitors
            .entry(category.to_string())
            .or_insert_with(|| DriftMonitor::new(category, cfg))
    }
}
