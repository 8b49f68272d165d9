//! # Forecast Ensemble
//!
//! Blended demand forecasting per category. Two complementary base
//! models — a trend+AR(1) baseline and a weekly seasonal decomposition —
//! are combined by inverse-error weighting from a trailing backtest.
//!
//! The degradation ladder is explicit, never silent:
//!   ensemble (>= 14 points) → baseline alone (>= 7) →
//!   moving-average fallback (>= 3) → `InsufficientHistory`.
//! The rung that produced a result is visible in
//! [`ForecastResult::model_name`].

pub mod backtest;
pub mod baseline;
pub mod seasonal;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ForecastConfig;
use crate::error::{CoreError, CoreResult};

pub use backtest::{backtest, BacktestReport};

/// Supported forecast horizon, in days.
pub const MIN_HORIZON_DAYS: u32 = 1;
pub const MAX_HORIZON_DAYS: u32 = 30;

/// One observed (date, value) point of a category demand series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Historical demand series for one product category. External, read-only
/// input; points are kept sorted by date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySeries {
    pub category: String,
    pub points: Vec<SeriesPoint>,
}

impl CategorySeries {
    pub fn new(category: impl Into<String>, mut points: Vec<SeriesPoint>) -> Self {
        points.sort_by_key(|p| p.date);
        Self {
            category: category.into(),
            points,
        }
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }
}

/// Which model the caller wants. `Ensemble` is the default and still
/// degrades down the ladder when history is short; pinning a base model
/// degrades from that rung instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelChoice {
    #[default]
    Ensemble,
    Baseline,
    Seasonal,
    MovingAverage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TrendDirection {
    Up,
    Down,
    Flat,
}

/// One forecast step; bounds always satisfy lower <= point <= upper.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub point_estimate: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

/// Blended (or degraded) forecast for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub category: String,
    /// Which rung of the ladder produced this: "ensemble", "trend_ar",
    /// "seasonal_decomp" or "moving_average".
    pub model_name: String,
    pub points: Vec<ForecastPoint>,
    pub trend_direction: TrendDirection,
    pub historical_points_used: usize,
}

/// A fitted base model: point predictions for future steps plus the
/// residual spread from its own fit.
pub(crate) trait FittedModel {
    fn name(&self) -> &'static str;
    /// Predictions for steps 1..=steps past the end of the fit data.
    fn predict(&self, steps: usize) -> Vec<f64>;
    fn residual_std(&self) -> f64;
}

/// Moving-average fallback: mean of the trailing week plus a damped
/// recent slope. The bottom rung of the ladder.
#[derive(Debug, Clone, Copy)]
pub(crate) struct MovingAverage {
    mean: f64,
    slope: f64,
    std: f64,
}

impl MovingAverage {
    pub(crate) fn fit(values: &[f64]) -> Self {
        let window = values.len().min(7);
        let tail = &values[values.len() - window..];
        let mean = tail.iter().sum::<f64>() / window as f64;
        let slope = if values.len() >= 3 {
            (values[values.len() - 1] - values[values.len() - 3]) / 3.0
        } else {
            0.0
        };
        Self {
            mean,
            slope,
            std: sample_std(tail),
        }
    }
}

impl FittedModel for MovingAverage {
    fn name(&self) -> &'static str {
        "moving_average"
    }

    fn predict(&self, steps: usize) -> Vec<f64> {
        (1..=steps)
            .map(|k| self.mean + self.slope * k as f64)
            .collect()
    }

    fn residual_std(&self) -> f64 {
        self.std
    }
}

/// Produce a forecast for `series` over `horizon_days`.
///
/// Fails with `InvalidHorizon` outside [1, 30] and `InsufficientHistory`
/// below the moving-average minimum. Any shorter-history degradation is a
/// valid result, distinguished by `model_name`.
pub fn forecast(
    series: &CategorySeries,
    horizon_days: u32,
    choice: ModelChoice,
    cfg: &ForecastConfig,
) -> CoreResult<ForecastResult> {
    cfg.validate()?;
    if !(MIN_HORIZON_DAYS..=MAX_HORIZON_DAYS).contains(&horizon_days) {
        return Err(CoreError::InvalidHorizon {
            horizon: horizon_days,
            min: MIN_HORIZON_DAYS,
            max: MAX_HORIZON_DAYS,
        });
    }
    let values = series.values();
    let n = values.len();
    if n < cfg.min_points_fallback {
        return Err(CoreError::InsufficientHistory {
            points: n,
            required: cfg.min_points_fallback,
        });
    }
    let last_date = series.points[n - 1].date;
    let steps = horizon_days as usize;

    let (model_name, predictions, widths) = match resolve_rung(choice, n, cfg) {
        Rung::Blend => blended_forecast(&values, series, steps, cfg)?,
        Rung::Single(single) => {
            let model: Box<dyn FittedModel> = match single {
                SingleModel::Baseline => Box::new(baseline::TrendAr::fit(&values)),
                SingleModel::Seasonal => {
                    Box::new(seasonal::SeasonalTrend::fit(&values, cfg.season_length))
                }
                SingleModel::MovingAverage => Box::new(MovingAverage::fit(&values)),
            };
            debug!(model = model.name(), points = n, "single-model forecast");
            let preds = model.predict(steps);
            let sigma = model.residual_std();
            let widths = (1..=steps)
                .map(|k| cfg.interval_z * sigma * (k as f64).sqrt())
                .collect();
            (model.name().to_string(), preds, widths)
        }
    };

    let points = assemble_points(last_date, &predictions, &widths);
    let direction = trend_direction(&points, cfg.direction_threshold);

    info!(
        category = series.category.as_str(),
        model = model_name.as_str(),
        horizon_days,
        points = n,
        ?direction,
        "forecast complete"
    );
    Ok(ForecastResult {
        category: series.category.clone(),
        model_name,
        points,
        trend_direction: direction,
        historical_points_used: n,
    })
}

enum Rung {
    Blend,
    Single(SingleModel),
}

enum SingleModel {
    Baseline,
    Seasonal,
    MovingAverage,
}

/// The degradation ladder, starting from the caller's pinned rung.
fn resolve_rung(choice: ModelChoice, n: usize, cfg: &ForecastConfig) -> Rung {
    match choice {
        ModelChoice::Ensemble if n >= cfg.min_points_seasonal => Rung::Blend,
        ModelChoice::Ensemble | ModelChoice::Baseline if n >= cfg.min_points_baseline => {
            Rung::Single(SingleModel::Baseline)
        }
        ModelChoice::Seasonal if n >= cfg.min_points_seasonal => {
            Rung::Single(SingleModel::Seasonal)
        }
        ModelChoice::Seasonal if n >= cfg.min_points_baseline => {
            Rung::Single(SingleModel::Baseline)
        }
        _ => Rung::Single(SingleModel::MovingAverage),
    }
}

/// Fit both base models on the full series, weight them by trailing
/// backtest error, and derive interval widths from each model's residual
/// variance plus the spread between their predictions.
fn blended_forecast(
    values: &[f64],
    series: &CategorySeries,
    steps: usize,
    cfg: &ForecastConfig,
) -> CoreResult<(String, Vec<f64>, Vec<f64>)> {
    let model_a = baseline::TrendAr::fit(values);
    let model_b = seasonal::SeasonalTrend::fit(values, cfg.season_length);

    let reports = backtest::backtest(series, cfg)?;
    let mape_a = reports
        .iter()
        .find(|r| r.model_name == model_a.name())
        .and_then(|r| r.mape);
    let mape_b = reports
        .iter()
        .find(|r| r.model_name == model_b.name())
        .and_then(|r| r.mape);
    let (w_a, w_b) = match (mape_a, mape_b) {
        (Some(a), Some(b)) => inverse_error_weights(a, b),
        // A model that could not be backtested gets no preferential
        // treatment: fall back to an even split.
        _ => (0.5, 0.5),
    };
    debug!(w_a, w_b, ?mape_a, ?mape_b, "ensemble blend weights");

    let preds_a = model_a.predict(steps);
    let preds_b = model_b.predict(steps);
    let predictions: Vec<f64> = preds_a
        .iter()
        .zip(preds_b.iter())
        .map(|(a, b)| w_a * a + w_b * b)
        .collect();

    let sigma = w_a * model_a.residual_std() + w_b * model_b.residual_std();
    let widths = preds_a
        .iter()
        .zip(preds_b.iter())
        .enumerate()
        .map(|(i, (a, b))| {
            let k = (i + 1) as f64;
            cfg.interval_z * sigma * k.sqrt() + (a - b).abs() / 2.0
        })
        .collect();

    Ok(("ensemble".to_string(), predictions, widths))
}

/// Inverse-error weights, normalized to sum to 1. Lower historical error
/// means a higher weight.
pub(crate) fn inverse_error_weights(mape_a: f64, mape_b: f64) -> (f64, f64) {
    const EPS: f64 = 1e-6;
    let ia = 1.0 / mape_a.max(EPS);
    let ib = 1.0 / mape_b.max(EPS);
    (ia / (ia + ib), ib / (ia + ib))
}

/// Turn raw predictions + interval widths into dated points with the two
/// bound invariants enforced: lower <= point <= upper at every step, and
/// interval width never shrinking as the horizon grows.
fn assemble_points(last_date: NaiveDate, predictions: &[f64], widths: &[f64]) -> Vec<ForecastPoint> {
    let mut points = Vec::with_capacity(predictions.len());
    let mut last_width = 0.0f64;
    for (i, (&raw, &w)) in predictions.iter().zip(widths.iter()).enumerate() {
        let point = raw.max(0.0); // demand cannot be negative
        let lower = (point - w).max(0.0);
        let mut upper = point + w;
        // Clamping lower at zero can shrink the printed interval; grow the
        // upper bound so uncertainty still compounds with the horizon.
        if upper - lower < last_width {
            upper = lower + last_width;
        }
        last_width = upper - lower;
        points.push(ForecastPoint {
            date: last_date + Duration::days((i + 1) as i64),
            point_estimate: point,
            lower_bound: lower,
            upper_bound: upper,
        });
    }
    points
}

/// UP/DOWN/FLAT from the relative change between the first and last point
/// estimate.
fn trend_direction(points: &[ForecastPoint], threshold: f64) -> TrendDirection {
    let first = points.first().map(|p| p.point_estimate).unwrap_or(0.0);
    let last = points.last().map(|p| p.point_estimate).unwrap_or(0.0);
    let rel = (last - first) / first.abs().max(1e-9);
    if rel > threshold {
        TrendDirection::Up
    } else if rel < -threshold {
        TrendDirection::Down
    } else {
        TrendDirection::Flat
    }
}

/// Shared least-squares helpers for the base models.
pub(crate) fn linear_fit(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean_t = (n - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n;
    let mut num = 0.0;
    let mut den = 0.0;
    for (t, &y) in values.iter().enumerate() {
        let dt = t as f64 - mean_t;
        num += dt * (y - mean_y);
        den += dt * dt;
    }
    let slope = if den > f64::EPSILON { num / den } else { 0.0 };
    (mean_y - slope * mean_t, slope)
}

pub(crate) fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}
