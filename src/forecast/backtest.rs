//! Backtest support: hold out the series tail, re-fit on the prefix, and
//! score the held-out actuals with MAPE. The per-model errors feed the
//! ensemble's blend weights and the drift monitor's baseline.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{baseline::TrendAr, seasonal::SeasonalTrend, CategorySeries, FittedModel,
    MovingAverage};
use crate::config::ForecastConfig;
use crate::error::{CoreError, CoreResult};

/// Backtest outcome for one model on one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub model_name: String,
    /// Mean absolute percentage error over the holdout, or `None` when
    /// the model was not eligible on the fit prefix or every holdout
    /// actual was zero.
    pub mape: Option<f64>,
    pub fit_len: usize,
    pub holdout_len: usize,
}

/// Mean absolute percentage error. Zero actuals are skipped; if nothing
/// remains there is no meaningful percentage error.
pub fn mape(actuals: &[f64], forecasts: &[f64]) -> Option<f64> {
    let mut sum = 0.0;
    let mut n = 0usize;
    for (&a, &f) in actuals.iter().zip(forecasts.iter()) {
        if a.abs() > f64::EPSILON {
            sum += ((a - f) / a).abs();
            n += 1;
        }
    }
    (n > 0).then(|| sum / n as f64)
}

/// Re-fit every ladder model on the prefix of `series` and score each
/// against the held-out tail.
///
/// The holdout is at least `holdout_min` points and at most a fifth of
/// the series. A model whose minimum is not met by the prefix gets a
/// `None` MAPE rather than an error — the ensemble treats that as
/// "no evidence", not failure.
pub fn backtest(series: &CategorySeries, cfg: &ForecastConfig) -> CoreResult<Vec<BacktestReport>> {
    let values = series.values();
    let n = values.len();
    let min_fit = cfg.min_points_fallback;
    if n < min_fit + cfg.holdout_min {
        return Err(CoreError::InsufficientHistory {
            points: n,
            required: min_fit + cfg.holdout_min,
        });
    }
    let holdout_len = (n / 5).max(cfg.holdout_min).min(n - min_fit);
    let fit_len = n - holdout_len;
    let (prefix, tail) = values.split_at(fit_len);

    let mut reports = Vec::new();
    let mut fitted: Vec<Box<dyn FittedModel>> = Vec::new();

    if fit_len >= cfg.min_points_baseline {
        fitted.push(Box::new(TrendAr::fit(prefix)));
    }
    if fit_len >= cfg.min_points_seasonal {
        fitted.push(Box::new(SeasonalTrend::fit(prefix, cfg.season_length)));
    }
    fitted.push(Box::new(MovingAverage::fit(prefix)));

    let mut scored: Vec<(String, Option<f64>, Vec<f64>)> = Vec::new();
    for model in &fitted {
        let preds = model.predict(holdout_len);
        let err = mape(tail, &preds);
        debug!(
            model = model.name(),
            ?err,
            fit_len,
            holdout_len,
            "backtested model"
        );
        scored.push((model.name().to_string(), err, preds));
    }

    // When both base models were eligible, also score their inverse-error
    // blend on the same holdout so callers can baseline the ensemble.
    let base: Vec<&(String, Option<f64>, Vec<f64>)> = scored
        .iter()
        .filter(|(name, _, _)| name == "trend_ar" || name == "seasonal_decomp")
        .collect();
    if let [a, b] = base.as_slice() {
        if let (Some(ea), Some(eb)) = (a.1, b.1) {
            let (wa, wb) = super::inverse_error_weights(ea, eb);
            let blended: Vec<f64> = a
                .2
                .iter()
                .zip(b.2.iter())
                .map(|(x, y)| wa * x + wb * y)
                .collect();
            reports.push(BacktestReport {
                model_name: "ensemble".to_string(),
                mape: mape(tail, &blended),
                fit_len,
                holdout_len,
            });
        }
    }

    reports.extend(scored.into_iter().map(|(model_name, err, _)| BacktestReport {
        model_name,
        mape: err,
        fit_len,
        holdout_len,
    }));
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::{CategorySeries, SeriesPoint};
    use chrono::{Duration, NaiveDate};

    fn daily(values: &[f64]) -> CategorySeries {
        let start = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        CategorySeries::new(
            "phones",
            values
                .iter()
                .enumerate()
                .map(|(i, &v)| SeriesPoint {
                    date: start + Duration::days(i as i64),
                    value: v,
                })
                .collect(),
        )
    }

    #[test]
    fn mape_skips_zero_actuals() {
        assert_eq!(mape(&[0.0, 0.0], &[1.0, 2.0]), None);
        let e = mape(&[10.0, 0.0, 20.0], &[11.0, 5.0, 18.0]).unwrap();
        assert!((e - (0.1 + 0.1) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn too_short_for_any_holdout_is_an_error() {
        let err = backtest(&daily(&[5.0, 6.0, 7.0]), &ForecastConfig::default()).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientHistory { .. }));
    }

    #[test]
    fn linear_series_backtests_near_zero_error() {
        let values: Vec<f64> = (0..25).map(|i| 10.0 + 2.0 * i as f64).collect();
        let reports = backtest(&daily(&values), &ForecastConfig::default()).unwrap();
        let ar = reports
            .iter()
            .find(|r| r.model_name == "trend_ar")
            .unwrap();
        assert!(ar.mape.unwrap() < 0.01);
    }

    #[test]
    fn short_prefix_reports_no_seasonal_row() {
        // 12 points: prefix of 9 fits baseline and moving average only.
        let values: Vec<f64> = (0..12).map(|i| 10.0 + i as f64).collect();
        let reports = backtest(&daily(&values), &ForecastConfig::default()).unwrap();
        assert!(reports.iter().any(|r| r.model_name == "trend_ar"));
        assert!(reports.iter().any(|r| r.model_name == "moving_average"));
        assert!(!reports.iter().any(|r| r.model_name == "seasonal_decomp"));
    }

    #[test]
    fn ensemble_row_present_with_enough_history() {
        let values: Vec<f64> = (0..30)
            .map(|i| 40.0 + i as f64 + if i % 7 == 0 { 3.0 } else { 0.0 })
            .collect();
        let reports = backtest(&daily(&values), &ForecastConfig::default()).unwrap();
        assert!(reports.iter().any(|r| r.model_name == "ensemble"));
    }
}
