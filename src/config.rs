//! # Configuration
//!
//! Explicit config structs for scoring, forecasting and drift monitoring.
//! All weights and thresholds live here — the scoring formula is policy,
//! not physics, and must be fully reproducible under varied configurations.
//!
//! - serde defaults mirror the documented built-in policy.
//! - `from_file` loads JSON and validates; a missing file is an error,
//!   a present-but-inconsistent file is `InvalidConfiguration`.
//! - `CoreConfig::default()` is always valid (asserted in tests).

use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::error::{CoreError, CoreResult};

/// Weight/threshold tolerance when checking sums and orderings.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Scoring-side configuration: strength weights, normalization caps and
/// label thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Bucket width used by the aggregator, in hours.
    pub bucket_hours: i64,

    /// Strength weights; must sum to 1.0.
    pub w_velocity: f64,
    pub w_growth: f64,
    pub w_agreement: f64,
    pub w_volume: f64,

    /// Velocity is clamped to [-velocity_clamp, velocity_clamp] before
    /// normalization so a single outlier bucket cannot dominate the score.
    pub velocity_clamp: f64,
    /// Growth-rate magnitude (in percent) that maps to a normalized 1.0.
    pub growth_norm_pct: f64,
    /// Mention volume that maps to a normalized 1.0 on the log scale.
    pub volume_norm: f64,

    /// Label thresholds on the 0-100 strength scale; must be strictly
    /// ordered low < mid < high.
    pub high_threshold: f64,
    pub mid_threshold: f64,
    pub low_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            bucket_hours: 1,
            w_velocity: 0.30,
            w_growth: 0.30,
            w_agreement: 0.20,
            w_volume: 0.20,
            velocity_clamp: 1.0,
            growth_norm_pct: 200.0,
            volume_norm: 100.0,
            high_threshold: 70.0,
            mid_threshold: 40.0,
            low_threshold: 20.0,
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> CoreResult<()> {
        let sum = self.w_velocity + self.w_growth + self.w_agreement + self.w_volume;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(CoreError::InvalidConfiguration(format!(
                "strength weights must sum to 1.0, got {sum}"
            )));
        }
        if [self.w_velocity, self.w_growth, self.w_agreement, self.w_volume]
            .iter()
            .any(|w| *w < 0.0)
        {
            return Err(CoreError::InvalidConfiguration(
                "strength weights must be non-negative".into(),
            ));
        }
        if !(self.low_threshold < self.mid_threshold && self.mid_threshold < self.high_threshold) {
            return Err(CoreError::InvalidConfiguration(format!(
                "label thresholds out of order: low {} / mid {} / high {}",
                self.low_threshold, self.mid_threshold, self.high_threshold
            )));
        }
        if self.bucket_hours < 1 {
            return Err(CoreError::InvalidConfiguration(format!(
                "bucket_hours must be >= 1, got {}",
                self.bucket_hours
            )));
        }
        if self.velocity_clamp <= 0.0 || self.growth_norm_pct <= 0.0 || self.volume_norm <= 1.0 {
            return Err(CoreError::InvalidConfiguration(
                "normalization caps must be positive (volume_norm > 1)".into(),
            ));
        }
        Ok(())
    }
}

/// Forecast-side configuration: model eligibility minimums, seasonality,
/// interval shape and backtest holdout policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Minimum points for the moving-average fallback; below this the
    /// forecast fails with `InsufficientHistory`.
    pub min_points_fallback: usize,
    /// Minimum points for the trend+AR baseline (model A).
    pub min_points_baseline: usize,
    /// Minimum points for seasonal decomposition (model B).
    pub min_points_seasonal: usize,
    /// Seasonal cycle length in points (7 = weekly on daily data).
    pub season_length: usize,

    /// z multiplier for confidence intervals (1.96 ~ 95%).
    pub interval_z: f64,
    /// Relative change between first and last point estimate that
    /// classifies the direction as UP (or DOWN when negative).
    pub direction_threshold: f64,

    /// Backtest holdout: at least `holdout_min` points, at most a fifth
    /// of the series.
    pub holdout_min: usize,
    /// Days of history the facade requests from storage per forecast.
    pub lookback_days: u32,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            min_points_fallback: 3,
            min_points_baseline: 7,
            min_points_seasonal: 14,
            season_length: 7,
            interval_z: 1.96,
            direction_threshold: 0.05,
            holdout_min: 3,
            lookback_days: 90,
        }
    }
}

impl ForecastConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if self.min_points_fallback < 2 {
            return Err(CoreError::InvalidConfiguration(
                "min_points_fallback must be >= 2".into(),
            ));
        }
        if !(self.min_points_fallback <= self.min_points_baseline
            && self.min_points_baseline <= self.min_points_seasonal)
        {
            return Err(CoreError::InvalidConfiguration(format!(
                "model minimums out of order: fallback {} / baseline {} / seasonal {}",
                self.min_points_fallback, self.min_points_baseline, self.min_points_seasonal
            )));
        }
        if self.season_length < 2 || self.min_points_seasonal < 2 * self.season_length {
            return Err(CoreError::InvalidConfiguration(
                "seasonal model needs at least two full cycles of history".into(),
            ));
        }
        if self.interval_z <= 0.0 || self.direction_threshold <= 0.0 {
            return Err(CoreError::InvalidConfiguration(
                "interval_z and direction_threshold must be positive".into(),
            ));
        }
        if self.holdout_min < 1 {
            return Err(CoreError::InvalidConfiguration(
                "holdout_min must be >= 1".into(),
            ));
        }
        Ok(())
    }
}

/// Drift-monitor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    /// Trailing window of (forecast, actual) pairs kept per category.
    pub window: usize,
    /// Rolling MAPE must exceed baseline by this relative margin
    /// (0.5 = 50% worse) to count as a breach.
    pub relative_tolerance: f64,
    /// Consecutive breaching evaluations required before `drifted` flips,
    /// so one noisy actual does not raise a flag.
    pub min_consecutive: usize,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            window: 10,
            relative_tolerance: 0.5,
            min_consecutive: 3,
        }
    }
}

impl DriftConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if self.window == 0 || self.min_consecutive == 0 {
            return Err(CoreError::InvalidConfiguration(
                "drift window and min_consecutive must be >= 1".into(),
            ));
        }
        if self.relative_tolerance <= 0.0 {
            return Err(CoreError::InvalidConfiguration(
                "relative_tolerance must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Top-level configuration bundle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub scoring: ScoringConfig,
    pub forecast: ForecastConfig,
    pub drift: DriftConfig,
}

impl CoreConfig {
    /// Load from a JSON file and validate.
    pub fn from_file<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let bytes = fs::read(path.as_ref()).map_err(|e| {
            CoreError::InvalidConfiguration(format!(
                "cannot read {}: {e}",
                path.as_ref().display()
            ))
        })?;
        let cfg: Self = serde_json::from_slice(&bytes)
            .map_err(|e| CoreError::InvalidConfiguration(format!("bad config JSON: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> CoreResult<()> {
        self.scoring.validate()?;
        self.forecast.validate()?;
        self.drift.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        CoreConfig::default().validate().expect("defaults valid");
    }

    #[test]
    fn weights_must_sum_to_one() {
        let cfg = ScoringConfig {
            w_velocity: 0.5,
            ..ScoringConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(CoreError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn thresholds_must_be_ordered() {
        let cfg = ScoringConfig {
            mid_threshold: 80.0,
            ..ScoringConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn model_minimums_must_be_ordered() {
        let cfg = ForecastConfig {
            min_points_baseline: 20,
            ..ForecastConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: CoreConfig =
            serde_json::from_str(r#"{"scoring": {"high_threshold": 60.0}}"#).unwrap();
        assert!((cfg.scoring.high_threshold - 60.0).abs() < 1e-9);
        assert_eq!(cfg.forecast.min_points_seasonal, 14);
        cfg.validate().unwrap();
    }
}
