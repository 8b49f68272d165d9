//! # Drift Monitor
//! Tracks a trailing window of (forecast, realized-actual) pairs per
//! category and flags when rolling accuracy degrades beyond tolerance
//! against the baseline established at the last successful backtest.
//!
//! This only emits a signal — re-fitting or re-weighting in response is
//! the caller's decision. A single noisy actual never flips the flag:
//! the breach must persist for a configured number of consecutive
//! evaluations.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::DriftConfig;
use crate::forecast::backtest::mape;

/// Drift verdict for one category at one point in time. Never persisted
/// by the core itself; surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftReport {
    pub category: String,
    /// Rolling MAPE over the trailing window, if computable.
    pub rolling_error: Option<f64>,
    /// Baseline MAPE from the last successful backtest, if set.
    pub baseline_error: Option<f64>,
    pub drifted: bool,
    pub evaluated_at: DateTime<Utc>,
}

/// Per-category drift state: the trailing pair window, the stored
/// baseline, and the consecutive-breach counter.
#[derive(Debug, Clone)]
pub struct DriftMonitor {
    category: String,
    cfg: DriftConfig,
    pairs: VecDeque<(f64, f64)>,
    baseline: Option<f64>,
    consecutive_breaches: usize,
}

impl DriftMonitor {
    pub fn new(category: impl Into<String>, cfg: DriftConfig) -> Self {
        Self {
            category: category.into(),
            cfg,
            pairs: VecDeque::new(),
            baseline: None,
            consecutive_breaches: 0,
        }
    }

    /// Store the baseline MAPE from a fresh backtest and reset the breach
    /// streak — the model just proved itself against history again.
    pub fn set_baseline(&mut self, baseline_mape: f64) {
        self.baseline = Some(baseline_mape);
        self.consecutive_breaches = 0;
    }

    pub fn baseline(&self) -> Option<f64> {
        self.baseline
    }

    /// Record one (forecast, realized-actual) pair, discarding the oldest
    /// once the trailing window is full.
    pub fn record(&mut self, forecast: f64, actual: f64) {
        self.pairs.push_back((forecast, actual));
        while self.pairs.len() > self.cfg.window {
            self.pairs.pop_front();
        }
    }

    /// Rolling MAPE over the current window.
    pub fn rolling_error(&self) -> Option<f64> {
        let (forecasts, actuals): (Vec<f64>, Vec<f64>) = self.pairs.iter().copied().unzip();
        mape(&actuals, &forecasts)
    }

    /// Evaluate the window against the baseline. `drifted` flips only
    /// after `min_consecutive` breaching evaluations in a row.
    pub fn evaluate(&mut self, evaluated_at: DateTime<Utc>) -> DriftReport {
        let rolling = self.rolling_error();
        let breach = match (rolling, self.baseline) {
            (Some(r), Some(b)) => r > b * (1.0 + self.cfg.relative_tolerance),
            // No baseline or no actuals yet: nothing to compare.
            _ => false,
        };
        if breach {
            self.consecutive_breaches += 1;
        } else {
            self.consecutive_breaches = 0;
        }
        let drifted = self.consecutive_breaches >= self.cfg.min_consecutive;

        if drifted {
            warn!(
                category = self.category.as_str(),
                rolling = ?rolling,
                baseline = ?self.baseline,
                streak = self.consecutive_breaches,
                "forecast drift detected"
            );
        } else {
            debug!(
                category = self.category.as_str(),
                rolling = ?rolling,
                baseline = ?self.baseline,
                breach,
                "drift evaluation"
            );
        }

        DriftReport {
            category: self.category.clone(),
            rolling_error: rolling,
            baseline_error: self.baseline,
            drifted,
            evaluated_at,
        }
    }
}
