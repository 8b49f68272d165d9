//! Base model A: linear trend plus an AR(1) term on the residuals.
//!
//! Captures level, trend and short-range autocorrelation. Cheap to fit,
//! robust on short or irregular series — this is the rung the ensemble
//! degrades to when there is not enough history for seasonality.

use super::{linear_fit, sample_std, FittedModel};

/// |phi| cap; keeps the residual carry-over from blowing up on short,
/// strongly autocorrelated series.
const PHI_CAP: f64 = 0.95;

#[derive(Debug, Clone, Copy)]
pub(crate) struct TrendAr {
    intercept: f64,
    slope: f64,
    phi: f64,
    last_residual: f64,
    innovation_std: f64,
    n: usize,
}

impl TrendAr {
    pub(crate) fn fit(values: &[f64]) -> Self {
        let n = values.len();
        if n < 2 {
            let level = values.first().copied().unwrap_or(0.0);
            return Self {
                intercept: level,
                slope: 0.0,
                phi: 0.0,
                last_residual: 0.0,
                innovation_std: 0.0,
                n,
            };
        }

        let (intercept, slope) = linear_fit(values);
        let residuals: Vec<f64> = values
            .iter()
            .enumerate()
            .map(|(t, &y)| y - (intercept + slope * t as f64))
            .collect();

        // Lag-1 autocorrelation of the trend residuals.
        let mut num = 0.0;
        let mut den = 0.0;
        for t in 1..n {
            num += residuals[t] * residuals[t - 1];
            den += residuals[t - 1] * residuals[t - 1];
        }
        let phi = if den > f64::EPSILON {
            (num / den).clamp(-PHI_CAP, PHI_CAP)
        } else {
            0.0
        };

        // Innovations are what AR(1) could not explain; their spread is
        // the model's one-step uncertainty.
        let innovations: Vec<f64> = (1..n)
            .map(|t| residuals[t] - phi * residuals[t - 1])
            .collect();

        Self {
            intercept,
            slope,
            phi,
            last_residual: residuals[n - 1],
            innovation_std: sample_std(&innovations),
            n,
        }
    }
}

impl FittedModel for TrendAr {
    fn name(&self) -> &'static str {
        "trend_ar"
    }

    fn predict(&self, steps: usize) -> Vec<f64> {
        (1..=steps)
            .map(|k| {
                let t = (self.n.saturating_sub(1) + k) as f64;
                // The residual carry-over decays geometrically.
                self.intercept + self.slope * t + self.phi.powi(k as i32) * self.last_residual
            })
            .collect()
    }

    fn residual_std(&self) -> f64 {
        self.innovation_std
    }
}
