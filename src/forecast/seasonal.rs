//! Base model B: linear trend plus additive seasonal indices.
//!
//! Classic decomposition with a fixed cycle length (7 on daily data):
//! detrend with least squares, average the detrended values per position
//! in the cycle, center the indices so they sum to zero. Needs at least
//! two full cycles to say anything reliable about seasonality — that
//! minimum is enforced by the ensemble's ladder, not here.

use super::{linear_fit, sample_std, FittedModel};

#[derive(Debug, Clone)]
pub(crate) struct SeasonalTrend {
    intercept: f64,
    slope: f64,
    seasonal: Vec<f64>,
    residual_std: f64,
    n: usize,
}

impl SeasonalTrend {
    pub(crate) fn fit(values: &[f64], season_length: usize) -> Self {
        let n = values.len();
        let m = season_length.max(1);
        if n < 2 {
            let level = values.first().copied().unwrap_or(0.0);
            return Self {
                intercept: level,
                slope: 0.0,
                seasonal: vec![0.0; m],
                residual_std: 0.0,
                n,
            };
        }

        let (intercept, slope) = linear_fit(values);
        let detrended: Vec<f64> = values
            .iter()
            .enumerate()
            .map(|(t, &y)| y - (intercept + slope * t as f64))
            .collect();

        // Mean detrended value per cycle position.
        let mut sums = vec![0.0f64; m];
        let mut counts = vec![0usize; m];
        for (t, &d) in detrended.iter().enumerate() {
            sums[t % m] += d;
            counts[t % m] += 1;
        }
        let mut seasonal: Vec<f64> = sums
            .iter()
            .zip(counts.iter())
            .map(|(&s, &c)| if c > 0 { s / c as f64 } else { 0.0 })
            .collect();
        // Center so the indices carry no level of their own.
        let mean_idx = seasonal.iter().sum::<f64>() / m as f64;
        for s in &mut seasonal {
            *s -= mean_idx;
        }

        let residuals: Vec<f64> = values
            .iter()
            .enumerate()
            .map(|(t, &y)| y - (intercept + slope * t as f64 + seasonal[t % m]))
            .collect();

        Self {
            intercept,
            slope,
            seasonal,
            residual_std: sample_std(&residuals),
            n,
        }
    }
}

impl FittedModel for SeasonalTrend {
    fn name(&self) -> &'static str {
        "seasonal_decomp"
    }

    fn predict(&self, steps: usize) -> Vec<f64> {
        let m = self.seasonal.len();
        (1..=steps)
            .map(|k| {
                let t = self.n.saturating_sub(1) + k;
                self.intercept + self.slope * t as f64 + self.seasonal[t % m]
            })
            .collect()
    }

    fn residual_std(&self) -> f64 {
        self.residual_std
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_a_pure_weekly_cycle() {
        // Flat level 20 with a deterministic weekly shape, chosen so the
        // least-squares trend through it is exactly flat.
        let shape = [1.0, -2.0, 1.0, 0.0, 1.0, -2.0, 1.0];
        let values: Vec<f64> = (0..28).map(|t| 20.0 + shape[t % 7]).collect();
        let m = SeasonalTrend::fit(&values, 7);
        let preds = m.predict(7);
        for (k, p) in preds.iter().enumerate() {
            let t = 27 + k + 1;
            assert!(
                (p - (20.0 + shape[t % 7])).abs() < 1e-6,
                "step {k}: predicted {p}"
            );
        }
        assert!(m.residual_std() < 1e-6);
    }

    #[test]
    fn seasonal_indices_are_centered() {
        let values: Vec<f64> = (0..21).map(|t| 10.0 + (t % 7) as f64).collect();
        let m = SeasonalTrend::fit(&values, 7);
        let sum: f64 = m.seasonal.iter().sum();
        assert!(sum.abs() < 1e-9);
    }

    #[test]
    fn trend_plus_season_is_additive() {
        // Rising trend with a superimposed cycle; predictions keep rising.
        let values: Vec<f64> = (0..28)
            .map(|t| 50.0 + 2.0 * t as f64 + if t % 7 == 0 { 5.0 } else { 0.0 })
            .collect();
        let m = SeasonalTrend::fit(&values, 7);
        let preds = m.predict(14);
        assert!(preds[13] > preds[0]);
    }
}
