// tests/forecast_noise.rs
//
// The ensemble on realistic, noisy demand: trend + weekly cycle + seeded
// noise. Checks the invariants that must survive noise, not exact values.

use chrono::{Duration, NaiveDate};
use rand::{Rng, SeedableRng};

use market_mood::{forecast, CategorySeries, ForecastConfig, ModelChoice, SeriesPoint, TrendDirection};

fn noisy_series(seed: u64, days: usize) -> CategorySeries {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let start = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
    let points = (0..days)
        .map(|i| {
            let trend = 200.0 + 1.5 * i as f64;
            let season = match i % 7 {
                5 | 6 => 30.0, // weekend bump
                0 => -10.0,
                _ => 0.0,
            };
            let noise: f64 = rng.random_range(-8.0..8.0);
            SeriesPoint {
                date: start + Duration::days(i as i64),
                value: (trend + season + noise).max(0.0),
            }
        })
        .collect();
    CategorySeries::new("laptops", points)
}

#[test]
fn noisy_growth_is_still_classified_up() {
    let cfg = ForecastConfig::default();
    let r = forecast(&noisy_series(7, 60), 14, ModelChoice::Ensemble, &cfg).unwrap();
    assert_eq!(r.model_name, "ensemble");
    assert_eq!(r.trend_direction, TrendDirection::Up);
}

#[test]
fn bound_invariants_survive_noise_across_seeds() {
    let cfg = ForecastConfig::default();
    for seed in [1u64, 2, 3, 4, 5] {
        let r = forecast(&noisy_series(seed, 45), 21, ModelChoice::Ensemble, &cfg).unwrap();
        let mut last_width = 0.0;
        for p in &r.points {
            assert!(p.lower_bound <= p.point_estimate && p.point_estimate <= p.upper_bound);
            assert!(p.lower_bound >= 0.0);
            let width = p.upper_bound - p.lower_bound;
            assert!(width + 1e-9 >= last_width, "seed {seed}: interval shrank");
            last_width = width;
        }
    }
}

#[test]
fn noisy_intervals_are_wider_than_clean_ones() {
    let cfg = ForecastConfig::default();
    let clean: Vec<SeriesPoint> = (0..45)
        .map(|i| SeriesPoint {
            date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap() + Duration::days(i as i64),
            value: 200.0 + 1.5 * i as f64,
        })
        .collect();
    let clean = forecast(
        &CategorySeries::new("laptops", clean),
        7,
        ModelChoice::Ensemble,
        &cfg,
    )
    .unwrap();
    let noisy = forecast(&noisy_series(11, 45), 7, ModelChoice::Ensemble, &cfg).unwrap();

    let width = |r: &market_mood::ForecastResult| {
        r.points[6].upper_bound - r.points[6].lower_bound
    };
    assert!(width(&noisy) > width(&clean));
}
