//! # Trend Scorer
//! Pure, testable logic that maps bucketed keyword series → `TrendSignal`.
//! No I/O, suitable for unit tests and future offline evaluation.
//!
//! Strength is a weighted sum of four normalized, explainable factors:
//! sentiment velocity, mention growth, cross-source agreement and
//! log-scaled volume. An additive model is used on purpose — an analyst
//! must be able to see which factor drove a score.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::aggregate::KeywordSeries;
use crate::config::ScoringConfig;
use crate::error::{CoreError, CoreResult};
use crate::event::Source;

/// Qualitative signal classification on the strength scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendLabel {
    StrongPositive,
    StrongNegative,
    Emerging,
    Weak,
    None,
}

/// One scored keyword. Created fresh each scoring cycle and never
/// mutated afterward; a new cycle produces a new signal so history stays
/// auditable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSignal {
    pub keyword: String,
    /// Overall strength in [0, 100].
    pub strength: f64,
    /// Sentiment change per hour between the two most recent buckets,
    /// clamped to the configured range.
    pub velocity: f64,
    /// Relative mention change between the two most recent buckets, in
    /// percent.
    pub growth_rate: f64,
    pub sources: BTreeSet<Source>,
    pub mention_count: u64,
    pub avg_sentiment: f64,
    pub label: TrendLabel,
    pub detected_at: DateTime<Utc>,
}

/// Per-keyword bucket totals combined across sources: mention counts sum,
/// sentiment is the mention-weighted mean (empty buckets stay neutral).
struct Combined {
    sources: BTreeSet<Source>,
    counts: Vec<u64>,
    sentiments: Vec<f64>,
}

fn combine_by_keyword(series: &[KeywordSeries]) -> BTreeMap<String, Combined> {
    let mut map: BTreeMap<String, Combined> = BTreeMap::new();
    for s in series {
        let n = s.buckets.len();
        let entry = map.entry(s.keyword.clone()).or_insert_with(|| Combined {
            sources: BTreeSet::new(),
            counts: vec![0; n],
            sentiments: vec![0.0; n],
        });
        if entry.counts.len() < n {
            entry.counts.resize(n, 0);
            entry.sentiments.resize(n, 0.0);
        }
        if s.total_mentions() > 0 {
            entry.sources.insert(s.source);
        }
        for (i, b) in s.buckets.iter().enumerate() {
            // Accumulate weighted sums first; divide once below.
            entry.counts[i] += b.mention_count;
            entry.sentiments[i] += b.mean_sentiment * b.mention_count as f64;
        }
    }
    for c in map.values_mut() {
        for (sum, &count) in c.sentiments.iter_mut().zip(c.counts.iter()) {
            *sum = if count > 0 { *sum / count as f64 } else { 0.0 };
        }
    }
    map
}

/// Score every keyword present in `series` and return the signals sorted
/// by strength descending (ties: mention_count descending, then keyword
/// ascending). Keywords labelled NONE are dropped — they carry no signal.
///
/// Fails with `InsufficientData` when the aggregator produced no series
/// for the window.
pub fn score_trends(
    series: &[KeywordSeries],
    cfg: &ScoringConfig,
    detected_at: DateTime<Utc>,
) -> CoreResult<Vec<TrendSignal>> {
    cfg.validate()?;
    if series.is_empty() {
        return Err(CoreError::InsufficientData(
            "no keyword series in analysis window".into(),
        ));
    }

    let mut signals = Vec::new();
    for (keyword, combined) in combine_by_keyword(series) {
        let total: u64 = combined.counts.iter().sum();
        if total == 0 {
            continue;
        }
        let n = combined.counts.len();

        // Velocity: first difference of bucket sentiment per hour,
        // clamped so one outlier bucket cannot dominate.
        let velocity = if n >= 2 {
            let raw = (combined.sentiments[n - 1] - combined.sentiments[n - 2])
                / cfg.bucket_hours as f64;
            raw.clamp(-cfg.velocity_clamp, cfg.velocity_clamp)
        } else {
            0.0
        };

        // Growth: relative mention change; max(prior, 1) guards the
        // division when a keyword newly appears.
        let (recent, prior) = if n >= 2 {
            (combined.counts[n - 1], combined.counts[n - 2])
        } else {
            (combined.counts[n - 1], 0)
        };
        let growth_rate = (recent as f64 - prior as f64) / (prior.max(1) as f64) * 100.0;

        let agreement = combined.sources.len() as f64 / Source::ALL.len() as f64;

        // Log-scaled volume with diminishing returns past volume_norm.
        let volume = (((total as f64) + 1.0).ln() / (cfg.volume_norm + 1.0).ln()).min(1.0);

        let norm_velocity = (velocity.abs() / cfg.velocity_clamp).min(1.0);
        let norm_growth = (growth_rate.abs() / cfg.growth_norm_pct).min(1.0);

        let strength = (100.0
            * (cfg.w_velocity * norm_velocity
                + cfg.w_growth * norm_growth
                + cfg.w_agreement * agreement
                + cfg.w_volume * volume))
            .clamp(0.0, 100.0);

        let weighted_sum: f64 = combined
            .sentiments
            .iter()
            .zip(combined.counts.iter())
            .map(|(s, &c)| s * c as f64)
            .sum();
        let avg_sentiment = weighted_sum / total as f64;

        let label = classify(strength, avg_sentiment, cfg);
        debug!(
            keyword = keyword.as_str(),
            strength, velocity, growth_rate, ?label,
            "scored keyword"
        );
        if label == TrendLabel::None {
            continue;
        }

        signals.push(TrendSignal {
            keyword,
            strength,
            velocity,
            growth_rate,
            sources: combined.sources,
            mention_count: total,
            avg_sentiment,
            label,
            detected_at,
        });
    }

    // Deterministic ordering: strength desc, mentions desc, keyword asc.
    signals.sort_by(|a, b| {
        b.strength
            .total_cmp(&a.strength)
            .then(b.mention_count.cmp(&a.mention_count))
            .then(a.keyword.cmp(&b.keyword))
    });

    info!(signals = signals.len(), "trend scoring cycle complete");
    Ok(signals)
}

fn classify(strength: f64, avg_sentiment: f64, cfg: &ScoringConfig) -> TrendLabel {
    if strength >= cfg.high_threshold && avg_sentiment > 0.0 {
        TrendLabel::StrongPositive
    } else if strength >= cfg.high_threshold && avg_sentiment < 0.0 {
        TrendLabel::StrongNegative
    } else if strength >= cfg.mid_threshold {
        TrendLabel::Emerging
    } else if strength >= cfg.low_threshold {
        TrendLabel::Weak
    } else {
        TrendLabel::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::SeriesBucket;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
    }

    fn series(kw: &str, source: Source, buckets: &[(u64, f64)]) -> KeywordSeries {
        KeywordSeries {
            keyword: kw.to_string(),
            source,
            buckets: buckets
                .iter()
                .enumerate()
                .map(|(i, &(count, sentiment))| SeriesBucket {
                    bucket_start: t0() + chrono::Duration::hours(i as i64),
                    mention_count: count,
                    mean_sentiment: sentiment,
                })
                .collect(),
        }
    }

    #[test]
    fn empty_input_is_an_error() {
        let err = score_trends(&[], &ScoringConfig::default(), t0()).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientData(_)));
    }

    #[test]
    fn velocity_and_growth_are_finite_with_zero_prior() {
        // Keyword appears out of nowhere: prior bucket has zero count.
        let s = series("newkw", Source::News, &[(0, 0.0), (8, 0.9)]);
        let cfg = ScoringConfig::default();
        let signals = score_trends(&[s], &cfg, t0()).unwrap();
        let sig = &signals[0];
        assert!(sig.velocity.is_finite());
        assert!(sig.growth_rate.is_finite());
        assert!((sig.growth_rate - 800.0).abs() < 1e-9);
    }

    #[test]
    fn strength_stays_within_scale() {
        // Extreme everything; strength still must land in [0, 100].
        let all: Vec<KeywordSeries> = Source::ALL
            .iter()
            .map(|&src| series("huge", src, &[(1, -0.9), (10_000, 0.9)]))
            .collect();
        let signals = score_trends(&all, &ScoringConfig::default(), t0()).unwrap();
        let s = &signals[0];
        assert!(s.strength >= 0.0 && s.strength <= 100.0);
        assert_eq!(s.sources.len(), 5);
    }

    #[test]
    fn strong_labels_require_high_threshold() {
        let cfg = ScoringConfig::default();
        let signals = score_trends(
            &[series("mild", Source::News, &[(3, 0.1), (4, 0.2)])],
            &cfg,
            t0(),
        )
        .unwrap_or_default();
        for s in &signals {
            if matches!(s.label, TrendLabel::StrongPositive | TrendLabel::StrongNegative) {
                assert!(s.strength >= cfg.high_threshold);
            }
        }
    }

    #[test]
    fn negative_surge_labels_strong_negative() {
        // Lowered high threshold to make the strong band reachable with
        // two sources; sentiment is clearly negative.
        let cfg = ScoringConfig {
            high_threshold: 50.0,
            mid_threshold: 30.0,
            low_threshold: 10.0,
            ..ScoringConfig::default()
        };
        let input = vec![
            series("recallx", Source::News, &[(2, -0.1), (60, -0.8)]),
            series("recallx", Source::Social, &[(1, -0.2), (40, -0.9)]),
            series("recallx", Source::Community, &[(0, 0.0), (30, -0.7)]),
        ];
        let signals = score_trends(&input, &cfg, t0()).unwrap();
        assert_eq!(signals[0].label, TrendLabel::StrongNegative);
        assert!(signals[0].avg_sentiment < 0.0);
    }

    #[test]
    fn none_labelled_keywords_are_dropped() {
        // One flat, tiny keyword: below low threshold, so no output row.
        let s = series("meh", Source::News, &[(1, 0.0), (1, 0.0)]);
        let signals = score_trends(&[s], &ScoringConfig::default(), t0()).unwrap();
        assert!(signals.is_empty());
    }

    #[test]
    fn ordering_is_deterministic_with_ties() {
        let cfg = ScoringConfig {
            low_threshold: 1.0,
            ..ScoringConfig::default()
        };
        // Two keywords engineered to identical factor values.
        let input = vec![
            series("bravo", Source::News, &[(2, 0.0), (4, 0.5)]),
            series("alpha", Source::News, &[(2, 0.0), (4, 0.5)]),
        ];
        let a = score_trends(&input, &cfg, t0()).unwrap();
        let b = score_trends(&input, &cfg, t0()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].keyword, "alpha"); // lexicographic tiebreak
    }
}
