//! # Signal Aggregator
//!
//! Groups raw mention events into per-(keyword, source) bucketed series.
//! Buckets are contiguous across the whole window and gap-filled: a bucket
//! with no events still appears with `mention_count = 0` and
//! `mean_sentiment = 0.0` (neutral silence, not "missing"), so downstream
//! velocity math never divides by an absent interval.
//!
//! Keyword matching is exact after case-normalization. Fuzzy/alias
//! matching ("OnePlus" vs "One Plus") is a documented limitation; the
//! strategy sits behind [`KeywordMatcher`] so a smarter matcher can be
//! swapped in without touching scoring.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{CoreError, CoreResult};
use crate::event::{AnalysisWindow, MentionEvent, Source};

/// Sentiment magnitude below which a mention counts as neutral in the
/// window summary.
const NEUTRAL_BAND: f64 = 0.05;

/// Pluggable keyword canonicalization. Two raw keywords aggregate
/// together iff their canonical forms are identical strings.
pub trait KeywordMatcher {
    fn canonical(&self, raw: &str) -> String;
}

/// Default matcher: trim + ASCII-lowercase, nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatcher;

impl KeywordMatcher for ExactMatcher {
    fn canonical(&self, raw: &str) -> String {
        raw.trim().to_lowercase()
    }
}

/// One fixed-width time bucket of a keyword series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesBucket {
    pub bucket_start: DateTime<Utc>,
    pub mention_count: u64,
    /// Mean sentiment of the bucket's mentions; 0.0 for empty buckets.
    pub mean_sentiment: f64,
}

/// Contiguous bucketed series for one (keyword, source) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordSeries {
    pub keyword: String,
    pub source: Source,
    pub buckets: Vec<SeriesBucket>,
}

impl KeywordSeries {
    pub fn total_mentions(&self) -> u64 {
        self.buckets.iter().map(|b| b.mention_count).sum()
    }
}

/// Aggregate `events` inside `window` into one series per (keyword,
/// source) pair, using `bucket_hours`-wide buckets.
///
/// Fails with `InsufficientData` when the window holds zero events across
/// all sources — there is nothing to score.
pub fn aggregate_events<M: KeywordMatcher + ?Sized>(
    events: &[MentionEvent],
    window: &AnalysisWindow,
    bucket_hours: i64,
    matcher: &M,
) -> CoreResult<Vec<KeywordSeries>> {
    debug_assert!(bucket_hours >= 1);
    let bucket = Duration::hours(bucket_hours);
    let window_secs = window.duration().num_seconds();
    if window_secs <= 0 {
        return Err(CoreError::InsufficientData(format!(
            "empty analysis window [{}, {})",
            window.start, window.end
        )));
    }
    // Ceiling division so a partial trailing bucket still exists.
    let num_buckets = ((window_secs + bucket.num_seconds() - 1) / bucket.num_seconds()) as usize;

    // (keyword, source) -> bucket index -> (count, sentiment sum)
    let mut groups: BTreeMap<(String, Source), BTreeMap<usize, (u64, f64)>> = BTreeMap::new();
    let mut kept = 0usize;

    for ev in events {
        if !window.contains(ev.timestamp) {
            continue;
        }
        let idx = ((ev.timestamp - window.start).num_seconds() / bucket.num_seconds()) as usize;
        let slot = groups
            .entry((matcher.canonical(&ev.keyword), ev.source))
            .or_default()
            .entry(idx)
            .or_insert((0, 0.0));
        slot.0 += 1;
        slot.1 += ev.sentiment;
        kept += 1;
    }

    if groups.is_empty() {
        return Err(CoreError::InsufficientData(format!(
            "no events in window [{}, {})",
            window.start, window.end
        )));
    }

    let mut series = Vec::with_capacity(groups.len());
    for ((keyword, source), filled) in groups {
        let buckets = (0..num_buckets)
            .map(|i| {
                let (count, sum) = filled.get(&i).copied().unwrap_or((0, 0.0));
                SeriesBucket {
                    bucket_start: window.start + bucket * i as i32,
                    mention_count: count,
                    mean_sentiment: if count > 0 { sum / count as f64 } else { 0.0 },
                }
            })
            .collect();
        series.push(KeywordSeries {
            keyword,
            source,
            buckets,
        });
    }

    info!(
        events = kept,
        series = series.len(),
        buckets = num_buckets,
        "aggregated mention events"
    );
    Ok(series)
}

/// Per-source slice of a window summary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceSummary {
    pub mentions: u64,
    pub mean_sentiment: f64,
    pub min_sentiment: f64,
    pub max_sentiment: f64,
}

/// Sentiment statistics over a whole analysis window, overall and broken
/// down by source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSummary {
    pub window: AnalysisWindow,
    pub total_mentions: u64,
    pub mean_sentiment: f64,
    pub positive: u64,
    pub negative: u64,
    pub neutral: u64,
    pub per_source: BTreeMap<Source, SourceSummary>,
}

/// Summarize sentiment over the window. Same `InsufficientData` contract
/// as [`aggregate_events`].
pub fn sentiment_summary(
    events: &[MentionEvent],
    window: &AnalysisWindow,
) -> CoreResult<WindowSummary> {
    let mut total = 0u64;
    let mut sum = 0.0f64;
    let (mut pos, mut neg, mut neu) = (0u64, 0u64, 0u64);
    let mut per_source: BTreeMap<Source, (u64, f64, f64, f64)> = BTreeMap::new();

    for ev in events {
        if !window.contains(ev.timestamp) {
            continue;
        }
        total += 1;
        sum += ev.sentiment;
        if ev.sentiment > NEUTRAL_BAND {
            pos += 1;
        } else if ev.sentiment < -NEUTRAL_BAND {
            neg += 1;
        } else {
            neu += 1;
        }
        let s = per_source
            .entry(ev.source)
            .or_insert((0, 0.0, f64::INFINITY, f64::NEG_INFINITY));
        s.0 += 1;
        s.1 += ev.sentiment;
        s.2 = s.2.min(ev.sentiment);
        s.3 = s.3.max(ev.sentiment);
    }

    if total == 0 {
        return Err(CoreError::InsufficientData(format!(
            "no events in window [{}, {})",
            window.start, window.end
        )));
    }

    debug!(total, pos, neg, neu, "window sentiment summarized");
    Ok(WindowSummary {
        window: *window,
        total_mentions: total,
        mean_sentiment: sum / total as f64,
        positive: pos,
        negative: neg,
        neutral: neu,
        per_source: per_source
            .into_iter()
            .map(|(src, (n, s, lo, hi))| {
                (
                    src,
                    SourceSummary {
                        mentions: n,
                        mean_sentiment: s / n as f64,
                        min_sentiment: lo,
                        max_sentiment: hi,
                    },
                )
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
    }

    fn window(hours: i64) -> AnalysisWindow {
        AnalysisWindow::new(t0(), t0() + Duration::hours(hours))
    }

    fn ev(kw: &str, src: Source, offset_min: i64, sentiment: f64) -> MentionEvent {
        MentionEvent::new(kw, src, t0() + Duration::minutes(offset_min), sentiment)
    }

    #[test]
    fn empty_window_is_an_error() {
        let err = aggregate_events(&[], &window(4), 1, &ExactMatcher).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientData(_)));
    }

    #[test]
    fn buckets_are_contiguous_and_gap_filled() {
        // Events only in buckets 0 and 3 of a 4-hour window.
        let events = vec![
            ev("phoneX", Source::News, 10, 0.5),
            ev("phoneX", Source::News, 190, -0.2),
        ];
        let series = aggregate_events(&events, &window(4), 1, &ExactMatcher).unwrap();
        assert_eq!(series.len(), 1);
        let s = &series[0];
        assert_eq!(s.buckets.len(), 4);
        assert_eq!(s.buckets[0].mention_count, 1);
        assert_eq!(s.buckets[1].mention_count, 0);
        assert!((s.buckets[1].mean_sentiment).abs() < 1e-9); // neutral, not NaN
        assert_eq!(s.buckets[2].mention_count, 0);
        assert_eq!(s.buckets[3].mention_count, 1);
    }

    #[test]
    fn keywords_are_case_normalized() {
        let events = vec![
            ev("PhoneX", Source::News, 5, 0.4),
            ev("phonex", Source::News, 6, 0.6),
        ];
        let series = aggregate_events(&events, &window(1), 1, &ExactMatcher).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].keyword, "phonex");
        assert_eq!(series[0].buckets[0].mention_count, 2);
        assert!((series[0].buckets[0].mean_sentiment - 0.5).abs() < 1e-9);
    }

    #[test]
    fn sources_stay_separate() {
        let events = vec![
            ev("phonex", Source::News, 5, 0.4),
            ev("phonex", Source::Social, 6, 0.6),
        ];
        let series = aggregate_events(&events, &window(1), 1, &ExactMatcher).unwrap();
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn events_outside_window_are_ignored() {
        let events = vec![
            ev("phonex", Source::News, -10, 0.4), // before start
            ev("phonex", Source::News, 120, 0.4), // at/after end of 2h window
        ];
        let err = aggregate_events(&events, &window(2), 1, &ExactMatcher).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientData(_)));
    }

    #[test]
    fn summary_counts_polarity_and_sources() {
        let events = vec![
            ev("a", Source::News, 1, 0.8),
            ev("b", Source::News, 2, -0.6),
            ev("c", Source::Social, 3, 0.01),
        ];
        let sum = sentiment_summary(&events, &window(1)).unwrap();
        assert_eq!(sum.total_mentions, 3);
        assert_eq!((sum.positive, sum.negative, sum.neutral), (1, 1, 1));
        let news = &sum.per_source[&Source::News];
        assert_eq!(news.mentions, 2);
        assert!((news.min_sentiment - (-0.6)).abs() < 1e-9);
        assert!((news.max_sentiment - 0.8).abs() < 1e-9);
    }

    #[test]
    fn custom_matcher_merges_aliases() {
        struct AliasMatcher;
        impl KeywordMatcher for AliasMatcher {
            fn canonical(&self, raw: &str) -> String {
                raw.trim().to_lowercase().replace(' ', "")
            }
        }
        let events = vec![
            ev("One Plus", Source::News, 1, 0.2),
            ev("OnePlus", Source::News, 2, 0.4),
        ];
        let series = aggregate_events(&events, &window(1), 1, &AliasMatcher).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].total_mentions(), 2);
    }
}
