//! # Mention Events
//! The raw input of the trend side: one record per keyword mention,
//! already sentiment-scored by the upstream NLP layer. The core never
//! depends on anything from that layer beyond the single `sentiment`
//! number on each event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a mention was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    News,
    Social,
    Search,
    Commerce,
    Community,
}

impl Source {
    /// Every configured source, in stable order. The deterministic order
    /// matters for reproducible output; the length is the denominator of
    /// cross-source agreement.
    pub const ALL: [Source; 5] = [
        Source::News,
        Source::Social,
        Source::Search,
        Source::Commerce,
        Source::Community,
    ];
}

/// One sentiment-scored keyword mention. Immutable once created;
/// produced by external collectors, consumed only by the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MentionEvent {
    pub keyword: String,
    pub source: Source,
    pub timestamp: DateTime<Utc>,
    /// Sentiment in [-1, 1]; 0 is neutral.
    pub sentiment: f64,
}

impl MentionEvent {
    pub fn new(
        keyword: impl Into<String>,
        source: Source,
        timestamp: DateTime<Utc>,
        sentiment: f64,
    ) -> Self {
        Self {
            keyword: keyword.into(),
            source,
            timestamp,
            sentiment: sentiment.clamp(-1.0, 1.0),
        }
    }
}

/// Half-open analysis window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl AnalysisWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Window covering the trailing `hours` before `end`.
    pub fn last_hours(end: DateTime<Utc>, hours: i64) -> Self {
        Self {
            start: end - chrono::Duration::hours(hours),
            end,
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }

    pub fn duration(&self) -> chrono::Duration {
        self.end - self.start
    }
}
