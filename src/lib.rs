// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod aggregate;
pub mod alert;
pub mod config;
pub mod core;
pub mod drift;
pub mod error;
pub mod event;
pub mod forecast;
pub mod provider;
pub mod scoring;

// ---- Re-exports for stable public API ----
pub use crate::aggregate::{aggregate_events, sentiment_summary, ExactMatcher, KeywordMatcher};
pub use crate::alert::{detect_alerts, Alert, AlertLevel};
pub use crate::config::{CoreConfig, DriftConfig, ForecastConfig, ScoringConfig};
pub use crate::core::MarketMood;
pub use crate::drift::{DriftMonitor, DriftReport};
pub use crate::error::{CoreError, CoreResult};
pub use crate::event::{AnalysisWindow, MentionEvent, Source};
pub use crate::forecast::{
    backtest, forecast, BacktestReport, CategorySeries, ForecastPoint, ForecastResult,
    ModelChoice, SeriesPoint, TrendDirection,
};
pub use crate::scoring::{score_trends, TrendLabel, TrendSignal};
