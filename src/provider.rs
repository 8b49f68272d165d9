//! # Collaborator Interfaces
//! The only doors to the outside world. Ingestion, storage and actuals
//! retrieval live behind these read-only traits; the core calls them
//! before computing and never performs I/O itself. Implementations are
//! free to be backed by SQL, HTTP caches or test fixtures.

use anyhow::Result;
use chrono::NaiveDate;

use crate::event::{AnalysisWindow, MentionEvent};
use crate::forecast::CategorySeries;

/// Sentiment-scored mention events from ingestion/storage.
pub trait EventFeed {
    fn fetch_events(&self, window: &AnalysisWindow) -> Result<Vec<MentionEvent>>;
}

/// Historical demand series per category from storage.
pub trait SeriesStore {
    fn fetch_category_series(&self, category: &str, lookback_days: u32)
        -> Result<CategorySeries>;
}

/// Realized actuals for drift evaluation, as (date, value) pairs.
pub trait ActualsFeed {
    fn fetch_actuals(
        &self,
        category: &str,
        window: &AnalysisWindow,
    ) -> Result<Vec<(NaiveDate, f64)>>;
}
