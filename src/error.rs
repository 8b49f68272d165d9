//! # Error Taxonomy
//! All failures this core can report. Every variant is an input-validation
//! failure: nothing in here is transient, so nothing is retried internally.
//! The caller decides whether to widen the window, fetch more history, or
//! surface an empty result.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    /// The requested scope contains no events or series to analyze.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// Weights not summing to 1, thresholds out of order, etc.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Forecast horizon outside the supported range.
    #[error("invalid horizon: {horizon} days (supported range {min}..={max})")]
    InvalidHorizon { horizon: u32, min: u32, max: u32 },

    /// Series too short for any model, including the moving-average fallback.
    #[error("insufficient history: {points} points, at least {required} required")]
    InsufficientHistory { points: usize, required: usize },

    /// Failure surfaced by an external provider (storage, ingestion).
    /// The core never produces these itself.
    #[error("provider error: {0}")]
    Provider(#[from] anyhow::Error),
}
