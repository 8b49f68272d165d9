//! # Early-Warning Filter
//! Pure mapping from scored trend signals to actionable alerts.
//!
//! Recommendation text comes from a small fixed template set keyed by
//! (label, alert_level) — no free-text generation, so output is
//! deterministic and testable.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::scoring::{TrendLabel, TrendSignal};

/// Strength at/above which a multi-source signal escalates to HIGH.
pub const HIGH_STRENGTH: f64 = 70.0;
/// Strength at/above which a signal is at least MEDIUM.
pub const MEDIUM_STRENGTH: f64 = 50.0;
/// Distinct sources required for a HIGH alert.
pub const HIGH_MIN_SOURCES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertLevel {
    Low,
    Medium,
    High,
}

/// One alert derived from a single `TrendSignal`; read-only afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub keyword: String,
    pub alert_level: AlertLevel,
    pub strength: f64,
    pub recommendation: String,
}

/// Map each signal at/above `min_strength` into an alert. The minimum
/// is deliberately inclusive: a signal at exactly `min_strength` alerts.
///
/// HIGH requires both strength >= 70 and agreement from at least two
/// sources; MEDIUM requires strength >= 50; anything else above the
/// minimum is LOW.
pub fn detect_alerts(signals: &[TrendSignal], min_strength: f64) -> Vec<Alert> {
    let alerts: Vec<Alert> = signals
        .iter()
        .filter(|s| s.strength >= min_strength)
        .map(|s| {
            let level = if s.strength >= HIGH_STRENGTH && s.sources.len() >= HIGH_MIN_SOURCES {
                AlertLevel::High
            } else if s.strength >= MEDIUM_STRENGTH {
                AlertLevel::Medium
            } else {
                AlertLevel::Low
            };
            Alert {
                keyword: s.keyword.clone(),
                alert_level: level,
                strength: s.strength,
                recommendation: recommendation(s.label, level, &s.keyword),
            }
        })
        .collect();
    info!(alerts = alerts.len(), min_strength, "early-warning pass complete");
    alerts
}

/// Fixed recommendation templates keyed by (label, level).
fn recommendation(label: TrendLabel, level: AlertLevel, keyword: &str) -> String {
    match (label, level) {
        (TrendLabel::StrongPositive, AlertLevel::High) => format!(
            "OPPORTUNITY: {keyword} showing strong positive momentum. Consider increasing inventory/marketing."
        ),
        (TrendLabel::StrongNegative, AlertLevel::High) => format!(
            "RISK: {keyword} showing negative sentiment surge. Review product quality/pricing."
        ),
        (TrendLabel::StrongPositive, _) => format!(
            "MONITOR: {keyword} positive momentum building. Prepare inventory options."
        ),
        (TrendLabel::StrongNegative, _) => format!(
            "CAUTION: {keyword} negative sentiment building. Monitor closely for issues."
        ),
        (TrendLabel::Emerging, AlertLevel::High | AlertLevel::Medium) => format!(
            "MONITOR: {keyword} showing significant sentiment shift. Investigate cause."
        ),
        _ => format!("WATCH: {keyword} trending. Continue monitoring."),
    }
}
