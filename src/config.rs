use chrono::Months;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;
use crate::filter::SeriesExclusions;

pub const DEFAULT_THRESHOLD_PCT: f64 = 90.0;
pub const DEFAULT_LOOKBACK_MONTHS: i64 = 3;

/// Knobs shared by the daily filter and the historical scanner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Delivery percentage a record must strictly exceed.
    pub threshold_pct: f64,
    pub excluded_series: SeriesExclusions,
    /// Trailing window, in calendar months, that must be free of crossings
    /// for a crossing to count as novel.
    pub lookback_months: i64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            threshold_pct: DEFAULT_THRESHOLD_PCT,
            excluded_series: SeriesExclusions::default(),
            lookback_months: DEFAULT_LOOKBACK_MONTHS,
        }
    }
}

impl AnalysisConfig {
    /// Reads `DELIVERY_THRESHOLD`, `EXCLUDED_SERIES` and `LOOKBACK_MONTHS`.
    /// Missing values fall back to the defaults; unparseable ones do too, with
    /// a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AnalysisConfig::from_env`] over an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            threshold_pct: setting(&lookup, "DELIVERY_THRESHOLD", |v| v.trim().parse().ok())
                .unwrap_or(defaults.threshold_pct),
            excluded_series: setting(&lookup, "EXCLUDED_SERIES", |v| {
                SeriesExclusions::parse_list(v).ok()
            })
            .unwrap_or(defaults.excluded_series),
            lookback_months: setting(&lookup, "LOOKBACK_MONTHS", |v| v.trim().parse().ok())
                .unwrap_or(defaults.lookback_months),
        }
    }

    pub fn with_threshold(mut self, threshold_pct: f64) -> Self {
        self.threshold_pct = threshold_pct;
        self
    }

    pub fn with_excluded_series(mut self, excluded: SeriesExclusions) -> Self {
        self.excluded_series = excluded;
        self
    }

    pub fn with_lookback_months(mut self, months: i64) -> Self {
        self.lookback_months = months;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.threshold_pct.is_finite() || !(0.0..=100.0).contains(&self.threshold_pct) {
            return Err(ConfigError::ThresholdOutOfRange {
                value: self.threshold_pct,
            });
        }
        self.lookback().map(|_| ())
    }

    pub fn lookback(&self) -> Result<Months, ConfigError> {
        if self.lookback_months < 0 {
            return Err(ConfigError::NegativeLookback {
                months: self.lookback_months,
            });
        }
        u32::try_from(self.lookback_months)
            .map(Months::new)
            .map_err(|_| ConfigError::LookbackTooLarge {
                months: self.lookback_months,
            })
    }
}

fn setting<F, T>(lookup: &F, key: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    let parsed = parse(&raw);
    if parsed.is_none() {
        warn!(key, value = %raw, "unparseable setting, using default");
    }
    parsed
}
