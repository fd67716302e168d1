//! Daily filter: drop excluded series, keep rows strictly above the delivery
//! threshold, group the survivors by series.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::info;

use crate::config::AnalysisConfig;
use crate::error::ConfigError;
use crate::records::{DailySnapshot, DeliveryRecord};

// =============================================================================
// Series exclusion rules
// =============================================================================

/// A single exclusion pattern. `GB` matches exactly, `W*` matches any series starting with `W`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SeriesRule {
    Exact(String),
    Prefix(String),
}

impl SeriesRule {
    pub fn parse(pattern: &str) -> Result<Self, ConfigError> {
        let trimmed = pattern.trim();
        let invalid = || ConfigError::InvalidSeriesPattern {
            pattern: pattern.to_string(),
        };
        let rule = match trimmed.strip_suffix('*') {
            Some(prefix) => SeriesRule::Prefix(prefix.to_ascii_uppercase()),
            None => SeriesRule::Exact(trimmed.to_ascii_uppercase()),
        };
        match &rule {
            SeriesRule::Exact(code) | SeriesRule::Prefix(code)
                if code.is_empty() || code.contains('*') || code.contains(char::is_whitespace) =>
            {
                Err(invalid())
            }
            _ => Ok(rule),
        }
    }

    /// Case-insensitive; surrounding whitespace on the series is ignored.
    pub fn matches(&self, series: &str) -> bool {
        let series = series.trim().to_ascii_uppercase();
        match self {
            SeriesRule::Exact(code) => series == *code,
            SeriesRule::Prefix(prefix) => series.starts_with(prefix.as_str()),
        }
    }
}

impl FromStr for SeriesRule {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SeriesRule::parse(s)
    }
}

impl fmt::Display for SeriesRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesRule::Exact(code) => write!(f, "{}", code),
            SeriesRule::Prefix(prefix) => write!(f, "{}*", prefix),
        }
    }
}

/// Ordered list of exclusion rules, evaluated first to last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct SeriesExclusions {
    rules: Vec<SeriesRule>,
}

impl Default for SeriesExclusions {
    /// Bonds, trade-for-trade and warrant-like series: GB, GS, BE, BO, BL, W*, K*.
    fn default() -> Self {
        let exact = ["GB", "GS", "BE", "BO", "BL"]
            .into_iter()
            .map(|c| SeriesRule::Exact(c.to_string()));
        let prefix = ["W", "K"]
            .into_iter()
            .map(|p| SeriesRule::Prefix(p.to_string()));
        Self {
            rules: exact.chain(prefix).collect(),
        }
    }
}

impl SeriesExclusions {
    pub fn new(rules: Vec<SeriesRule>) -> Self {
        Self { rules }
    }

    pub fn none() -> Self {
        Self { rules: Vec::new() }
    }

    /// Parses a comma-separated pattern list such as `GB,GS,W*`. Blank entries are skipped.
    pub fn parse_list(list: &str) -> Result<Self, ConfigError> {
        let rules = list
            .split(',')
            .filter(|p| !p.trim().is_empty())
            .map(SeriesRule::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    pub fn push(&mut self, rule: SeriesRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[SeriesRule] {
        &self.rules
    }

    /// First rule that matches, in list order.
    pub fn matching_rule(&self, series: &str) -> Option<&SeriesRule> {
        self.rules.iter().find(|rule| rule.matches(series))
    }

    pub fn excludes(&self, series: &str) -> bool {
        self.matching_rule(series).is_some()
    }
}

impl TryFrom<Vec<String>> for SeriesExclusions {
    type Error = ConfigError;

    fn try_from(patterns: Vec<String>) -> Result<Self, Self::Error> {
        let rules = patterns
            .iter()
            .map(|p| SeriesRule::parse(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }
}

impl From<SeriesExclusions> for Vec<String> {
    fn from(exclusions: SeriesExclusions) -> Self {
        exclusions.rules.iter().map(|r| r.to_string()).collect()
    }
}

// =============================================================================
// Daily report
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DailySummary {
    pub total_rows: usize,
    pub after_exclusion: usize,
    pub above_threshold: usize,
    /// Qualifying rows per series.
    pub per_series: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyReport {
    pub date: Option<NaiveDate>,
    pub threshold_pct: f64,
    /// Series code to qualifying records, ordered by symbol.
    pub groups: BTreeMap<String, Vec<DeliveryRecord>>,
    pub summary: DailySummary,
}

impl DailyReport {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Records of one series, highest delivery first.
    pub fn ranked(&self, series: &str) -> Vec<&DeliveryRecord> {
        let mut rows: Vec<&DeliveryRecord> = self
            .groups
            .get(series)
            .map(|g| g.iter().collect())
            .unwrap_or_default();
        rows.sort_by(|a, b| {
            b.delivery_pct
                .total_cmp(&a.delivery_pct)
                .then_with(|| a.symbol.cmp(&b.symbol))
        });
        rows
    }
}

pub fn filter_daily(
    snapshot: &DailySnapshot,
    cfg: &AnalysisConfig,
) -> Result<DailyReport, ConfigError> {
    cfg.validate()?;

    let mut summary = DailySummary {
        total_rows: snapshot.len(),
        ..DailySummary::default()
    };
    let mut groups: BTreeMap<String, Vec<DeliveryRecord>> = BTreeMap::new();

    for record in snapshot.records() {
        if cfg.excluded_series.excludes(&record.series) {
            continue;
        }
        summary.after_exclusion += 1;
        if !record.crosses(cfg.threshold_pct) {
            continue;
        }
        summary.above_threshold += 1;
        groups
            .entry(record.series.clone())
            .or_default()
            .push(record.clone());
    }

    for (series, rows) in groups.iter_mut() {
        rows.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        summary.per_series.insert(series.clone(), rows.len());
    }

    info!(
        date = ?snapshot.date(),
        total = summary.total_rows,
        after_exclusion = summary.after_exclusion,
        qualifying = summary.above_threshold,
        series = groups.len(),
        "daily filter complete"
    );

    Ok(DailyReport {
        date: snapshot.date(),
        threshold_pct: cfg.threshold_pct,
        groups,
        summary,
    })
}
