//! Delivery-percentage analysis over exchange-published CSV data.
//!
//! Two pure analyses sit on top of a shared parser:
//! - [`filter::filter_daily`] surfaces one day's stocks strictly above a
//!   delivery threshold, grouped by series, after series exclusions.
//! - [`scanner::scan_series`] finds threshold crossings in one stock's history
//!   and marks the ones with no earlier crossing in a trailing calendar window.
//!
//! Neither keeps state between calls. File reading, rendering and any session
//! state belong to the caller.

pub mod config;
pub mod data;
pub mod error;
pub mod filter;
pub mod logging;
pub mod records;
pub mod scanner;
pub mod stats;

pub use config::AnalysisConfig;
pub use error::{AnalysisError, ConfigError, DataError};
pub use filter::{filter_daily, DailyReport, SeriesExclusions, SeriesRule};
pub use records::{DailySnapshot, DeliveryRecord, HistoricalSeries};
pub use scanner::{scan_series, CrossingSignal, ScanReport};

use data::ParseSummary;

/// Parses a market-wide daily file and filters it. The configuration is
/// checked before any row is read.
pub fn analyze_daily(
    input: &str,
    cfg: &AnalysisConfig,
) -> Result<(ParseSummary, DailyReport), AnalysisError> {
    cfg.validate()?;
    let (summary, snapshot) = data::parse_csv(input)?.into_daily();
    let report = filter_daily(&snapshot, cfg)?;
    Ok((summary, report))
}

/// Parses a single-symbol history file and scans it. The configuration is
/// checked before any row is read.
pub fn analyze_history(
    input: &str,
    cfg: &AnalysisConfig,
) -> Result<(ParseSummary, ScanReport), AnalysisError> {
    cfg.validate()?;
    let (summary, series) = data::parse_csv(input)?.into_historical();
    let report = scan_series(&series, cfg)?;
    Ok((summary, report))
}
