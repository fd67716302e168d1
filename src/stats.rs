//! Summary statistics over a single-symbol history: coverage, volume,
//! run-length patterns and the price reaction on high-delivery days.
//!
//! All functions assume records in ascending date order.

use chrono::NaiveDate;
use serde::Serialize;

use crate::records::DeliveryRecord;

/// Rows back used for the trailing price change.
pub const PRICE_CHANGE_LAG: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeriesStats {
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    /// Calendar days between first and last record.
    pub span_days: i64,
    pub records: usize,
    pub above_threshold: usize,
    pub at_or_below_threshold: usize,
    /// Absent when no record carries a traded volume.
    pub volume: Option<VolumeStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumeStats {
    pub mean_volume: f64,
    pub max_volume: u64,
    /// Records that carried a volume.
    pub sampled: usize,
    /// Mean of volume / mean_volume over novel signal days that carried a volume.
    pub mean_multiple_on_signals: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PatternStats {
    pub max_consecutive_above: usize,
    pub max_consecutive_increases: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceReaction {
    pub samples: usize,
    /// Mean trailing close-to-close change, as a fraction, over high-delivery days.
    pub mean_change: f64,
    /// Share of those changes that were positive.
    pub positive_rate: f64,
}

pub fn series_stats(records: &[DeliveryRecord], threshold_pct: f64) -> SeriesStats {
    let first_date = records.first().map(|r| r.date);
    let last_date = records.last().map(|r| r.date);
    let span_days = match (first_date, last_date) {
        (Some(first), Some(last)) => (last - first).num_days(),
        _ => 0,
    };
    let above_threshold = records.iter().filter(|r| r.crosses(threshold_pct)).count();
    SeriesStats {
        first_date,
        last_date,
        span_days,
        records: records.len(),
        above_threshold,
        at_or_below_threshold: records.len() - above_threshold,
        volume: volume_stats(records),
    }
}

pub fn volume_stats(records: &[DeliveryRecord]) -> Option<VolumeStats> {
    let volumes: Vec<u64> = records.iter().filter_map(|r| r.volume).collect();
    let max_volume = *volumes.iter().max()?;
    let mean_volume = volumes.iter().map(|v| *v as f64).sum::<f64>() / volumes.len() as f64;
    Some(VolumeStats {
        mean_volume,
        max_volume,
        sampled: volumes.len(),
        mean_multiple_on_signals: None,
    })
}

pub fn pattern_stats(records: &[DeliveryRecord], threshold_pct: f64) -> PatternStats {
    let mut stats = PatternStats::default();
    let mut above_run = 0;
    let mut increase_run = 0;
    let mut prev: Option<f64> = None;

    for record in records {
        if record.crosses(threshold_pct) {
            above_run += 1;
            stats.max_consecutive_above = stats.max_consecutive_above.max(above_run);
        } else {
            above_run = 0;
        }

        match prev {
            Some(p) if record.delivery_pct > p => {
                increase_run += 1;
                stats.max_consecutive_increases = stats.max_consecutive_increases.max(increase_run);
            }
            _ => increase_run = 0,
        }
        prev = Some(record.delivery_pct);
    }
    stats
}

/// The only record above threshold, when exactly one exists.
pub fn first_time_crossing(records: &[DeliveryRecord], threshold_pct: f64) -> Option<&DeliveryRecord> {
    let mut above = records.iter().filter(|r| r.crosses(threshold_pct));
    match (above.next(), above.next()) {
        (Some(only), None) => Some(only),
        _ => None,
    }
}

/// Trailing close change over high-delivery days. Absent when no such day has
/// a close both on it and `PRICE_CHANGE_LAG` rows earlier.
pub fn price_reaction(records: &[DeliveryRecord], threshold_pct: f64) -> Option<PriceReaction> {
    let changes: Vec<f64> = records
        .iter()
        .enumerate()
        .skip(PRICE_CHANGE_LAG)
        .filter(|(_, r)| r.crosses(threshold_pct))
        .filter_map(|(idx, r)| {
            let now = r.close?;
            let then = records[idx - PRICE_CHANGE_LAG].close?;
            (then > 0.0).then(|| now / then - 1.0)
        })
        .collect();
    if changes.is_empty() {
        return None;
    }
    let samples = changes.len();
    let positive = changes.iter().filter(|c| **c > 0.0).count();
    Some(PriceReaction {
        samples,
        mean_change: changes.iter().sum::<f64>() / samples as f64,
        positive_rate: positive as f64 / samples as f64,
    })
}
