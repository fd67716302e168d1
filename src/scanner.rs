//! Historical signal scanner.
//!
//! Walks one symbol's history in date order and emits a [`CrossingSignal`] for
//! every day whose delivery percentage is strictly above the threshold. A
//! crossing is *novel* when no earlier record dated within the trailing
//! lookback window `[d - N months, d)` also crossed. The window is measured in
//! calendar months, so gaps in trading days never shift it.
//!
//! Less than N months of history is not an error: the window is whatever
//! precedes the day, and an empty window means novel.

use chrono::{Months, NaiveDate};
use serde::Serialize;
use tracing::info;

use crate::config::AnalysisConfig;
use crate::error::ConfigError;
use crate::records::{DeliveryRecord, HistoricalSeries};
use crate::stats::{self, PatternStats, PriceReaction, SeriesStats};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossingSignal {
    pub date: NaiveDate,
    pub delivery_pct: f64,
    pub is_novel: bool,
    /// Mean delivery % of the earlier records inside the window.
    pub prior_avg_pct: Option<f64>,
    /// Volume relative to the series mean volume.
    pub volume_multiple: Option<f64>,
    pub delivery_to_traded: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanReport {
    pub symbol: Option<String>,
    pub threshold_pct: f64,
    pub lookback_months: u32,
    /// Every crossing in date order, novel or not.
    pub signals: Vec<CrossingSignal>,
    pub stats: SeriesStats,
    pub patterns: PatternStats,
    pub first_time_crossing: Option<DeliveryRecord>,
    pub price_reaction: Option<PriceReaction>,
}

impl ScanReport {
    /// The actionable view: first crossings only.
    pub fn novel_signals(&self) -> impl Iterator<Item = &CrossingSignal> {
        self.signals.iter().filter(|s| s.is_novel)
    }

    pub fn novel_count(&self) -> usize {
        self.novel_signals().count()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}

// =============================================================================
// Lookback window
// =============================================================================

/// Half-open window `records[start..end]` of already-visited records. Both
/// ends only move forward, so a full pass is linear.
#[derive(Debug)]
struct LookbackWindow<'a> {
    records: &'a [DeliveryRecord],
    threshold_pct: f64,
    months: Months,
    start: usize,
    end: usize,
    crossings: usize,
    pct_sum: f64,
}

impl<'a> LookbackWindow<'a> {
    fn new(records: &'a [DeliveryRecord], threshold_pct: f64, months: Months) -> Self {
        Self {
            records,
            threshold_pct,
            months,
            start: 0,
            end: 0,
            crossings: 0,
            pct_sum: 0.0,
        }
    }

    /// Positions the window on the records strictly before `idx` dated on or
    /// after `date - months`.
    fn slide_to(&mut self, idx: usize, date: NaiveDate) {
        while self.end < idx {
            let entering = &self.records[self.end];
            self.pct_sum += entering.delivery_pct;
            if entering.crosses(self.threshold_pct) {
                self.crossings += 1;
            }
            self.end += 1;
        }

        // Underflow past the earliest representable date keeps everything.
        let Some(cutoff) = date.checked_sub_months(self.months) else {
            return;
        };
        while self.start < self.end && self.records[self.start].date < cutoff {
            let leaving = &self.records[self.start];
            self.pct_sum -= leaving.delivery_pct;
            if leaving.crosses(self.threshold_pct) {
                self.crossings -= 1;
            }
            self.start += 1;
        }
    }

    fn len(&self) -> usize {
        self.end - self.start
    }

    fn has_crossing(&self) -> bool {
        self.crossings > 0
    }

    /// Mean of the running sum. Long series accumulate float rounding from
    /// the add/subtract updates, well below the two decimals exchanges publish.
    fn mean_pct(&self) -> Option<f64> {
        (self.len() > 0).then(|| self.pct_sum / self.len() as f64)
    }
}

// =============================================================================
// Scan
// =============================================================================

/// Core pass over date-ascending records with no repeated dates.
///
/// `mean_volume` scales each signal's volume into a multiple; pass `None` when
/// the series carries no volume.
pub fn detect_crossings(
    records: &[DeliveryRecord],
    threshold_pct: f64,
    lookback: Months,
    mean_volume: Option<f64>,
) -> Vec<CrossingSignal> {
    let mut window = LookbackWindow::new(records, threshold_pct, lookback);
    let mut signals = Vec::new();

    for (idx, record) in records.iter().enumerate() {
        if !record.crosses(threshold_pct) {
            continue;
        }
        window.slide_to(idx, record.date);
        let volume_multiple = match (record.volume, mean_volume) {
            (Some(vol), Some(mean)) if mean > 0.0 => Some(vol as f64 / mean),
            _ => None,
        };
        signals.push(CrossingSignal {
            date: record.date,
            delivery_pct: record.delivery_pct,
            is_novel: !window.has_crossing(),
            prior_avg_pct: window.mean_pct(),
            volume_multiple,
            delivery_to_traded: record.delivery_to_traded(),
        });
    }
    signals
}

pub fn scan_series(series: &HistoricalSeries, cfg: &AnalysisConfig) -> Result<ScanReport, ConfigError> {
    cfg.validate()?;
    let lookback = cfg.lookback()?;
    let threshold = cfg.threshold_pct;
    let records = series.records();

    let mut coverage = stats::series_stats(records, threshold);
    let mean_volume = coverage.volume.as_ref().map(|v| v.mean_volume);
    let signals = detect_crossings(records, threshold, lookback, mean_volume);

    if let Some(volume) = coverage.volume.as_mut() {
        let multiples: Vec<f64> = signals
            .iter()
            .filter(|s| s.is_novel)
            .filter_map(|s| s.volume_multiple)
            .collect();
        if !multiples.is_empty() {
            volume.mean_multiple_on_signals =
                Some(multiples.iter().sum::<f64>() / multiples.len() as f64);
        }
    }

    let report = ScanReport {
        symbol: series.symbol().map(str::to_string),
        threshold_pct: threshold,
        lookback_months: cfg.lookback_months as u32,
        patterns: stats::pattern_stats(records, threshold),
        first_time_crossing: stats::first_time_crossing(records, threshold).cloned(),
        price_reaction: stats::price_reaction(records, threshold),
        stats: coverage,
        signals,
    };

    info!(
        symbol = report.symbol.as_deref().unwrap_or("-"),
        records = records.len(),
        crossings = report.signals.len(),
        novel = report.novel_count(),
        "historical scan complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn rec(d: NaiveDate, pct: f64) -> DeliveryRecord {
        DeliveryRecord::new("ABC", "EQ", d, pct)
    }

    fn novelty(signals: &[CrossingSignal]) -> Vec<(NaiveDate, bool)> {
        signals.iter().map(|s| (s.date, s.is_novel)).collect()
    }

    #[test]
    fn test_window_counts_only_prior_records() {
        let recs = vec![rec(date(2024, 1, 2), 95.0), rec(date(2024, 1, 3), 96.0)];
        let signals = detect_crossings(&recs, 90.0, Months::new(3), None);
        assert_eq!(
            novelty(&signals),
            vec![(date(2024, 1, 2), true), (date(2024, 1, 3), false)]
        );
        assert_eq!(signals[0].prior_avg_pct, None);
        assert_eq!(signals[1].prior_avg_pct, Some(95.0));
    }

    #[test]
    fn test_window_lower_bound_is_inclusive() {
        // 2024-04-10 minus three months is 2024-01-10.
        let recs = vec![rec(date(2024, 1, 10), 91.0), rec(date(2024, 4, 10), 92.0)];
        let signals = detect_crossings(&recs, 90.0, Months::new(3), None);
        assert!(!signals[1].is_novel);

        let recs = vec![rec(date(2024, 1, 9), 91.0), rec(date(2024, 4, 10), 92.0)];
        let signals = detect_crossings(&recs, 90.0, Months::new(3), None);
        assert!(signals[1].is_novel);
    }

    #[test]
    fn test_month_end_clamps() {
        // 2023-05-31 minus three months clamps to 2023-02-28.
        let inside = vec![rec(date(2023, 2, 28), 99.0), rec(date(2023, 5, 31), 99.0)];
        assert!(!detect_crossings(&inside, 90.0, Months::new(3), None)[1].is_novel);

        let outside = vec![rec(date(2023, 2, 27), 99.0), rec(date(2023, 5, 31), 99.0)];
        assert!(detect_crossings(&outside, 90.0, Months::new(3), None)[1].is_novel);
    }

    #[test]
    fn test_zero_month_lookback_makes_every_crossing_novel() {
        let recs = vec![rec(date(2024, 1, 1), 95.0), rec(date(2024, 1, 2), 95.0)];
        let signals = detect_crossings(&recs, 90.0, Months::new(0), None);
        assert!(signals.iter().all(|s| s.is_novel));
    }

    #[test]
    fn test_non_crossing_records_still_feed_prior_average() {
        let recs = vec![
            rec(date(2024, 1, 1), 40.0),
            rec(date(2024, 1, 2), 60.0),
            rec(date(2024, 1, 3), 97.0),
        ];
        let signals = detect_crossings(&recs, 90.0, Months::new(3), None);
        assert_eq!(signals.len(), 1);
        assert!(signals[0].is_novel);
        assert_eq!(signals[0].prior_avg_pct, Some(50.0));
    }

    #[test]
    fn test_prior_average_stays_accurate_over_long_series() {
        let start = date(2015, 1, 1);
        let recs: Vec<DeliveryRecord> = (0..4000u64)
            .map(|i| {
                let pct = ((i * 7919) % 10_000) as f64 / 100.0 + 0.01;
                rec(start + chrono::Days::new(i), pct.min(100.0))
            })
            .collect();
        let signals = detect_crossings(&recs, 90.0, Months::new(3), None);
        assert!(signals.len() > 100);
        for signal in &signals {
            let cutoff = signal.date.checked_sub_months(Months::new(3)).unwrap();
            let window: Vec<f64> = recs
                .iter()
                .filter(|r| r.date >= cutoff && r.date < signal.date)
                .map(|r| r.delivery_pct)
                .collect();
            let exact = window.iter().sum::<f64>() / window.len() as f64;
            let running = signal.prior_avg_pct.unwrap();
            assert!((running - exact).abs() < 1e-9, "{}: {} vs {}", signal.date, running, exact);
        }
    }

    #[test]
    fn test_volume_multiple_and_delivery_ratio() {
        let recs = vec![
            rec(date(2024, 1, 1), 50.0).with_volume(100),
            rec(date(2024, 1, 2), 95.0)
                .with_volume(300)
                .with_deliverable_qty(285),
        ];
        let series = HistoricalSeries::from_records(recs);
        let report = scan_series(&series, &AnalysisConfig::default()).unwrap();
        let signal = &report.signals[0];
        assert_eq!(signal.volume_multiple, Some(1.5));
        assert_eq!(signal.delivery_to_traded, Some(95.0));

        let volume = report.stats.volume.as_ref().unwrap();
        assert_eq!(volume.mean_volume, 200.0);
        assert_eq!(volume.mean_multiple_on_signals, Some(1.5));
    }

    #[test]
    fn test_report_without_volume_omits_volume_stats() {
        let series = HistoricalSeries::from_records(vec![rec(date(2024, 1, 1), 95.0)]);
        let report = scan_series(&series, &AnalysisConfig::default()).unwrap();
        assert!(report.stats.volume.is_none());
        assert_eq!(report.signals[0].volume_multiple, None);
        assert_eq!(report.first_time_crossing.as_ref().map(|r| r.delivery_pct), Some(95.0));
    }

    #[test]
    fn test_invalid_config_rejected_before_scan() {
        let series = HistoricalSeries::from_records(vec![rec(date(2024, 1, 1), 95.0)]);
        let cfg = AnalysisConfig::default().with_lookback_months(-3);
        assert_eq!(
            scan_series(&series, &cfg),
            Err(ConfigError::NegativeLookback { months: -3 })
        );
    }

    #[test]
    fn test_empty_series_is_empty_report() {
        let report = scan_series(&HistoricalSeries::default(), &AnalysisConfig::default()).unwrap();
        assert!(report.is_empty());
        assert_eq!(report.symbol, None);
        assert_eq!(report.novel_count(), 0);
    }
}
