//! Canonical delivery records and the two shapes the engines consume:
//! a one-day market snapshot and a single-symbol history.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One normalized row of exchange delivery data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub symbol: String,
    pub series: String,
    pub date: NaiveDate,
    /// Deliverable quantity as a percentage of traded quantity, within [0, 100].
    pub delivery_pct: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deliverable_qty: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close: Option<f64>,
}

impl DeliveryRecord {
    pub fn new(symbol: &str, series: &str, date: NaiveDate, delivery_pct: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            series: series.to_string(),
            date,
            delivery_pct,
            volume: None,
            deliverable_qty: None,
            close: None,
        }
    }

    pub fn with_volume(mut self, volume: u64) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn with_deliverable_qty(mut self, qty: u64) -> Self {
        self.deliverable_qty = Some(qty);
        self
    }

    pub fn with_close(mut self, close: f64) -> Self {
        self.close = Some(close);
        self
    }

    /// Strictly above the threshold. A value equal to the threshold does not cross.
    pub fn crosses(&self, threshold_pct: f64) -> bool {
        self.delivery_pct > threshold_pct
    }

    /// Deliverable quantity over traded quantity, in percent.
    pub fn delivery_to_traded(&self) -> Option<f64> {
        match (self.deliverable_qty, self.volume) {
            (Some(qty), Some(vol)) if vol > 0 => Some(qty as f64 * 100.0 / vol as f64),
            _ => None,
        }
    }
}

// =============================================================================
// Daily snapshot
// =============================================================================

/// One day's market-wide records, one per (symbol, series).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DailySnapshot {
    date: Option<NaiveDate>,
    records: Vec<DeliveryRecord>,
    discarded: usize,
}

impl DailySnapshot {
    /// The snapshot date is the most common record date, earliest on a tie.
    /// Rows dated otherwise are dropped, then the first row for each
    /// (symbol, series) is kept.
    pub fn from_records(records: Vec<DeliveryRecord>) -> Self {
        let mut counts: HashMap<NaiveDate, usize> = HashMap::new();
        for record in &records {
            *counts.entry(record.date).or_default() += 1;
        }
        let date = counts
            .into_iter()
            .max_by(|(da, ca), (db, cb)| ca.cmp(cb).then(db.cmp(da)))
            .map(|(d, _)| d);

        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut kept = Vec::with_capacity(records.len());
        let mut discarded = 0;
        for record in records {
            if Some(record.date) == date
                && seen.insert((record.symbol.clone(), record.series.clone()))
            {
                kept.push(record);
            } else {
                discarded += 1;
            }
        }

        Self {
            date,
            records: kept,
            discarded,
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn records(&self) -> &[DeliveryRecord] {
        &self.records
    }

    /// Off-date and duplicate (symbol, series) rows dropped while building
    /// the snapshot.
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// =============================================================================
// Historical series
// =============================================================================

/// Date-ordered history of a single symbol with no repeated dates.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistoricalSeries {
    symbol: Option<String>,
    records: Vec<DeliveryRecord>,
    discarded: usize,
}

impl HistoricalSeries {
    /// Stable-sorts by date, keeps the first row per date, and drops rows whose
    /// symbol differs from the first row's.
    pub fn from_records(records: Vec<DeliveryRecord>) -> Self {
        let symbol = records.first().map(|r| r.symbol.clone());
        let total = records.len();

        let mut same_symbol: Vec<DeliveryRecord> = records
            .into_iter()
            .filter(|r| Some(&r.symbol) == symbol.as_ref())
            .collect();
        same_symbol.sort_by_key(|r| r.date);
        same_symbol.dedup_by_key(|r| r.date);

        let discarded = total - same_symbol.len();
        Self {
            symbol,
            records: same_symbol,
            discarded,
        }
    }

    pub fn symbol(&self) -> Option<&str> {
        self.symbol.as_deref()
    }

    pub fn records(&self) -> &[DeliveryRecord] {
        &self.records
    }

    /// Rows dropped for a repeated date or a foreign symbol.
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.records.first().map(|r| r.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.records.last().map(|r| r.date)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_crosses_is_strict() {
        let r = DeliveryRecord::new("ABC", "EQ", day(1), 90.0);
        assert!(!r.crosses(90.0));
        assert!(r.crosses(89.99));
    }

    #[test]
    fn test_delivery_to_traded_needs_both_quantities() {
        let r = DeliveryRecord::new("ABC", "EQ", day(1), 50.0).with_volume(200);
        assert_eq!(r.delivery_to_traded(), None);
        let r = r.with_deliverable_qty(150);
        assert_eq!(r.delivery_to_traded(), Some(75.0));
        let zero = DeliveryRecord::new("ABC", "EQ", day(1), 50.0)
            .with_volume(0)
            .with_deliverable_qty(0);
        assert_eq!(zero.delivery_to_traded(), None);
    }

    #[test]
    fn test_history_sorts_and_keeps_first_duplicate() {
        let series = HistoricalSeries::from_records(vec![
            DeliveryRecord::new("ABC", "EQ", day(3), 30.0),
            DeliveryRecord::new("ABC", "EQ", day(1), 10.0),
            DeliveryRecord::new("ABC", "EQ", day(3), 99.0),
            DeliveryRecord::new("ABC", "EQ", day(2), 20.0),
        ]);
        let pcts: Vec<f64> = series.records().iter().map(|r| r.delivery_pct).collect();
        assert_eq!(pcts, vec![10.0, 20.0, 30.0]);
        assert_eq!(series.discarded(), 1);
        assert_eq!(series.first_date(), Some(day(1)));
        assert_eq!(series.last_date(), Some(day(3)));
    }

    #[test]
    fn test_history_drops_foreign_symbols() {
        let series = HistoricalSeries::from_records(vec![
            DeliveryRecord::new("ABC", "EQ", day(1), 10.0),
            DeliveryRecord::new("XYZ", "EQ", day(2), 20.0),
        ]);
        assert_eq!(series.symbol(), Some("ABC"));
        assert_eq!(series.len(), 1);
        assert_eq!(series.discarded(), 1);
    }

    #[test]
    fn test_snapshot_dedupes_symbol_series_pairs() {
        let snap = DailySnapshot::from_records(vec![
            DeliveryRecord::new("ABC", "EQ", day(5), 95.0),
            DeliveryRecord::new("ABC", "BE", day(5), 96.0),
            DeliveryRecord::new("ABC", "EQ", day(5), 10.0),
        ]);
        assert_eq!(snap.len(), 2);
        assert_eq!(snap.discarded(), 1);
        assert_eq!(snap.records()[0].delivery_pct, 95.0);
        assert_eq!(snap.date(), Some(day(5)));
    }

    #[test]
    fn test_snapshot_drops_rows_from_other_dates() {
        let snap = DailySnapshot::from_records(vec![
            DeliveryRecord::new("A", "EQ", day(15), 95.0),
            DeliveryRecord::new("B", "EQ", day(15), 96.0),
            DeliveryRecord::new("C", "EQ", day(14), 97.0),
        ]);
        assert_eq!(snap.date(), Some(day(15)));
        assert_eq!(snap.len(), 2);
        assert_eq!(snap.discarded(), 1);
        assert!(snap.records().iter().all(|r| r.date == day(15)));
    }

    #[test]
    fn test_snapshot_date_tie_keeps_earliest() {
        let snap = DailySnapshot::from_records(vec![
            DeliveryRecord::new("A", "EQ", day(15), 95.0),
            DeliveryRecord::new("B", "EQ", day(14), 96.0),
        ]);
        assert_eq!(snap.date(), Some(day(14)));
        let symbols: Vec<&str> = snap.records().iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["B"]);
    }

    #[test]
    fn test_empty_snapshot_has_no_date() {
        let snap = DailySnapshot::from_records(Vec::new());
        assert!(snap.is_empty());
        assert_eq!(snap.date(), None);
    }
}
