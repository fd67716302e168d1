use chrono::NaiveDate;
use deliveryscan::{filter_daily, scan_series, AnalysisConfig, DailySnapshot, DeliveryRecord, HistoricalSeries};
use proptest::prelude::*;

fn snapshot_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 10, 15).unwrap()
}

fn excluded_series() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("GB".to_string()),
        Just("GS".to_string()),
        Just("BE".to_string()),
        Just("BO".to_string()),
        Just("BL".to_string()),
        "[WK][0-9A-Z]{0,2}",
    ]
}

proptest! {
    #[test]
    fn values_at_threshold_are_excluded(threshold in 0.0f64..=100.0) {
        let snap = DailySnapshot::from_records(vec![
            DeliveryRecord::new("EXACT", "EQ", snapshot_date(), threshold),
        ]);
        let cfg = AnalysisConfig::default().with_threshold(threshold);
        let report = filter_daily(&snap, &cfg).unwrap();
        prop_assert!(report.is_empty());
        prop_assert_eq!(report.summary.after_exclusion, 1);
        prop_assert_eq!(report.summary.above_threshold, 0);
    }

    #[test]
    fn excluded_series_never_survive(series in excluded_series(), pct in 0.0f64..=100.0) {
        let snap = DailySnapshot::from_records(vec![
            DeliveryRecord::new("ANY", &series, snapshot_date(), pct),
        ]);
        let cfg = AnalysisConfig::default().with_threshold(0.0);
        let report = filter_daily(&snap, &cfg).unwrap();
        prop_assert!(report.is_empty());
        prop_assert_eq!(report.summary.total_rows, 1);
        prop_assert_eq!(report.summary.after_exclusion, 0);
    }

    #[test]
    fn survivors_are_strictly_above_threshold(
        pcts in proptest::collection::vec(0.0f64..=100.0, 0..60),
        threshold in 0.0f64..=100.0,
    ) {
        let records = pcts
            .iter()
            .enumerate()
            .map(|(i, p)| DeliveryRecord::new(&format!("S{}", i), "EQ", snapshot_date(), *p))
            .collect();
        let snap = DailySnapshot::from_records(records);
        let report = filter_daily(&snap, &AnalysisConfig::default().with_threshold(threshold)).unwrap();
        let survivors: usize = report.groups.values().map(|g| g.len()).sum();
        prop_assert_eq!(survivors, pcts.iter().filter(|p| **p > threshold).count());
        for rows in report.groups.values() {
            prop_assert!(rows.iter().all(|r| r.delivery_pct > threshold));
        }
    }

    #[test]
    fn first_crossing_is_always_novel(
        pcts in proptest::collection::vec(0.0f64..=100.0, 1..200),
        threshold in 0.0f64..100.0,
    ) {
        let start = snapshot_date();
        let records = pcts
            .iter()
            .enumerate()
            .map(|(i, p)| DeliveryRecord::new("ABC", "EQ", start + chrono::Days::new(i as u64 * 3), *p))
            .collect();
        let series = HistoricalSeries::from_records(records);
        let cfg = AnalysisConfig::default().with_threshold(threshold);
        let report = scan_series(&series, &cfg).unwrap();
        prop_assert_eq!(report.signals.len(), pcts.iter().filter(|p| **p > threshold).count());
        if let Some(first) = report.signals.first() {
            prop_assert!(first.is_novel);
        }
        prop_assert_eq!(report, scan_series(&series, &cfg).unwrap());
    }
}
