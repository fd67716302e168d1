//! CSV ingestion: header recognition, row coercion and malformed-row accounting.
//!
//! Rows that cannot be coerced are dropped and counted, never raised. Only a
//! header lacking a required column, or an unreadable file, is an error.

pub mod manifest;
pub mod schema;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::DataError;
use crate::records::{DailySnapshot, DeliveryRecord, HistoricalSeries};
use schema::{Column, HeaderMap};

/// Accepted date layouts, exchange format first.
pub const DATE_FORMATS: [&str; 3] = ["%d-%b-%Y", "%Y-%m-%d", "%d-%m-%Y"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    ShortRow,
    MissingField,
    BadDelivery,
    BadDate,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::ShortRow => "short_row",
            DropReason::MissingField => "missing_field",
            DropReason::BadDelivery => "bad_delivery",
            DropReason::BadDate => "bad_date",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropCounts {
    pub short_row: usize,
    pub missing_field: usize,
    pub bad_delivery: usize,
    pub bad_date: usize,
}

impl DropCounts {
    fn record(&mut self, reason: DropReason) {
        match reason {
            DropReason::ShortRow => self.short_row += 1,
            DropReason::MissingField => self.missing_field += 1,
            DropReason::BadDelivery => self.bad_delivery += 1,
            DropReason::BadDate => self.bad_date += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.short_row + self.missing_field + self.bad_delivery + self.bad_date
    }
}

/// Everything about a parse except the records themselves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseSummary {
    pub columns: Vec<String>,
    /// Non-blank data rows seen after the header.
    pub row_count: usize,
    pub dropped: usize,
    pub drops: DropCounts,
    pub date_min: Option<NaiveDate>,
    pub date_max: Option<NaiveDate>,
    pub has_volume: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseOutcome {
    pub records: Vec<DeliveryRecord>,
    pub summary: ParseSummary,
}

impl ParseOutcome {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_daily(self) -> (ParseSummary, DailySnapshot) {
        (self.summary, DailySnapshot::from_records(self.records))
    }

    pub fn into_historical(self) -> (ParseSummary, HistoricalSeries) {
        (self.summary, HistoricalSeries::from_records(self.records))
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Parses delivery CSV text. The first non-blank line is the header; text with
/// no header at all yields an empty outcome.
pub fn parse_csv(input: &str) -> Result<ParseOutcome, DataError> {
    let mut lines = input.lines().filter(|l| !l.trim().is_empty());
    let header = match lines.next() {
        Some(line) => split_fields(line),
        None => return Ok(ParseOutcome::default()),
    };
    let map = HeaderMap::resolve(&header).require()?;

    let mut outcome = ParseOutcome {
        records: Vec::new(),
        summary: ParseSummary {
            columns: header.iter().map(|h| schema::normalize_header(h)).collect(),
            has_volume: map.has(Column::Volume),
            ..ParseSummary::default()
        },
    };

    for (line_no, line) in lines.enumerate() {
        outcome.summary.row_count += 1;
        let fields = split_fields(line);
        match parse_row(&fields, &map) {
            Ok(record) => {
                let summary = &mut outcome.summary;
                summary.date_min = Some(summary.date_min.map_or(record.date, |d| d.min(record.date)));
                summary.date_max = Some(summary.date_max.map_or(record.date, |d| d.max(record.date)));
                outcome.records.push(record);
            }
            Err(reason) => {
                debug!(row = line_no + 1, reason = reason.as_str(), "dropped malformed row");
                outcome.summary.drops.record(reason);
            }
        }
    }
    outcome.summary.dropped = outcome.summary.drops.total();

    if outcome.records.is_empty() {
        warn!(rows = outcome.summary.row_count, "no usable delivery rows");
    } else if outcome.summary.dropped > 0 {
        debug!(
            kept = outcome.records.len(),
            dropped = outcome.summary.dropped,
            "parsed delivery rows"
        );
    }
    Ok(outcome)
}

/// Coerces one row. Optional numeric columns that fail to parse become absent.
pub fn parse_row(fields: &[String], map: &HeaderMap) -> Result<DeliveryRecord, DropReason> {
    let required = |column: Column| -> Result<&str, DropReason> {
        let idx = map.index(column).ok_or(DropReason::ShortRow)?;
        let value = fields.get(idx).ok_or(DropReason::ShortRow)?.trim();
        if value.is_empty() {
            Err(DropReason::MissingField)
        } else {
            Ok(value)
        }
    };
    let optional = |column: Column| -> Option<&str> {
        map.index(column).and_then(|idx| fields.get(idx)).map(|s| s.as_str())
    };

    let symbol = required(Column::Symbol)?;
    let series = required(Column::Series)?;
    let date = parse_date(required(Column::Date)?).ok_or(DropReason::BadDate)?;
    let delivery_pct = parse_pct(required(Column::DeliveryPct)?).ok_or(DropReason::BadDelivery)?;

    Ok(DeliveryRecord {
        symbol: symbol.to_string(),
        series: series.to_string(),
        date,
        delivery_pct,
        volume: optional(Column::Volume).and_then(parse_quantity),
        deliverable_qty: optional(Column::DeliverableQty).and_then(parse_quantity),
        close: optional(Column::Close).and_then(parse_price),
    })
}

/// Splits a CSV line on commas outside double quotes. `""` inside quotes is a literal quote.
/// Input is split into lines first, so a quoted field cannot span a newline.
pub fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    fields.push(current);
    fields
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Trims, strips thousands separators, and maps `-` or blank to absent.
fn clean_numeric(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return None;
    }
    Some(trimmed.replace(',', ""))
}

pub fn parse_pct(raw: &str) -> Option<f64> {
    let value: f64 = clean_numeric(raw)?.parse().ok()?;
    (value.is_finite() && (0.0..=100.0).contains(&value)).then_some(value)
}

pub fn parse_quantity(raw: &str) -> Option<u64> {
    let cleaned = clean_numeric(raw)?;
    if let Ok(qty) = cleaned.parse::<u64>() {
        return Some(qty);
    }
    let value: f64 = cleaned.parse().ok()?;
    (value.is_finite() && value >= 0.0 && value.fract() == 0.0).then_some(value as u64)
}

pub fn parse_price(raw: &str) -> Option<f64> {
    let value: f64 = clean_numeric(raw)?.parse().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}

// =============================================================================
// File readers
// =============================================================================

pub fn read_csv(path: &Path) -> Result<ParseOutcome, DataError> {
    let text = fs::read_to_string(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_csv(&text)
}

/// Reads a market-wide daily file into a snapshot.
pub fn read_daily(path: &Path) -> Result<(ParseSummary, DailySnapshot), DataError> {
    read_csv(path).map(ParseOutcome::into_daily)
}

/// Reads a single-symbol history file, sorted and deduplicated by date.
pub fn read_historical(path: &Path) -> Result<(ParseSummary, HistoricalSeries), DataError> {
    read_csv(path).map(ParseOutcome::into_historical)
}
