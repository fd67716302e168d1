//! Column recognition for the exchange's daily and historical delivery files.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::DataError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Symbol,
    Series,
    Date,
    DeliveryPct,
    Volume,
    DeliverableQty,
    Close,
}

impl Column {
    pub const REQUIRED: [Column; 4] = [
        Column::Symbol,
        Column::Series,
        Column::Date,
        Column::DeliveryPct,
    ];

    pub const ALL: [Column; 7] = [
        Column::Symbol,
        Column::Series,
        Column::Date,
        Column::DeliveryPct,
        Column::Volume,
        Column::DeliverableQty,
        Column::Close,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Column::Symbol => "symbol",
            Column::Series => "series",
            Column::Date => "date",
            Column::DeliveryPct => "delivery_pct",
            Column::Volume => "volume",
            Column::DeliverableQty => "deliverable_qty",
            Column::Close => "close",
        }
    }

    /// Header spellings used by the daily bhavcopy and the security-wise archive.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Column::Symbol => &["symbol"],
            Column::Series => &["series"],
            Column::Date => &["date1", "date"],
            Column::DeliveryPct => &["deliv_per", "% dly qt to traded qty"],
            Column::Volume => &["ttl_trd_qnty", "total traded quantity"],
            Column::DeliverableQty => &["deliv_qty", "deliverable qty"],
            Column::Close => &["close_price", "close price", "close"],
        }
    }

    pub fn is_required(&self) -> bool {
        Self::REQUIRED.contains(self)
    }

    pub fn matches(&self, header: &str) -> bool {
        let normalized = normalize_header(header);
        self.aliases().iter().any(|alias| *alias == normalized)
    }

    fn identify(header: &str) -> Option<Column> {
        Self::ALL.into_iter().find(|c| c.matches(header))
    }
}

/// Lower-cases, trims, strips a byte-order mark and collapses inner whitespace.
pub fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Position of each recognised column in a header row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    positions: HashMap<Column, usize>,
}

impl HeaderMap {
    /// The first header cell matching a column wins.
    pub fn resolve<S: AsRef<str>>(header: &[S]) -> Self {
        let mut positions = HashMap::new();
        for (idx, cell) in header.iter().enumerate() {
            if let Some(column) = Column::identify(cell.as_ref()) {
                positions.entry(column).or_insert(idx);
            }
        }
        Self { positions }
    }

    pub fn index(&self, column: Column) -> Option<usize> {
        self.positions.get(&column).copied()
    }

    pub fn has(&self, column: Column) -> bool {
        self.positions.contains_key(&column)
    }

    pub fn missing(&self) -> Vec<Column> {
        Column::REQUIRED
            .into_iter()
            .filter(|c| !self.has(*c))
            .collect()
    }

    pub fn require(self) -> Result<Self, DataError> {
        match self.missing().first() {
            Some(column) => Err(DataError::MissingColumn {
                column: column.as_str(),
            }),
            None => Ok(self),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaReport {
    pub columns: Vec<String>,
    pub missing: Vec<String>,
    pub ok: bool,
    pub message: String,
}

/// Checks a header row for the required columns without touching the data rows.
pub fn validate_schema<S: AsRef<str>>(header: &[S]) -> SchemaReport {
    let map = HeaderMap::resolve(header);
    let missing: Vec<String> = map.missing().iter().map(|c| c.as_str().to_string()).collect();
    let ok = missing.is_empty();
    let message = if ok {
        "schema ok".to_string()
    } else {
        format!("schema mismatch: missing {:?}", missing)
    };
    SchemaReport {
        columns: header.iter().map(|h| h.as_ref().trim().to_string()).collect(),
        missing,
        ok,
        message,
    }
}
