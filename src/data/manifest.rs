//! Fingerprint of an input file, so a rendered report can name exactly which
//! upload produced it.

use chrono::{NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use super::ParseSummary;
use crate::error::DataError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetManifest {
    pub path: String,
    pub hash_sha256: String,
    pub row_count: usize,
    pub dropped_rows: usize,
    pub date_min: Option<NaiveDate>,
    pub date_max: Option<NaiveDate>,
    pub columns: Vec<String>,
    pub warnings: Vec<String>,
    pub generated_at: String,
}

pub fn build_manifest(path: &Path, summary: &ParseSummary) -> Result<DatasetManifest, DataError> {
    Ok(DatasetManifest {
        path: path.display().to_string(),
        hash_sha256: file_sha256(path)?,
        row_count: summary.row_count,
        dropped_rows: summary.dropped,
        date_min: summary.date_min,
        date_max: summary.date_max,
        columns: summary.columns.clone(),
        warnings: summary_warnings(summary),
        generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    })
}

fn summary_warnings(summary: &ParseSummary) -> Vec<String> {
    let mut warnings = Vec::new();
    if summary.row_count == 0 {
        warnings.push("empty_input".to_string());
    } else if summary.dropped == summary.row_count {
        warnings.push("no_usable_rows".to_string());
    }
    let drops = &summary.drops;
    for (label, count) in [
        ("short_row", drops.short_row),
        ("missing_field", drops.missing_field),
        ("bad_delivery", drops.bad_delivery),
        ("bad_date", drops.bad_date),
    ] {
        if count > 0 {
            warnings.push(format!("dropped {}: {}", label, count));
        }
    }
    if !summary.has_volume && summary.row_count > 0 {
        warnings.push("no_volume_column".to_string());
    }
    warnings
}

pub fn file_sha256(path: &Path) -> Result<String, DataError> {
    let io_err = |source| DataError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::open(path).map_err(io_err)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf).map_err(io_err)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// `<file>.manifest.json` next to the input.
pub fn default_manifest_path(dataset_path: &Path) -> PathBuf {
    let mut p = dataset_path.to_path_buf();
    let fname = dataset_path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("dataset.csv");
    p.set_file_name(format!("{}.manifest.json", fname));
    p
}

/// Writes `manifest` as pretty JSON to [`default_manifest_path`] and returns
/// the path written.
pub fn write_manifest(dataset_path: &Path, manifest: &DatasetManifest) -> Result<PathBuf, DataError> {
    let out_path = default_manifest_path(dataset_path);
    let io_err = |source: std::io::Error| DataError::Io {
        path: out_path.clone(),
        source,
    };
    let bytes = serde_json::to_vec_pretty(manifest).map_err(|e| io_err(e.into()))?;
    fs::write(&out_path, bytes).map_err(io_err)?;
    Ok(out_path)
}
