//! Command-line front end: `delivery_scan daily <file.csv>` or
//! `delivery_scan history <file.csv>`.
//!
//! Configuration comes from DELIVERY_THRESHOLD, EXCLUDED_SERIES and
//! LOOKBACK_MONTHS. Writes the dataset manifest to `<file>.manifest.json`
//! next to the input and prints `{manifest, report}` as JSON on stdout.

use anyhow::{Context, Result};
use deliveryscan::data::manifest::{build_manifest, write_manifest, DatasetManifest};
use deliveryscan::data::schema::validate_schema;
use deliveryscan::data::{read_daily, read_historical, split_fields};
use deliveryscan::{filter_daily, logging, scan_series, AnalysisConfig};
use serde_json::{json, Value};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const USAGE: &str = "usage: delivery_scan <daily|history> <file.csv>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Daily,
    History,
}

fn main() {
    logging::init_from_env();

    let args: Vec<String> = env::args().skip(1).collect();
    let (mode, path) = match (args.first().map(String::as_str), args.get(1)) {
        (Some("daily"), Some(p)) => (Mode::Daily, PathBuf::from(p)),
        (Some("history"), Some(p)) => (Mode::History, PathBuf::from(p)),
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(1);
        }
    };

    let cfg = AnalysisConfig::from_env();
    if let Err(err) = cfg.validate() {
        eprintln!("invalid configuration: {}", err);
        std::process::exit(3);
    }

    match check_schema(&path) {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(4);
        }
    }

    let (manifest, report) = match run(mode, &path, &cfg) {
        Ok(out) => out,
        Err(err) => {
            eprintln!("analysis failed: {:#}", err);
            std::process::exit(3);
        }
    };

    match write_manifest(&path, &manifest) {
        Ok(written) => info!(path = %written.display(), "wrote manifest"),
        Err(err) => {
            eprintln!("{}", err);
            std::process::exit(4);
        }
    }

    let payload = json!({
        "manifest": manifest,
        "report": report,
    });

    match serde_json::to_string_pretty(&payload) {
        Ok(text) => println!("{}", text),
        Err(err) => {
            eprintln!("failed to encode report: {}", err);
            std::process::exit(4);
        }
    }
}

fn check_schema(path: &Path) -> Result<bool> {
    let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let header = match text.lines().find(|l| !l.trim().is_empty()) {
        Some(line) => split_fields(line),
        // Empty files flow through as empty results.
        None => return Ok(true),
    };
    let schema = validate_schema(&header);
    if !schema.ok {
        eprintln!("{}", schema.message);
        eprintln!("columns found: {:?}", schema.columns);
    }
    Ok(schema.ok)
}

fn run(mode: Mode, path: &Path, cfg: &AnalysisConfig) -> Result<(DatasetManifest, Value)> {
    let (summary, report) = match mode {
        Mode::Daily => {
            let (summary, snapshot) = read_daily(path)?;
            let report = filter_daily(&snapshot, cfg)?;
            info!(qualifying = report.summary.above_threshold, "daily report ready");
            (summary, serde_json::to_value(&report)?)
        }
        Mode::History => {
            let (summary, series) = read_historical(path)?;
            let report = scan_series(&series, cfg)?;
            let novel: Vec<_> = report.novel_signals().cloned().collect();
            info!(novel = novel.len(), "historical report ready");
            let mut value = serde_json::to_value(&report)?;
            value["novel_signals"] = serde_json::to_value(novel)?;
            (summary, value)
        }
    };
    Ok((build_manifest(path, &summary)?, report))
}
