//! Crude assay sheet import
//!
//! Scans a directory of plain-text assay sheets and loads the crudes they
//! describe into the catalog. Sheets are loosely formatted, e.g.
//!
//! ```text
//! Crude: Merey 16
//! API gravity: 16.0
//! Sulfur: 2.45 wt%
//! Price: $62.50
//! Transport: 3.10
//! Opex: 5.20
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;
use rusqlite::Connection;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::db;
use crate::models::CrudeOption;

const NUMBER: &str = r"(\d+(?:\.\d+)?)";

struct AssayPatterns {
    name: Regex,
    api: Regex,
    api_suffix: Regex,
    sulfur: Regex,
    price: Regex,
    transport: Regex,
    operational: Regex,
}

impl AssayPatterns {
    fn new() -> Result<Self> {
        Ok(Self {
            name: Regex::new(r"(?im)^\s*(?:name|crude)\s*[:=]\s*(.+?)\s*$")?,
            // API: 31.2 / API gravity = 31.2
            api: Regex::new(&format!(r"(?im)^\s*API(?:\s+gravity)?\s*[:=]\s*{NUMBER}"))?,
            // 31.2 °API
            api_suffix: Regex::new(&format!(r"(?i){NUMBER}\s*°\s*API\b"))?,
            sulfur: Regex::new(&format!(
                r"(?im)^\s*(?:sulfur|sulphur|S\s*wt\s*%)(?:\s+content)?\s*[:=]?\s*{NUMBER}"
            ))?,
            price: Regex::new(&format!(
                r"(?im)^\s*(?:purchase\s+)?price\s*[:=]\s*\$?\s*{NUMBER}"
            ))?,
            transport: Regex::new(&format!(
                r"(?im)^\s*transport(?:\s+cost)?\s*[:=]\s*\$?\s*{NUMBER}"
            ))?,
            operational: Regex::new(&format!(
                r"(?im)^\s*(?:operational(?:\s+cost)?|opex)\s*[:=]\s*\$?\s*{NUMBER}"
            ))?,
        })
    }
}

fn capture_number(re: &Regex, content: &str) -> Result<Option<f64>> {
    match re.captures(content) {
        Some(cap) => {
            let value = cap[1]
                .parse::<f64>()
                .with_context(|| format!("Bad number '{}'", &cap[1]))?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

/// Find all assay sheets under `dir`
pub fn find_assay_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        let is_sheet = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("assay") || ext.eq_ignore_ascii_case("txt"));
        if entry.file_type().is_file() && is_sheet {
            files.push(path.to_path_buf());
        }
    }

    Ok(files)
}

/// Parse one assay sheet. Sheets without a name, API gravity or sulfur are
/// not crude assays and yield `None`. Missing costs read as zero.
fn parse_assay(patterns: &AssayPatterns, content: &str) -> Result<Option<CrudeOption>> {
    let Some(name) = patterns.name.captures(content).map(|c| c[1].to_string()) else {
        return Ok(None);
    };
    let api = match capture_number(&patterns.api, content)? {
        Some(v) => Some(v),
        None => capture_number(&patterns.api_suffix, content)?,
    };
    let Some(api) = api else {
        return Ok(None);
    };
    let Some(sulfur) = capture_number(&patterns.sulfur, content)? else {
        return Ok(None);
    };

    let crude = CrudeOption {
        name,
        api,
        sulfur,
        purchase_price: capture_number(&patterns.price, content)?.unwrap_or(0.0),
        transport_cost: capture_number(&patterns.transport, content)?.unwrap_or(0.0),
        operational_cost: capture_number(&patterns.operational, content)?.unwrap_or(0.0),
    };
    crude.validate()?;
    Ok(Some(crude))
}

fn parse_assay_file(patterns: &AssayPatterns, filepath: &Path) -> Result<Option<CrudeOption>> {
    let content = fs::read_to_string(filepath)
        .with_context(|| format!("Failed to read {}", filepath.display()))?;
    parse_assay(patterns, &content)
}

/// Import all assay sheets under `dir` into the catalog
pub fn extract_to_database(conn: &Connection, dir: &Path) -> Result<ExtractStats> {
    let mut stats = ExtractStats::default();
    let patterns = AssayPatterns::new()?;

    info!(dir = %dir.display(), "scanning for assay sheets");
    let files = find_assay_files(dir)?;
    info!(count = files.len(), "found candidate assay sheets");

    for filepath in &files {
        match parse_assay_file(&patterns, filepath) {
            Ok(Some(crude)) => {
                db::upsert_crude(conn, &crude)?;
                stats.crudes += 1;
                info!(
                    crude = %crude.name,
                    api = crude.api,
                    sulfur = crude.sulfur,
                    "imported assay"
                );
            }
            Ok(None) => {
                stats.skipped += 1;
            }
            Err(e) => {
                warn!(file = %filepath.display(), error = %e, "failed to parse assay");
                stats.errors += 1;
            }
        }
    }

    Ok(stats)
}

#[derive(Debug, Default, PartialEq)]
pub struct ExtractStats {
    pub crudes: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl std::fmt::Display for ExtractStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Imported {} crudes. Skipped: {}, Errors: {}",
            self.crudes, self.skipped, self.errors
        )
    }
}
