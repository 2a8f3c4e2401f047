//! Tabular records and the dataset layer
//!
//! Rows travel through the pipeline as dynamic JSON records. This module
//! provides:
//! - [`Record`] and cell classification helpers shared by every stage
//! - CSV loading into records
//! - Synthetic timestamp annotation and dataset metadata
//! - Date-range validation and period slicing

mod loader;
mod metadata;
mod ranges;

pub use loader::DataLoader;
pub use metadata::{annotate_timestamps, DatasetMetadata, TIMESTAMP_FORMAT};
pub use ranges::{
    monthly_counts, parse_timestamp, DailyCount, DateRanges, MonthlyCount, Period, PeriodSummary,
    RangeReport, RangeStatus,
};

use serde_json::Value;
use std::collections::HashSet;

/// One input row: field name to raw JSON value, in insertion order
pub type Record = serde_json::Map<String, Value>;

/// How a single cell reads once coerced towards a number
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell {
    /// Absent key, `null`, blank or NA-like string, or a non-finite number
    Missing,
    /// A finite number (JSON number or numeric string)
    Number(f64),
    /// Anything that cannot be read as a number
    Text,
}

const NA_TOKENS: [&str; 5] = ["na", "nan", "null", "none", "n/a"];

/// Classify a cell for numeric use
pub fn classify(value: Option<&Value>) -> Cell {
    match value {
        None | Some(Value::Null) => Cell::Missing,
        Some(Value::Number(n)) => match n.as_f64() {
            Some(v) if v.is_finite() => Cell::Number(v),
            _ => Cell::Missing,
        },
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() || NA_TOKENS.contains(&trimmed.to_ascii_lowercase().as_str()) {
                return Cell::Missing;
            }
            match trimmed.parse::<f64>() {
                Ok(v) if v.is_finite() => Cell::Number(v),
                Ok(_) => Cell::Missing,
                Err(_) => Cell::Text,
            }
        }
        Some(_) => Cell::Text,
    }
}

/// Read a binary label (0 or 1) from a cell
pub fn parse_label(value: Option<&Value>) -> Option<f64> {
    match value {
        Some(Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
        Some(Value::String(s)) if s.trim().eq_ignore_ascii_case("true") => Some(1.0),
        Some(Value::String(s)) if s.trim().eq_ignore_ascii_case("false") => Some(0.0),
        other => match classify(other) {
            Cell::Number(v) if v == 0.0 || v == 1.0 => Some(v),
            _ => None,
        },
    }
}

/// Column names in order of first appearance across the rows
pub fn column_names(rows: &[Record]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for row in rows {
        for key in row.keys() {
            if seen.insert(key.as_str()) {
                names.push(key.clone());
            }
        }
    }
    names
}

/// First column whose name matches `name` case-insensitively
pub fn find_column(rows: &[Record], name: &str) -> Option<String> {
    column_names(rows)
        .into_iter()
        .find(|c| c.eq_ignore_ascii_case(name))
}

/// Render a cell as plain text (strings unquoted, null as empty)
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
