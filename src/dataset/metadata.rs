//! Dataset metadata and synthetic timestamps

use super::{column_names, find_column, parse_label, parse_timestamp, Record};
use crate::error::{Result, StackfoldError};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Timestamp layout used for synthetic and rendered timestamps
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn synthetic_origin() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2021, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Give every row a timestamp one second apart, starting 2021-01-01 00:00:00.
///
/// Rows are left untouched when any of them already carries `column`.
/// Returns whether timestamps were added.
pub fn annotate_timestamps(rows: &mut [Record], column: &str) -> bool {
    if rows.iter().any(|r| r.contains_key(column)) {
        return false;
    }
    let origin = synthetic_origin();
    for (i, row) in rows.iter_mut().enumerate() {
        let ts = origin + Duration::seconds(i as i64);
        row.insert(
            column.to_string(),
            Value::String(ts.format(TIMESTAMP_FORMAT).to_string()),
        );
    }
    true
}

/// Summary of an uploaded dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetMetadata {
    pub total_records: usize,
    pub total_columns: usize,
    /// Fraction of rows whose target equals 1
    pub pass_rate: f64,
    pub start_timestamp: Option<NaiveDateTime>,
    pub end_timestamp: Option<NaiveDateTime>,
}

impl DatasetMetadata {
    /// Summarise rows; the target column must exist (matched case-insensitively)
    pub fn from_rows(rows: &[Record], target: &str, timestamp_column: &str) -> Result<Self> {
        let target_col = find_column(rows, target)
            .ok_or_else(|| StackfoldError::MissingTarget(target.to_string()))?;

        let total = rows.len();
        let passes = rows
            .iter()
            .filter(|r| parse_label(r.get(&target_col)) == Some(1.0))
            .count();

        let timestamps: Vec<NaiveDateTime> = rows
            .iter()
            .filter_map(|r| r.get(timestamp_column))
            .filter_map(|v| parse_timestamp(&super::value_to_string(v)).ok())
            .collect();

        Ok(Self {
            total_records: total,
            total_columns: column_names(rows).len(),
            pass_rate: if total > 0 { passes as f64 / total as f64 } else { 0.0 },
            start_timestamp: timestamps.iter().min().copied(),
            end_timestamp: timestamps.iter().max().copied(),
        })
    }
}
