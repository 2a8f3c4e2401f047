//! Date-range validation and period slicing
//!
//! A dataset is split chronologically into a training, a testing and a
//! simulation period. Periods are inclusive on both ends and must follow one
//! another without overlap.

use super::{value_to_string, Record};
use crate::error::Result;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parse `YYYY-MM-DD HH:MM:SS`, its `T`-separated and fractional forms, or a bare date
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(ts);
        }
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")?;
    Ok(date.and_hms_opt(0, 0, 0).unwrap_or_default())
}

/// Inclusive time period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Period {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        ts >= self.start && ts <= self.end
    }

    /// Whole days spanned, counting both ends
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// `YYYY-MM-DD to YYYY-MM-DD`
    pub fn label(&self) -> String {
        format!(
            "{} to {}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }

    /// Rows whose timestamp falls inside the period, ordered by timestamp
    pub fn slice(&self, rows: &[Record], timestamp_column: &str) -> Vec<Record> {
        let mut selected: Vec<(NaiveDateTime, &Record)> = rows
            .iter()
            .filter_map(|r| row_timestamp(r, timestamp_column).map(|ts| (ts, r)))
            .filter(|(ts, _)| self.contains(*ts))
            .collect();
        selected.sort_by_key(|(ts, _)| *ts);
        selected.into_iter().map(|(_, r)| r.clone()).collect()
    }

    fn count(&self, timestamps: &[NaiveDateTime]) -> usize {
        timestamps.iter().filter(|ts| self.contains(**ts)).count()
    }
}

/// Records per calendar month, ascending; rows without a readable timestamp are skipped
pub fn monthly_counts(rows: &[Record], timestamp_column: &str) -> Vec<MonthlyCount> {
    let timestamps: Vec<NaiveDateTime> = rows
        .iter()
        .filter_map(|r| row_timestamp(r, timestamp_column))
        .collect();
    count_by(&timestamps, "%Y-%m")
        .into_iter()
        .map(|(month, records)| MonthlyCount { month, records })
        .collect()
}

fn count_by(timestamps: &[NaiveDateTime], fmt: &str) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for ts in timestamps {
        *counts.entry(ts.format(fmt).to_string()).or_insert(0) += 1;
    }
    counts
}

fn row_timestamp(row: &Record, column: &str) -> Option<NaiveDateTime> {
    row.get(column)
        .and_then(|v| parse_timestamp(&value_to_string(v)).ok())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangeStatus {
    Valid,
    Invalid,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub records: usize,
    pub days: i64,
    pub range: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyCount {
    pub month: String,
    pub records: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: String,
    pub records: usize,
}

/// Outcome of validating [`DateRanges`] against a dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeReport {
    pub status: RangeStatus,
    pub message: String,
    pub training: PeriodSummary,
    pub testing: PeriodSummary,
    pub simulation: PeriodSummary,
    pub monthly_counts: Vec<MonthlyCount>,
    pub daily_counts: Vec<DailyCount>,
}

impl RangeReport {
    fn invalid(message: &str) -> Self {
        Self {
            status: RangeStatus::Invalid,
            message: message.to_string(),
            training: PeriodSummary::default(),
            testing: PeriodSummary::default(),
            simulation: PeriodSummary::default(),
            monthly_counts: Vec::new(),
            daily_counts: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status == RangeStatus::Valid
    }
}

/// Training, testing and simulation periods
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DateRanges {
    pub training: Period,
    pub testing: Period,
    pub simulation: Period,
}

impl DateRanges {
    /// Check ordering, overlap and dataset bounds, and count records per period
    pub fn validate(&self, rows: &[Record], timestamp_column: &str) -> RangeReport {
        let timestamps: Vec<NaiveDateTime> = rows
            .iter()
            .filter_map(|r| row_timestamp(r, timestamp_column))
            .collect();

        let (min, max) = match (timestamps.iter().min(), timestamps.iter().max()) {
            (Some(min), Some(max)) => (*min, *max),
            _ => return RangeReport::invalid("Dataset has no timestamped rows."),
        };

        let periods = [self.training, self.testing, self.simulation];
        if periods.iter().any(|p| p.start > p.end) {
            return RangeReport::invalid("One or more ranges have start date after end date.");
        }

        if !(self.training.end < self.testing.start && self.testing.end < self.simulation.start) {
            return RangeReport::invalid("Ranges must be sequential and non-overlapping.");
        }

        if self.training.start < min || self.simulation.end > max {
            return RangeReport::invalid("Selected ranges fall outside dataset bounds.");
        }


        let summary = |p: &Period| PeriodSummary {
            records: p.count(&timestamps),
            days: p.days(),
            range: p.label(),
        };

        RangeReport {
            status: RangeStatus::Valid,
            message: "Date ranges validated successfully.".to_string(),
            training: summary(&self.training),
            testing: summary(&self.testing),
            simulation: summary(&self.simulation),
            monthly_counts: count_by(&timestamps, "%Y-%m")
                .into_iter()
                .map(|(month, records)| MonthlyCount { month, records })
                .collect(),
            daily_counts: count_by(&timestamps, "%Y-%m-%d")
                .into_iter()
                .map(|(date, records)| DailyCount { date, records })
                .collect(),
        }
    }
}
