//! Data loading utilities

use super::Record;
use crate::error::{Result, StackfoldError};
use polars::prelude::*;
use serde_json::Value;
use std::fs::File;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Loads CSV or JSON files into dynamic records
pub struct DataLoader {
    /// Rows used for CSV schema inference
    infer_schema_length: usize,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Create a new data loader
    pub fn new() -> Self {
        Self {
            infer_schema_length: 1000,
        }
    }

    /// Set number of rows scanned for schema inference
    pub fn with_infer_schema_length(mut self, rows: usize) -> Self {
        self.infer_schema_length = rows.max(1);
        self
    }

    /// Load a file, choosing the reader from its extension
    pub fn load(&self, path: &Path) -> Result<Vec<Record>> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => self.load_csv(path),
            Some(ext) if ext.eq_ignore_ascii_case("json") => self.load_json(path),
            _ => Err(StackfoldError::InvalidInput(format!(
                "Unsupported file format: {}. Use CSV or JSON.",
                path.display()
            ))),
        }
    }

    /// Load a CSV file
    pub fn load_csv(&self, path: &Path) -> Result<Vec<Record>> {
        let start = Instant::now();
        let file = File::open(path).map_err(|e| StackfoldError::DataError(e.to_string()))?;

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(self.infer_schema_length))
            .into_reader_with_file_handle(file)
            .finish()?;

        let records = frame_to_records(&df)?;
        info!(
            path = %path.display(),
            rows = records.len(),
            columns = df.width(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded CSV"
        );
        Ok(records)
    }

    /// Load a JSON array of objects
    pub fn load_json(&self, path: &Path) -> Result<Vec<Record>> {
        let text = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&text)?;
        let rows = match value {
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(map) => Ok(map),
                    other => Err(StackfoldError::DataError(format!(
                        "Expected an object per row, found {}",
                        other
                    ))),
                })
                .collect::<Result<Vec<_>>>()?,
            _ => {
                return Err(StackfoldError::DataError(
                    "Expected a JSON array of rows".to_string(),
                ))
            }
        };
        info!(path = %path.display(), rows = rows.len(), "Loaded JSON");
        Ok(rows)
    }
}

/// Convert a polars frame into records, one per row
pub fn frame_to_records(df: &DataFrame) -> Result<Vec<Record>> {
    let columns = df.get_columns();
    let names: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();

    let mut records = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let mut record = Record::new();
        for (name, col) in names.iter().zip(columns.iter()) {
            record.insert(name.clone(), any_value_to_json(col.get(i)?));
        }
        records.push(record);
    }
    Ok(records)
}

fn any_value_to_json(value: AnyValue) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(v) => Value::Bool(v),
        AnyValue::Int8(v) => Value::from(v),
        AnyValue::Int16(v) => Value::from(v),
        AnyValue::Int32(v) => Value::from(v),
        AnyValue::Int64(v) => Value::from(v),
        AnyValue::UInt8(v) => Value::from(v),
        AnyValue::UInt16(v) => Value::from(v),
        AnyValue::UInt32(v) => Value::from(v),
        AnyValue::UInt64(v) => Value::from(v),
        AnyValue::Float32(v) => float_to_json(v as f64),
        AnyValue::Float64(v) => float_to_json(v),
        AnyValue::String(v) => Value::String(v.to_string()),
        other => Value::String(other.to_string()),
    }
}

fn float_to_json(v: f64) -> Value {
    serde_json::Number::from_f64(v)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}
