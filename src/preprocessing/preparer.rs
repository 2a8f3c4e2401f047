//! Feature selection and sentinel imputation
//!
//! The preparer decides, from the training rows alone, which columns feed the
//! models. The resulting [`FeatureSet`] is the only thing prediction needs to
//! rebuild an identical numeric matrix from new rows.

use super::PreparerConfig;
use crate::dataset::{classify, column_names, find_column, parse_label, Cell, Record};
use crate::error::{Result, StackfoldError};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Position of a row in the batch it arrived in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowId(pub usize);

/// Rows paired with their binary labels
#[derive(Debug, Clone)]
pub struct LabelledRows {
    pub rows: Vec<Record>,
    pub labels: Vec<f64>,
}

impl LabelledRows {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows per class as `(negatives, positives)`
    pub fn class_counts(&self) -> (usize, usize) {
        let pos = self.labels.iter().filter(|&&y| y > 0.5).count();
        (self.labels.len() - pos, pos)
    }

    pub fn label_array(&self) -> Array1<f64> {
        Array1::from_vec(self.labels.clone())
    }
}

/// Why a column was left out of the feature set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnDecision {
    Kept,
    Excluded,
    TooSparse { missing_fraction: f64 },
    NonNumeric,
}

/// Ordered feature columns plus the fill value used for them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    columns: Vec<String>,
    sentinel: f64,
}

impl FeatureSet {
    pub fn new(columns: Vec<String>, sentinel: f64) -> Self {
        Self { columns, sentinel }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn sentinel(&self) -> f64 {
        self.sentinel
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Build the numeric matrix over exactly these columns.
    ///
    /// Absent columns and cells that are missing or not numeric become the
    /// sentinel; no row is ever rejected.
    pub fn transform(&self, rows: &[Record]) -> PreparedFrame {
        let mut x = Array2::from_elem((rows.len(), self.columns.len()), self.sentinel);
        for (i, row) in rows.iter().enumerate() {
            for (j, column) in self.columns.iter().enumerate() {
                if let Cell::Number(v) = classify(row.get(column)) {
                    x[[i, j]] = v;
                }
            }
        }
        PreparedFrame {
            row_ids: (0..rows.len()).map(RowId).collect(),
            x,
        }
    }
}

/// Numeric matrix with the identifier of the input row behind each matrix row
#[derive(Debug, Clone)]
pub struct PreparedFrame {
    pub row_ids: Vec<RowId>,
    pub x: Array2<f64>,
}

impl PreparedFrame {
    pub fn n_rows(&self) -> usize {
        self.x.nrows()
    }
}

/// Selects usable numeric columns and fills gaps with the sentinel
#[derive(Debug, Clone, Default)]
pub struct FeaturePreparer {
    config: PreparerConfig,
}

impl FeaturePreparer {
    pub fn new(config: PreparerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PreparerConfig {
        &self.config
    }

    /// Locate the target column by case-insensitive name
    pub fn resolve_target(&self, rows: &[Record]) -> Result<String> {
        find_column(rows, &self.config.target_column)
            .ok_or_else(|| StackfoldError::MissingTarget(self.config.target_column.clone()))
    }

    /// Keep rows with a readable 0/1 label; the rest are skipped
    pub fn labelled(&self, rows: &[Record], target: &str) -> LabelledRows {
        let mut kept = Vec::with_capacity(rows.len());
        let mut labels = Vec::with_capacity(rows.len());
        let mut skipped = 0usize;
        for row in rows {
            match parse_label(row.get(target)) {
                Some(y) => {
                    kept.push(row.clone());
                    labels.push(y);
                }
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!(skipped, target, "Skipped rows without a readable label");
        }
        LabelledRows { rows: kept, labels }
    }

    /// Decide the retention of every column seen in `rows`
    pub fn column_decisions(&self, rows: &[Record]) -> Vec<(String, ColumnDecision)> {
        let n = rows.len().max(1) as f64;
        column_names(rows)
            .into_iter()
            .map(|name| {
                if self.config.is_excluded(&name) {
                    return (name, ColumnDecision::Excluded);
                }
                let mut missing = 0usize;
                let mut numbers = 0usize;
                let mut text = 0usize;
                for row in rows {
                    match classify(row.get(&name)) {
                        Cell::Missing => missing += 1,
                        Cell::Number(_) => numbers += 1,
                        Cell::Text => text += 1,
                    }
                }
                let missing_fraction = missing as f64 / n;
                let decision = if missing_fraction > self.config.missing_threshold {
                    ColumnDecision::TooSparse { missing_fraction }
                } else if text > 0 || numbers == 0 {
                    ColumnDecision::NonNumeric
                } else {
                    ColumnDecision::Kept
                };
                (name, decision)
            })
            .collect()
    }

    /// Select the feature set from the training rows
    pub fn fit(&self, rows: &[Record]) -> Result<FeatureSet> {
        if rows.is_empty() {
            return Err(StackfoldError::PreprocessingError(
                "No training rows to select features from".to_string(),
            ));
        }

        let mut columns = Vec::new();
        for (name, decision) in self.column_decisions(rows) {
            match decision {
                ColumnDecision::Kept => columns.push(name),
                ColumnDecision::Excluded => {}
                ColumnDecision::TooSparse { missing_fraction } => {
                    debug!(column = %name, missing_fraction, "Dropped sparse column");
                }
                ColumnDecision::NonNumeric => {
                    debug!(column = %name, "Dropped non-numeric column");
                }
            }
        }

        if columns.is_empty() {
            return Err(StackfoldError::PreprocessingError(
                "No usable numeric feature columns".to_string(),
            ));
        }

        info!(features = columns.len(), rows = rows.len(), "Selected feature columns");
        Ok(FeatureSet::new(columns, self.config.sentinel))
    }

    /// Numeric matrix for `rows` over `feature_set`
    pub fn transform(&self, rows: &[Record], feature_set: &FeatureSet) -> PreparedFrame {
        feature_set.transform(rows)
    }
}
