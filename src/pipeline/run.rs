//! A fully trained pipeline, immutable once published

use crate::dataset::Record;
use crate::ensemble::{stack_features, FittedLearner, MetaClassifier};
use crate::error::Result;
use crate::preprocessing::{FeatureSet, PreparedFrame};
use crate::training::ModelMetrics;
use chrono::{DateTime, Utc};
use ndarray::Array1;

/// Everything prediction needs, produced by one train call
#[derive(Debug)]
pub struct TrainingRun {
    /// Threshold the train call was made with
    pub threshold: f64,
    /// Target column as spelled in the training rows
    pub target_column: String,
    pub feature_set: FeatureSet,
    /// Production learners in stacking column order
    pub learners: Vec<FittedLearner>,
    pub meta: MetaClassifier,
    pub metrics: ModelMetrics,
    pub trained_at: DateTime<Utc>,
}

impl TrainingRun {
    pub fn learner_names(&self) -> Vec<&str> {
        self.learners.iter().map(|l| l.name.as_str()).collect()
    }

    /// Meta-level positive probability for each row, keyed by row id
    pub fn predict_proba(&self, rows: &[Record]) -> Result<(PreparedFrame, Array1<f64>)> {
        let frame = self.feature_set.transform(rows);
        let stacked = stack_features(&self.learners, &frame.x)?;
        let proba = self.meta.predict_proba(&stacked)?;
        Ok((frame, proba))
    }
}
