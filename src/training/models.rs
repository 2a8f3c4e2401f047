//! Classifier capability and evaluation metrics

use crate::error::{Result, StackfoldError};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Binary classification metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    /// `[[tn, fp], [fn, tp]]`, rows are true labels, columns predictions
    pub confusion_matrix: [[usize; 2]; 2],
    pub n_samples: usize,
}

impl ModelMetrics {
    /// All-zero metrics, reported when training could not run
    pub fn zeroed() -> Self {
        Self::default()
    }

    /// Compute classification metrics for 0/1 labels.
    ///
    /// Precision, recall and F1 are 0 when their denominator is 0.
    pub fn compute_classification(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(StackfoldError::ShapeError {
                expected: format!("{} predictions", y_true.len()),
                actual: format!("{} predictions", y_pred.len()),
            });
        }

        let (tp, fp, tn, fn_) = Self::confusion_counts(y_true, y_pred);
        let n = y_true.len();

        let accuracy = if n > 0 { (tp + tn) as f64 / n as f64 } else { 0.0 };
        let precision = if tp + fp > 0 { tp as f64 / (tp + fp) as f64 } else { 0.0 };
        let recall = if tp + fn_ > 0 { tp as f64 / (tp + fn_) as f64 } else { 0.0 };
        let f1_score = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Ok(Self {
            accuracy,
            precision,
            recall,
            f1_score,
            confusion_matrix: [[tn, fp], [fn_, tp]],
            n_samples: n,
        })
    }

    fn confusion_counts(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> (usize, usize, usize, usize) {
        let mut tp = 0;
        let mut fp = 0;
        let mut tn = 0;
        let mut fn_ = 0;

        for (t, p) in y_true.iter().zip(y_pred.iter()) {
            match (*t > 0.5, *p > 0.5) {
                (true, true) => tp += 1,
                (false, true) => fp += 1,
                (false, false) => tn += 1,
                (true, false) => fn_ += 1,
            }
        }

        (tp, fp, tn, fn_)
    }
}

/// Capability shared by every learner in the ensemble
pub trait Classifier: Send + Sync {
    /// Fit to a numeric matrix and 0/1 labels
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Probability of the positive class for each row
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Hard 0/1 predictions at a 0.5 cutoff
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.predict_proba(x)?.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }
}

/// Reject empty or mismatched training input
pub(crate) fn check_fit_input(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() == 0 {
        return Err(StackfoldError::TrainingError("Empty dataset".into()));
    }
    if x.nrows() != y.len() {
        return Err(StackfoldError::ShapeError {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    Ok(())
}

/// Reject prediction input whose width differs from training
pub(crate) fn check_predict_input(x: &Array2<f64>, n_features: usize) -> Result<()> {
    if x.ncols() != n_features {
        return Err(StackfoldError::ShapeError {
            expected: format!("{} features", n_features),
            actual: format!("{} features", x.ncols()),
        });
    }
    Ok(())
}

/// Log-odds of the positive rate, clamped away from 0 and 1
pub(crate) fn base_log_odds(y: &Array1<f64>) -> f64 {
    let p = y.mean().unwrap_or(0.5).clamp(1e-7, 1.0 - 1e-7);
    (p / (1.0 - p)).ln()
}

pub(crate) fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
