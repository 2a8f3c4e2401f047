//! Result payloads returned by the orchestrator

use crate::dataset::Record;
use crate::ensemble::Verdict;
use crate::training::ModelMetrics;
use serde::{Deserialize, Serialize};

/// Outcome of an orchestrator operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Success,
    Error,
    Invalid,
}

/// Summary of one train call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingResult {
    pub status: RunStatus,
    pub message: String,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confusion_matrix: Option<[[usize; 2]; 2]>,
    pub train_rows: usize,
    pub test_rows: usize,
    pub features: Vec<String>,
}

impl TrainingResult {
    /// Failed train call with zeroed metrics
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Error,
            message: message.into(),
            accuracy: 0.0,
            precision: 0.0,
            recall: 0.0,
            f1_score: 0.0,
            confusion_matrix: None,
            train_rows: 0,
            test_rows: 0,
            features: Vec::new(),
        }
    }

    pub fn success(metrics: &ModelMetrics, train_rows: usize, test_rows: usize, features: Vec<String>) -> Self {
        Self {
            status: RunStatus::Success,
            message: format!(
                "Stacking model trained on {} rows, tested on {} rows",
                train_rows, test_rows
            ),
            accuracy: metrics.accuracy,
            precision: metrics.precision,
            recall: metrics.recall,
            f1_score: metrics.f1_score,
            confusion_matrix: Some(metrics.confusion_matrix),
            train_rows,
            test_rows,
            features,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }
}

/// Decision for one input row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_id: Option<String>,
    pub prediction: Verdict,
    /// Positive-class probability as a percentage, two decimals
    pub confidence: f64,
    #[serde(flatten)]
    pub passthrough: Record,
}

/// Probability to a 0-100 confidence rounded to two decimals
pub fn confidence_percent(probability: f64) -> f64 {
    (probability * 100.0 * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationStats {
    pub total: usize,
    pub pass: usize,
    pub fail: usize,
    pub average_confidence: f64,
}

impl SimulationStats {
    pub fn from_predictions(predictions: &[Prediction]) -> Self {
        let total = predictions.len();
        let pass = predictions.iter().filter(|p| p.prediction.is_pass()).count();
        let average_confidence = if total > 0 {
            predictions.iter().map(|p| p.confidence).sum::<f64>() / total as f64
        } else {
            0.0
        };
        Self {
            total,
            pass,
            fail: total - pass,
            average_confidence,
        }
    }
}

/// Predictions over a simulation period plus their summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub rows: Vec<Prediction>,
    pub stats: SimulationStats,
    pub status: RunStatus,
    pub message: String,
}

impl SimulationReport {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            rows: Vec::new(),
            stats: SimulationStats::default(),
            status: RunStatus::Invalid,
            message: message.into(),
        }
    }

    pub fn success(rows: Vec<Prediction>) -> Self {
        let stats = SimulationStats::from_predictions(&rows);
        let message = format!("Simulated {} rows", stats.total);
        Self {
            rows,
            stats,
            status: RunStatus::Success,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn prediction(verdict: Verdict, confidence: f64) -> Prediction {
        Prediction {
            timestamp: "2021-01-01 00:00:00".to_string(),
            sample_id: None,
            prediction: verdict,
            confidence,
            passthrough: Record::new(),
        }
    }

    #[test]
    fn test_error_result_is_zeroed() {
        let result = TrainingResult::error("No response column found");
        assert_eq!(result.status, RunStatus::Error);
        assert_eq!(result.accuracy, 0.0);
        assert_eq!(result.f1_score, 0.0);
        assert!(result.confusion_matrix.is_none());
    }

    #[test]
    fn test_training_result_camel_case() {
        let value = serde_json::to_value(TrainingResult::error("x")).unwrap();
        assert!(value.get("f1Score").is_some());
        assert!(value.get("trainRows").is_some());
        assert!(value.get("confusionMatrix").is_none());
    }

    #[test]
    fn test_confidence_rounding() {
        assert_eq!(confidence_percent(0.123456), 12.35);
        assert_eq!(confidence_percent(1.0), 100.0);
    }

    #[test]
    fn test_prediction_flattens_passthrough() {
        let mut p = prediction(Verdict::Pass, 81.5);
        p.sample_id = Some("7".to_string());
        p.passthrough.insert("temperature".to_string(), json!(21.5));

        let value = serde_json::to_value(&p).unwrap();
        assert_eq!(value["prediction"], "Pass");
        assert_eq!(value["sample_id"], "7");
        assert_eq!(value["temperature"], 21.5);
    }

    #[test]
    fn test_stats_sum_to_total() {
        let rows = vec![
            prediction(Verdict::Pass, 90.0),
            prediction(Verdict::Fail, 10.0),
            prediction(Verdict::Pass, 80.0),
        ];
        let stats = SimulationStats::from_predictions(&rows);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.pass + stats.fail, stats.total);
        assert!((stats.average_confidence - 60.0).abs() < 1e-12);
        assert_eq!(SimulationReport::success(rows).message, "Simulated 3 rows");
    }
}
