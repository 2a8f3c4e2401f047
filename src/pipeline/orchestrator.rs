//! Train, predict and simulate over a single live training run

use super::config::PipelineConfig;
use super::results::{confidence_percent, Prediction, SimulationReport, TrainingResult};
use super::run::TrainingRun;
use crate::dataset::{find_column, value_to_string, Record};
use crate::ensemble::{BaseLearnerEnsemble, MetaClassifier, OofStacker, ThresholdDecider};
use crate::error::{Result, StackfoldError};
use crate::preprocessing::{ClassBalancer, FeaturePreparer};
use crate::training::ModelMetrics;
use chrono::Utc;
use ndarray::Array1;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Owns the live [`TrainingRun`] and the shared decision threshold.
///
/// Train calls are serialised and publish a complete run in one swap;
/// predictions read a snapshot of whichever run was live when they started.
pub struct TrainingOrchestrator {
    config: PipelineConfig,
    ensemble: BaseLearnerEnsemble,
    live: RwLock<Option<Arc<TrainingRun>>>,
    threshold: RwLock<f64>,
    train_lock: Mutex<()>,
}

impl Default for TrainingOrchestrator {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl TrainingOrchestrator {
    pub fn new(config: PipelineConfig) -> Self {
        let ensemble = BaseLearnerEnsemble::from_config(&config.learners);
        let threshold = config.default_threshold;
        Self {
            config,
            ensemble,
            live: RwLock::new(None),
            threshold: RwLock::new(threshold),
            train_lock: Mutex::new(()),
        }
    }

    /// Replace the base learners
    pub fn with_ensemble(mut self, ensemble: BaseLearnerEnsemble) -> Self {
        self.ensemble = ensemble;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Threshold applied by every prediction
    pub fn threshold(&self) -> f64 {
        *self.threshold.read()
    }

    /// Snapshot of the live run, if any
    pub fn current_run(&self) -> Option<Arc<TrainingRun>> {
        self.live.read().clone()
    }

    pub fn is_trained(&self) -> bool {
        self.live.read().is_some()
    }

    /// Train a new stacked model and publish it.
    ///
    /// A missing target column yields an `Error` result with zeroed metrics.
    /// Degenerate folds and learner failures are returned as `Err` and leave
    /// the previous run live.
    pub fn train(
        &self,
        train_rows: &[Record],
        test_rows: &[Record],
        threshold: f64,
        downsample: bool,
    ) -> Result<TrainingResult> {
        let _guard = self.train_lock.lock();
        *self.threshold.write() = threshold;

        let start = Instant::now();
        let preparer = FeaturePreparer::new(self.config.preparer.clone());

        let target = match preparer.resolve_target(train_rows) {
            Ok(target) => target,
            Err(err @ StackfoldError::MissingTarget(_)) => {
                warn!(rows = train_rows.len(), "Training rows have no target column");
                return Ok(TrainingResult::error(err.to_string()));
            }
            Err(err) => return Err(err),
        };

        let mut train = preparer.labelled(train_rows, &target);
        if train.is_empty() {
            return Ok(TrainingResult::error(format!(
                "No training rows with a readable {} label",
                target
            )));
        }
        if downsample {
            train = ClassBalancer::new(self.config.balance.clone()).balance(train)?;
        }

        let Some(test_target) = find_column(test_rows, &self.config.preparer.target_column) else {
            return Ok(TrainingResult::error(format!("No {} column found in test rows", target)));
        };
        let test = preparer.labelled(test_rows, &test_target);
        if test.is_empty() {
            return Ok(TrainingResult::error(format!(
                "No test rows with a readable {} label",
                test_target
            )));
        }

        let feature_set = preparer.fit(&train.rows)?;
        let train_frame = feature_set.transform(&train.rows);
        let test_frame = feature_set.transform(&test.rows);
        let y_train = train.label_array();
        let y_test = test.label_array();

        let stacker = OofStacker::new(self.config.stacking.clone());
        let stacked = stacker.stack(&self.ensemble, &train_frame.x, &y_train, &test_frame.x)?;

        let mut meta = MetaClassifier::new(&self.config.meta);
        meta.fit(&stacked.oof, &y_train)?;

        let proba = meta.predict_proba(&stacked.stacked_test)?;
        let y_pred: Array1<f64> = proba
            .iter()
            .map(|&p| ThresholdDecider::decide(p, threshold).as_label())
            .collect();
        let metrics = ModelMetrics::compute_classification(&y_test, &y_pred)?;

        let result = TrainingResult::success(
            &metrics,
            train.len(),
            test.len(),
            feature_set.columns().to_vec(),
        );

        let run = TrainingRun {
            threshold,
            target_column: target,
            feature_set,
            learners: stacked.learners,
            meta,
            metrics,
            trained_at: Utc::now(),
        };
        *self.live.write() = Some(Arc::new(run));

        info!(
            train_rows = result.train_rows,
            test_rows = result.test_rows,
            features = result.features.len(),
            accuracy = result.accuracy,
            f1 = result.f1_score,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Training run published"
        );

        Ok(result)
    }

    /// Decide every row with the live run; empty when nothing is trained
    pub fn predict(&self, rows: &[Record]) -> Result<Vec<Prediction>> {
        let Some(run) = self.current_run() else {
            return Ok(Vec::new());
        };
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let threshold = self.threshold();
        let (frame, proba) = run.predict_proba(rows)?;

        let predictions = frame
            .row_ids
            .iter()
            .zip(proba.iter())
            .map(|(row_id, &p)| self.describe(&rows[row_id.0], p, threshold))
            .collect::<Vec<_>>();

        info!(rows = predictions.len(), threshold, "Predicted rows");
        Ok(predictions)
    }

    /// Predict a simulation period and summarise it.
    ///
    /// Rows without an identifier get `Id = position + 1`.
    pub fn simulate(&self, rows: &[Record]) -> Result<SimulationReport> {
        if !self.is_trained() {
            return Ok(SimulationReport::invalid("Model not trained."));
        }
        if rows.is_empty() {
            return Ok(SimulationReport::invalid("No rows in selected simulation period."));
        }

        let id_column = &self.config.preparer.id_column;
        let rows: Vec<Record> = rows
            .iter()
            .enumerate()
            .map(|(idx, row)| {
                let mut row = row.clone();
                if row.get(id_column).map_or(true, Value::is_null) {
                    row.insert(id_column.clone(), Value::from(idx + 1));
                }
                row
            })
            .collect();

        let predictions = self.predict(&rows)?;
        let report = SimulationReport::success(predictions);
        info!(
            total = report.stats.total,
            pass = report.stats.pass,
            fail = report.stats.fail,
            "Simulation complete"
        );
        Ok(report)
    }

    fn describe(&self, row: &Record, probability: f64, threshold: f64) -> Prediction {
        let preparer = &self.config.preparer;
        let timestamp = row
            .get(&preparer.timestamp_column)
            .map(value_to_string)
            .unwrap_or_default();
        let sample_id = row
            .get(&preparer.id_column)
            .filter(|v| !v.is_null())
            .map(value_to_string);

        let passthrough = self
            .config
            .passthrough_fields
            .iter()
            .filter_map(|field| {
                row.get(field)
                    .filter(|v| !v.is_null())
                    .map(|v| (field.clone(), v.clone()))
            })
            .collect();

        Prediction {
            timestamp,
            sample_id,
            prediction: ThresholdDecider::decide(probability, threshold),
            confidence: confidence_percent(probability),
            passthrough,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::RunStatus;
    use crate::training::DecisionTree;
    use serde_json::json;

    fn small_orchestrator() -> TrainingOrchestrator {
        let mut config = PipelineConfig::default();
        config.stacking.n_folds = 3;
        config.meta.n_estimators = 10;
        TrainingOrchestrator::new(config).with_ensemble(
            BaseLearnerEnsemble::new()
                .with_learner("tree", || Box::new(DecisionTree::new().with_max_depth(3))),
        )
    }

    fn rows(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| {
                let y = i % 2;
                json!({"Sensor_A": y as f64 * 10.0 + (i % 5) as f64, "Response": y})
                    .as_object()
                    .cloned()
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_threshold_recorded_even_on_failure() {
        let orchestrator = small_orchestrator();
        let no_target: Vec<Record> = vec![json!({"a": 1}).as_object().cloned().unwrap()];
        let result = orchestrator.train(&no_target, &no_target, 0.55, false).unwrap();
        assert!(!result.is_success());
        assert_eq!(orchestrator.threshold(), 0.55);
        assert!(!orchestrator.is_trained());
    }

    #[test]
    fn test_train_then_predict() {
        let orchestrator = small_orchestrator();
        let result = orchestrator.train(&rows(30), &rows(10), 0.5, false).unwrap();
        assert!(result.is_success(), "{}", result.message);
        assert_eq!(result.features, vec!["Sensor_A"]);

        let predictions = orchestrator.predict(&rows(4)).unwrap();
        assert_eq!(predictions.len(), 4);
        assert_eq!(orchestrator.current_run().unwrap().learner_names(), vec!["tree"]);
    }

    #[test]
    fn test_simulate_requires_model() {
        let report = small_orchestrator().simulate(&rows(3)).unwrap();
        assert_eq!(report.status, RunStatus::Invalid);
        assert_eq!(report.message, "Model not trained.");
    }
}
