//! Integration test: train, predict and simulate through the orchestrator

use serde_json::{json, Value};
use stackfold::dataset::Record;
use stackfold::ensemble::{BaseLearnerEnsemble, LearnerConfig, MetaConfig, StackingConfig, Verdict};
use stackfold::pipeline::{PipelineConfig, RunStatus, TrainingOrchestrator};
use stackfold::training::DecisionTree;
use std::sync::Arc;

fn small_config() -> PipelineConfig {
    PipelineConfig::default()
        .with_stacking(StackingConfig::default().with_n_folds(3))
        .with_learners(LearnerConfig::default().with_n_estimators(5))
        .with_meta(MetaConfig {
            n_estimators: 10,
            ..MetaConfig::default()
        })
}

fn tree_orchestrator() -> TrainingOrchestrator {
    TrainingOrchestrator::new(small_config()).with_ensemble(
        BaseLearnerEnsemble::new()
            .with_learner("tree", || Box::new(DecisionTree::new().with_max_depth(4))),
    )
}

/// Separable sensor rows: `n_pos` positives then `n_neg` negatives
fn sensor_rows(n_pos: usize, n_neg: usize, offset: usize) -> Vec<Record> {
    (0..n_pos + n_neg)
        .map(|i| {
            let y = usize::from(i < n_pos);
            let k = i + offset;
            json!({
                "synthetic_timestamp": format!("2021-01-01 00:{:02}:{:02}", (k / 60) % 60, k % 60),
                "Sensor_A": y as f64 * 10.0 + (k % 7) as f64,
                "Sensor_B": (k % 13) as f64,
                "temperature": 20.0 + (k % 5) as f64,
                "Response": y,
            })
            .as_object()
            .cloned()
            .unwrap()
        })
        .collect()
}

fn strip_response(rows: &[Record]) -> Vec<Record> {
    rows.iter()
        .map(|r| {
            let mut r = r.clone();
            r.remove("Response");
            r
        })
        .collect()
}

#[test]
fn test_end_to_end_with_boosted_learners() {
    let orchestrator = TrainingOrchestrator::new(small_config());
    let result = orchestrator
        .train(&sensor_rows(30, 30, 0), &sensor_rows(10, 10, 60), 0.5, false)
        .unwrap();

    assert_eq!(result.status, RunStatus::Success, "{}", result.message);
    assert_eq!(result.train_rows, 60);
    assert_eq!(result.test_rows, 20);
    assert_eq!(result.features, vec!["Sensor_A", "Sensor_B", "temperature"]);
    assert!(result.accuracy > 0.8, "accuracy {}", result.accuracy);

    let run = orchestrator.current_run().unwrap();
    assert_eq!(run.learner_names(), vec!["xgb", "lgbm", "cat"]);
    assert_eq!(run.threshold, 0.5);

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["status"], "Success");
    assert!(json.get("confusionMatrix").is_some());
}

#[test]
fn test_missing_response_is_an_error_result() {
    let orchestrator = tree_orchestrator();
    let train = strip_response(&sensor_rows(10, 10, 0));
    let result = orchestrator.train(&train, &sensor_rows(5, 5, 20), 0.7, false).unwrap();

    assert_eq!(result.status, RunStatus::Error);
    assert_eq!(result.accuracy, 0.0);
    assert!(result.message.contains("response"));
    assert!(!orchestrator.is_trained());
}

#[test]
fn test_failed_train_keeps_previous_run() {
    let orchestrator = tree_orchestrator();
    orchestrator
        .train(&sensor_rows(15, 15, 0), &sensor_rows(5, 5, 30), 0.7, false)
        .unwrap();
    let before = orchestrator.current_run().unwrap();

    // Two positives cannot fill three folds
    let result = orchestrator.train(&sensor_rows(2, 20, 0), &sensor_rows(5, 5, 30), 0.6, false);
    assert!(result.is_err());

    let after = orchestrator.current_run().unwrap();
    assert!(Arc::ptr_eq(&before, &after));
}

#[test]
fn test_downsample_trains_on_balanced_rows() {
    let orchestrator = tree_orchestrator();
    let result = orchestrator
        .train(&sensor_rows(60, 40, 0), &sensor_rows(10, 10, 100), 0.7, true)
        .unwrap();
    assert!(result.is_success(), "{}", result.message);
    assert_eq!(result.train_rows, 80);
}

#[test]
fn test_predict_before_train_is_empty() {
    let predictions = tree_orchestrator().predict(&sensor_rows(3, 3, 0)).unwrap();
    assert!(predictions.is_empty());
}

#[test]
fn test_predict_is_idempotent_and_tolerates_missing_columns() {
    let orchestrator = tree_orchestrator();
    orchestrator
        .train(&sensor_rows(20, 20, 0), &sensor_rows(5, 5, 40), 0.7, false)
        .unwrap();

    let rows = strip_response(&sensor_rows(4, 4, 50));
    let first = orchestrator.predict(&rows).unwrap();
    let second = orchestrator.predict(&rows).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 8);
    assert_eq!(first[0].timestamp, rows[0]["synthetic_timestamp"].as_str().unwrap());
    assert_eq!(first[0].passthrough["temperature"], rows[0]["temperature"]);
    assert!(first.iter().all(|p| (0.0..=100.0).contains(&p.confidence)));

    let sparse = vec![json!({"Sensor_B": 4.0}).as_object().cloned().unwrap()];
    let predicted = orchestrator.predict(&sparse).unwrap();
    assert_eq!(predicted.len(), 1);
    assert!(predicted[0].passthrough.is_empty());
}

#[test]
fn test_threshold_controls_verdicts() {
    let orchestrator = tree_orchestrator();
    let rows = strip_response(&sensor_rows(5, 5, 50));

    orchestrator
        .train(&sensor_rows(20, 20, 0), &sensor_rows(5, 5, 40), 0.0, false)
        .unwrap();
    let all_pass = orchestrator.predict(&rows).unwrap();
    assert!(all_pass.iter().all(|p| p.prediction == Verdict::Pass));

    orchestrator
        .train(&sensor_rows(20, 20, 0), &sensor_rows(5, 5, 40), 1.0 + f64::EPSILON, false)
        .unwrap();
    let all_fail = orchestrator.predict(&rows).unwrap();
    assert!(all_fail.iter().all(|p| p.prediction == Verdict::Fail));
}

#[test]
fn test_simulation_assigns_ids_and_sums_stats() {
    let orchestrator = tree_orchestrator();
    orchestrator
        .train(&sensor_rows(20, 20, 0), &sensor_rows(5, 5, 40), 0.7, false)
        .unwrap();

    let mut rows = strip_response(&sensor_rows(6, 6, 50));
    rows[1].insert("Id".to_string(), Value::from("S-2"));
    let report = orchestrator.simulate(&rows).unwrap();

    assert_eq!(report.status, RunStatus::Success);
    assert_eq!(report.stats.total, 12);
    assert_eq!(report.stats.pass + report.stats.fail, report.stats.total);
    assert_eq!(report.rows[0].sample_id.as_deref(), Some("1"));
    assert_eq!(report.rows[1].sample_id.as_deref(), Some("S-2"));
    assert_eq!(report.rows[2].sample_id.as_deref(), Some("3"));

    let empty = orchestrator.simulate(&[]).unwrap();
    assert_eq!(empty.status, RunStatus::Invalid);
    assert_eq!(empty.message, "No rows in selected simulation period.");
}

#[test]
fn test_predictions_during_retraining_see_a_whole_run() {
    let orchestrator = tree_orchestrator();
    orchestrator
        .train(&sensor_rows(20, 20, 0), &sensor_rows(5, 5, 40), 0.7, false)
        .unwrap();
    let rows = strip_response(&sensor_rows(3, 3, 50));

    std::thread::scope(|scope| {
        let trainer = scope.spawn(|| {
            for threshold in [0.3, 0.5, 0.9] {
                orchestrator
                    .train(&sensor_rows(20, 20, 0), &sensor_rows(5, 5, 40), threshold, false)
                    .unwrap();
            }
        });
        for _ in 0..5 {
            let predictions = orchestrator.predict(&rows).unwrap();
            assert_eq!(predictions.len(), rows.len());
        }
        trainer.join().unwrap();
    });

    assert_eq!(orchestrator.threshold(), 0.9);
}
