//! Integration test: feature preparation and class balancing

use serde_json::{json, Value};
use stackfold::dataset::Record;
use stackfold::preprocessing::{
    BalanceConfig, ClassBalancer, ColumnDecision, FeaturePreparer, PreparerConfig,
};
use stackfold::StackfoldError;

fn record(value: Value) -> Record {
    value.as_object().cloned().unwrap()
}

/// `n_pos` positives then `n_neg` negatives, with one sparse and one text column
fn inspection_rows(n_pos: usize, n_neg: usize) -> Vec<Record> {
    (0..n_pos + n_neg)
        .map(|i| {
            let y = usize::from(i < n_pos);
            record(json!({
                "Id": i + 1,
                "synthetic_timestamp": format!("2021-01-01 00:{:02}:{:02}", i / 60, i % 60),
                "Sensor_A": y as f64 * 4.0 + (i % 7) as f64 * 0.1,
                "Sensor_B": if i % 5 == 0 { Value::Null } else { json!((i % 11) as f64) },
                "Sensor_C": if i % 10 == 0 { json!(1.5) } else { Value::Null },
                "Line": format!("L{}", i % 3),
                "Response": y,
            }))
        })
        .collect()
}

fn ids(rows: &[Record]) -> Vec<Value> {
    rows.iter().map(|r| r["Id"].clone()).collect()
}

#[test]
fn test_feature_set_excludes_target_timestamp_sparse_and_text() {
    let rows = inspection_rows(20, 20);
    let preparer = FeaturePreparer::default();
    let feature_set = preparer.fit(&rows).unwrap();

    assert_eq!(feature_set.columns(), &["Sensor_A", "Sensor_B"]);

    let decisions = preparer.column_decisions(&rows);
    let decision = |name: &str| {
        decisions
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, d)| d.clone())
            .unwrap()
    };
    assert_eq!(decision("Response"), ColumnDecision::Excluded);
    assert_eq!(decision("synthetic_timestamp"), ColumnDecision::Excluded);
    assert_eq!(decision("Id"), ColumnDecision::Excluded);
    assert_eq!(decision("Line"), ColumnDecision::NonNumeric);
    assert!(matches!(decision("Sensor_C"), ColumnDecision::TooSparse { .. }));
}

#[test]
fn test_transform_of_training_rows_has_no_missing_values() {
    let rows = inspection_rows(15, 15);
    let feature_set = FeaturePreparer::default().fit(&rows).unwrap();
    let frame = feature_set.transform(&rows);

    assert_eq!(frame.n_rows(), rows.len());
    assert!(frame.x.iter().all(|v| v.is_finite()));
    // Sensor_B nulls are filled with the sentinel
    assert_eq!(frame.x[[0, 1]], -999.0);
    assert_eq!(frame.row_ids.len(), rows.len());
    assert_eq!(frame.row_ids[3].0, 3);
}

#[test]
fn test_missing_column_at_predict_time_uses_sentinel() {
    let rows = inspection_rows(10, 10);
    let feature_set = FeaturePreparer::new(PreparerConfig::new().with_sentinel(-1.0))
        .fit(&rows)
        .unwrap();

    let incoming = vec![record(json!({"Sensor_B": 3.0, "Unseen": 8.0}))];
    let frame = feature_set.transform(&incoming);
    assert_eq!(frame.x.shape(), &[1, 2]);
    assert_eq!(frame.x[[0, 0]], -1.0);
    assert_eq!(frame.x[[0, 1]], 3.0);
}

#[test]
fn test_no_numeric_columns_is_an_error() {
    let rows = vec![
        record(json!({"Line": "L1", "Response": 1})),
        record(json!({"Line": "L2", "Response": 0})),
    ];
    let result = FeaturePreparer::default().fit(&rows);
    assert!(matches!(result, Err(StackfoldError::PreprocessingError(_))));
}

#[test]
fn test_malformed_labels_are_skipped() {
    let mut rows = inspection_rows(5, 5);
    rows.push(record(json!({"Sensor_A": 1.0, "Response": "maybe"})));
    rows.push(record(json!({"Sensor_A": 1.0})));

    let preparer = FeaturePreparer::default();
    let target = preparer.resolve_target(&rows).unwrap();
    assert_eq!(target, "Response");

    let labelled = preparer.labelled(&rows, &target);
    assert_eq!(labelled.len(), 10);
    assert_eq!(labelled.class_counts(), (5, 5));
}

#[test]
fn test_downsample_sixty_forty_to_forty_forty() {
    let rows = inspection_rows(60, 40);
    let preparer = FeaturePreparer::default();
    let labelled = preparer.labelled(&rows, "Response");
    assert_eq!(labelled.class_counts(), (40, 60));

    let balanced = ClassBalancer::new(BalanceConfig::default())
        .balance(labelled.clone())
        .unwrap();
    assert_eq!(balanced.len(), 80);
    assert_eq!(balanced.class_counts(), (40, 40));

    // Same seed, same selection and order
    let again = ClassBalancer::new(BalanceConfig::default()).balance(labelled).unwrap();
    assert_eq!(ids(&balanced.rows), ids(&again.rows));
}

#[test]
fn test_balancing_a_single_class_fails() {
    let rows = inspection_rows(8, 0);
    let labelled = FeaturePreparer::default().labelled(&rows, "Response");
    let result = ClassBalancer::new(BalanceConfig::default()).balance(labelled);
    assert!(matches!(result, Err(StackfoldError::ValidationError(_))));
}
