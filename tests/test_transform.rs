//! Integration tests for feature transformation: cleaning, encoding, scaling

use ndarray::Axis;
use polars::prelude::*;
use riskml::prelude::*;

fn train_frame() -> DataFrame {
    df!(
        "Customer ID" => &[1i64, 2, 3, 4, 5, 6],
        "Credit Score" => &[700.0, 580.0, 640.0, 720.0, 590.0, 710.0],
        "Outstanding Debt" => &[1200.0, 8800.0, 4300.0, 900.0, 7600.0, 1100.0],
        "Utilization" => &[0.2, 0.9, 0.5, 0.1, 0.8, 0.15],
        "Risk Classification" => &["Low Risk", "High Risk", "High Risk", "Low Risk", "High Risk", "Low Risk"]
    )
    .unwrap()
}

fn test_frame() -> DataFrame {
    df!(
        "Customer ID" => &[7i64, 8],
        "Credit Score" => &[610.0, 690.0],
        "Outstanding Debt" => &[6100.0, 1500.0],
        "Utilization" => &[0.7, 0.25],
        "Risk Classification" => &["High Risk", "Low Risk"]
    )
    .unwrap()
}

// ============================================================================
// Cleaning and shape
// ============================================================================

#[test]
fn test_transform_drops_identifier_and_separates_label() {
    let out = FeatureTransformer::default()
        .transform(&train_frame(), &test_frame())
        .unwrap();

    assert_eq!(out.x_train.dim(), (6, 3));
    assert_eq!(out.x_test.dim(), (2, 3));
    assert_eq!(
        out.feature_names,
        vec!["Credit Score", "Outstanding Debt", "Utilization"]
    );
}

#[test]
fn test_null_rows_removed_independently_per_split() {
    let train = df!(
        "Credit Score" => &[Some(700.0), None, Some(640.0), Some(720.0), Some(590.0)],
        "Utilization" => &[Some(0.2), Some(0.9), Some(0.5), Some(0.1), Some(0.8)],
        "Risk Classification" => &[Some("Low Risk"), Some("High Risk"), Some("High Risk"), Some("Low Risk"), Some("High Risk")]
    )
    .unwrap();
    let test = df!(
        "Credit Score" => &[Some(610.0), Some(690.0), None],
        "Utilization" => &[Some(0.7), Some(0.25), Some(0.4)],
        "Risk Classification" => &[Some("High Risk"), Some("Low Risk"), Some("Low Risk")]
    )
    .unwrap();

    let out = FeatureTransformer::default().transform(&train, &test).unwrap();
    assert_eq!(out.x_train.nrows(), 4);
    assert_eq!(out.x_test.nrows(), 2);
}

// ============================================================================
// Label encoding
// ============================================================================

#[test]
fn test_encoding_uses_training_classes_only() {
    let out = FeatureTransformer::default()
        .transform(&train_frame(), &test_frame())
        .unwrap();

    assert_eq!(out.encoder.classes(), &["High Risk", "Low Risk"]);
    // Test labels map through the training encoding
    assert_eq!(out.y_test[0], 0.0);
    assert_eq!(out.y_test[1], 1.0);
}

#[test]
fn test_unseen_test_label_fails() {
    let test = df!(
        "Credit Score" => &[650.0],
        "Outstanding Debt" => &[3000.0],
        "Utilization" => &[0.4],
        "Risk Classification" => &["Medium Risk"]
    )
    .unwrap();

    let err = FeatureTransformer::default()
        .transform(&train_frame(), &test)
        .unwrap_err();
    assert!(matches!(err, RiskmlError::Transformation(_)));
}

// ============================================================================
// Scaling
// ============================================================================

#[test]
fn test_train_columns_are_standardized() {
    let out = FeatureTransformer::default()
        .transform(&train_frame(), &test_frame())
        .unwrap();

    for col in out.x_train.axis_iter(Axis(1)) {
        let mean = col.mean().unwrap();
        assert!(mean.abs() < 1e-9, "column mean {} not centered", mean);
    }
}

#[test]
fn test_test_split_does_not_leak_into_scaler() {
    let base_test = test_frame();
    let shifted_test = df!(
        "Customer ID" => &[7i64, 8],
        "Credit Score" => &[10_000.0, 20_000.0],
        "Outstanding Debt" => &[1.0, 2.0],
        "Utilization" => &[5.0, 6.0],
        "Risk Classification" => &["High Risk", "Low Risk"]
    )
    .unwrap();

    let transformer = FeatureTransformer::default();
    let a = transformer.transform(&train_frame(), &base_test).unwrap();
    let b = transformer.transform(&train_frame(), &shifted_test).unwrap();

    // Wildly different test data leaves the training matrix untouched
    assert_eq!(a.x_train, b.x_train);
    assert_eq!(a.scaler, b.scaler);
}

#[test]
fn test_transform_is_idempotent() {
    let transformer = FeatureTransformer::default();
    let a = transformer.transform(&train_frame(), &test_frame()).unwrap();
    let b = transformer.transform(&train_frame(), &test_frame()).unwrap();

    assert_eq!(a.x_train, b.x_train);
    assert_eq!(a.x_test, b.x_test);
    assert_eq!(a.y_train, b.y_train);
    assert_eq!(a.feature_names, b.feature_names);
}
