//! End-to-end inference behaviour against artifacts on disk

use cropprice_core::{Hyperparameters, Model, ModelArtifact, Node, Tree};
use cropprice_service::{
    ArtifactPolicy, InferenceService, ModelTag, PredictionResponse, Status, INFERENCE_FEATURES,
};
use proptest::prelude::*;
use serde_json::json;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

fn constant_artifact(value: f64) -> ModelArtifact {
    ModelArtifact::new(
        INFERENCE_FEATURES.iter().map(|s| s.to_string()).collect(),
        "Price",
        Hyperparameters::default(),
        Model::new(vec![Tree::new(vec![Node::leaf(0, 0.0)])], value, 2),
    )
    .unwrap()
}

fn response_json(service: &InferenceService, payload: &str) -> (serde_json::Value, i32) {
    let outcome = service.handle_payload(payload);
    (serde_json::to_value(&outcome.response).unwrap(), outcome.status.code())
}

#[test]
fn test_fallback_arithmetic() {
    let dir = tempdir().unwrap();
    let service = InferenceService::new(dir.path().join("model.json"), ArtifactPolicy::Cached);

    let (body, status) = response_json(
        &service,
        r#"{"crop":"Wheat","location":"Punjab","currentPrice":3500,"change":5.2}"#,
    );
    assert_eq!(body, json!({"predictedPrice": 3682, "model": "fallback"}));
    assert_eq!(status, 0);

    let (body, status) = response_json(&service, r#"{"currentPrice":1000}"#);
    assert_eq!(body, json!({"predictedPrice": 1000, "model": "fallback"}));
    assert_eq!(status, 0);
}

#[test]
fn test_model_path_labeling() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("model.json");
    constant_artifact(3684.6).save(&path).unwrap();

    let service = InferenceService::new(&path, ArtifactPolicy::Cached);
    let (body, status) = response_json(&service, r#"{"currentPrice":3500,"change":5.2}"#);
    assert_eq!(body, json!({"predictedPrice": 3685, "model": "xgboost"}));
    assert_eq!(status, 0);
}

#[test]
fn test_graceful_degrade_on_corrupted_artifact() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("model.json");
    fs::write(&path, [0xff, 0x00, 0x13, 0x37]).unwrap();

    let service = InferenceService::new(&path, ArtifactPolicy::Cached);
    let (body, status) = response_json(&service, r#"{"currentPrice":2000,"change":0}"#);
    assert_eq!(body["predictedPrice"], json!(2000));
    assert_eq!(body["model"], json!("fallback"));
    assert!(body["details"].is_string());
    assert_eq!(status, 2);
}

#[test]
fn test_unrepresentable_model_output_degrades() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("model.json");
    constant_artifact(1e300).save(&path).unwrap();

    let service = InferenceService::new(&path, ArtifactPolicy::Cached);
    assert!(service.health().is_available());

    let (body, status) = response_json(&service, r#"{"currentPrice":2000,"change":0}"#);
    assert_eq!(body["predictedPrice"], json!(2000));
    assert_eq!(body["model"], json!("fallback"));
    assert!(body["details"].as_str().unwrap().contains("model execution failed"));
    assert_eq!(status, 2);
}

#[test]
fn test_tampered_artifact_is_not_trusted() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("model.json");
    constant_artifact(5000.0).save(&path).unwrap();
    let json = fs::read_to_string(&path).unwrap();
    fs::write(&path, json.replace("5000.0", "9000.0")).unwrap();

    let service = InferenceService::new(&path, ArtifactPolicy::Cached);
    let outcome = service.handle_payload(r#"{"currentPrice":2000}"#);
    assert_eq!(outcome.status, Status::ModelFailure);
    assert_eq!(outcome.predicted_price(), Some(2000));
}

#[test]
fn test_invalid_input_responses() {
    let service = InferenceService::with_artifact(constant_artifact(1.0));
    for payload in [
        "",
        "{",
        "[]",
        "\"text\"",
        r#"{"currentPrice":"abc"}"#,
        r#"{"currentPrice":{}}"#,
    ] {
        let (body, status) = response_json(&service, payload);
        assert_eq!(body["error"], json!("Invalid input"), "{payload}");
        assert!(body["details"].is_string());
        assert_eq!(status, 1);
    }
}

#[tokio::test]
async fn test_timeout_outcome_is_consistent() {
    let service = Arc::new(InferenceService::with_artifact(constant_artifact(2000.0)));
    let outcome = service
        .handle_payload_with_timeout(r#"{"currentPrice":2000,"change":0}"#, Duration::ZERO)
        .await;

    // Either the model answered before the deadline was checked, or the
    // request degraded; both must be internally consistent.
    assert_eq!(outcome.predicted_price(), Some(2000));
    match outcome.response {
        PredictionResponse::Prediction {
            model: ModelTag::Xgboost,
            details,
            ..
        } => {
            assert_eq!(outcome.status, Status::Success);
            assert!(details.is_none());
        }
        PredictionResponse::Prediction {
            model: ModelTag::Fallback,
            details,
            ..
        } => {
            assert_eq!(outcome.status, Status::ModelFailure);
            assert!(details.unwrap().contains("timed out"));
        }
        other => panic!("unexpected response {other:?}"),
    }
}

#[tokio::test]
async fn test_timeout_path_rejects_invalid_input_first() {
    let service = Arc::new(InferenceService::with_artifact(constant_artifact(1.0)));
    let outcome = service
        .handle_payload_with_timeout("not json", Duration::from_secs(1))
        .await;
    assert_eq!(outcome.status, Status::InvalidInput);
}

proptest! {
    #[test]
    fn heuristic_never_panics(price in any::<f64>(), change in any::<f64>()) {
        let dir = tempdir().unwrap();
        let service =
            InferenceService::new(dir.path().join("missing.json"), ArtifactPolicy::Cached);
        let payload = json!({"currentPrice": price, "change": change}).to_string();
        let outcome = service.handle_payload(&payload);
        prop_assert!(matches!(outcome.status, Status::Success | Status::InvalidInput));
    }

    #[test]
    fn heuristic_matches_formula_for_ordinary_prices(
        price in 0u32..1_000_000,
        change_tenths in -1000i32..1000,
    ) {
        let dir = tempdir().unwrap();
        let service =
            InferenceService::new(dir.path().join("missing.json"), ArtifactPolicy::Cached);
        let change = change_tenths as f64 / 10.0;
        let payload = json!({"currentPrice": price, "change": change}).to_string();

        let expected = (price as f64 * (1.0 + change / 100.0)).round_ties_even() as i64;
        prop_assert_eq!(service.handle_payload(&payload).predicted_price(), Some(expected));
    }
}
