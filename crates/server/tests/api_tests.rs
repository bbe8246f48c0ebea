//! Integration tests for the prediction service endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use fitness_predictor::{create_router, AppState, ServerConfig};
use predictor_lib::{predictor::ModelVariant, ArtifactRole, LoadError};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

fn write_json(dir: &Path, file: &str, value: Value) {
    std::fs::write(dir.join(file), serde_json::to_vec(&value).unwrap()).unwrap();
}

/// Linear artifacts: performance = 0.1 * sum(features),
/// calorie burn = 10 + 500 * session hours (identity scaler).
fn write_artifacts(dir: &Path) {
    let perf = ModelVariant::Performance.feature_names();
    write_json(
        dir,
        "performance_model.json",
        json!({
            "kind": "linear",
            "feature_names": perf,
            "coefficients": vec![0.1; perf.len()],
            "intercept": 0.0,
        }),
    );

    let cal = ModelVariant::CalorieBurn.feature_names();
    let coefficients: Vec<f64> = cal
        .iter()
        .map(|name| if name == "Session_Duration (hours)" { 500.0 } else { 0.0 })
        .collect();
    write_json(
        dir,
        "calorie_model.json",
        json!({
            "kind": "linear",
            "feature_names": cal,
            "coefficients": coefficients,
            "intercept": 10.0,
        }),
    );
    write_json(
        dir,
        "calorie_scaler.json",
        json!({
            "kind": "standard",
            "feature_names": cal,
            "mean": vec![0.0; cal.len()],
            "scale": vec![1.0; cal.len()],
        }),
    );
}

fn config_for(dir: &Path, variants: &str) -> ServerConfig {
    let vars: HashMap<String, String> = [
        ("FITNESS_ARTIFACT_DIR", dir.to_str().unwrap()),
        ("FITNESS_PERFORMANCE_MODEL", "performance_model.json"),
        ("FITNESS_CALORIE_MODEL", "calorie_model.json"),
        ("FITNESS_VARIANTS", variants),
        ("FITNESS_INSTANCE_NAME", "test-instance"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    ServerConfig::from_sources(
        None,
        config::Environment::with_prefix("FITNESS")
            .try_parsing(true)
            .source(Some(vars)),
    )
    .unwrap()
}

fn setup_test_app(variants: &str) -> (TempDir, Arc<AppState>) {
    let tmp = TempDir::new().unwrap();
    write_artifacts(tmp.path());
    let state = AppState::load(&config_for(tmp.path(), variants), "test").unwrap();
    (tmp, Arc::new(state))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn get_json(state: &Arc<AppState>, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let (status, body) = send(create_router(state.clone()), request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

async fn post_json(state: &Arc<AppState>, uri: &str, payload: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let (status, body) = send(create_router(state.clone()), request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

fn scenario_a() -> Value {
    json!({
        "Age": 25,
        "Gender": "Male",
        "Weight": 70,
        "Height": 170,
        "Exercise_Duration": 60,
        "Heart_Rate": 120,
        "Body_Temperature": 37,
        "Workout_Type": "Cardio",
        "Water_Intake": 1.5,
        "Sleep_Hours": 7
    })
}

fn calorie_input() -> Value {
    json!({
        "Age": 34,
        "Gender": "Female",
        "Weight": 65.0,
        "Height": 1.68,
        "Max_BPM": 185,
        "Avg_BPM": 142,
        "Resting_BPM": 62,
        "Session_Duration": 1.25,
        "Workout_Type": "HIIT",
        "Fat_Percentage": 24.5,
        "Water_Intake": 2.7,
        "Workout_Frequency": 4,
        "Experience_Level": 2
    })
}

#[tokio::test]
async fn test_healthz_reports_loaded_artifacts() {
    let (_tmp, state) = setup_test_app("performance,calorie_burn");

    let (status, health) = get_json(&state, "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["version"], "test");

    let calorie = &health["variants"]["calorie_burn"];
    assert_eq!(calorie["status"], "healthy");
    assert_eq!(calorie["model"]["checksum"].as_str().unwrap().len(), 64);
    assert_eq!(calorie["scaler"]["kind"], "standard");
    assert!(health["variants"]["performance"]["scaler"].is_null());
}

#[tokio::test]
async fn test_readyz_lists_variants() {
    let (_tmp, state) = setup_test_app("performance,calorie_burn");

    let (status, readiness) = get_json(&state, "/readyz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(readiness["ready"], true);
    assert_eq!(readiness["variants"], json!(["performance", "calorie_burn"]));
}

#[tokio::test]
async fn test_predict_performance_scenario_a() {
    let (_tmp, state) = setup_test_app("performance");

    let (status, outcome) = post_json(&state, "/v1/predict/performance", scenario_a()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["status"], "success");
    assert_eq!(outcome["label"], "Predicted Performance Score");
    let prediction = outcome["prediction"].as_f64().unwrap();
    assert!((prediction - 49.15).abs() < 1e-9, "prediction was {}", prediction);
}

#[tokio::test]
async fn test_predict_calorie_burn_uses_scaler() {
    let (_tmp, state) = setup_test_app("performance,calorie_burn");

    let (status, outcome) = post_json(&state, "/v1/predict/calorie_burn", calorie_input()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["variant"], "calorie_burn");
    assert_eq!(outcome["prediction"].as_f64().unwrap(), 635.0);
}

#[tokio::test]
async fn test_predict_unknown_category_is_422() {
    let (_tmp, state) = setup_test_app("performance");

    let mut input = scenario_a();
    input["Workout_Type"] = json!("Pilates");
    let (status, outcome) = post_json(&state, "/v1/predict/performance", input).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(outcome["status"], "failure");
    assert_eq!(outcome["error_kind"], "encoding");
    assert_eq!(outcome["stage"], "encoding");
    assert!(outcome["message"].as_str().unwrap().contains("Workout_Type"));
    assert!(outcome.get("prediction").is_none());
}

#[tokio::test]
async fn test_predict_missing_field_is_422() {
    let (_tmp, state) = setup_test_app("performance");

    let mut input = scenario_a();
    input.as_object_mut().unwrap().remove("Heart_Rate");
    let (status, outcome) = post_json(&state, "/v1/predict/performance", input).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(outcome["message"].as_str().unwrap().contains("Heart_Rate"));
}

#[tokio::test]
async fn test_unknown_variant_is_404() {
    let (_tmp, state) = setup_test_app("performance");

    let (status, body) = post_json(&state, "/v1/predict/sleep_quality", scenario_a()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("sleep_quality"));
}

#[tokio::test]
async fn test_unloaded_variant_is_404() {
    let (_tmp, state) = setup_test_app("performance");

    let (status, body) = post_json(&state, "/v1/predict/calorie_burn", calorie_input()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("not loaded"));
}

#[tokio::test]
async fn test_schema_endpoint() {
    let (_tmp, state) = setup_test_app("performance");

    let (status, schema) = get_json(&state, "/v1/schema/calorie_burn").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(schema["height_unit"], "meters");
    assert_eq!(schema["requires_scaler"], true);

    let features = schema["features"].as_array().unwrap();
    assert_eq!(features.len(), 14);
    assert_eq!(features[13]["name"], "BMI");
    assert_eq!(features[13]["source"], "bmi");

    let inputs = schema["inputs"].as_array().unwrap();
    let workout = inputs.iter().find(|i| i["name"] == "Workout_Type").unwrap();
    assert_eq!(workout["choices"], json!(["Cardio", "HIIT", "Strength", "Yoga"]));
    let height = inputs.iter().find(|i| i["name"] == "Height").unwrap();
    assert_eq!(height["bound"]["max"], 2.5);
}

#[tokio::test]
async fn test_metrics_endpoint_after_prediction() {
    let (_tmp, state) = setup_test_app("performance");
    post_json(&state, "/v1/predict/performance", scenario_a()).await;

    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let response = create_router(state.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/plain"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let metrics_text = String::from_utf8(body.to_vec()).unwrap();
    assert!(metrics_text.contains("fitness_predictor_predictions_total"));
    assert!(metrics_text.contains("fitness_predictor_prediction_latency_seconds_bucket"));
    assert!(metrics_text.contains("fitness_predictor_artifact_info"));
}

#[test]
fn test_startup_fails_on_missing_artifacts() {
    let tmp = TempDir::new().unwrap();
    let config = config_for(&tmp.path().join("missing"), "performance");

    let err = AppState::load(&config, "test").err().expect("load should fail");
    match err.downcast_ref::<LoadError>() {
        Some(LoadError::NotFound { role, .. }) => assert_eq!(*role, ArtifactRole::Model),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_startup_fails_on_schema_mismatch() {
    let tmp = TempDir::new().unwrap();
    write_artifacts(tmp.path());
    write_json(
        tmp.path(),
        "calorie_scaler.json",
        json!({
            "kind": "standard",
            "feature_names": ["Age", "Gender"],
            "mean": [0.0, 0.0],
            "scale": [1.0, 1.0],
        }),
    );

    let err = AppState::load(&config_for(tmp.path(), "calorie_burn"), "test")
        .err()
        .expect("load should fail");
    assert!(matches!(
        err.downcast_ref::<LoadError>(),
        Some(LoadError::SchemaMismatch {
            role: ArtifactRole::Scaler,
            ..
        })
    ));
}
