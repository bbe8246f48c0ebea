//! HTTP API for predictions, schemas, health checks and Prometheus metrics

use crate::config::ServerConfig;
use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use predictor_lib::{
    health::{ComponentStatus, HealthReport},
    observability::{PredictorMetrics, StructuredLogger},
    predictor::{
        ArtifactLoader, FeatureSpec, HeightUnit, InputField, InputKind, LoadedArtifacts,
        ModelVariant, OutputFormatter, PredictorRegistry,
    },
    RawInput,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub registry: PredictorRegistry,
    pub health: HealthReport,
    pub metrics: PredictorMetrics,
    pub logger: StructuredLogger,
    pub formatter: OutputFormatter,
}

impl AppState {
    pub fn new(
        registry: PredictorRegistry,
        health: HealthReport,
        metrics: PredictorMetrics,
        logger: StructuredLogger,
        formatter: OutputFormatter,
    ) -> Self {
        Self {
            registry,
            health,
            metrics,
            logger,
            formatter,
        }
    }

    /// Load every configured variant's artifacts and build the state.
    ///
    /// Any `LoadError` is returned before a listener exists.
    pub fn load(config: &ServerConfig, version: &str) -> Result<Self> {
        let variants = config.variants()?;
        let logger = StructuredLogger::new(&config.instance_name);
        let metrics = PredictorMetrics::new();

        let loader = ArtifactLoader::new(config.artifact_layout());
        let loaded: Vec<LoadedArtifacts> = loader.load_all(&variants).with_context(|| {
            format!(
                "Failed to load artifacts from {}",
                config.artifact_dir.display()
            )
        })?;

        for info in loaded.iter().flat_map(LoadedArtifacts::infos) {
            logger.log_artifact_loaded(info);
        }
        metrics.set_artifacts(loaded.iter().flat_map(LoadedArtifacts::infos));

        let registry = PredictorRegistry::from_artifacts(&loaded)?;
        let health = HealthReport::new(version, &variants, &loaded);

        Ok(Self::new(
            registry,
            health,
            metrics,
            logger,
            OutputFormatter::with_config(config.output_config()),
        ))
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn not_found(message: String) -> Response {
    (StatusCode::NOT_FOUND, Json(ErrorBody { error: message })).into_response()
}

fn resolve_variant(name: &str) -> Result<ModelVariant, Response> {
    name.parse::<ModelVariant>().map_err(not_found)
}

/// Run one prediction - 200 on success, 422 on a per-request failure
async fn predict(
    State(state): State<Arc<AppState>>,
    Path(variant): Path<String>,
    Json(input): Json<RawInput>,
) -> Response {
    let variant = match resolve_variant(&variant) {
        Ok(v) => v,
        Err(response) => return response,
    };
    let Some(pipeline) = state.registry.get(variant) else {
        return not_found(format!("variant {} is not loaded", variant));
    };

    let start = Instant::now();
    let result = pipeline.predict(&input);
    let elapsed = start.elapsed();

    let outcome = state.formatter.from_result(variant, &result);
    state.metrics.record_outcome(&outcome, elapsed);
    state.logger.log_prediction(&outcome, elapsed);

    let status = if outcome.is_success() {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    (status, Json(outcome)).into_response()
}

#[derive(Debug, Serialize)]
struct InputView {
    #[serde(flatten)]
    field: InputField,
    #[serde(skip_serializing_if = "Option::is_none")]
    choices: Option<&'static [&'static str]>,
}

#[derive(Debug, Serialize)]
struct SchemaResponse {
    variant: ModelVariant,
    target: &'static str,
    height_unit: HeightUnit,
    requires_scaler: bool,
    features: &'static [FeatureSpec],
    inputs: Vec<InputView>,
}

/// Feature schema and input bounds for a variant
async fn schema(Path(variant): Path<String>) -> Response {
    let variant = match resolve_variant(&variant) {
        Ok(v) => v,
        Err(response) => return response,
    };

    let inputs = variant
        .input_fields()
        .iter()
        .map(|field| InputView {
            field: *field,
            choices: match field.kind {
                InputKind::Categorical { kind } => Some(kind.domain()),
                InputKind::Numeric { .. } => None,
            },
        })
        .collect();

    Json(SchemaResponse {
        variant,
        target: variant.target_label(),
        height_unit: variant.height_unit(),
        requires_scaler: variant.requires_scaler(),
        features: variant.schema(),
        inputs,
    })
    .into_response()
}

/// Health check response - returns 200 if healthy, 503 otherwise
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health.health();

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health.readiness();

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/predict/:variant", post(predict))
        .route("/v1/schema/:variant", get(schema))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server, stopping on Ctrl-C
pub async fn serve(port: u16, state: Arc<AppState>) -> Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
}
