//! Observability infrastructure for the fitness predictor
//!
//! Provides:
//! - Prometheus metrics (prediction latency, outcome counters, loaded artifacts)
//! - Structured JSON logging with tracing

use crate::error::ErrorKind;
use crate::predictor::{ArtifactInfo, ModelVariant, PredictionOutcome};
use prometheus::{
    register_gauge_vec, register_histogram_vec, register_int_counter_vec, register_int_gauge,
    GaugeVec, HistogramVec, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{info, warn};

/// Histogram buckets for prediction latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00005, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<PredictorMetricsInner> = OnceLock::new();

struct PredictorMetricsInner {
    prediction_latency_seconds: HistogramVec,
    predictions_total: IntCounterVec,
    prediction_failures_total: IntCounterVec,
    artifact_info: GaugeVec,
    variants_loaded: IntGauge,
}

impl PredictorMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram_vec!(
                "fitness_predictor_prediction_latency_seconds",
                "Time spent encoding, scaling and running the model for one request",
                &["variant"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_total: register_int_counter_vec!(
                "fitness_predictor_predictions_total",
                "Total number of successful predictions",
                &["variant"]
            )
            .expect("Failed to register predictions_total"),

            prediction_failures_total: register_int_counter_vec!(
                "fitness_predictor_prediction_failures_total",
                "Total number of failed predictions by error kind",
                &["variant", "kind"]
            )
            .expect("Failed to register prediction_failures_total"),

            artifact_info: register_gauge_vec!(
                "fitness_predictor_artifact_info",
                "Loaded model and scaler artifacts",
                &["variant", "role", "checksum"]
            )
            .expect("Failed to register artifact_info"),

            variants_loaded: register_int_gauge!(
                "fitness_predictor_variants_loaded",
                "Number of model variants with loaded artifacts"
            )
            .expect("Failed to register variants_loaded"),
        }
    }
}

/// Predictor metrics for Prometheus exposition
///
/// A lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct PredictorMetrics {
    _private: (),
}

impl Default for PredictorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PredictorMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(PredictorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &PredictorMetricsInner {
        GLOBAL_METRICS.get_or_init(PredictorMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, variant: ModelVariant, elapsed: Duration) {
        self.inner()
            .prediction_latency_seconds
            .with_label_values(&[variant.as_str()])
            .observe(elapsed.as_secs_f64());
    }

    pub fn inc_predictions(&self, variant: ModelVariant) {
        self.inner()
            .predictions_total
            .with_label_values(&[variant.as_str()])
            .inc();
    }

    pub fn inc_failures(&self, variant: ModelVariant, kind: ErrorKind) {
        self.inner()
            .prediction_failures_total
            .with_label_values(&[variant.as_str(), &kind.to_string()])
            .inc();
    }

    /// Record a request outcome: latency plus the success or failure counter
    pub fn record_outcome(&self, outcome: &PredictionOutcome, elapsed: Duration) {
        self.observe_prediction_latency(outcome.variant, elapsed);
        match outcome.error_kind {
            None => self.inc_predictions(outcome.variant),
            Some(kind) => self.inc_failures(outcome.variant, kind),
        }
    }

    /// Publish the loaded artifacts, replacing any previous set
    pub fn set_artifacts<'a>(&self, artifacts: impl IntoIterator<Item = &'a ArtifactInfo>) {
        let gauge = &self.inner().artifact_info;
        gauge.reset();
        let mut variants = Vec::new();
        for info in artifacts {
            gauge
                .with_label_values(&[
                    info.variant.as_str(),
                    &info.role.to_string(),
                    info.checksum_prefix(),
                ])
                .set(1.0);
            if !variants.contains(&info.variant) {
                variants.push(info.variant);
            }
        }
        self.inner().variants_loaded.set(variants.len() as i64);
    }
}

/// Structured logger for predictor events
///
/// Emits one named `event` per significant occurrence so the JSON log
/// stream can be filtered without parsing messages.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn log_startup(&self, version: &str, variants: &[ModelVariant]) {
        let variants: Vec<&str> = variants.iter().map(|v| v.as_str()).collect();
        info!(
            event = "predictor_started",
            instance = %self.instance,
            version = %version,
            variants = %variants.join(","),
            "Fitness predictor started"
        );
    }

    pub fn log_artifact_loaded(&self, artifact: &ArtifactInfo) {
        info!(
            event = "artifact_loaded",
            instance = %self.instance,
            variant = %artifact.variant,
            role = %artifact.role,
            kind = %artifact.kind,
            path = %artifact.path.display(),
            checksum = %artifact.checksum,
            size_bytes = artifact.size_bytes,
            "Artifact loaded"
        );
    }

    pub fn log_prediction(&self, outcome: &PredictionOutcome, elapsed: Duration) {
        if outcome.is_success() {
            info!(
                event = "prediction_generated",
                instance = %self.instance,
                variant = %outcome.variant,
                prediction = outcome.prediction,
                elapsed_us = elapsed.as_micros() as u64,
                "Generated prediction"
            );
        } else {
            warn!(
                event = "prediction_failed",
                instance = %self.instance,
                variant = %outcome.variant,
                kind = ?outcome.error_kind,
                stage = ?outcome.stage,
                message = outcome.message.as_deref().unwrap_or_default(),
                expected_features = ?outcome.expected_features,
                supplied_features = ?outcome.supplied_features,
                "Prediction failed"
            );
        }
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "predictor_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Fitness predictor shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ArtifactRole;
    use crate::predictor::{ArtifactFormat, OutputFormatter, Prediction};
    use crate::models::FeatureVector;
    use chrono::Utc;
    use std::path::PathBuf;

    #[test]
    fn test_metrics_recording() {
        // The registry is process-global; only check that recording works.
        let metrics = PredictorMetrics::new();
        let outcome = OutputFormatter::new().success(&Prediction {
            variant: ModelVariant::Performance,
            value: 81.2,
            features: FeatureVector::default(),
        });
        metrics.record_outcome(&outcome, Duration::from_micros(250));
        metrics.inc_failures(ModelVariant::CalorieBurn, ErrorKind::Scaling);

        let info = ArtifactInfo {
            variant: ModelVariant::Performance,
            role: ArtifactRole::Model,
            path: PathBuf::from("performance_model.onnx"),
            format: ArtifactFormat::Onnx,
            checksum: "0123456789abcdef0123".to_string(),
            size_bytes: 42,
            kind: "onnx".to_string(),
            loaded_at: Utc::now(),
        };
        metrics.set_artifacts([&info]);

        let families = prometheus::gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "fitness_predictor_artifact_info"));
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("test-instance");
        assert_eq!(logger.instance, "test-instance");
        logger.log_startup("0.1.0", &ModelVariant::ALL);
        logger.log_shutdown("test");
    }
}
