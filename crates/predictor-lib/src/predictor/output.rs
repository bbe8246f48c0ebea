//! Prediction output formatting
//!
//! Turns a pipeline result into a serializable outcome: the rounded value and
//! label on success, or the error kind, stage and feature comparison on
//! failure.

use super::pipeline::Prediction;
use super::schema::ModelVariant;
use crate::error::{ErrorKind, PredictionError, Stage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Decimal places reported by default
pub const DEFAULT_DECIMAL_PLACES: u32 = 2;

/// Configuration for output formatting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub decimal_places: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            decimal_places: DEFAULT_DECIMAL_PLACES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    Failure,
}

/// Result of one prediction request, as reported to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionOutcome {
    pub variant: ModelVariant,
    pub status: OutcomeStatus,
    /// e.g. "Predicted Calories Burned"
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<f64>,
    /// Unrounded model output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_features: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplied_features: Option<Vec<String>>,
    pub generated_at: DateTime<Utc>,
}

impl PredictionOutcome {
    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }

    /// One-line human summary
    pub fn headline(&self, decimal_places: u32) -> String {
        match (self.status, self.prediction) {
            (OutcomeStatus::Success, Some(value)) => format!(
                "{}: {:.*}",
                self.label,
                decimal_places as usize,
                value
            ),
            _ => format!(
                "{} failed: {}",
                self.label,
                self.message.as_deref().unwrap_or("unknown error")
            ),
        }
    }
}

/// Formats pipeline results into `PredictionOutcome`s
#[derive(Debug, Clone, Default)]
pub struct OutputFormatter {
    config: OutputConfig,
}

impl OutputFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: OutputConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> OutputConfig {
        self.config
    }

    /// Round half away from zero to the configured decimal places
    pub fn round(&self, value: f64) -> f64 {
        let factor = 10f64.powi(self.config.decimal_places as i32);
        (value * factor).round() / factor
    }

    pub fn success(&self, prediction: &Prediction) -> PredictionOutcome {
        PredictionOutcome {
            variant: prediction.variant,
            status: OutcomeStatus::Success,
            label: label(prediction.variant),
            prediction: Some(self.round(prediction.value)),
            raw_value: Some(prediction.value),
            error_kind: None,
            message: None,
            stage: None,
            expected_features: None,
            supplied_features: None,
            generated_at: Utc::now(),
        }
    }

    pub fn failure(&self, variant: ModelVariant, error: &PredictionError) -> PredictionOutcome {
        PredictionOutcome {
            variant,
            status: OutcomeStatus::Failure,
            label: label(variant),
            prediction: None,
            raw_value: None,
            error_kind: Some(error.kind()),
            message: Some(error.to_string()),
            stage: Some(error.stage()),
            expected_features: error.expected_features().map(<[String]>::to_vec),
            supplied_features: error.supplied_features().map(<[String]>::to_vec),
            generated_at: Utc::now(),
        }
    }

    pub fn from_result(
        &self,
        variant: ModelVariant,
        result: &Result<Prediction, PredictionError>,
    ) -> PredictionOutcome {
        match result {
            Ok(prediction) => self.success(prediction),
            Err(e) => self.failure(variant, e),
        }
    }
}

fn label(variant: ModelVariant) -> String {
    format!("Predicted {}", variant.target_label())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EncodingError, InferenceCause, InferenceError};
    use crate::models::FeatureVector;

    fn prediction(value: f64) -> Prediction {
        Prediction {
            variant: ModelVariant::CalorieBurn,
            value,
            features: FeatureVector::default(),
        }
    }

    #[test]
    fn test_rounds_to_two_places() {
        let formatter = OutputFormatter::new();
        assert_eq!(formatter.round(312.4567), 312.46);
        assert_eq!(formatter.round(-10.054), -10.05);
        assert_eq!(formatter.round(7.0), 7.0);
    }

    #[test]
    fn test_configurable_places() {
        let formatter = OutputFormatter::with_config(OutputConfig { decimal_places: 0 });
        assert_eq!(formatter.round(84.6), 85.0);
    }

    #[test]
    fn test_success_outcome() {
        let outcome = OutputFormatter::new().success(&prediction(312.4567));
        assert!(outcome.is_success());
        assert_eq!(outcome.label, "Predicted Calories Burned");
        assert_eq!(outcome.prediction, Some(312.46));
        assert_eq!(outcome.raw_value, Some(312.4567));
        assert_eq!(outcome.headline(2), "Predicted Calories Burned: 312.46");

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "success");
        assert!(json.get("error_kind").is_none());
    }

    #[test]
    fn test_failure_outcome_carries_diagnostics() {
        let err: PredictionError = InferenceError {
            expected: Some(vec!["a".to_string(), "b".to_string()]),
            supplied: vec!["b".to_string(), "a".to_string()],
            cause: InferenceCause::SchemaMismatch,
        }
        .into();
        let outcome = OutputFormatter::new().failure(ModelVariant::Performance, &err);
        assert!(!outcome.is_success());
        assert_eq!(outcome.prediction, None);
        assert_eq!(outcome.error_kind, Some(ErrorKind::Inference));
        assert_eq!(outcome.stage, Some(Stage::Inference));
        assert_eq!(outcome.expected_features.as_deref().unwrap(), ["a", "b"]);
        assert_eq!(outcome.supplied_features.as_deref().unwrap(), ["b", "a"]);

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["error_kind"], "inference");
        assert_eq!(json["stage"], "inference");
    }

    #[test]
    fn test_encoding_failure_has_no_feature_lists() {
        let err: Result<Prediction, PredictionError> = Err(EncodingError::MissingField {
            field: "Age".to_string(),
        }
        .into());
        let outcome = OutputFormatter::new().from_result(ModelVariant::Performance, &err);
        assert_eq!(outcome.error_kind, Some(ErrorKind::Encoding));
        assert!(outcome.expected_features.is_none());
        assert!(outcome.headline(2).contains("missing required field Age"));
    }
}
