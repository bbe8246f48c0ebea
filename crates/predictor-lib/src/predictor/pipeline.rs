//! Per-request prediction pipeline
//!
//! `Collected -> Encoded -> [Scaled] -> Predicted | Failed`. A pipeline holds
//! only immutable, shared artifacts, so one value serves concurrent callers.

use super::features::FeatureEncoder;
use super::inference::invoke_model;
use super::loader::{validate_artifacts, LoadedArtifacts};
use super::scaler::scale_features;
use super::schema::ModelVariant;
use super::{Model, Scaler};
use crate::error::{LoadError, PredictionError};
use crate::models::{FeatureVector, RawInput};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Successful prediction with the vector the model actually saw
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub variant: ModelVariant,
    pub value: f64,
    pub features: FeatureVector,
}

/// Encoder, optional scaler and model for one variant
#[derive(Clone)]
pub struct PredictionPipeline {
    encoder: FeatureEncoder,
    model: Arc<dyn Model>,
    scaler: Option<Arc<dyn Scaler>>,
}

impl PredictionPipeline {
    /// Build a pipeline from injected artifacts, checking them against the variant schema
    pub fn new(
        variant: ModelVariant,
        model: Arc<dyn Model>,
        scaler: Option<Arc<dyn Scaler>>,
    ) -> Result<Self, LoadError> {
        validate_artifacts(variant, model.as_ref(), scaler.as_deref())?;
        Ok(Self {
            encoder: FeatureEncoder::new(variant),
            model,
            scaler,
        })
    }

    pub fn from_artifacts(artifacts: &LoadedArtifacts) -> Result<Self, LoadError> {
        Self::new(
            artifacts.variant,
            Arc::clone(&artifacts.model),
            artifacts.scaler.clone(),
        )
    }

    pub fn variant(&self) -> ModelVariant {
        self.encoder.variant()
    }

    pub fn has_scaler(&self) -> bool {
        self.scaler.is_some()
    }

    /// Encode and, when configured, scale without invoking the model
    pub fn prepare(&self, input: &RawInput) -> Result<FeatureVector, PredictionError> {
        let variant = self.variant();
        let encoded = self.encoder.encode(input)?;
        debug!(variant = %variant, features = encoded.len(), "Input encoded");

        match &self.scaler {
            Some(scaler) => {
                let scaled = scale_features(scaler.as_ref(), &encoded)?;
                debug!(variant = %variant, scaler = scaler.kind(), "Features scaled");
                Ok(scaled)
            }
            None => Ok(encoded),
        }
    }

    pub fn predict(&self, input: &RawInput) -> Result<Prediction, PredictionError> {
        let features = self.prepare(input)?;
        let value = invoke_model(self.model.as_ref(), &features)?;
        debug!(variant = %self.variant(), value, "Prediction generated");

        Ok(Prediction {
            variant: self.variant(),
            value,
            features,
        })
    }
}

impl std::fmt::Debug for PredictionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictionPipeline")
            .field("variant", &self.variant())
            .field("model", &self.model.kind())
            .field("scaler", &self.scaler.as_ref().map(|s| s.kind()))
            .finish()
    }
}

/// One pipeline per loaded variant
#[derive(Debug, Clone, Default)]
pub struct PredictorRegistry {
    pipelines: BTreeMap<ModelVariant, PredictionPipeline>,
}

impl PredictorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_artifacts(loaded: &[LoadedArtifacts]) -> Result<Self, LoadError> {
        let mut registry = Self::new();
        for artifacts in loaded {
            registry.insert(PredictionPipeline::from_artifacts(artifacts)?);
        }
        Ok(registry)
    }

    /// Add a pipeline, replacing any existing one for the same variant
    pub fn insert(&mut self, pipeline: PredictionPipeline) {
        self.pipelines.insert(pipeline.variant(), pipeline);
    }

    pub fn get(&self, variant: ModelVariant) -> Option<&PredictionPipeline> {
        self.pipelines.get(&variant)
    }

    pub fn variants(&self) -> Vec<ModelVariant> {
        self.pipelines.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }
}
