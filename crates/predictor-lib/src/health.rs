//! Health and readiness reporting
//!
//! Artifacts are loaded once before the service accepts requests, so health
//! is a snapshot taken at startup: which configured variants have loaded
//! artifacts, and their checksums.

use crate::predictor::{ArtifactInfo, LoadedArtifacts, ModelVariant};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    Unhealthy,
}

/// Artifact summary for one role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactSummary {
    pub kind: String,
    pub checksum: String,
    pub size_bytes: usize,
    pub loaded_at: DateTime<Utc>,
}

impl From<&ArtifactInfo> for ArtifactSummary {
    fn from(info: &ArtifactInfo) -> Self {
        Self {
            kind: info.kind.clone(),
            checksum: info.checksum.clone(),
            size_bytes: info.size_bytes,
            loaded_at: info.loaded_at,
        }
    }
}

/// Health of one model variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<ArtifactSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scaler: Option<ArtifactSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Overall health response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub version: String,
    pub variants: BTreeMap<ModelVariant, VariantHealth>,
}

/// Readiness response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub variants: Vec<ModelVariant>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Startup snapshot of configured and loaded variants
#[derive(Debug, Clone)]
pub struct HealthReport {
    version: String,
    variants: BTreeMap<ModelVariant, VariantHealth>,
}

impl HealthReport {
    pub fn new(
        version: impl Into<String>,
        configured: &[ModelVariant],
        loaded: &[LoadedArtifacts],
    ) -> Self {
        let mut variants = BTreeMap::new();
        for variant in configured {
            let health = match loaded.iter().find(|a| a.variant == *variant) {
                Some(artifacts) => VariantHealth {
                    status: ComponentStatus::Healthy,
                    model: Some(ArtifactSummary::from(&artifacts.model_info)),
                    scaler: artifacts.scaler_info.as_ref().map(ArtifactSummary::from),
                    message: None,
                },
                None => VariantHealth {
                    status: ComponentStatus::Unhealthy,
                    model: None,
                    scaler: None,
                    message: Some("artifacts not loaded".to_string()),
                },
            };
            variants.insert(*variant, health);
        }
        Self {
            version: version.into(),
            variants,
        }
    }

    pub fn health(&self) -> HealthResponse {
        let status = if self
            .variants
            .values()
            .all(|v| v.status == ComponentStatus::Healthy)
        {
            ComponentStatus::Healthy
        } else {
            ComponentStatus::Unhealthy
        };
        HealthResponse {
            status,
            version: self.version.clone(),
            variants: self.variants.clone(),
        }
    }

    pub fn readiness(&self) -> ReadinessResponse {
        let ready_variants: Vec<ModelVariant> = self
            .variants
            .iter()
            .filter(|(_, h)| h.status == ComponentStatus::Healthy)
            .map(|(v, _)| *v)
            .collect();

        let reason = if self.variants.is_empty() {
            Some("No variants configured".to_string())
        } else if ready_variants.len() < self.variants.len() {
            Some("Some configured variants have no loaded artifacts".to_string())
        } else {
            None
        };

        ReadinessResponse {
            ready: reason.is_none(),
            variants: ready_variants,
            reason,
        }
    }
}
