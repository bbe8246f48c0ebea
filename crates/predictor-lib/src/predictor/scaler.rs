//! Pre-fitted feature scaling
//!
//! Scaler artifacts are JSON documents holding the fitted parameters of a
//! standard or min-max scaler, optionally with the feature names they were
//! fitted on.

use super::Scaler;
use crate::error::{ScalingError, SchemaMismatch};
use crate::models::FeatureVector;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Fitted scaler parameters as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScalerArtifact {
    /// `(x - mean) / scale`
    Standard {
        #[serde(default)]
        feature_names: Option<Vec<String>>,
        mean: Vec<f64>,
        scale: Vec<f64>,
    },
    /// `x * scale + min`
    MinMax {
        #[serde(default)]
        feature_names: Option<Vec<String>>,
        min: Vec<f64>,
        scale: Vec<f64>,
    },
}

impl ScalerArtifact {
    /// Parse and validate a JSON scaler artifact
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let artifact: ScalerArtifact = serde_json::from_slice(bytes)?;
        artifact.validate()?;
        Ok(artifact)
    }

    fn validate(&self) -> Result<()> {
        let (names, offsets, scale) = match self {
            ScalerArtifact::Standard {
                feature_names,
                mean,
                scale,
            } => (feature_names, mean, scale),
            ScalerArtifact::MinMax {
                feature_names,
                min,
                scale,
            } => (feature_names, min, scale),
        };

        if offsets.is_empty() {
            bail!("scaler has no fitted features");
        }
        if offsets.len() != scale.len() {
            bail!(
                "scaler parameter lengths differ: {} offsets, {} scales",
                offsets.len(),
                scale.len()
            );
        }
        if let Some(names) = names {
            if names.len() != offsets.len() {
                bail!(
                    "scaler declares {} feature names for {} fitted features",
                    names.len(),
                    offsets.len()
                );
            }
        }
        if offsets.iter().chain(scale.iter()).any(|v| !v.is_finite()) {
            bail!("scaler parameters contain non-finite values");
        }
        if matches!(self, ScalerArtifact::Standard { .. }) && scale.iter().any(|s| *s == 0.0) {
            bail!("standard scaler has a zero scale");
        }
        Ok(())
    }
}

impl Scaler for ScalerArtifact {
    fn feature_names(&self) -> Option<&[String]> {
        match self {
            ScalerArtifact::Standard { feature_names, .. }
            | ScalerArtifact::MinMax { feature_names, .. } => feature_names.as_deref(),
        }
    }

    fn n_features(&self) -> usize {
        match self {
            ScalerArtifact::Standard { scale, .. } | ScalerArtifact::MinMax { scale, .. } => {
                scale.len()
            }
        }
    }

    fn transform_values(&self, values: &[f64]) -> Result<Vec<f64>> {
        if values.len() != self.n_features() {
            bail!(
                "expected {} values, got {}",
                self.n_features(),
                values.len()
            );
        }
        let out = match self {
            ScalerArtifact::Standard { mean, scale, .. } => values
                .iter()
                .zip(mean.iter().zip(scale.iter()))
                .map(|(x, (m, s))| (x - m) / s)
                .collect(),
            ScalerArtifact::MinMax { min, scale, .. } => values
                .iter()
                .zip(min.iter().zip(scale.iter()))
                .map(|(x, (m, s))| x * s + m)
                .collect(),
        };
        Ok(out)
    }

    fn kind(&self) -> &'static str {
        match self {
            ScalerArtifact::Standard { .. } => "standard",
            ScalerArtifact::MinMax { .. } => "min_max",
        }
    }
}

/// Run the scaling stage: check the schema, transform, check the output
pub fn scale_features(
    scaler: &dyn Scaler,
    features: &FeatureVector,
) -> Result<FeatureVector, ScalingError> {
    match scaler.feature_names() {
        Some(expected) => {
            if let Some(mismatch) = SchemaMismatch::compare(expected, features.names()) {
                return Err(ScalingError::SchemaMismatch(mismatch));
            }
        }
        None => {
            if scaler.n_features() != features.len() {
                return Err(ScalingError::FeatureCount {
                    expected: scaler.n_features(),
                    supplied: features.names().to_vec(),
                });
            }
        }
    }

    let values = scaler
        .transform_values(features.values())
        .map_err(|e| ScalingError::Transform(e.into()))?;

    if let Some((name, _)) = features
        .names()
        .iter()
        .zip(values.iter())
        .find(|(_, v)| !v.is_finite())
    {
        return Err(ScalingError::NonFinite {
            feature: name.clone(),
        });
    }

    let actual = values.len();
    features
        .with_values(values)
        .ok_or(ScalingError::OutputLength {
            expected: features.len(),
            actual,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features() -> FeatureVector {
        [("a", 2.0), ("b", 10.0), ("c", -1.0)].into_iter().collect()
    }

    fn standard(names: Option<Vec<&str>>) -> ScalerArtifact {
        ScalerArtifact::Standard {
            feature_names: names.map(|n| n.into_iter().map(String::from).collect()),
            mean: vec![1.0, 10.0, 0.0],
            scale: vec![0.5, 2.0, 4.0],
        }
    }

    #[test]
    fn test_standard_transform() {
        let scaled = scale_features(&standard(None), &features()).unwrap();
        assert_eq!(scaled.values(), &[2.0, 0.0, -0.25]);
        assert_eq!(scaled.names(), features().names());
    }

    #[test]
    fn test_min_max_transform() {
        let scaler = ScalerArtifact::MinMax {
            feature_names: None,
            min: vec![0.0, -1.0, 0.5],
            scale: vec![0.5, 0.1, 1.0],
        };
        let scaled = scale_features(&scaler, &features()).unwrap();
        assert_eq!(scaled.values(), &[1.0, 0.0, -0.5]);
    }

    #[test]
    fn test_scaling_is_deterministic() {
        let scaler = standard(Some(vec!["a", "b", "c"]));
        let first = scale_features(&scaler, &features()).unwrap();
        assert_eq!(scale_features(&scaler, &features()).unwrap(), first);
    }

    #[test]
    fn test_name_mismatch_reports_both_lists() {
        let scaler = standard(Some(vec!["a", "c", "b"]));
        match scale_features(&scaler, &features()).unwrap_err() {
            ScalingError::SchemaMismatch(m) => {
                assert_eq!(m.expected, vec!["a", "c", "b"]);
                assert_eq!(m.supplied, vec!["a", "b", "c"]);
                assert!(m.is_reordering());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_count_mismatch_without_names() {
        let short: FeatureVector = [("a", 1.0), ("b", 2.0)].into_iter().collect();
        match scale_features(&standard(None), &short).unwrap_err() {
            ScalingError::FeatureCount { expected, supplied } => {
                assert_eq!(expected, 3);
                assert_eq!(supplied, vec!["a", "b"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_artifact_from_json() {
        let json = br#"{"kind": "standard", "feature_names": ["a", "b"], "mean": [1, 2], "scale": [1, 1]}"#;
        let scaler = ScalerArtifact::from_json(json).unwrap();
        assert_eq!(scaler.n_features(), 2);
        assert_eq!(scaler.kind(), "standard");
        assert_eq!(scaler.feature_names().unwrap(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_invalid_artifacts_rejected() {
        let zero = br#"{"kind": "standard", "mean": [1, 2], "scale": [1, 0]}"#;
        assert!(ScalerArtifact::from_json(zero).is_err());

        let lengths = br#"{"kind": "min_max", "min": [1, 2], "scale": [1]}"#;
        assert!(ScalerArtifact::from_json(lengths).is_err());

        let names = br#"{"kind": "standard", "feature_names": ["a"], "mean": [1, 2], "scale": [1, 1]}"#;
        assert!(ScalerArtifact::from_json(names).is_err());

        let kind = br#"{"kind": "robust", "mean": [1], "scale": [1]}"#;
        assert!(ScalerArtifact::from_json(kind).is_err());
    }
}
