//! Error taxonomy for the prediction pipeline
//!
//! Per-request failures (`EncodingError`, `ScalingError`, `InferenceError`)
//! are recoverable and reported to the caller; `LoadError` is fatal at startup.

use crate::predictor::ModelVariant;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Boxed underlying failure from an opaque artifact
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Expected vs supplied feature names, kept as data rather than text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaMismatch {
    pub expected: Vec<String>,
    pub supplied: Vec<String>,
}

impl SchemaMismatch {
    /// Compare two name lists; `None` when they match exactly, order included
    pub fn compare(expected: &[String], supplied: &[String]) -> Option<Self> {
        if expected == supplied {
            return None;
        }
        Some(Self {
            expected: expected.to_vec(),
            supplied: supplied.to_vec(),
        })
    }

    /// Names the artifact expects that were not supplied
    pub fn missing(&self) -> Vec<&str> {
        self.expected
            .iter()
            .filter(|name| !self.supplied.contains(name))
            .map(String::as_str)
            .collect()
    }

    /// Supplied names the artifact does not know
    pub fn unexpected(&self) -> Vec<&str> {
        self.supplied
            .iter()
            .filter(|name| !self.expected.contains(name))
            .map(String::as_str)
            .collect()
    }

    /// First position where the two lists disagree
    pub fn first_divergence(&self) -> Option<usize> {
        self.expected
            .iter()
            .zip(self.supplied.iter())
            .position(|(e, s)| e != s)
            .or_else(|| {
                (self.expected.len() != self.supplied.len())
                    .then(|| self.expected.len().min(self.supplied.len()))
            })
    }

    /// Same names, different order
    pub fn is_reordering(&self) -> bool {
        self.expected.len() == self.supplied.len()
            && self.missing().is_empty()
            && self.unexpected().is_empty()
    }
}

impl fmt::Display for SchemaMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "expected {} features [{}], supplied {} [{}]",
            self.expected.len(),
            self.expected.join(", "),
            self.supplied.len(),
            self.supplied.join(", ")
        )?;
        let missing = self.missing();
        if !missing.is_empty() {
            write!(f, "; missing: {}", missing.join(", "))?;
        }
        let unexpected = self.unexpected();
        if !unexpected.is_empty() {
            write!(f, "; unexpected: {}", unexpected.join(", "))?;
        }
        if self.is_reordering() {
            if let Some(idx) = self.first_divergence() {
                write!(f, "; order differs at position {}", idx)?;
            }
        }
        Ok(())
    }
}

/// Raw input could not be turned into a feature vector
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodingError {
    #[error("missing required field {field}")]
    MissingField { field: String },

    #[error("field {field} must be numeric, got {value}")]
    NotNumeric { field: String, value: String },

    #[error("field {field} must be a finite number")]
    NonFinite { field: String },

    #[error("field {field} value {value} is not one of: {}", .allowed.join(", "))]
    UnknownCategory {
        field: String,
        value: String,
        allowed: &'static [&'static str],
    },

    #[error("cannot derive {feature}: {reason}")]
    InvalidDerived { feature: String, reason: String },
}

impl EncodingError {
    /// Raw field (or derived feature) the error refers to
    pub fn field(&self) -> &str {
        match self {
            EncodingError::MissingField { field }
            | EncodingError::NotNumeric { field, .. }
            | EncodingError::NonFinite { field }
            | EncodingError::UnknownCategory { field, .. } => field,
            EncodingError::InvalidDerived { feature, .. } => feature,
        }
    }
}

/// The scaler rejected or mangled a feature vector
#[derive(Debug, Error)]
pub enum ScalingError {
    #[error("scaler schema mismatch: {0}")]
    SchemaMismatch(SchemaMismatch),

    #[error("scaler was fitted on {expected} features, {} supplied", .supplied.len())]
    FeatureCount {
        expected: usize,
        supplied: Vec<String>,
    },

    #[error("scaler transform failed: {0}")]
    Transform(#[source] BoxError),

    #[error("scaler produced {actual} values for {expected} features")]
    OutputLength { expected: usize, actual: usize },

    #[error("scaler produced a non-finite value for {feature}")]
    NonFinite { feature: String },
}

/// Why a model call failed
#[derive(Debug, Error)]
pub enum InferenceCause {
    #[error("supplied feature names differ from the model's expected names")]
    SchemaMismatch,

    #[error("model expects {expected} features, {supplied} supplied")]
    FeatureCount { expected: usize, supplied: usize },

    #[error("model call failed: {0}")]
    Model(#[source] BoxError),

    #[error("model returned a non-finite prediction ({0})")]
    NonFinite(f64),
}

/// Model invocation failure with the feature comparison attached
#[derive(Debug, Error)]
#[error("inference failed: {cause}")]
pub struct InferenceError {
    /// Feature names the model declares, when it exposes them
    pub expected: Option<Vec<String>>,
    /// Feature names actually handed to the model
    pub supplied: Vec<String>,
    #[source]
    pub cause: InferenceCause,
}

impl InferenceError {
    pub fn mismatch(&self) -> Option<SchemaMismatch> {
        self.expected
            .as_deref()
            .and_then(|expected| SchemaMismatch::compare(expected, &self.supplied))
    }
}

/// Role an artifact plays for a variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactRole {
    Model,
    Scaler,
}

impl fmt::Display for ArtifactRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactRole::Model => f.write_str("model"),
            ArtifactRole::Scaler => f.write_str("scaler"),
        }
    }
}

/// Artifact could not be loaded; fatal at startup
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{role} artifact not found at {path:?}")]
    NotFound { role: ArtifactRole, path: PathBuf },

    #[error("failed to read {role} artifact {path:?}: {source}")]
    Unreadable {
        role: ArtifactRole,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to deserialize {role} artifact {path:?}: {reason}")]
    Deserialize {
        role: ArtifactRole,
        path: PathBuf,
        reason: String,
    },

    #[error("unsupported {role} artifact format {path:?} (expected .onnx or .json)")]
    UnsupportedFormat { role: ArtifactRole, path: PathBuf },

    #[error("{role} does not match the {variant} schema: {mismatch}")]
    SchemaMismatch {
        role: ArtifactRole,
        variant: ModelVariant,
        mismatch: SchemaMismatch,
    },

    #[error("{role} expects {expected} features, the {variant} schema has {actual}")]
    FeatureCount {
        role: ArtifactRole,
        variant: ModelVariant,
        expected: usize,
        actual: usize,
    },

    #[error("variant {variant} requires a scaler artifact")]
    MissingScaler { variant: ModelVariant },
}

/// Coarse error category reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Encoding,
    Scaling,
    Inference,
    Load,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Encoding => "encoding",
            ErrorKind::Scaling => "scaling",
            ErrorKind::Inference => "inference",
            ErrorKind::Load => "load",
        };
        f.write_str(s)
    }
}

/// Pipeline step a request was in when it failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Encoding,
    Scaling,
    Inference,
}

/// Any recoverable per-request failure
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Scaling(#[from] ScalingError),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl PredictionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PredictionError::Encoding(_) => ErrorKind::Encoding,
            PredictionError::Scaling(_) => ErrorKind::Scaling,
            PredictionError::Inference(_) => ErrorKind::Inference,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            PredictionError::Encoding(_) => Stage::Encoding,
            PredictionError::Scaling(_) => Stage::Scaling,
            PredictionError::Inference(_) => Stage::Inference,
        }
    }

    /// Feature names the failing artifact expects, when known
    pub fn expected_features(&self) -> Option<&[String]> {
        match self {
            PredictionError::Encoding(_) => None,
            PredictionError::Scaling(ScalingError::SchemaMismatch(m)) => Some(m.expected.as_slice()),
            PredictionError::Scaling(_) => None,
            PredictionError::Inference(e) => e.expected.as_deref(),
        }
    }

    /// Feature names that were handed to the failing artifact
    pub fn supplied_features(&self) -> Option<&[String]> {
        match self {
            PredictionError::Encoding(_) => None,
            PredictionError::Scaling(ScalingError::SchemaMismatch(m)) => Some(m.supplied.as_slice()),
            PredictionError::Scaling(ScalingError::FeatureCount { supplied, .. }) => {
                Some(supplied.as_slice())
            }
            PredictionError::Scaling(_) => None,
            PredictionError::Inference(e) => Some(e.supplied.as_slice()),
        }
    }
}
