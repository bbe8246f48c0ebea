//! Artifact loading
//!
//! Models and scalers are read once at startup from an artifact directory,
//! checksummed, and validated against the variant schema. Any failure here is
//! a `LoadError` and the caller is expected to abort.

use super::inference::{ModelArtifact, OnnxModel};
use super::scaler::ScalerArtifact;
use super::schema::ModelVariant;
use super::{Model, Scaler};
use crate::error::{ArtifactRole, LoadError, SchemaMismatch};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

pub const DEFAULT_ARTIFACT_DIR: &str = "artifacts";
pub const DEFAULT_PERFORMANCE_MODEL: &str = "performance_model.onnx";
pub const DEFAULT_CALORIE_MODEL: &str = "calorie_model.onnx";
pub const DEFAULT_CALORIE_SCALER: &str = "calorie_scaler.json";

/// Where each variant's artifacts live
///
/// File names are resolved relative to `dir` unless absolute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactLayout {
    pub dir: PathBuf,
    pub performance_model: String,
    pub calorie_model: String,
    pub calorie_scaler: String,
}

impl Default for ArtifactLayout {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_ARTIFACT_DIR),
            performance_model: DEFAULT_PERFORMANCE_MODEL.to_string(),
            calorie_model: DEFAULT_CALORIE_MODEL.to_string(),
            calorie_scaler: DEFAULT_CALORIE_SCALER.to_string(),
        }
    }
}

impl ArtifactLayout {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }

    pub fn model_path(&self, variant: ModelVariant) -> PathBuf {
        let file = match variant {
            ModelVariant::Performance => &self.performance_model,
            ModelVariant::CalorieBurn => &self.calorie_model,
        };
        self.dir.join(file)
    }

    /// Scaler path, for variants that use one
    pub fn scaler_path(&self, variant: ModelVariant) -> Option<PathBuf> {
        variant
            .requires_scaler()
            .then(|| self.dir.join(&self.calorie_scaler))
    }
}

/// On-disk artifact format, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    Onnx,
    Json,
}

impl ArtifactFormat {
    pub fn from_path(role: ArtifactRole, path: &Path) -> Result<Self, LoadError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("onnx") if role == ArtifactRole::Model => Ok(ArtifactFormat::Onnx),
            Some("json") => Ok(ArtifactFormat::Json),
            _ => Err(LoadError::UnsupportedFormat {
                role,
                path: path.to_path_buf(),
            }),
        }
    }
}

/// Provenance of one loaded artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactInfo {
    pub variant: ModelVariant,
    pub role: ArtifactRole,
    pub path: PathBuf,
    pub format: ArtifactFormat,
    /// Hex SHA-256 of the file contents
    pub checksum: String,
    pub size_bytes: usize,
    /// Model or scaler kind reported by the artifact
    pub kind: String,
    pub loaded_at: DateTime<Utc>,
}

impl ArtifactInfo {
    pub fn checksum_prefix(&self) -> &str {
        let end = self.checksum.len().min(12);
        &self.checksum[..end]
    }
}

/// Everything one variant needs, immutable once loaded
#[derive(Clone)]
pub struct LoadedArtifacts {
    pub variant: ModelVariant,
    pub model: Arc<dyn Model>,
    pub scaler: Option<Arc<dyn Scaler>>,
    pub model_info: ArtifactInfo,
    pub scaler_info: Option<ArtifactInfo>,
}

impl LoadedArtifacts {
    pub fn infos(&self) -> impl Iterator<Item = &ArtifactInfo> {
        std::iter::once(&self.model_info).chain(self.scaler_info.iter())
    }
}

impl std::fmt::Debug for LoadedArtifacts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedArtifacts")
            .field("variant", &self.variant)
            .field("model", &self.model.kind())
            .field("scaler", &self.scaler.as_ref().map(|s| s.kind()))
            .field("model_info", &self.model_info)
            .field("scaler_info", &self.scaler_info)
            .finish()
    }
}

/// Loads artifacts described by an `ArtifactLayout`
#[derive(Debug, Clone)]
pub struct ArtifactLoader {
    layout: ArtifactLayout,
}

impl ArtifactLoader {
    pub fn new(layout: ArtifactLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    /// Load and validate every artifact for each variant, stopping at the first failure
    pub fn load_all(&self, variants: &[ModelVariant]) -> Result<Vec<LoadedArtifacts>, LoadError> {
        variants.iter().map(|v| self.load_variant(*v)).collect()
    }

    pub fn load_variant(&self, variant: ModelVariant) -> Result<LoadedArtifacts, LoadError> {
        let (model, model_info) = self.load_model(variant, &self.layout.model_path(variant))?;

        let (scaler, scaler_info) = match self.layout.scaler_path(variant) {
            Some(path) => {
                let (scaler, info) = self.load_scaler(variant, &path)?;
                (Some(scaler), Some(info))
            }
            None => (None, None),
        };

        validate_artifacts(variant, model.as_ref(), scaler.as_deref())?;

        info!(
            variant = %variant,
            model_kind = model.kind(),
            model_checksum = %model_info.checksum,
            scaler_checksum = scaler_info.as_ref().map(|i| i.checksum.as_str()).unwrap_or("-"),
            "Artifacts loaded"
        );

        Ok(LoadedArtifacts {
            variant,
            model,
            scaler,
            model_info,
            scaler_info,
        })
    }

    pub fn load_model(
        &self,
        variant: ModelVariant,
        path: &Path,
    ) -> Result<(Arc<dyn Model>, ArtifactInfo), LoadError> {
        let role = ArtifactRole::Model;
        let format = ArtifactFormat::from_path(role, path)?;
        let bytes = read_artifact(role, path)?;

        let model: Arc<dyn Model> = match format {
            // Graphs with a symbolic input width are sized to the schema
            ArtifactFormat::Onnx => OnnxModel::from_bytes(&bytes, variant.feature_count())
                .map(|m| Arc::new(m) as Arc<dyn Model>),
            ArtifactFormat::Json => ModelArtifact::from_json(&bytes).map(|a| Arc::from(a.into_model())),
        }
        .map_err(|e| LoadError::Deserialize {
            role,
            path: path.to_path_buf(),
            reason: format!("{:#}", e),
        })?;

        let info = artifact_info(variant, role, path, format, &bytes, model.kind());
        Ok((model, info))
    }

    pub fn load_scaler(
        &self,
        variant: ModelVariant,
        path: &Path,
    ) -> Result<(Arc<dyn Scaler>, ArtifactInfo), LoadError> {
        let role = ArtifactRole::Scaler;
        let format = ArtifactFormat::from_path(role, path)?;
        let bytes = read_artifact(role, path)?;

        let scaler = ScalerArtifact::from_json(&bytes).map_err(|e| LoadError::Deserialize {
            role,
            path: path.to_path_buf(),
            reason: format!("{:#}", e),
        })?;

        let info = artifact_info(variant, role, path, format, &bytes, scaler.kind());
        Ok((Arc::new(scaler), info))
    }
}

fn read_artifact(role: ArtifactRole, path: &Path) -> Result<Vec<u8>, LoadError> {
    debug!(role = %role, path = ?path, "Reading artifact");
    fs::read(path).map_err(|source| match source.kind() {
        IoErrorKind::NotFound => LoadError::NotFound {
            role,
            path: path.to_path_buf(),
        },
        _ => LoadError::Unreadable {
            role,
            path: path.to_path_buf(),
            source,
        },
    })
}

fn artifact_info(
    variant: ModelVariant,
    role: ArtifactRole,
    path: &Path,
    format: ArtifactFormat,
    bytes: &[u8],
    kind: &str,
) -> ArtifactInfo {
    ArtifactInfo {
        variant,
        role,
        path: path.to_path_buf(),
        format,
        checksum: compute_checksum(bytes),
        size_bytes: bytes.len(),
        kind: kind.to_string(),
        loaded_at: Utc::now(),
    }
}

/// Check that the artifacts declare the variant's schema.
///
/// Declared names are compared exactly, order included. Artifacts that only
/// expose a width are checked on count.
pub fn validate_artifacts(
    variant: ModelVariant,
    model: &dyn Model,
    scaler: Option<&dyn Scaler>,
) -> Result<(), LoadError> {
    let schema = variant.feature_names();

    match scaler {
        Some(scaler) => check_schema(
            variant,
            ArtifactRole::Scaler,
            &schema,
            scaler.feature_names(),
            Some(scaler.n_features()),
        )?,
        None if variant.requires_scaler() => return Err(LoadError::MissingScaler { variant }),
        None => {}
    }

    check_schema(
        variant,
        ArtifactRole::Model,
        &schema,
        model.feature_names(),
        model.n_features(),
    )
}

fn check_schema(
    variant: ModelVariant,
    role: ArtifactRole,
    schema: &[String],
    declared: Option<&[String]>,
    width: Option<usize>,
) -> Result<(), LoadError> {
    if let Some(declared) = declared {
        if let Some(mismatch) = SchemaMismatch::compare(declared, schema) {
            return Err(LoadError::SchemaMismatch {
                role,
                variant,
                mismatch,
            });
        }
    } else if let Some(expected) = width {
        if expected != schema.len() {
            return Err(LoadError::FeatureCount {
                role,
                variant,
                expected,
                actual: schema.len(),
            });
        }
    }
    Ok(())
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
