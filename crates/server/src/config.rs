//! Server configuration

use anyhow::{Context, Result};
use predictor_lib::predictor::{ArtifactLayout, ModelVariant, OutputConfig};
use serde::Deserialize;
use std::path::PathBuf;

/// Environment variable naming an optional configuration file
pub const CONFIG_FILE_ENV: &str = "FITNESS_CONFIG";

/// Server configuration
///
/// Read from an optional file, then `FITNESS_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Instance name attached to structured log events
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// Port for the prediction, health and metrics API
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Directory holding model and scaler artifacts
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,

    /// Comma-separated variants to load and serve
    #[serde(default = "default_variants")]
    pub variants: String,

    #[serde(default = "default_performance_model")]
    pub performance_model: String,

    #[serde(default = "default_calorie_model")]
    pub calorie_model: String,

    #[serde(default = "default_calorie_scaler")]
    pub calorie_scaler: String,

    /// Decimal places in reported predictions
    #[serde(default = "default_decimal_places")]
    pub decimal_places: u32,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "fitness-predictor".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_artifact_dir() -> PathBuf {
    ArtifactLayout::default().dir
}

fn default_variants() -> String {
    ModelVariant::ALL
        .iter()
        .map(|v| v.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

fn default_performance_model() -> String {
    ArtifactLayout::default().performance_model
}

fn default_calorie_model() -> String {
    ArtifactLayout::default().calorie_model
}

fn default_calorie_scaler() -> String {
    ArtifactLayout::default().calorie_scaler
}

fn default_decimal_places() -> u32 {
    OutputConfig::default().decimal_places
}

impl ServerConfig {
    /// Load configuration from the optional config file and the environment
    pub fn load() -> Result<Self> {
        Self::from_sources(
            std::env::var(CONFIG_FILE_ENV).ok().map(PathBuf::from),
            config::Environment::with_prefix("FITNESS").try_parsing(true),
        )
    }

    pub fn from_sources(file: Option<PathBuf>, env: config::Environment) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path.as_path()).required(true));
        }

        let config = builder
            .add_source(env)
            .build()
            .context("Failed to read configuration sources")?;

        config
            .try_deserialize()
            .context("Invalid server configuration")
    }

    /// Parsed, de-duplicated variant list
    pub fn variants(&self) -> Result<Vec<ModelVariant>> {
        let mut variants = Vec::new();
        for name in self.variants.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let variant: ModelVariant = name
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))
                .context("Invalid FITNESS_VARIANTS")?;
            if !variants.contains(&variant) {
                variants.push(variant);
            }
        }
        if variants.is_empty() {
            anyhow::bail!("FITNESS_VARIANTS names no variants");
        }
        Ok(variants)
    }

    pub fn artifact_layout(&self) -> ArtifactLayout {
        ArtifactLayout {
            dir: self.artifact_dir.clone(),
            performance_model: self.performance_model.clone(),
            calorie_model: self.calorie_model.clone(),
            calorie_scaler: self.calorie_scaler.clone(),
        }
    }

    pub fn output_config(&self) -> OutputConfig {
        OutputConfig {
            decimal_places: self.decimal_places,
        }
    }
}
