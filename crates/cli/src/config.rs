//! Configuration management for the CLI

use anyhow::{Context, Result};
use predictor_lib::predictor::ArtifactLayout;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Overrides the config file location
pub const CONFIG_PATH_ENV: &str = "FITP_CONFIG";

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Default artifact directory
    pub artifact_dir: Option<PathBuf>,
    pub performance_model: Option<String>,
    pub calorie_model: Option<String>,
    pub calorie_scaler: Option<String>,
}

impl Config {
    /// Load configuration from file; a missing file yields the defaults
    pub fn load() -> Result<Self> {
        let Some(config_path) = Self::config_path() else {
            return Ok(Self::default());
        };

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", config_path.display()))
    }

    /// Get the configuration file path
    fn config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Some(PathBuf::from(path));
        }
        dirs_next::config_dir().map(|dir| dir.join("fitp").join("config.json"))
    }

    /// Artifact layout: command line, then config file, then built-in defaults
    pub fn artifact_layout(&self, artifact_dir: Option<PathBuf>) -> ArtifactLayout {
        let defaults = ArtifactLayout::default();
        ArtifactLayout {
            dir: artifact_dir
                .or_else(|| self.artifact_dir.clone())
                .unwrap_or(defaults.dir),
            performance_model: self
                .performance_model
                .clone()
                .unwrap_or(defaults.performance_model),
            calorie_model: self.calorie_model.clone().unwrap_or(defaults.calorie_model),
            calorie_scaler: self.calorie_scaler.clone().unwrap_or(defaults.calorie_scaler),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_dir_wins() {
        let config = Config {
            artifact_dir: Some(PathBuf::from("/from/config")),
            calorie_model: Some("calorie_v2.json".to_string()),
            ..Config::default()
        };

        let layout = config.artifact_layout(Some(PathBuf::from("/from/cli")));
        assert_eq!(layout.dir, PathBuf::from("/from/cli"));
        assert_eq!(layout.calorie_model, "calorie_v2.json");
        assert_eq!(layout.performance_model, "performance_model.onnx");

        assert_eq!(config.artifact_layout(None).dir, PathBuf::from("/from/config"));
    }

    #[test]
    fn test_parse_config_file() {
        let config: Config =
            serde_json::from_str(r#"{"artifact_dir": "/models", "calorie_scaler": "s.json"}"#)
                .unwrap();
        assert_eq!(config.artifact_dir, Some(PathBuf::from("/models")));
        assert_eq!(config.calorie_scaler.as_deref(), Some("s.json"));
    }
}
