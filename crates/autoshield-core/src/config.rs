// crates/autoshield-core/src/config.rs

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::preprocessing::ColumnMode;
use crate::scoring::{Contamination, Detector, DEFAULT_CONTAMINATION};

/// Environment variable naming a config file when `--config` is not given.
pub const CONFIG_ENV_VAR: &str = "AUTOSHIELD_CONFIG";

pub const DEFAULT_RAW_PATH: &str = "data/raw/ambient_temperature_system_failure.csv";
pub const DEFAULT_PROCESSED_PATH: &str = "data/processed/ambient_temperature_processed.csv";
pub const DEFAULT_LABELED_PATH: &str = "outputs/ambient_temperature_labeled.csv";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub detection: DetectionConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub raw: PathBuf,
    pub processed: PathBuf,
    pub labeled: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw: PathBuf::from(DEFAULT_RAW_PATH),
            processed: PathBuf::from(DEFAULT_PROCESSED_PATH),
            labeled: PathBuf::from(DEFAULT_LABELED_PATH),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DetectionConfig {
    pub contamination: f64,
    pub detector: Detector,
    pub columns: ColumnMode,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            contamination: DEFAULT_CONTAMINATION,
            detector: Detector::default(),
            columns: ColumnMode::default(),
        }
    }
}

impl DetectionConfig {
    pub fn contamination(&self) -> Result<Contamination> {
        Contamination::new(self.contamination)
    }
}

impl AppConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AppConfig =
            toml::from_str(content).map_err(|err| PipelineError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|err| {
            PipelineError::Config(format!("cannot read {}: {err}", path.display()))
        })?;
        let config = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Loads `path` when given, otherwise returns the built-in defaults.
    pub fn load_optional(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.detection.contamination()?;
        Ok(())
    }
}
