use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::pipeline::processing::entity_resolution::{
    MissingEmailPolicy, DEFAULT_MAX_CANDIDATES, DEFAULT_SIMILARITY_THRESHOLD,
};

pub const DEFAULT_CONFIG_PATH: &str = "pipeline.toml";
pub const CONFIG_PATH_ENV: &str = "CRM_PIPELINE_CONFIG";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub entity_resolution: EntityResolutionConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub input: PathBuf,
    pub processed_dir: PathBuf,
    pub reports_dir: PathBuf,
    pub upload_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("data/raw/crm_raw_data.csv"),
            processed_dir: PathBuf::from("data/processed"),
            reports_dir: PathBuf::from("reports"),
            upload_dir: PathBuf::from("data/raw"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EntityResolutionConfig {
    pub similarity_threshold: f64,
    pub max_candidates: usize,
    pub missing_email_policy: MissingEmailPolicy,
}

impl Default for EntityResolutionConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            max_candidates: DEFAULT_MAX_CANDIDATES,
            missing_email_policy: MissingEmailPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on an upload request body; unlimited when unset
    pub max_upload_bytes: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            max_upload_bytes: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub directory: PathBuf,
    pub file_name: String,
    pub default_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            file_name: "crm_pipeline.log".to_string(),
            default_filter: "crm_pipeline=info,info".to_string(),
        }
    }
}

impl Config {
    /// Load from an explicit path, `$CRM_PIPELINE_CONFIG`, or `pipeline.toml`.
    /// Only the implicit default file may be absent.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let (path, required) = match explicit {
            Some(path) => (path.to_path_buf(), true),
            None => match std::env::var(CONFIG_PATH_ENV) {
                Ok(path) => (PathBuf::from(path), true),
                Err(_) => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
            },
        };

        if !path.exists() {
            if required {
                return Err(PipelineError::Config(format!(
                    "Config file '{}' does not exist",
                    path.display()
                )));
            }
            let config = Config::default();
            config.validate()?;
            return Ok(config);
        }

        let content = fs::read_to_string(&path).map_err(|e| {
            PipelineError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        let config = Self::from_toml(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let threshold = self.entity_resolution.similarity_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(PipelineError::Config(format!(
                "similarity_threshold must be within [0, 1], got {}",
                threshold
            )));
        }
        if self.entity_resolution.max_candidates == 0 {
            return Err(PipelineError::Config(
                "max_candidates must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
