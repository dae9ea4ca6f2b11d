use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use crate::common::error::{FaceIdError, Result};
use crate::common::paths;

/// Environment variable that overrides `service.base_url`.
pub const SERVICE_URL_ENV: &str = "FACEID_SERVICE_URL";

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub permissions: PermissionConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_timeout() -> u64 { 30 }

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl ServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct CaptureConfig {
    /// Shell-free command line; `{output}` is replaced by the target file path.
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

impl CaptureConfig {
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(paths::default_capture_dir)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct PermissionConfig {
    /// Ask for camera and gallery access as soon as a screen opens.
    #[serde(default)]
    pub prompt_on_open: bool,
}

impl Config {
    /// Explicit path first, then the per-user config file, then defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load_from_path(path)?,
            None => match paths::default_config_file() {
                Some(path) if path.exists() => Self::load_from_path(&path)?,
                _ => {
                    debug!("No config file found, using defaults");
                    Config::default()
                }
            },
        };

        if let Ok(url) = std::env::var(SERVICE_URL_ENV) {
            if !url.trim().is_empty() {
                info!("Service URL taken from {}", SERVICE_URL_ENV);
                config.service.base_url = url.trim().to_string();
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(FaceIdError::Config(format!(
                "Config file not found: {}", path.display()
            )));
        }

        info!("Loading config from: {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| FaceIdError::Config(format!("Config parse error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.service.base_url).map_err(|e| {
            FaceIdError::Config(format!(
                "Service base_url '{}' is not a valid URL: {}", self.service.base_url, e
            ))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(FaceIdError::Config(format!(
                "Service base_url must use http or https, got {}", url.scheme()
            )));
        }

        if self.service.timeout_seconds < 1 || self.service.timeout_seconds > 300 {
            return Err(FaceIdError::Config(format!(
                "Timeout must be between 1 and 300 seconds, got {}",
                self.service.timeout_seconds
            )));
        }

        if let Some(command) = &self.capture.command {
            if !command.contains("{output}") {
                return Err(FaceIdError::Config(
                    "capture.command must contain an {output} placeholder".to_string(),
                ));
            }
        }

        Ok(())
    }
}
