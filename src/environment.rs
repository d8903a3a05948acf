// src/environment.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::ai::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::ai::language::DEFAULT_LANGUAGE_API_URL;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub firebase_project_id: String,
    pub database_path: PathBuf,
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,
    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,
    #[serde(default = "default_language_api_url")]
    pub language_api_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: u64,
}

fn default_gemini_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_gemini_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_language_api_url() -> String {
    DEFAULT_LANGUAGE_API_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_max_upload_mb() -> u64 {
    10
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    local: EnvironmentConfig,
    production: EnvironmentConfig,
}

impl EnvironmentConfig {
    /// Load configuration based on environment
    pub fn load() -> Result<Self> {
        let environment = Self::get_environment();
        info!("Loading configuration for environment: {}", environment);
        Self::load_from_file(Path::new("config.yaml"), &environment)
    }

    fn get_environment() -> String {
        std::env::var("CAREERTWIN_ENV")
            .or_else(|_| std::env::var("ENVIRONMENT"))
            .or_else(|_| std::env::var("ENV"))
            .unwrap_or_else(|_| "local".to_string())
    }

    pub fn load_from_file(config_path: &Path, environment: &str) -> Result<Self> {
        if !config_path.exists() {
            anyhow::bail!(
                "{} not found. Server cannot start without configuration.",
                config_path.display()
            );
        }

        let config_content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let env_config = Self::from_yaml(&config_content, environment)?;

        Ok(Self {
            database_path: Self::resolve_path(&env_config.database_path)?,
            ..env_config
        })
    }

    pub fn from_yaml(content: &str, environment: &str) -> Result<Self> {
        let config_file: ConfigFile =
            serde_yaml::from_str(content).context("Failed to parse config.yaml")?;

        Ok(match environment {
            "production" => config_file.production,
            _ => config_file.local,
        })
    }

    fn resolve_path(path: &Path) -> Result<PathBuf> {
        if path.is_absolute() {
            Ok(path.to_path_buf())
        } else {
            let current_dir = std::env::current_dir().context("Failed to get current directory")?;
            Ok(current_dir.join(path))
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Key for the generative model. Required to serve.
pub fn gemini_api_key() -> Result<String> {
    std::env::var("GEMINI_API_KEY")
        .map_err(|_| anyhow::anyhow!("GEMINI_API_KEY environment variable not set"))
}

/// Key for the Natural Language API, falling back to the Gemini key.
pub fn language_api_key() -> Result<String> {
    std::env::var("GOOGLE_API_KEY").or_else(|_| gemini_api_key())
}

pub fn firebase_api_key() -> Result<String> {
    std::env::var("FIREBASE_API_KEY")
        .map_err(|_| anyhow::anyhow!("FIREBASE_API_KEY environment variable not set"))
}

pub fn server_port() -> Result<u16> {
    match std::env::var("ROCKET_PORT") {
        Ok(port) => port
            .parse::<u16>()
            .map_err(|_| anyhow::anyhow!("ROCKET_PORT must be a valid port number")),
        Err(_) => Ok(DEFAULT_PORT),
    }
}

pub fn api_url() -> String {
    std::env::var("CAREERTWIN_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
local:
  firebase_project_id: careertwin-dev
  database_path: data/careertwin.db
production:
  firebase_project_id: careertwin
  database_path: /var/lib/careertwin/careertwin.db
  gemini_model: gemini-1.5-flash
  request_timeout_secs: 30
  max_upload_mb: 5
"#;

    #[test]
    fn test_local_section_uses_defaults() {
        let config = EnvironmentConfig::from_yaml(CONFIG, "local").unwrap();
        assert_eq!(config.firebase_project_id, "careertwin-dev");
        assert_eq!(config.gemini_model, DEFAULT_MODEL);
        assert_eq!(config.language_api_url, DEFAULT_LANGUAGE_API_URL);
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
        assert_eq!(config.max_upload_mb, 10);
    }

    #[test]
    fn test_production_section() {
        let config = EnvironmentConfig::from_yaml(CONFIG, "production").unwrap();
        assert_eq!(config.gemini_model, "gemini-1.5-flash");
        assert_eq!(config.max_upload_mb, 5);
        assert!(config.database_path.is_absolute());
    }

    #[test]
    fn test_unknown_environment_falls_back_to_local() {
        let config = EnvironmentConfig::from_yaml(CONFIG, "staging").unwrap();
        assert_eq!(config.firebase_project_id, "careertwin-dev");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = EnvironmentConfig::load_from_file(Path::new("/nonexistent/config.yaml"), "local")
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_relative_database_path_is_resolved() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, CONFIG).unwrap();

        let config = EnvironmentConfig::load_from_file(&path, "local").unwrap();
        assert!(config.database_path.is_absolute());
        assert!(config.database_path.ends_with("data/careertwin.db"));
    }
}
