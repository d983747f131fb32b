//! Configuration management for elevenlabs-mia-mcp.
//!
//! Loads an optional YAML file from standard locations. Every key has a
//! default, so the server runs with no file at all as long as an API key
//! arrives from the command line or the environment.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::ConfigError;

pub const API_KEY_ENV: &str = "ELEVENLABS_API_KEY";
pub const DEFAULT_MODEL_ID: &str = "eleven_monolingual_v1";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ElevenLabsConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model_id: String,
    pub timeout_secs: u64,
}

impl Default for ElevenLabsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.elevenlabs.io".into(),
            model_id: DEFAULT_MODEL_ID.into(),
            timeout_secs: 30,
        }
    }
}

impl ElevenLabsConfig {
    /// Resolve the API key: explicit value first, then the environment.
    /// Surrounding whitespace is trimmed; a blank key counts as missing.
    pub fn resolve_api_key(&self) -> Result<String, ConfigError> {
        self.api_key
            .as_deref()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .or_else(|| {
                std::env::var(API_KEY_ENV)
                    .ok()
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty())
            })
            .ok_or(ConfigError::MissingApiKey)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MiaConfig {
    pub host: String,
    pub port: u16,
    pub timeout_secs: u64,
}

impl Default for MiaConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 8000,
            timeout_secs: 10,
        }
    }
}

impl MiaConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProfilesConfig {
    pub path: Option<PathBuf>,
}

impl ProfilesConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(crate::profiles::ProfileStore::default_path)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub output_dir: Option<PathBuf>,
}

impl AudioConfig {
    pub fn resolved_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub elevenlabs: ElevenLabsConfig,
    pub mia: MiaConfig,
    pub profiles: ProfilesConfig,
    pub audio: AudioConfig,
}

impl Config {
    /// Load configuration from YAML file.
    ///
    /// Searches standard locations if no path is provided:
    /// 1. ./config.yaml
    /// 2. elevenlabs-mia/config.yaml under the platform config dir
    pub fn load(path: Option<&Path>) -> Self {
        let resolved = path.map(PathBuf::from).or_else(|| {
            let candidates = [
                std::env::current_dir().ok().map(|d| d.join("config.yaml")),
                dirs::config_dir().map(|c| c.join("elevenlabs-mia/config.yaml")),
            ];
            candidates.into_iter().flatten().find(|p| p.exists())
        });

        let Some(config_path) = resolved else {
            info!("No config file found, using defaults");
            return Self::default();
        };

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(config) => {
                    info!("Loaded config from {}", config_path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {e}, using defaults", config_path.display());
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read {}: {e}, using defaults", config_path.display());
                Self::default()
            }
        }
    }

    pub fn parse(contents: &str) -> Result<Self, serde_yml::Error> {
        serde_yml::from_str(contents)
    }
}
