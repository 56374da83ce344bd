use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::state::Language;

/// Top-level app configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub registrar: RegistrarConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub default_language: Language,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.registrar.write_retry_attempts == 0 {
            return Err("registrar.write_retry_attempts must be at least 1".to_string());
        }
        if let StoreConfig::File { dir } = &self.store {
            if dir.is_empty() {
                return Err("store.dir must not be empty".to_string());
            }
        }
        Ok(())
    }
}

/// Retry policy for session writes to the registrar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrarConfig {
    /// Attempts before a write is reported as failed
    #[serde(default = "default_retry_attempts")]
    pub write_retry_attempts: u32,
    /// Pause between attempts
    #[serde(default = "default_retry_backoff_ms")]
    pub write_retry_backoff_ms: u64,
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    250
}

impl Default for RegistrarConfig {
    fn default() -> Self {
        Self {
            write_retry_attempts: default_retry_attempts(),
            write_retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

/// Local store backend selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Volatile, session-only storage
    Memory,
    /// One file per key under a directory
    File { dir: String },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Memory
    }
}

/// Load configuration from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Arc<AppConfig>, String> {
    let path = path.as_ref();
    info!("Loading configuration from: {}", path.display());

    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

    let config: AppConfig = serde_yaml::from_str(&contents)
        .map_err(|e| format!("Failed to parse YAML config: {}", e))?;

    config.validate()?;

    info!("Configuration loaded successfully");
    Ok(Arc::new(config))
}

/// Load configuration with fallback options; built-in defaults when no file
/// is found anywhere
pub fn load_config_with_fallback() -> Arc<AppConfig> {
    if let Ok(config_path) = std::env::var("CONFIG_PATH") {
        match load_config(&config_path) {
            Ok(config) => return config,
            Err(e) => warn!(
                "Failed to load config from CONFIG_PATH ({}): {}",
                config_path, e
            ),
        }
    }

    let paths = ["config.yaml", "config.yml"];

    for path in paths {
        if Path::new(path).exists() {
            match load_config(path) {
                Ok(config) => return config,
                Err(e) => warn!("Failed to load config from '{}': {}", path, e),
            }
        }
    }

    info!("No configuration file found, using built-in defaults");
    Arc::new(AppConfig::default())
}
