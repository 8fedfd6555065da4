//! Configuration management for mcwarden

mod daemon;
pub mod serde_utils;

pub use daemon::{DaemonConfig, TunnelConfig, DEFAULT_IPC_PORT, RCON_PASSWORD_ENV};

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Get the default configuration directory
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mcwarden")
}

/// Get the default configuration file path
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}

/// Get the default registry file path
pub fn default_registry_path() -> PathBuf {
    default_config_dir().join("servers.json")
}

/// Load configuration from a file
pub fn load_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Invalid(format!("Failed to read config: {}", e)))?;

    let config: T = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to a file
pub fn save_config<T: serde::Serialize>(path: &Path, config: &T) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(config)?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ConfigError::Invalid(format!("Failed to create config dir: {}", e)))?;
    }

    std::fs::write(path, content)
        .map_err(|e| ConfigError::Invalid(format!("Failed to write config: {}", e)))?;

    Ok(())
}

/// Load the daemon configuration
///
/// An explicit path must exist. Without one, the default path is used if
/// present and built-in defaults otherwise. Environment overrides are
/// applied in every case.
pub fn load_daemon_config(path: Option<&Path>) -> Result<DaemonConfig, ConfigError> {
    let config = match path {
        Some(path) => load_config::<DaemonConfig>(path)?,
        None => {
            let default_path = default_config_path();
            if default_path.exists() {
                load_config::<DaemonConfig>(&default_path)?
            } else {
                tracing::debug!("No config at {:?}, using defaults", default_path);
                DaemonConfig::default()
            }
        }
    };

    Ok(config.with_env_overrides())
}
