//! Config command implementations

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::output::{print_error, print_info, print_success, print_warning};
use mw_core::config::{self, DaemonConfig};

const REDACTED: &str = "********";

/// Show the effective daemon configuration
///
/// Secrets are masked. Without a config file the built-in defaults are shown.
pub fn config_show(config_path: Option<&PathBuf>) -> Result<()> {
    let path = config_path
        .cloned()
        .unwrap_or_else(config::default_config_path);

    if path.exists() {
        print_info(&format!("Configuration file: {}", path.display()));
    } else if config_path.is_some() {
        anyhow::bail!("Config file not found: {}", path.display());
    } else {
        print_warning(&format!(
            "No configuration file at {}, showing defaults",
            path.display()
        ));
    }
    println!();

    let config = config::load_daemon_config(config_path.map(PathBuf::as_path))
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    println!("{}", render_config(config)?);

    Ok(())
}

/// Print the configuration directory
pub fn config_path() {
    println!("{}", config::default_config_dir().display());
}

/// Write a configuration file with every default spelled out
pub fn config_init(config_path: Option<&PathBuf>, force: bool) -> Result<()> {
    let path = config_path
        .cloned()
        .unwrap_or_else(config::default_config_path);

    if path.exists() && !force {
        print_error(&format!("Config file already exists: {}", path.display()));
        print_info("Use --force to overwrite");
        return Ok(());
    }

    write_default_config(&path)?;
    print_success(&format!("Created configuration file: {}", path.display()));
    Ok(())
}

fn write_default_config(path: &Path) -> Result<()> {
    config::save_config(path, &DaemonConfig::default())
        .with_context(|| format!("Failed to write config file: {}", path.display()))
}

fn render_config(mut config: DaemonConfig) -> Result<String> {
    if config.rcon_password.is_some() {
        config.rcon_password = Some(REDACTED.to_string());
    }
    toml::to_string_pretty(&config).context("Failed to render configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_render_masks_secret() {
        let config = DaemonConfig {
            rcon_password: Some("hunter2".to_string()),
            ..DaemonConfig::default()
        };
        let text = render_config(config).unwrap();
        assert!(!text.contains("hunter2"));
        assert!(text.contains(REDACTED));
        assert!(text.contains("graceful_stop_timeout = 30"));
    }

    #[test]
    fn test_init_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        config_init(Some(&path), false).unwrap();
        let loaded: DaemonConfig = config::load_config(&path).unwrap();
        assert_eq!(loaded.ipc_port, config::DEFAULT_IPC_PORT);
    }

    #[test]
    fn test_init_does_not_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "ipc_port = 30000\n").unwrap();

        config_init(Some(&path), false).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "ipc_port = 30000\n"
        );
    }
}
