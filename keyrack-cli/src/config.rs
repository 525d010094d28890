//! CLI configuration handling.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use keyrack_core::ResolverConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Path to the configuration file that was loaded.
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Inventory used when `--inventory` is not given.
    #[serde(default = "default_inventory_path")]
    pub inventory_path: PathBuf,

    /// Logging level.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Resolver tunables.
    #[serde(default)]
    pub resolver: ResolverConfig,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_inventory_path() -> PathBuf {
    project_dirs()
        .map(|d| d.config_dir().join("inventory.toml"))
        .unwrap_or_else(|| PathBuf::from("keyrack-inventory.toml"))
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            inventory_path: default_inventory_path(),
            log_level: default_log_level(),
            resolver: ResolverConfig::default(),
        }
    }
}

/// Default location of the configuration file.
pub fn default_config_path() -> PathBuf {
    project_dirs()
        .map(|d| d.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("keyrack.toml"))
}

/// Load configuration from `path`, or from the default location.
///
/// A missing file yields the defaults. An explicitly given path must exist.
pub fn load_config(path: Option<&Path>) -> Result<CliConfig> {
    let config_path = match path {
        Some(path) => {
            anyhow::ensure!(path.exists(), "config file {:?} does not exist", path);
            path.to_path_buf()
        }
        None => default_config_path(),
    };

    let mut config = if config_path.exists() {
        let contents = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config from {:?}", config_path))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {:?}", config_path))?
    } else {
        CliConfig::default()
    };

    config.config_path = config_path;
    Ok(config)
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "keyrack", "keyrack")
}
