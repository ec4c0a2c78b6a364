/// Application configuration management
/// Stores user preferences in ~/.config/docker-backup/config.toml,
/// overridable through DOCKER_BACKUP_* environment variables

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::core::path_mapping::{IdentityPathMapper, PathMapper, PrefixPathMapper};
use crate::utils::constants::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backup_dir: PathBuf,
    pub helper_image: String,
    pub docker_binary: String,
    /// humantime duration, e.g. "30m" or "1h 30m"
    pub command_timeout: String,
    pub log_level: String,
    /// Running inside a container: translate bind-mount paths to the host
    pub dev_mode: bool,
    pub container_root: Option<PathBuf>,
    pub host_root: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backup_dir: PathBuf::from(DEFAULT_BACKUP_DIR),
            helper_image: DEFAULT_HELPER_IMAGE.to_string(),
            docker_binary: DEFAULT_DOCKER_BINARY.to_string(),
            command_timeout: DEFAULT_COMMAND_TIMEOUT.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            dev_mode: false,
            container_root: None,
            host_root: None,
        }
    }
}

impl AppConfig {
    /// Get config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join(APP_NAME);
        Ok(config_dir.join("config.toml"))
    }

    /// Load configuration from file (explicit path or default location),
    /// then apply environment overrides
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let mut config = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            Self::from_toml_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?
        } else if explicit.is_some() {
            bail!("Config file not found at {}", path.display());
        } else {
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Apply DOCKER_BACKUP_* overrides from `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("DOCKER_BACKUP_DIR") {
            self.backup_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("DOCKER_BACKUP_HELPER_IMAGE") {
            self.helper_image = v;
        }
        if let Some(v) = lookup("DOCKER_BACKUP_DOCKER_BIN") {
            self.docker_binary = v;
        }
        if let Some(v) = lookup("DOCKER_BACKUP_TIMEOUT") {
            self.command_timeout = v;
        }
        if let Some(v) = lookup("DOCKER_BACKUP_LOG") {
            self.log_level = v;
        }
        if let Some(v) = lookup("DOCKER_BACKUP_DEV_MODE") {
            self.dev_mode = parse_flag(&v)
                .with_context(|| format!("Invalid DOCKER_BACKUP_DEV_MODE value '{}'", v))?;
        }
        if let Some(v) = lookup("DOCKER_BACKUP_CONTAINER_ROOT") {
            self.container_root = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("DOCKER_BACKUP_HOST_ROOT") {
            self.host_root = Some(PathBuf::from(v));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Result<Duration> {
        humantime::parse_duration(&self.command_timeout)
            .with_context(|| format!("Invalid command_timeout '{}'", self.command_timeout))
    }

    /// Path mapper for bind-mount sources, chosen by `dev_mode`
    pub fn path_mapper(&self) -> Result<Arc<dyn PathMapper>> {
        if !self.dev_mode {
            return Ok(Arc::new(IdentityPathMapper));
        }
        match (&self.container_root, &self.host_root) {
            (Some(container_root), Some(host_root)) => Ok(Arc::new(PrefixPathMapper::new(
                container_root.clone(),
                host_root.clone(),
            ))),
            _ => bail!(
                "dev_mode requires both container_root and host_root \
                (DOCKER_BACKUP_CONTAINER_ROOT / DOCKER_BACKUP_HOST_ROOT)"
            ),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
