//! Panel configuration
//!
//! YAML config for the defaults an operator would otherwise type every
//! session: engine address and the watch debounce. Loading is tolerant -
//! a missing or unparseable file yields defaults. Nothing is written
//! during normal operation; `save` exists for explicit use.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::remote::{RemoteTarget, DEFAULT_HOST, DEFAULT_PORT};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Engine host, overridable per commit from the panel
    pub host: String,
    pub port: u16,
    /// Watch quiet window in milliseconds
    pub debounce_ms: u64,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            debounce_ms: 300,
        }
    }
}

impl PanelConfig {
    pub fn target(&self) -> RemoteTarget {
        RemoteTarget::new(self.host.clone(), self.port)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Default config file location: `~/.config/clipdeck/config.yaml`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("clipdeck")
        .join("config.yaml")
}

/// Load configuration from a YAML file.
///
/// Missing file or parse failure falls back to defaults with a log line,
/// never an error - the panel must come up regardless.
pub fn load_config(path: &Path) -> PanelConfig {
    if !path.exists() {
        log::info!("no config at {:?}, using defaults", path);
        return PanelConfig::default();
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<PanelConfig>(&contents) {
            Ok(config) => {
                log::info!("loaded config from {:?}", path);
                config
            }
            Err(e) => {
                log::warn!("failed to parse config: {e}, using defaults");
                PanelConfig::default()
            }
        },
        Err(e) => {
            log::warn!("failed to read config file: {e}, using defaults");
            PanelConfig::default()
        }
    }
}

/// Save configuration to a YAML file, creating parent directories.
pub fn save_config(config: &PanelConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {parent:?}"))?;
    }

    let yaml = serde_yaml::to_string(config).context("Failed to serialize config to YAML")?;
    std::fs::write(path, yaml).with_context(|| format!("Failed to write config file: {path:?}"))?;
    Ok(())
}
