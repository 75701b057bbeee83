use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{PermissionError, Result};

/// Decision timeout default; stays under the agent CLI's own 180s limit
const DEFAULT_DECISION_TIMEOUT_SECS: u64 = 170;

/// User-configurable settings for toolgate
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ToolgateConfig {
    /// Port for the loopback bridge server (default: 0, dynamic)
    pub port: Option<u16>,
    /// Seconds to wait for the user before denying (default: 170). `toolgate-mcp`
    /// gives up after 175s; past that the request is cancelled, not timed out.
    pub decision_timeout_secs: Option<u64>,
    /// Tools allowed on every channel without asking
    pub auto_approve: Option<Vec<String>>,
}

impl ToolgateConfig {
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(0)
    }

    pub fn decision_timeout(&self) -> Duration {
        Duration::from_secs(
            self.decision_timeout_secs
                .unwrap_or(DEFAULT_DECISION_TIMEOUT_SECS),
        )
    }

    pub fn auto_approve(&self) -> Vec<String> {
        self.auto_approve.clone().unwrap_or_default()
    }
}

/// Get the config directory path
fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("toolgate"))
}

/// Get the config file path
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load config from the default location, then apply env overrides
pub fn load_config() -> ToolgateConfig {
    let config = match config_path() {
        Some(path) => load_config_from(&path),
        None => ToolgateConfig::default(),
    };
    apply_env_overrides(config, |key| std::env::var(key).ok())
}

/// Load config from a file. A missing or broken file yields defaults.
pub fn load_config_from(path: &Path) -> ToolgateConfig {
    if !path.exists() {
        debug!(?path, "No config file found, using defaults");
        return ToolgateConfig::default();
    }

    match read_config(path) {
        Ok(config) => {
            debug!(?path, "Loaded config");
            config
        }
        Err(e) => {
            warn!(?path, error = %e, "Failed to load config, using defaults");
            ToolgateConfig::default()
        }
    }
}

fn read_config(path: &Path) -> Result<ToolgateConfig> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Apply `TOOLGATE_*` overrides using `lookup` to read variables
pub fn apply_env_overrides(
    mut config: ToolgateConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> ToolgateConfig {
    if let Some(val) = lookup("TOOLGATE_PORT") {
        match val.parse::<u16>() {
            Ok(port) => {
                debug!(port, "Overriding port from env");
                config.port = Some(port);
            }
            Err(_) => warn!(value = %val, "Ignoring invalid TOOLGATE_PORT"),
        }
    }
    if let Some(val) = lookup("TOOLGATE_DECISION_TIMEOUT") {
        match val.parse::<u64>() {
            Ok(secs) => {
                debug!(secs, "Overriding decision timeout from env");
                config.decision_timeout_secs = Some(secs);
            }
            Err(_) => warn!(value = %val, "Ignoring invalid TOOLGATE_DECISION_TIMEOUT"),
        }
    }
    if let Some(val) = lookup("TOOLGATE_AUTO_APPROVE") {
        let tools: Vec<String> = val
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect();
        debug!(?tools, "Overriding auto-approve list from env");
        config.auto_approve = Some(tools);
    }
    config
}

/// Save config to the default location
pub fn save_config(config: &ToolgateConfig) -> Result<PathBuf> {
    let path = config_path()
        .ok_or_else(|| PermissionError::Config("Could not determine config path".to_string()))?;
    save_config_to(&path, config)?;
    Ok(path)
}

pub fn save_config_to(path: &Path, config: &ToolgateConfig) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.exists() {
            fs::create_dir_all(dir)?;
        }
    }

    let content = toml::to_string_pretty(config)?;
    fs::write(path, content)?;

    debug!(?path, "Saved config");
    Ok(())
}
