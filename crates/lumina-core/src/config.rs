//! Lumina client configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{LuminaError, Result};

/// Root configuration for one member's client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LuminaConfig {
    /// This client's member record id.
    #[serde(default)]
    pub member_id: String,
    /// The neighborhood group this client belongs to.
    #[serde(default)]
    pub group_id: String,
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub location: LocationConfig,
}

impl Default for LuminaConfig {
    fn default() -> Self {
        Self {
            member_id: String::new(),
            group_id: String::new(),
            controller: ControllerConfig::default(),
            scheduler: SchedulerConfig::default(),
            location: LocationConfig::default(),
        }
    }
}

impl LuminaConfig {
    /// Load config from the default path (~/.lumina/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| LuminaError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| LuminaError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| LuminaError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Lumina state directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".lumina")
    }
}

/// Local WLED controller endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Single-attempt HTTP timeout for controller calls.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_host() -> String {
    "192.168.1.50".into()
}
fn default_port() -> u16 {
    80
}
fn default_timeout() -> u64 {
    5
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Schedule evaluator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// How often the evaluator wakes to check due schedules.
    #[serde(default = "default_tick_secs")]
    pub tick_interval_secs: u64,
    /// Directory for fired-marker persistence. Defaults to
    /// ~/.lumina/scheduler.
    #[serde(default)]
    pub state_dir: Option<PathBuf>,
}

fn default_tick_secs() -> u64 {
    30
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_secs(),
            state_dir: None,
        }
    }
}

impl SchedulerConfig {
    pub fn state_dir(&self) -> PathBuf {
        self.state_dir
            .clone()
            .unwrap_or_else(|| LuminaConfig::home_dir().join("scheduler"))
    }
}

/// Device's last known location, for sunset-relative schedules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationConfig {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LuminaConfig::default();
        assert_eq!(config.controller.port, 80);
        assert_eq!(config.controller.timeout_secs, 5);
        assert_eq!(config.scheduler.tick_interval_secs, 30);
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml_str = r#"
            member_id = "m1"
            group_id = "g1"

            [controller]
            host = "192.168.1.77"
        "#;
        let config: LuminaConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.member_id, "m1");
        assert_eq!(config.controller.host, "192.168.1.77");
        // Unspecified fields fall back to defaults.
        assert_eq!(config.controller.port, 80);
        assert_eq!(config.location.latitude, 0.0);
    }
}
