//! TOML-based application configuration.
//!
//! Stores user preferences:
//! - Timer durations (study/break minutes)
//! - Presence intervals (heartbeat, staleness window)
//! - Backend endpoint
//!
//! Configuration is stored at `~/.config/focusroom/config.toml`.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ValidationError};
use crate::membership::MembershipConfig;
use crate::timer::TimerSettings;

/// Timer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_study_minutes")]
    pub study_minutes: u64,
    #[serde(default = "default_break_minutes")]
    pub break_minutes: u64,
}

/// Presence/liveness configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceConfig {
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,
    /// Participants silent for longer than this are considered abandoned.
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,
}

/// Backend endpoint configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the hosted deployment; absent means local-only.
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/focusroom/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub presence: PresenceConfig,
    #[serde(default)]
    pub backend: BackendConfig,
}

// Default functions
fn default_study_minutes() -> u64 {
    25
}
fn default_break_minutes() -> u64 {
    5
}
fn default_heartbeat_secs() -> u64 {
    30
}
fn default_stale_after_secs() -> u64 {
    120
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            study_minutes: default_study_minutes(),
            break_minutes: default_break_minutes(),
        }
    }
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            heartbeat_secs: default_heartbeat_secs(),
            stale_after_secs: default_stale_after_secs(),
        }
    }
}

impl Config {
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let base = dirs::config_dir().ok_or(ConfigError::NoBaseDir("config"))?;
        Ok(base.join("focusroom").join("config.toml"))
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &PathBuf) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &PathBuf) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::SaveFailed {
                path: path.clone(),
                message: e.to_string(),
            })?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })
    }

    /// Validated timer settings from the configured minutes.
    pub fn timer_settings(&self) -> Result<TimerSettings, ValidationError> {
        TimerSettings::new(self.timer.study_minutes, self.timer.break_minutes)
    }

    pub fn membership(&self) -> MembershipConfig {
        MembershipConfig {
            heartbeat_interval: Duration::from_secs(self.presence.heartbeat_secs),
            ..Default::default()
        }
    }
}

/// Data directory for locally persisted state (`~/.local/share/focusroom`).
///
/// `FOCUSROOM_DATA_DIR` overrides the platform default, which keeps tests
/// and scripted runs away from the real state.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var("FOCUSROOM_DATA_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let base = dirs::data_dir().ok_or(ConfigError::NoBaseDir("data"))?;
    Ok(base.join("focusroom"))
}
