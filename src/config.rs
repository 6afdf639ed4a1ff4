//! Configuration loading and defaults for dbus-idle.

use anyhow::Context;
use anyhow::Result;
use serde::Deserialize;
use serde::Serialize;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use crate::domain::BackendKind;

/// Main configuration for dbus-idle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend used when none is given on the command line (default: dbus).
    pub backend: BackendKind,

    /// Seconds of inactivity after which the session counts as idle (default: 120).
    pub idle_threshold_seconds: u64,

    /// Poll interval for watch mode in seconds (default: 5).
    pub poll_interval_seconds: u64,

    /// Pattern matched against session bus names to find the idle monitor service.
    pub dbus_service_pattern: String,

    /// logind session id. If unset, `XDG_SESSION_ID` is used.
    pub session_id: Option<String>,

    /// Path to the swayidle binary. If unset, searches PATH.
    pub swayidle_path: Option<PathBuf>,

    /// Path to the xprintidle binary. If unset, searches PATH.
    pub xprintidle_path: Option<PathBuf>,

    /// Enable debug logging.
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            idle_threshold_seconds: 120,
            poll_interval_seconds: 5,
            dbus_service_pattern: "IdleMonitor".to_string(),
            session_id: None,
            swayidle_path: None,
            xprintidle_path: None,
            debug: false,
        }
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Load configuration from the default path, or return defaults if not found.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(p) = path {
            return Self::load(p);
        }

        if let Some(default_path) = Self::default_path()
            && default_path.exists()
        {
            return Self::load(&default_path);
        }

        Ok(Self::default())
    }

    /// Default config location: `$XDG_CONFIG_HOME/dbus-idle/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("dbus-idle").join("config.toml"))
    }

    pub fn idle_threshold(&self) -> Duration {
        Duration::from_secs(self.idle_threshold_seconds)
    }

    /// Watch mode poll interval, never shorter than one second.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds.max(1))
    }

    /// logind session id from config, falling back to the environment.
    pub fn resolved_session_id(&self) -> Option<String> {
        self.session_id
            .clone()
            .or_else(|| std::env::var("XDG_SESSION_ID").ok())
            .filter(|id| !id.is_empty())
    }
}
