//! Configuration for the posture monitor
//!
//! Runtime settings are loaded from a TOML file in the platform config
//! directory and fall back to defaults that match the reference sensor
//! bridge (device name prefixes, Nordic UART characteristics, local relay
//! endpoint).
//!
//! # File location
//!
//! - **Linux**: `~/.config/posturevis-rs/config.toml`
//! - **macOS**: `~/Library/Application Support/posturevis-rs/config.toml`
//! - **Windows**: `%APPDATA%\posturevis-rs\config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

use crate::error::{MonitorError, Result};
use crate::session::DEFAULT_WINDOW_CAPACITY;

/// Application identifier for config directories
pub const APP_ID: &str = "posturevis-rs";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Notify characteristic carrying angle frames (Nordic UART TX)
pub const DEFAULT_NOTIFY_UUID: Uuid = uuid::uuid!("6e400003-b5a3-f393-e0a9-e50e24dcca9e");

/// Write characteristic for sensor commands (Nordic UART RX)
pub const DEFAULT_WRITE_UUID: Uuid = uuid::uuid!("6e400002-b5a3-f393-e0a9-e50e24dcca9e");

/// Top-level application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Transport settings (BLE and relay)
    #[serde(default)]
    pub transport: TransportConfig,
    /// Sample window settings
    #[serde(default)]
    pub window: WindowConfig,
    /// CSV export settings
    #[serde(default)]
    pub export: ExportConfig,
}

/// Settings shared by the two sensor links
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Ordered allow-list of device name prefixes; the first prefix a
    /// discovered name starts with wins
    pub device_name_prefixes: Vec<String>,
    /// Notification characteristic delivering angle frames
    pub notify_characteristic: Uuid,
    /// Write characteristic for the start/keepalive commands
    pub write_characteristic: Uuid,
    /// How long to scan for a matching device, in seconds
    pub scan_timeout_secs: u64,
    /// How long to wait for the link to come up, in seconds
    pub connect_timeout_secs: u64,
    /// Interval between keepalive writes while connected, in seconds
    /// (0 disables keepalive)
    pub keepalive_interval_secs: u64,
    /// WebSocket endpoint of the relay bridge
    pub relay_url: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            device_name_prefixes: vec!["KIRIRI01".to_string(), "KIRI".to_string()],
            notify_characteristic: DEFAULT_NOTIFY_UUID,
            write_characteristic: DEFAULT_WRITE_UUID,
            scan_timeout_secs: 10,
            connect_timeout_secs: 20,
            keepalive_interval_secs: 15,
            relay_url: "ws://localhost:8765".to_string(),
        }
    }
}

impl TransportConfig {
    /// Scan timeout as a duration
    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs)
    }

    /// Connect timeout as a duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Keepalive interval, or `None` when disabled
    pub fn keepalive_interval(&self) -> Option<Duration> {
        (self.keepalive_interval_secs > 0)
            .then(|| Duration::from_secs(self.keepalive_interval_secs))
    }

    /// The highest-priority prefix the given device name starts with
    pub fn match_prefix<'a>(&'a self, name: &str) -> Option<&'a str> {
        self.device_name_prefixes
            .iter()
            .map(String::as_str)
            .find(|prefix| name.starts_with(prefix))
    }

    /// Priority rank of the matching prefix (lower wins across devices
    /// discovered in the same scan pass), or `None` for no match
    pub fn prefix_rank(&self, name: &str) -> Option<usize> {
        self.device_name_prefixes
            .iter()
            .position(|prefix| name.starts_with(prefix.as_str()))
    }
}

/// Sample window settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Maximum number of samples held for charting and export
    pub capacity: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_WINDOW_CAPACITY,
        }
    }
}

/// CSV export settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExportConfig {
    /// Write the CSV to a file automatically when a measurement ends
    pub auto_save: bool,
    /// Directory for auto-saved exports (defaults to the current dir)
    pub directory: Option<PathBuf>,
}

/// Get the path to the config file
pub fn config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID).join(CONFIG_FILE))
}

impl AppConfig {
    /// Load the config from the default location
    pub fn load() -> Result<Self> {
        let path = config_path()
            .ok_or_else(|| MonitorError::Config("Could not determine config path".to_string()))?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| MonitorError::Config(format!("Failed to read config: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| MonitorError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load the config, falling back to defaults on any error
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save the config to the default location
    pub fn save(&self) -> Result<()> {
        let path = config_path()
            .ok_or_else(|| MonitorError::Config("Could not determine config path".to_string()))?;

        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .map_err(|e| MonitorError::Config(format!("Failed to create config dir: {}", e)))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| MonitorError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&path, content)
            .map_err(|e| MonitorError::Config(format!("Failed to write config: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_bridge() {
        let config = TransportConfig::default();
        assert_eq!(config.device_name_prefixes, vec!["KIRIRI01", "KIRI"]);
        assert_eq!(config.relay_url, "ws://localhost:8765");
        assert_eq!(config.scan_timeout(), Duration::from_secs(10));
        assert!(config.keepalive_interval().is_some());
    }

    #[test]
    fn test_prefix_priority_order() {
        let config = TransportConfig::default();
        // "KIRIRI01-A" matches both prefixes; the first in the list wins.
        assert_eq!(config.match_prefix("KIRIRI01-A"), Some("KIRIRI01"));
        assert_eq!(config.match_prefix("KIRI-2"), Some("KIRI"));
        assert_eq!(config.match_prefix("OTHER"), None);
    }

    #[test]
    fn test_prefix_rank_orders_across_devices() {
        let config = TransportConfig::default();
        // Discovery prefers the device whose prefix ranks first, even
        // when another matching device was seen earlier in the scan.
        assert_eq!(config.prefix_rank("KIRIRI01-A"), Some(0));
        assert_eq!(config.prefix_rank("KIRI-2"), Some(1));
        assert_eq!(config.prefix_rank("OTHER"), None);
        assert!(config.prefix_rank("KIRIRI01-A") < config.prefix_rank("KIRI-2"));
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let config = AppConfig::default();
        let toml_text = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_text).unwrap();
        assert_eq!(
            parsed.transport.notify_characteristic,
            config.transport.notify_characteristic
        );
        assert_eq!(parsed.window.capacity, config.window.capacity);
    }

    #[test]
    fn test_keepalive_disabled_at_zero() {
        let config = TransportConfig {
            keepalive_interval_secs: 0,
            ..Default::default()
        };
        assert!(config.keepalive_interval().is_none());
    }
}
