//! Configuration module for ClimaVis-RS
//!
//! This module handles application configuration including:
//! - Station connection settings (candidate addresses, endpoint path)
//! - Network discovery settings
//! - History buffer sizes and plot appearance
//! - Application state persistence (UI preferences, last export folder)
//!
//! # App Data Location
//!
//! Application data is stored in the platform-appropriate location:
//! - **Linux**: `~/.local/share/dev.climavis.climavis-rs/`
//! - **macOS**: `~/Library/Application Support/dev.climavis.climavis-rs/`
//! - **Windows**: `%APPDATA%\dev.climavis.climavis-rs\`
//!
//! # Files
//!
//! - `config.toml` - [`AppConfig`], edited by hand
//! - `app_state.json` - [`AppState`], written by the application on exit
//!
//! Sample history is never persisted.

use crate::error::{ClimaVisError, Result};
use crate::history::{DEFAULT_EXPORT_CAPACITY, DEFAULT_GRAPH_CAPACITY};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application identifier for data directories
pub const APP_ID: &str = "dev.climavis.climavis-rs";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// App state filename
pub const APP_STATE_FILE: &str = "app_state.json";

/// Addresses the station has been seen at, tried in order on startup
pub const DEFAULT_CANDIDATE_ADDRESSES: &[&str] = &["172.16.49.253", "192.168.3.184"];

/// Path of the JSON endpoint on the station
pub const DEFAULT_ENDPOINT_PATH: &str = "/data";

/// DNS-SD service type browsed during the active scan
pub const DEFAULT_SERVICE_TYPE: &str = "_http._tcp.local.";

/// Substring that identifies the station among advertised services
pub const DEFAULT_NAME_FILTER: &str = "arduino";

/// Active scan window in milliseconds
pub const DEFAULT_SCAN_WINDOW_MS: u64 = 5_000;

// ==================== App Data Directory ====================

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Ensure the app data directory exists
pub fn ensure_app_data_dir() -> Result<PathBuf> {
    let dir = app_data_dir().ok_or_else(|| {
        ClimaVisError::Config("Could not determine app data directory".to_string())
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            ClimaVisError::Config(format!("Failed to create app data directory: {}", e))
        })?;
    }

    Ok(dir)
}

/// Get the path to the config file
pub fn config_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(CONFIG_FILE))
}

/// Get the path to the app state file
pub fn app_state_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(APP_STATE_FILE))
}

// ==================== App Config ====================

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Station connection configuration
    #[serde(default)]
    pub device: DeviceConfig,

    /// Network discovery configuration
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// History buffer configuration
    #[serde(default)]
    pub history: HistoryConfig,

    /// UI configuration
    #[serde(default)]
    pub ui: UiConfig,
}

impl AppConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)
            .map_err(|e| ClimaVisError::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config.sanitized())
    }

    /// Load a configuration file, returning defaults if it does not exist
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ClimaVisError::Config(format!("Failed to read config: {}", e)))?;

        Self::from_toml_str(&content)
    }

    /// Load the configuration from the default location, returning defaults on any error
    ///
    /// A missing file is created with the defaults so it can be edited.
    pub fn load_or_default() -> Self {
        let Some(path) = config_path() else {
            tracing::warn!("Could not determine config path, using defaults");
            return Self::default();
        };

        let existed = path.exists();
        let config = Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        });

        if !existed {
            if let Err(e) = ensure_app_data_dir().and_then(|_| config.save(&path)) {
                tracing::warn!("Failed to write default config: {}", e);
            }
        }

        config
    }

    /// Save the configuration as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ClimaVisError::Serialization(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path.as_ref(), content)
            .map_err(|e| ClimaVisError::Config(format!("Failed to write config: {}", e)))
    }

    /// Normalize user-edited values
    ///
    /// Blank candidate addresses are dropped and buffer capacities are kept
    /// at one or more.
    pub fn sanitized(mut self) -> Self {
        self.device.candidate_addresses = self
            .device
            .candidate_addresses
            .into_iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();

        if !self.device.endpoint_path.starts_with('/') {
            self.device.endpoint_path.insert(0, '/');
        }

        if self.history.graph_capacity == 0 {
            tracing::warn!("history.graph_capacity must be at least 1");
            self.history.graph_capacity = 1;
        }
        if self.history.export_capacity == 0 {
            tracing::warn!("history.export_capacity must be at least 1");
            self.history.export_capacity = 1;
        }

        self
    }
}

// ==================== Device Config ====================

/// Station connection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Known station addresses, tried front to back on startup
    pub candidate_addresses: Vec<String>,

    /// Path of the JSON endpoint (e.g. "/data")
    pub endpoint_path: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            candidate_addresses: DEFAULT_CANDIDATE_ADDRESSES
                .iter()
                .map(|a| a.to_string())
                .collect(),
            endpoint_path: DEFAULT_ENDPOINT_PATH.to_string(),
        }
    }
}

// ==================== Discovery Config ====================

/// Active network scan configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// DNS-SD service type to browse
    pub service_type: String,

    /// Case-insensitive substring the service instance name must contain
    pub name_filter: String,

    /// How long to wait for an advertisement, in milliseconds
    pub scan_window_ms: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            service_type: DEFAULT_SERVICE_TYPE.to_string(),
            name_filter: DEFAULT_NAME_FILTER.to_string(),
            scan_window_ms: DEFAULT_SCAN_WINDOW_MS,
        }
    }
}

impl DiscoveryConfig {
    /// Scan window as a duration
    pub fn scan_window(&self) -> Duration {
        Duration::from_millis(self.scan_window_ms)
    }
}

// ==================== History Config ====================

/// History buffer sizes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Samples kept for the live graph
    pub graph_capacity: usize,

    /// Samples kept for export
    pub export_capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            graph_capacity: DEFAULT_GRAPH_CAPACITY,
            export_capacity: DEFAULT_EXPORT_CAPACITY,
        }
    }
}

// ==================== UI Config ====================

/// UI configuration for plotting and display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Show grid on plots
    pub show_grid: bool,

    /// Show legend on plots
    pub show_legend: bool,

    /// Plot line width in pixels
    pub line_width: f32,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            show_grid: true,
            show_legend: true,
            line_width: 2.0,
        }
    }
}

// ==================== App State ====================

/// Persistent application state
///
/// Stores user preferences that persist across sessions, separate from the
/// hand-edited configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    /// Version for future migration support
    #[serde(default = "default_app_state_version")]
    pub version: u32,

    /// Folder of the last successful export
    #[serde(default)]
    pub last_export_dir: Option<PathBuf>,

    /// UI preferences
    #[serde(default)]
    pub ui_preferences: UiPreferences,
}

fn default_app_state_version() -> u32 {
    1
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            version: 1,
            last_export_dir: None,
            ui_preferences: UiPreferences::default(),
        }
    }
}

impl AppState {
    /// Load app state from the default location
    pub fn load() -> Result<Self> {
        let path = app_state_path().ok_or_else(|| {
            ClimaVisError::Config("Could not determine app state path".to_string())
        })?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| ClimaVisError::Config(format!("Failed to read app state: {}", e)))?;

        serde_json::from_str(&content)
            .map_err(|e| ClimaVisError::Config(format!("Failed to parse app state: {}", e)))
    }

    /// Load app state, returning defaults on any error
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load app state, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save app state to the default location
    pub fn save(&self) -> Result<()> {
        let dir = ensure_app_data_dir()?;
        let path = dir.join(APP_STATE_FILE);

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ClimaVisError::Config(format!("Failed to serialize app state: {}", e)))?;

        std::fs::write(&path, content)
            .map_err(|e| ClimaVisError::Config(format!("Failed to write app state: {}", e)))
    }

    /// Remember the folder of an exported file
    pub fn record_export(&mut self, exported_file: &Path) {
        self.last_export_dir = exported_file.parent().map(Path::to_path_buf);
    }
}

/// UI preferences that persist across sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct UiPreferences {
    /// Enable dark mode
    #[serde(default)]
    pub dark_mode: bool,
}

// ==================== Tests ====================
