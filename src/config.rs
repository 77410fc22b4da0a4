//! Configuration file support for the annotation engine.
//!
//! The engine is configured through an explicit [`EngineConfig`] value handed to
//! the [`crate::editor::Editor`] at construction time. The binary loads it from the
//! user's config directory; library users usually build it in code.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    CONSENSUS_TOOLS, DEFAULT_MAX_CONCURRENT_LOADS, DEFAULT_PLAYBACK_FPS, DEFAULT_PLAYBACK_LEAD,
    DEFAULT_PREFETCH_WINDOW, READONLY_TOOLS,
};

/// Log level setting for the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Engine configuration that can be exported and imported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// User preferences
    #[serde(default)]
    pub preferences: Preferences,

    /// Frame prefetch and playback tuning
    #[serde(default)]
    pub frame_loading: FrameLoadingConfig,

    /// Feature flags
    #[serde(default)]
    pub feature_flags: FeatureFlags,

    /// Tool allow-lists applied by availability recomputation
    #[serde(default)]
    pub tool_access: ToolAccessConfig,
}

/// User preferences section of the config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Refit the camera when a view switches to a different item
    #[serde(default = "default_true")]
    pub reset_zoom_on_item_change: bool,

    /// Playback rate used when a video does not carry one
    #[serde(default = "default_playback_fps")]
    pub playback_fps: f32,
}

fn default_true() -> bool {
    true
}

fn default_playback_fps() -> f32 {
    DEFAULT_PLAYBACK_FPS
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            reset_zoom_on_item_change: default_true(),
            playback_fps: default_playback_fps(),
        }
    }
}

/// Frame loading section of the config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameLoadingConfig {
    /// Width of the forward prefetch window
    #[serde(default = "default_prefetch_window")]
    pub prefetch_window: usize,

    /// Maximum number of decodes in flight per view
    #[serde(default = "default_max_concurrent_loads")]
    pub max_concurrent_loads: usize,

    /// Milliseconds before a frame is due that playback starts loading it
    #[serde(default = "default_playback_lead_ms")]
    pub playback_lead_ms: u64,
}

fn default_prefetch_window() -> usize {
    DEFAULT_PREFETCH_WINDOW
}

fn default_max_concurrent_loads() -> usize {
    DEFAULT_MAX_CONCURRENT_LOADS
}

fn default_playback_lead_ms() -> u64 {
    DEFAULT_PLAYBACK_LEAD.as_millis() as u64
}

impl FrameLoadingConfig {
    /// Playback lead as a duration.
    pub fn playback_lead(&self) -> Duration {
        Duration::from_millis(self.playback_lead_ms)
    }
}

impl Default for FrameLoadingConfig {
    fn default() -> Self {
        Self {
            prefetch_window: default_prefetch_window(),
            max_concurrent_loads: default_max_concurrent_loads(),
            playback_lead_ms: default_playback_lead_ms(),
        }
    }
}

/// Feature flags consulted by the tool manager.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    /// Raster (mask) annotations are enabled
    #[serde(default)]
    pub rasters: bool,
}

/// Tool allow-lists section of the config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolAccessConfig {
    /// Tools kept when the current item is read-only or consensus-locked
    #[serde(default = "default_readonly_tools")]
    pub readonly_tools: Vec<String>,

    /// Tools kept while the user works inside a consensus stage
    #[serde(default = "default_consensus_tools")]
    pub consensus_tools: Vec<String>,
}

fn default_readonly_tools() -> Vec<String> {
    READONLY_TOOLS.iter().map(|s| s.to_string()).collect()
}

fn default_consensus_tools() -> Vec<String> {
    CONSENSUS_TOOLS.iter().map(|s| s.to_string()).collect()
}

impl Default for ToolAccessConfig {
    fn default() -> Self {
        Self {
            readonly_tools: default_readonly_tools(),
            consensus_tools: default_consensus_tools(),
        }
    }
}

impl EngineConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            preferences: Preferences::default(),
            frame_loading: FrameLoadingConfig::default(),
            feature_flags: FeatureFlags::default(),
            tool_access: ToolAccessConfig::default(),
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config)
    }

    /// Get the default filename for the config file.
    pub fn default_filename() -> &'static str {
        "workview-config.json"
    }

    /// Get the default config file path.
    /// Returns None on WASM (no filesystem access).
    #[cfg(not(target_arch = "wasm32"))]
    pub fn default_path() -> Option<std::path::PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("workview").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("workview")
                    .join(Self::default_filename())
            })
        }
    }

    /// Try to load configuration from the default path.
    /// Returns None if the file doesn't exist or can't be read.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        Self::load_from_path(&path)
    }

    /// Try to load configuration from an explicit path.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_path(path: &std::path::Path) -> Option<Self> {
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return None;
        }

        match std::fs::read_to_string(path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(config) => {
                    log::info!("Loaded configuration from {:?}", path);
                    Some(config)
                }
                Err(e) => {
                    log::warn!("Failed to parse config file {:?}: {}", path, e);
                    None
                }
            },
            Err(e) => {
                log::warn!("Failed to read config file {:?}: {}", path, e);
                None
            }
        }
    }

    /// Save configuration to the default path.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_default_path(&self) -> Result<(), ConfigError> {
        let path = Self::default_path().ok_or_else(|| {
            ConfigError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config directory",
            ))
        })?;
        self.save_to_path(&path)
    }

    /// Save configuration to an explicit path, creating parent directories.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_path(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = self.to_json()?;
        std::fs::write(path, json)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
