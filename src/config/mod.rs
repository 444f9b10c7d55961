// SPDX-License-Identifier: MPL-2.0
//! This module handles the application's configuration, loading and saving
//! it from a `settings.toml` file.
//!
//! # Configuration Sections
//!
//! - `[general]` - Logging
//! - `[pipeline]` - Frame pool, sliding window and backward cache sizing
//!
//! # Path Resolution
//!
//! The config file location can be customized for testing or portable deployments:
//! 1. Use `load_from_path()`/`save_to_path()` with explicit path
//! 2. Pass `--config-dir` on the command line
//! 3. Set `VIDINSPECT_CONFIG_DIR` environment variable
//! 4. Falls back to platform-specific config directory
//!
//! # Examples
//!
//! ```no_run
//! use vidinspect::config::{self, PipelineConfig};
//!
//! // Load existing configuration (returns tuple with optional warning)
//! let (mut config, _warning) = config::load();
//!
//! // Modify a setting
//! config.pipeline.window_capacity = Some(16);
//!
//! let pipeline = PipelineConfig::from(&config);
//! assert_eq!(pipeline.window_capacity.value(), 16);
//!
//! config::save(&config).expect("Failed to save config");
//! ```

pub mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use crate::video_player::{BackwardCacheSize, WindowCapacity};
use crate::workspace::paths;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "settings.toml";

// =============================================================================
// Section Structs
// =============================================================================

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeneralConfig {
    /// Default `env_logger` filter (e.g., "info", "vidinspect=debug").
    #[serde(default = "default_log_level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Frame pipeline sizing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipelineSection {
    /// Frames preallocated per opened stream.
    #[serde(default = "default_pool_frames", skip_serializing_if = "Option::is_none")]
    pub pool_frames: Option<usize>,

    /// Frames held by the sliding window.
    #[serde(
        default = "default_window_capacity",
        skip_serializing_if = "Option::is_none"
    )]
    pub window_capacity: Option<usize>,

    /// Frames kept between the cursor and an end before that end is evicted.
    #[serde(
        default = "default_window_margin",
        skip_serializing_if = "Option::is_none"
    )]
    pub window_margin: Option<usize>,

    /// Capacity of the loader's backward ring.
    #[serde(
        default = "default_backward_cache",
        skip_serializing_if = "Option::is_none"
    )]
    pub backward_cache: Option<usize>,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            pool_frames: default_pool_frames(),
            window_capacity: default_window_capacity(),
            window_margin: default_window_margin(),
            backward_cache: default_backward_cache(),
        }
    }
}

// =============================================================================
// Main Config Struct (Sectioned)
// =============================================================================

/// Application configuration with logical sections.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Config {
    /// General application settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Frame pipeline sizing.
    #[serde(default)]
    pub pipeline: PipelineSection,
}

impl Config {
    /// Log filter to install when `RUST_LOG` is unset.
    #[must_use]
    pub fn log_level(&self) -> &str {
        self.general
            .log_level
            .as_deref()
            .unwrap_or(DEFAULT_LOG_LEVEL)
    }
}

// =============================================================================
// Resolved Pipeline Settings
// =============================================================================

/// Validated pipeline sizing consumed by the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub pool_frames: usize,
    pub window_capacity: WindowCapacity,
    /// Always below half the window capacity.
    pub window_margin: usize,
    pub backward_cache: BackwardCacheSize,
}

impl PipelineConfig {
    /// Builds a configuration, clamping every value into its valid range.
    #[must_use]
    pub fn new(
        pool_frames: usize,
        window_capacity: usize,
        window_margin: usize,
        backward_cache: usize,
    ) -> Self {
        let window_capacity = WindowCapacity::new(window_capacity);
        Self {
            pool_frames: pool_frames.clamp(1, MAX_POOL_FRAMES),
            window_margin: window_margin.min(window_capacity.max_margin()),
            window_capacity,
            backward_cache: BackwardCacheSize::new(backward_cache),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_POOL_FRAMES,
            DEFAULT_WINDOW_CAPACITY,
            DEFAULT_WINDOW_MARGIN,
            DEFAULT_BACKWARD_CACHE,
        )
    }
}

impl From<&Config> for PipelineConfig {
    fn from(config: &Config) -> Self {
        let section = &config.pipeline;
        Self::new(
            section.pool_frames.unwrap_or(DEFAULT_POOL_FRAMES),
            section.window_capacity.unwrap_or(DEFAULT_WINDOW_CAPACITY),
            section.window_margin.unwrap_or(DEFAULT_WINDOW_MARGIN),
            section.backward_cache.unwrap_or(DEFAULT_BACKWARD_CACHE),
        )
    }
}

// =============================================================================
// Default Value Functions
// =============================================================================

fn default_log_level() -> Option<String> {
    Some(DEFAULT_LOG_LEVEL.to_string())
}

fn default_pool_frames() -> Option<usize> {
    Some(DEFAULT_POOL_FRAMES)
}

fn default_window_capacity() -> Option<usize> {
    Some(DEFAULT_WINDOW_CAPACITY)
}

fn default_window_margin() -> Option<usize> {
    Some(DEFAULT_WINDOW_MARGIN)
}

fn default_backward_cache() -> Option<usize> {
    Some(DEFAULT_BACKWARD_CACHE)
}

// =============================================================================
// Config Path Resolution
// =============================================================================

fn get_config_path_with_override(base_dir: Option<PathBuf>) -> Option<PathBuf> {
    paths::get_app_config_dir_with_override(base_dir).map(|mut path| {
        path.push(CONFIG_FILE);
        path
    })
}

// =============================================================================
// Load Functions
// =============================================================================

/// Loads the configuration from the default path.
///
/// Returns a tuple of (config, optional_warning). If loading fails, returns
/// default config with a warning message explaining what went wrong.
pub fn load() -> (Config, Option<String>) {
    load_with_override(None)
}

/// Loads the configuration from a custom directory.
pub fn load_with_override(base_dir: Option<PathBuf>) -> (Config, Option<String>) {
    if let Some(path) = get_config_path_with_override(base_dir) {
        if path.exists() {
            match load_from_path(&path) {
                Ok(config) => return (config, None),
                Err(e) => {
                    return (
                        Config::default(),
                        Some(format!("ignoring {}: {e}", path.display())),
                    );
                }
            }
        }
    }
    (Config::default(), None)
}

/// Loads configuration from a specific path.
pub fn load_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    Ok(config)
}

// =============================================================================
// Save Functions
// =============================================================================

/// Saves the configuration to the default path.
pub fn save(config: &Config) -> Result<()> {
    save_with_override(config, None)
}

/// Saves the configuration to a custom directory.
pub fn save_with_override(config: &Config, base_dir: Option<PathBuf>) -> Result<()> {
    if let Some(path) = get_config_path_with_override(base_dir) {
        return save_to_path(config, &path);
    }
    Ok(())
}

/// Saves configuration to a specific path.
pub fn save_to_path(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config).map_err(Error::from)?;
    fs::write(path, content)?;
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
