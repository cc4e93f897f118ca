//! Configuration module for xpad-rs
//!
//! Settings that shape how the core behaves: sandbox limits for the command
//! evaluator, plot preparation and read defaults. The file is TOML and every
//! field has a default, so a partial file is valid.
//!
//! # Location
//!
//! The configuration lives in the platform config directory under
//! `io.github.xpad-rs`:
//!
//! - **Linux**: `~/.config/io.github.xpad-rs/config.toml`
//! - **macOS**: `~/Library/Application Support/io.github.xpad-rs/config.toml`
//! - **Windows**: `%APPDATA%\io.github.xpad-rs\config.toml`
//!
//! # Example
//!
//! ```toml
//! [evaluator]
//! max_operations = 5000000
//!
//! [plot]
//! max_points = 20000
//! ```

use crate::error::{Result, XpadError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for the config directory
pub const APP_ID: &str = "io.github.xpad-rs";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Default number of samples per plotted trace before down-sampling
pub const DEFAULT_MAX_PLOT_POINTS: usize = 10_000;

/// Path of the config file in the platform config directory
pub fn config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID).join(CONFIG_FILE))
}

/// Sandbox limits applied to the expression engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Operations one evaluation may perform (0 = unlimited)
    pub max_operations: u64,
    /// Nesting depth of function calls
    pub max_call_levels: usize,
    /// Nesting depth of expressions
    pub max_expr_depth: usize,
    /// Length of any string value
    pub max_string_size: usize,
    /// Length of any array value (data arrays included)
    pub max_array_size: usize,
    /// Size of any object map
    pub max_map_size: usize,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            max_operations: 1_000_000,
            max_call_levels: 32,
            max_expr_depth: 64,
            max_string_size: 100_000,
            max_array_size: 10_000_000,
            max_map_size: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    /// Traces longer than this are down-sampled (0 = never)
    pub max_points: usize,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            max_points: DEFAULT_MAX_PLOT_POINTS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadConfig {
    /// Selector used when a read is requested without any
    pub default_selector: String,
}

impl ReadConfig {
    /// `selectors`, or the default selector alone when the list is empty
    pub fn selectors_or_default(&self, selectors: &[String]) -> Vec<String> {
        if selectors.is_empty() {
            vec![self.default_selector.clone()]
        } else {
            selectors.to_vec()
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XpadConfig {
    pub evaluator: EvaluatorConfig,
    pub plot: PlotConfig,
    pub reads: ReadConfig,
}

impl XpadConfig {
    /// Load configuration from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            XpadError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        toml::from_str(&content)
            .map_err(|e| XpadError::Config(format!("Failed to parse config file {:?}: {}", path, e)))
    }

    /// Load from the default location. A missing file gives the defaults
    /// silently; an unreadable one is logged and gives the defaults.
    pub fn load_or_default() -> Self {
        let Some(path) = config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save configuration to a file, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                XpadError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| XpadError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            XpadError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }
}
