//! Configuration system for the oxidized-retro core host

use crate::error::{HostError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Config {
    pub paths: PathConfig,
    pub runner: RunnerConfig,
    pub debug: DebugConfig,
}

/// Directories handed to cores during negotiation
///
/// These are fixed for the lifetime of a host; cores only ever read them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// BIOS and firmware files
    pub system: PathBuf,
    /// Battery saves and memory cards
    pub save: PathBuf,
    /// Core-specific assets
    pub assets: PathBuf,
}

/// Headless runner settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Number of frames to run before exiting
    pub frames: u64,
    /// Write the last converted frame (raw RGBA8888) to this path
    pub dump_frame: Option<PathBuf>,
    /// Pace frames to the core's reported fps instead of running flat out
    pub realtime: bool,
}

/// Debug settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DebugConfig {
    pub log_level: LogLevel,
}

/// Logging level
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            system: PathBuf::from("./bios"),
            save: PathBuf::from("./"),
            assets: PathBuf::from("./"),
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            frames: 600,
            dump_frame: None,
            realtime: false,
        }
    }
}

impl Config {
    /// Load configuration from file, or create default if it doesn't exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path();

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            Self::from_toml(&content)
        } else {
            let config = Self::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Parse a configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| HostError::Config(e.to_string()))
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| HostError::Config(e.to_string()))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("oxidized-retro")
            .join("config.toml")
    }
}
