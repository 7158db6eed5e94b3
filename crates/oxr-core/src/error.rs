//! Error types for the oxidized-retro core host

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for host operations
///
/// Only [`HostError::ModuleLoad`] ends a core load attempt. Everything else is
/// a local failure of the operation that returned it.
#[derive(Error, Debug)]
pub enum HostError {
    #[error("Failed to open core {path}: {reason}")]
    ModuleLoad { path: PathBuf, reason: String },

    #[error("Core does not export {0}")]
    MissingSymbol(&'static str),

    #[error("No core loaded")]
    NoCoreLoaded,

    #[error("Failed to load game {path}: {reason}")]
    GameLoad { path: PathBuf, reason: String },

    #[error("Save state failed: {0}")]
    SaveState(String),

    #[error("Unknown setting: {0}")]
    UnknownSetting(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for host operations
pub type Result<T> = std::result::Result<T, HostError>;
