//! Shared foundations for the oxidized-retro core host
//!
//! This crate provides the error type, configuration and logging
//! infrastructure used by every other crate in the workspace.

pub mod config;
pub mod error;
pub mod logging;

pub use config::Config;
pub use error::{HostError, Result};
