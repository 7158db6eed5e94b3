//! Core settings registry
//!
//! Cores declare their options as `key` + `"Name; choice1|choice2|..."`. The
//! first choice is the default. Values are kept as C strings so the pointer
//! handed to the core on a variable read stays valid until the value changes.

use oxr_core::{HostError, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::ffi::{c_char, CString};
use tracing::{debug, warn};

/// One option declared by the core
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingsEntry {
    pub key: String,
    /// Human readable name
    pub name: String,
    pub choices: Vec<String>,
}

impl SettingsEntry {
    /// Parse a declaration of the form `"Name; choice1|choice2"`
    ///
    /// The name is everything before the first `;`. Whitespace right after
    /// the `;` is skipped, then the rest is split on `|`. A declaration with no
    /// `;` is all name and no choices.
    pub fn parse(key: &str, declaration: &str) -> Self {
        let (name, choices) = match declaration.split_once(';') {
            Some((name, rest)) => {
                let rest = rest.trim_start();
                let choices = if rest.is_empty() {
                    Vec::new()
                } else {
                    rest.split('|').map(str::to_string).collect()
                };
                (name.to_string(), choices)
            }
            None => (declaration.to_string(), Vec::new()),
        };

        Self {
            key: key.to_string(),
            name,
            choices,
        }
    }

    pub fn default_value(&self) -> &str {
        self.choices.first().map(String::as_str).unwrap_or("")
    }
}

/// Declared options and their current values
#[derive(Debug, Default)]
pub struct SettingsRegistry {
    entries: Vec<SettingsEntry>,
    values: HashMap<String, CString>,
    updated: bool,
}

impl SettingsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a declared option and reset its value to the default
    pub fn register(&mut self, key: &str, declaration: &str) {
        let entry = SettingsEntry::parse(key, declaration);
        debug!("Setting {} ({}): {:?}", entry.key, entry.name, entry.choices);

        self.values
            .insert(entry.key.clone(), to_c_string(entry.default_value()));
        self.entries.push(entry);
    }

    /// Declared options in registration order
    pub fn descriptor(&self) -> &[SettingsEntry] {
        &self.entries
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(|v| v.to_str().ok())
    }

    /// Pointer to the value's C string, valid until the value changes
    pub fn value_ptr(&self, key: &str) -> Option<*const c_char> {
        self.values.get(key).map(|v| v.as_ptr())
    }

    /// Override a declared option
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let Some(entry) = self.entries.iter().rev().find(|e| e.key == key) else {
            warn!("Ignoring value for undeclared setting {}", key);
            return Err(HostError::UnknownSetting(key.to_string()));
        };

        if !entry.choices.iter().any(|c| c == value) {
            warn!("Setting {} = {:?} is not one of the declared choices", key, value);
        }

        let value = CString::new(value)
            .map_err(|_| HostError::Config(format!("value for {} contains a NUL byte", key)))?;
        self.values.insert(key.to_string(), value);
        self.updated = true;
        Ok(())
    }

    /// Whether any value changed since the last call
    pub fn take_updated(&mut self) -> bool {
        std::mem::take(&mut self.updated)
    }
}

fn to_c_string(value: &str) -> CString {
    // Declarations come from C strings, so they never hold a NUL.
    CString::new(value).unwrap_or_default()
}
