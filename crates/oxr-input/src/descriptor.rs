//! Input descriptor table
//!
//! Maps a control identity `(device, id, index)` to the display name the core
//! gave it, per port.

use std::collections::HashMap;

/// Highest number of ports a core may describe
pub const MAX_PORTS: usize = 16;

/// Identity of one control as the core polls it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControlId {
    /// Device type (`RETRO_DEVICE_*`)
    pub device: u32,
    /// Control id within the device (`RETRO_DEVICE_ID_*`)
    pub id: u32,
    /// Sub-device index (analog stick side, etc.)
    pub index: u32,
}

impl ControlId {
    pub fn new(device: u32, id: u32, index: u32) -> Self {
        Self { device, id, index }
    }
}

/// One descriptor as registered by the core
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDescriptor {
    pub port: usize,
    pub control: ControlId,
    pub description: String,
}

/// Port-indexed descriptor table
#[derive(Debug, Clone, Default)]
pub struct DescriptorTable {
    ports: Vec<HashMap<ControlId, String>>,
}

impl DescriptorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a single-port table from `(control, name)` pairs
    pub fn single_port<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (ControlId, &'a str)>,
    {
        let port = entries
            .into_iter()
            .map(|(control, name)| (control, name.to_string()))
            .collect();
        Self { ports: vec![port] }
    }

    /// Set the name of a control; the table grows to cover `port`
    ///
    /// A later call for the same control replaces the name. Returns `false`
    /// without touching the table when `port` is not below [`MAX_PORTS`].
    pub fn insert(&mut self, port: usize, control: ControlId, description: String) -> bool {
        if port >= MAX_PORTS {
            return false;
        }
        if self.ports.len() <= port {
            self.ports.resize_with(port + 1, HashMap::new);
        }
        self.ports[port].insert(control, description);
        true
    }

    pub fn name(&self, port: usize, control: &ControlId) -> Option<&str> {
        self.ports.get(port)?.get(control).map(String::as_str)
    }

    pub fn contains_name(&self, port: usize, name: &str) -> bool {
        self.ports
            .get(port)
            .is_some_and(|controls| controls.values().any(|n| n == name))
    }

    pub fn port_count(&self) -> usize {
        self.ports.len()
    }

    /// Display names of a port ordered by control identity
    pub fn labels(&self, port: usize) -> Vec<String> {
        let Some(controls) = self.ports.get(port) else {
            return Vec::new();
        };

        let mut entries: Vec<_> = controls.iter().collect();
        entries.sort_by_key(|(control, _)| **control);
        entries.into_iter().map(|(_, name)| name.clone()).collect()
    }
}
