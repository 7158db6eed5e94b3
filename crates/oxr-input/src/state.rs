//! Input state table
//!
//! Pressed/released state per port, keyed by display name. The state table
//! follows the descriptor table's port count: whenever the two diverge the
//! whole state table is rebuilt released before the next lookup.

use crate::descriptor::{ControlId, DescriptorTable, InputDescriptor, MAX_PORTS};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Descriptor table plus the pressed state of every named control
#[derive(Debug, Default)]
pub struct InputState {
    descriptors: DescriptorTable,
    pressed: Vec<HashMap<String, bool>>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn descriptors(&self) -> &DescriptorTable {
        &self.descriptors
    }

    /// Merge descriptors registered by the core
    ///
    /// Matching controls take the new name; controls absent from `entries`
    /// keep theirs. State held under names that no longer exist is dropped.
    pub fn register_descriptors<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = InputDescriptor>,
    {
        for entry in entries {
            debug!(
                "Input descriptor port {} {:?}: {}",
                entry.port, entry.control, entry.description
            );
            if !self.descriptors.insert(entry.port, entry.control, entry.description) {
                warn!("Ignoring descriptor for port {} (limit {})", entry.port, MAX_PORTS);
            }
        }
        self.prune();
    }

    /// Replace the whole descriptor table
    pub fn replace_descriptors(&mut self, table: DescriptorTable) {
        self.descriptors = table;
        self.prune();
    }

    /// Whether a control is held, as the core sees it
    pub fn get_state(&mut self, port: usize, control: ControlId) -> bool {
        self.resync();

        let Some(name) = self.descriptors.name(port, &control) else {
            return false;
        };
        self.pressed
            .get(port)
            .and_then(|states| states.get(name))
            .copied()
            .unwrap_or(false)
    }

    /// Press or release a control by display name
    ///
    /// Returns `false` when the port or name is not described by the core.
    pub fn set_state(&mut self, port: usize, name: &str, pressed: bool) -> bool {
        self.resync();

        if !self.descriptors.contains_name(port, name) {
            warn!("No control named {:?} on port {}", name, port);
            return false;
        }
        self.pressed[port].insert(name.to_string(), pressed);
        true
    }

    /// Display names of a port ordered by control identity
    pub fn labels(&self, port: usize) -> Vec<String> {
        self.descriptors.labels(port)
    }

    /// Rebuild the state table released if its port count is stale
    fn resync(&mut self) {
        let ports = self.descriptors.port_count();
        if self.pressed.len() != ports {
            debug!(
                "Input ports changed {} -> {}, releasing all controls",
                self.pressed.len(),
                ports
            );
            self.pressed = vec![HashMap::new(); ports];
        }
    }

    fn prune(&mut self) {
        let descriptors = &self.descriptors;
        for (port, states) in self.pressed.iter_mut().enumerate() {
            states.retain(|name, _| descriptors.contains_name(port, name));
        }
    }
}
