//! Input handling for oxidized-retro
//!
//! Cores declare their controls through input descriptors; the host presses
//! and releases them by display name, and the core polls them by control
//! identity.

pub mod descriptor;
pub mod state;

pub use descriptor::{ControlId, DescriptorTable, InputDescriptor, MAX_PORTS};
pub use state::InputState;
