//! Core integration layer for oxidized-retro
//!
//! Binds a libretro core, answers its callbacks and exposes it to the
//! embedding application through [`CoreHost`].

pub mod callbacks;
pub mod context;
pub mod environment;
pub mod host;
pub mod quirks;
pub mod settings;

pub use context::{AvTiming, ControllerType, CoreContext, SharedContext};
pub use host::{CoreHost, SystemInfo};
pub use quirks::Quirk;
pub use settings::{SettingsEntry, SettingsRegistry};
