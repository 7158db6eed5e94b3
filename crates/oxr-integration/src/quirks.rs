//! Known core defects and their workarounds
//!
//! This is a short, explicit exception table, not a dispatch mechanism. A core
//! is matched by the library name it reports first and by its module file
//! name second.

use oxr_ffi::abi::*;
use oxr_input::{ControlId, DescriptorTable};
use std::path::Path;

/// Workaround applied to a known core family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quirk {
    /// MAME cores do not register joypad descriptors; install the arcade
    /// panel layout after game load.
    MameJoypadDescriptors,
}

struct QuirkEntry {
    /// Lowercase substring of the library or module name
    pattern: &'static str,
    quirk: Quirk,
}

const KNOWN_QUIRKS: &[QuirkEntry] = &[QuirkEntry {
    pattern: "mame",
    quirk: Quirk::MameJoypadDescriptors,
}];

/// Look up the quirk for a core
pub fn identify(library_name: Option<&str>, module_path: &Path) -> Option<Quirk> {
    let matches = |name: &str| {
        let name = name.to_lowercase();
        KNOWN_QUIRKS
            .iter()
            .find(|entry| name.contains(entry.pattern))
            .map(|entry| entry.quirk)
    };

    library_name.and_then(matches).or_else(|| {
        module_path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(matches)
    })
}

impl Quirk {
    /// Descriptor table that replaces whatever the core registered
    pub fn descriptor_override(&self) -> Option<DescriptorTable> {
        match self {
            Quirk::MameJoypadDescriptors => {
                let joypad = |id| ControlId::new(RETRO_DEVICE_JOYPAD, id, 0);
                Some(DescriptorTable::single_port([
                    (joypad(RETRO_DEVICE_ID_JOYPAD_A), "Weak Kick"),
                    (joypad(RETRO_DEVICE_ID_JOYPAD_B), "Medium Kick"),
                    (joypad(RETRO_DEVICE_ID_JOYPAD_X), "Strong Kick"),
                    (joypad(RETRO_DEVICE_ID_JOYPAD_Y), "Weak Punch"),
                    (joypad(RETRO_DEVICE_ID_JOYPAD_L), "Medium Punch"),
                    (joypad(RETRO_DEVICE_ID_JOYPAD_R), "Strong Punch"),
                    (joypad(RETRO_DEVICE_ID_JOYPAD_START), "Start"),
                    (joypad(RETRO_DEVICE_ID_JOYPAD_SELECT), "Coin"),
                    (joypad(RETRO_DEVICE_ID_JOYPAD_UP), "Up"),
                    (joypad(RETRO_DEVICE_ID_JOYPAD_DOWN), "Down"),
                    (joypad(RETRO_DEVICE_ID_JOYPAD_LEFT), "Left"),
                    (joypad(RETRO_DEVICE_ID_JOYPAD_RIGHT), "Right"),
                ]))
            }
        }
    }
}
