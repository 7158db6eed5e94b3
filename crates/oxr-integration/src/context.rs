//! Session state of the loaded core
//!
//! Everything the core can change through callbacks lives in one
//! [`CoreContext`], so a session is created, replaced and dropped as a unit.

use crate::settings::SettingsRegistry;
use oxr_audio::AudioSink;
use oxr_core::config::PathConfig;
use oxr_core::{HostError, Result};
use oxr_input::InputState;
use oxr_video::{FrameBuffer, PixelFormat};
use parking_lot::Mutex;
use serde::Serialize;
use std::ffi::{c_char, CString};
use std::path::Path;
use std::sync::Arc;

/// Session context shared between the host and the callback trampolines
pub type SharedContext = Arc<Mutex<CoreContext>>;

/// Audio/video timing reported by the core
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct AvTiming {
    pub fps: f64,
    pub sample_rate: f64,
}

/// Controller type a core offers on one port
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControllerType {
    pub description: String,
    pub device: u32,
}

/// Directory strings handed to the core
///
/// The core may keep the pointers, so they live as long as the session.
#[derive(Debug)]
pub struct Directories {
    system: CString,
    save: CString,
    assets: CString,
}

impl Directories {
    pub fn new(paths: &PathConfig) -> Result<Self> {
        Ok(Self {
            system: path_to_c_string(&paths.system)?,
            save: path_to_c_string(&paths.save)?,
            assets: path_to_c_string(&paths.assets)?,
        })
    }

    pub fn system(&self) -> *const c_char {
        self.system.as_ptr()
    }

    pub fn save(&self) -> *const c_char {
        self.save.as_ptr()
    }

    pub fn assets(&self) -> *const c_char {
        self.assets.as_ptr()
    }
}

fn path_to_c_string(path: &Path) -> Result<CString> {
    CString::new(path.to_string_lossy().into_owned())
        .map_err(|_| HostError::Config(format!("path {} contains a NUL byte", path.display())))
}

/// Mutable state of one core session
#[derive(Debug)]
pub struct CoreContext {
    pub settings: SettingsRegistry,
    pub input: InputState,
    pub frame: FrameBuffer,
    pub audio: AudioSink,
    pub pixel_format: PixelFormat,
    pub timing: AvTiming,
    /// Controller types per port, as declared by the core
    pub controllers: Vec<Vec<ControllerType>>,
    pub directories: Directories,
}

impl CoreContext {
    pub fn new(paths: &PathConfig) -> Result<Self> {
        Ok(Self {
            settings: SettingsRegistry::new(),
            input: InputState::new(),
            frame: FrameBuffer::new(),
            audio: AudioSink::new(),
            pixel_format: PixelFormat::default(),
            timing: AvTiming::default(),
            controllers: Vec::new(),
            directories: Directories::new(paths)?,
        })
    }

    pub fn shared(self) -> SharedContext {
        Arc::new(Mutex::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;

    #[test]
    fn test_new_context() {
        let ctx = CoreContext::new(&PathConfig::default()).unwrap();
        assert_eq!(ctx.pixel_format, PixelFormat::Unknown);
        assert_eq!(ctx.timing, AvTiming::default());
        assert!(ctx.settings.descriptor().is_empty());
        assert!(ctx.audio.is_empty());

        let system = unsafe { CStr::from_ptr(ctx.directories.system()) };
        assert_eq!(system.to_str().unwrap(), "./bios");
    }
}
