//! Core host
//!
//! [`CoreHost`] owns at most one loaded core and is the only way the
//! embedding application talks to it. Loading a core tears the previous one
//! down first, so a failed load leaves no core active.

use crate::callbacks;
use crate::context::{AvTiming, ControllerType, CoreContext, SharedContext};
use crate::environment::c_string;
use crate::quirks::{self, Quirk};
use crate::settings::SettingsEntry;
use oxr_audio::Sample;
use oxr_core::config::PathConfig;
use oxr_core::{HostError, Result};
use oxr_ffi::abi::*;
use oxr_ffi::{CoreModule, CoreSymbols, DynamicModule};
use oxr_video::{FrameBuffer, PixelFormat};
use serde::Serialize;
use std::ffi::{c_void, CString};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Port exposed to the embedding application for input injection
const HOST_PORT: usize = 0;

/// Static information the core reports about itself
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SystemInfo {
    pub library_name: String,
    pub library_version: String,
    /// `|`-separated list of content extensions
    pub valid_extensions: String,
    /// The core loads content from its path and never wants the bytes
    pub need_fullpath: bool,
    pub block_extract: bool,
}

impl SystemInfo {
    /// # Safety
    /// `symbols` must come from a module that is still loaded.
    unsafe fn query(symbols: &CoreSymbols) -> Self {
        let Some(get_system_info) = symbols.get_system_info else {
            return Self::default();
        };

        let mut raw = RetroSystemInfo::default();
        get_system_info(&mut raw);

        Self {
            library_name: c_string(raw.library_name).unwrap_or_default(),
            library_version: c_string(raw.library_version).unwrap_or_default(),
            valid_extensions: c_string(raw.valid_extensions).unwrap_or_default(),
            need_fullpath: raw.need_fullpath,
            block_extract: raw.block_extract,
        }
    }
}

/// Content handed to `retro_load_game`, kept alive until the game is unloaded
struct LoadedGame {
    path: CString,
    data: Option<Vec<u8>>,
}

impl LoadedGame {
    fn as_raw(&self) -> RetroGameInfo {
        let (data, size) = match &self.data {
            Some(bytes) => (bytes.as_ptr() as *const c_void, bytes.len()),
            None => (std::ptr::null(), 0),
        };
        RetroGameInfo {
            path: self.path.as_ptr(),
            data,
            size,
            meta: std::ptr::null(),
        }
    }
}

/// A bound core and its session
///
/// Fields drop in declaration order, so the module is unloaded after
/// everything that points into it.
struct LoadedCore {
    symbols: CoreSymbols,
    context: SharedContext,
    quirk: Option<Quirk>,
    system_info: SystemInfo,
    game: Option<LoadedGame>,
    module: Box<dyn CoreModule>,
}

impl LoadedCore {
    fn unload_game(&mut self) {
        let Some(game) = self.game.take() else {
            return;
        };
        debug!("Unloading game");
        if let Some(unload_game) = self.symbols.unload_game {
            // SAFETY: the module is loaded for as long as `self` exists.
            unsafe { unload_game() };
        }
        drop(game);
    }
}

impl Drop for LoadedCore {
    fn drop(&mut self) {
        self.unload_game();
        if let Some(deinit) = self.symbols.deinit {
            // SAFETY: the module is still loaded; it is the last field to drop.
            unsafe { deinit() };
        }
        callbacks::deactivate(&self.context);
        info!("Closed core: {}", self.module.path().display());
    }
}

/// Host for a single libretro core
pub struct CoreHost {
    paths: PathConfig,
    core: Option<LoadedCore>,
}

impl CoreHost {
    /// Create a host with no core loaded
    ///
    /// `paths` are the directories reported to every core this host loads.
    pub fn new(paths: PathConfig) -> Self {
        Self { paths, core: None }
    }

    /// Load a core from a shared library and return its name and version
    ///
    /// The current core, if any, is closed before the new one is opened.
    ///
    /// # Safety
    /// The library runs its own code on load and is trusted to implement the
    /// libretro ABI for every `retro_*` symbol it exports.
    pub unsafe fn load_core<P: AsRef<Path>>(&mut self, path: P) -> Result<(String, String)> {
        self.close_core();
        let module = DynamicModule::open(path)?;
        self.load_module(Box::new(module))
    }

    /// Bind an already opened module and start its session
    ///
    /// # Safety
    /// Every `retro_*` symbol `module` resolves must have the libretro
    /// signature for that name.
    pub unsafe fn load_module(&mut self, module: Box<dyn CoreModule>) -> Result<(String, String)> {
        self.close_core();

        let symbols = CoreSymbols::bind(module.as_ref());
        let missing = symbols.missing_required();
        if missing > 0 {
            warn!(
                "{} required entry points missing from {}, affected operations are disabled",
                missing,
                module.path().display()
            );
        }

        let context = CoreContext::new(&self.paths)?.shared();
        callbacks::activate(Arc::clone(&context));

        if let Some(api_version) = symbols.api_version {
            let version = api_version();
            if version != RETRO_API_VERSION {
                warn!(
                    "Core implements API version {}, host implements {}",
                    version, RETRO_API_VERSION
                );
            }
        }

        // Callbacks go in before init, which may already negotiate.
        callbacks::install(&symbols);
        if let Some(init) = symbols.init {
            init();
        }

        let system_info = SystemInfo::query(&symbols);
        let library_name = Some(system_info.library_name.as_str()).filter(|name| !name.is_empty());
        let quirk = quirks::identify(library_name, module.path());
        if let Some(quirk) = quirk {
            info!("Core matches quirk {:?}", quirk);
        }

        info!(
            "Loaded core: {} {}",
            system_info.library_name, system_info.library_version
        );
        let identity = (
            system_info.library_name.clone(),
            system_info.library_version.clone(),
        );

        self.core = Some(LoadedCore {
            symbols,
            context,
            quirk,
            system_info,
            game: None,
            module,
        });
        Ok(identity)
    }

    /// Release the current core; does nothing when none is loaded
    pub fn close_core(&mut self) {
        if let Some(core) = self.core.take() {
            debug!("Closing core: {}", core.module.path().display());
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.core.is_some()
    }

    fn core(&self) -> Result<&LoadedCore> {
        self.core.as_ref().ok_or(HostError::NoCoreLoaded)
    }

    /// Hand content to the core
    ///
    /// Cores that do not need a full path also receive the file's bytes. After
    /// a successful load the timing is refreshed and quirk overrides applied.
    pub fn load_game<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let core = self.core.as_mut().ok_or(HostError::NoCoreLoaded)?;
        let load_game = core
            .symbols
            .load_game
            .ok_or(HostError::MissingSymbol("retro_load_game"))?;

        core.unload_game();
        info!("Loading game: {}", path.display());

        let game_error = |reason: String| HostError::GameLoad {
            path: path.to_path_buf(),
            reason,
        };
        let c_path = CString::new(path.to_string_lossy().into_owned())
            .map_err(|_| game_error("path contains a NUL byte".to_string()))?;
        let data = if core.system_info.need_fullpath {
            None
        } else {
            Some(std::fs::read(path).map_err(|e| game_error(e.to_string()))?)
        };

        let game = LoadedGame { path: c_path, data };
        let info = game.as_raw();
        // SAFETY: `info` points into `game`, which outlives the call.
        if !unsafe { load_game(&info) } {
            return Err(game_error("core rejected the content".to_string()));
        }
        core.game = Some(game);

        if let Some(get_system_av_info) = core.symbols.get_system_av_info {
            let mut av_info = RetroSystemAvInfo::default();
            // SAFETY: the module is loaded while `core` exists.
            unsafe { get_system_av_info(&mut av_info) };
            debug!(
                "Game geometry {}x{}, {} fps, {} Hz",
                av_info.geometry.base_width,
                av_info.geometry.base_height,
                av_info.timing.fps,
                av_info.timing.sample_rate
            );
            core.context.lock().timing = AvTiming {
                fps: av_info.timing.fps,
                sample_rate: av_info.timing.sample_rate,
            };
        }

        if let Some(table) = core.quirk.and_then(|quirk| quirk.descriptor_override()) {
            debug!("Overriding input descriptors for {:?}", core.quirk);
            core.context.lock().input.replace_descriptors(table);
        }

        Ok(())
    }

    /// Run the core for one frame
    pub fn step(&mut self) -> Result<()> {
        let core = self.core()?;
        let run = core.symbols.run.ok_or(HostError::MissingSymbol("retro_run"))?;
        // SAFETY: the module is loaded while `core` exists; no lock is held.
        unsafe { run() };
        Ok(())
    }

    /// Restart the loaded content
    pub fn reset(&mut self) -> Result<()> {
        let core = self.core()?;
        let reset = core.symbols.reset.ok_or(HostError::MissingSymbol("retro_reset"))?;
        info!("Resetting core");
        // SAFETY: as for `step`.
        unsafe { reset() };
        Ok(())
    }

    /// Last converted frame
    pub fn frame(&self) -> Result<FrameBuffer> {
        Ok(self.core()?.context.lock().frame.clone())
    }

    /// Take every audio sample produced since the last call
    pub fn audio(&self) -> Result<Vec<Sample>> {
        Ok(self.core()?.context.lock().audio.drain())
    }

    pub fn timing(&self) -> Result<AvTiming> {
        Ok(self.core()?.context.lock().timing)
    }

    pub fn pixel_format(&self) -> Result<PixelFormat> {
        Ok(self.core()?.context.lock().pixel_format)
    }

    pub fn system_info(&self) -> Result<&SystemInfo> {
        Ok(&self.core()?.system_info)
    }

    /// Controller types the core declared, per port
    pub fn controller_info(&self) -> Result<Vec<Vec<ControllerType>>> {
        Ok(self.core()?.context.lock().controllers.clone())
    }

    /// Options declared by the core, in declaration order
    pub fn settings_descriptor(&self) -> Result<Vec<SettingsEntry>> {
        Ok(self.core()?.context.lock().settings.descriptor().to_vec())
    }

    pub fn set_setting(&mut self, key: &str, value: &str) -> Result<()> {
        self.core()?.context.lock().settings.set(key, value)
    }

    /// Display names of the joypad controls on port 0
    pub fn joypad_labels(&self) -> Result<Vec<String>> {
        Ok(self.core()?.context.lock().input.labels(HOST_PORT))
    }

    /// Hold a control on port 0; `false` if the core did not describe it
    pub fn press_button(&mut self, name: &str) -> Result<bool> {
        self.set_button(name, true)
    }

    /// Release a control on port 0; `false` if the core did not describe it
    pub fn release_button(&mut self, name: &str) -> Result<bool> {
        self.set_button(name, false)
    }

    fn set_button(&mut self, name: &str, pressed: bool) -> Result<bool> {
        let core = self.core()?;
        let mut ctx = core.context.lock();
        Ok(ctx.input.set_state(HOST_PORT, name, pressed))
    }

    /// Serialize the core's state into an opaque blob
    pub fn save_state(&self) -> Result<Vec<u8>> {
        let core = self.core()?;
        let serialize_size = core
            .symbols
            .serialize_size
            .ok_or(HostError::MissingSymbol("retro_serialize_size"))?;
        let serialize = core
            .symbols
            .serialize
            .ok_or(HostError::MissingSymbol("retro_serialize"))?;

        // SAFETY: the module is loaded while `core` exists.
        let size = unsafe { serialize_size() };
        if size == 0 {
            return Err(HostError::SaveState("core reports no state to save".to_string()));
        }

        let mut blob = vec![0u8; size];
        // SAFETY: `blob` is `size` writable bytes.
        if !unsafe { serialize(blob.as_mut_ptr() as *mut c_void, blob.len()) } {
            return Err(HostError::SaveState(format!("core failed to write {} bytes", size)));
        }
        debug!("Saved {} byte state", size);
        Ok(blob)
    }

    /// Restore a blob produced by [`save_state`](Self::save_state)
    ///
    /// Every blob, empty ones included, goes to the core, which decides whether
    /// to accept it. Whether a failed restore leaves the core untouched is up
    /// to the core.
    pub fn restore_state(&mut self, blob: &[u8]) -> bool {
        let Ok(core) = self.core() else {
            warn!("State restore with no core loaded");
            return false;
        };
        let Some(unserialize) = core.symbols.unserialize else {
            warn!("Core cannot restore state");
            return false;
        };
        // SAFETY: `blob` is `blob.len()` readable bytes.
        let restored = unsafe { unserialize(blob.as_ptr() as *const c_void, blob.len()) };
        if !restored {
            warn!("Core rejected a {} byte state", blob.len());
        }
        restored
    }

    /// Path of the loaded core module
    pub fn core_path(&self) -> Option<PathBuf> {
        self.core.as_ref().map(|core| core.module.path().to_path_buf())
    }
}

impl std::fmt::Debug for CoreHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreHost")
            .field("paths", &self.paths)
            .field("core", &self.core_path())
            .finish()
    }
}
