//! Core entry point table
//!
//! Every entry point is resolved by the fixed `retro_<name>` convention and is
//! independently optional. A `None` entry means the capability is missing and
//! must not be called.

use crate::abi::*;
use crate::module::CoreModule;
use tracing::{debug, warn};

/// Resolve one entry point. Required entry points warn when missing,
/// optional ones only log at debug level.
macro_rules! bind {
    (@resolve $module:expr, $name:literal, $log:ident) => {
        match $module.symbol(concat!("retro_", $name)) {
            // SAFETY: the libretro ABI fixes the signature behind each name.
            Some(address) => Some(unsafe { std::mem::transmute(address) }),
            None => {
                $log!("Core does not export {}", concat!("retro_", $name));
                None
            }
        }
    };
    ($module:expr, $name:literal, optional) => {
        bind!(@resolve $module, $name, debug)
    };
    ($module:expr, $name:literal) => {
        bind!(@resolve $module, $name, warn)
    };
}

/// Function pointers bound from a loaded core
///
/// Pointers are only valid while the module they came from stays loaded.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoreSymbols {
    pub init: Option<RetroInitFn>,
    pub run: Option<RetroRunFn>,
    pub load_game: Option<RetroLoadGameFn>,
    pub set_environment: Option<RetroSetEnvironmentFn>,
    pub set_video_refresh: Option<RetroSetVideoRefreshFn>,
    pub set_audio_sample: Option<RetroSetAudioSampleFn>,
    pub set_audio_sample_batch: Option<RetroSetAudioSampleBatchFn>,
    pub set_input_poll: Option<RetroSetInputPollFn>,
    pub set_input_state: Option<RetroSetInputStateFn>,
    pub get_system_info: Option<RetroGetSystemInfoFn>,
    pub get_system_av_info: Option<RetroGetSystemAvInfoFn>,
    pub serialize_size: Option<RetroSerializeSizeFn>,
    pub serialize: Option<RetroSerializeFn>,
    pub unserialize: Option<RetroUnserializeFn>,

    pub deinit: Option<RetroDeinitFn>,
    pub api_version: Option<RetroApiVersionFn>,
    pub reset: Option<RetroResetFn>,
    pub unload_game: Option<RetroUnloadGameFn>,
}

impl CoreSymbols {
    /// Resolve every entry point the host knows about
    pub fn bind(module: &dyn CoreModule) -> Self {
        debug!("Binding entry points from {}", module.path().display());

        Self {
            init: bind!(module, "init"),
            run: bind!(module, "run"),
            load_game: bind!(module, "load_game"),
            set_environment: bind!(module, "set_environment"),
            set_video_refresh: bind!(module, "set_video_refresh"),
            set_audio_sample: bind!(module, "set_audio_sample"),
            set_audio_sample_batch: bind!(module, "set_audio_sample_batch"),
            set_input_poll: bind!(module, "set_input_poll"),
            set_input_state: bind!(module, "set_input_state"),
            get_system_info: bind!(module, "get_system_info"),
            get_system_av_info: bind!(module, "get_system_av_info"),
            serialize_size: bind!(module, "serialize_size"),
            serialize: bind!(module, "serialize"),
            unserialize: bind!(module, "unserialize"),

            deinit: bind!(module, "deinit", optional),
            api_version: bind!(module, "api_version", optional),
            reset: bind!(module, "reset", optional),
            unload_game: bind!(module, "unload_game", optional),
        }
    }

    /// Number of required entry points that could not be resolved
    pub fn missing_required(&self) -> usize {
        [
            self.init.is_none(),
            self.run.is_none(),
            self.load_game.is_none(),
            self.set_environment.is_none(),
            self.set_video_refresh.is_none(),
            self.set_audio_sample.is_none(),
            self.set_audio_sample_batch.is_none(),
            self.set_input_poll.is_none(),
            self.set_input_state.is_none(),
            self.get_system_info.is_none(),
            self.get_system_av_info.is_none(),
            self.serialize_size.is_none(),
            self.serialize.is_none(),
            self.unserialize.is_none(),
        ]
        .into_iter()
        .filter(|missing| *missing)
        .count()
    }
}
