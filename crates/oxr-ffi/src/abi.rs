//! libretro ABI definitions
//!
//! Layouts and constants mirror `libretro.h` (API version 1). Only the parts
//! the host consumes are declared here.

use std::ffi::{c_char, c_uint, c_void};

/// API version this host implements
pub const RETRO_API_VERSION: c_uint = 1;

// ============================================================================
// Environment commands
// ============================================================================

pub const RETRO_ENVIRONMENT_GET_CAN_DUPE: c_uint = 3;
pub const RETRO_ENVIRONMENT_GET_SYSTEM_DIRECTORY: c_uint = 9;
pub const RETRO_ENVIRONMENT_SET_PIXEL_FORMAT: c_uint = 10;
pub const RETRO_ENVIRONMENT_SET_INPUT_DESCRIPTORS: c_uint = 11;
pub const RETRO_ENVIRONMENT_GET_VARIABLE: c_uint = 15;
pub const RETRO_ENVIRONMENT_SET_VARIABLES: c_uint = 16;
pub const RETRO_ENVIRONMENT_GET_VARIABLE_UPDATE: c_uint = 17;
pub const RETRO_ENVIRONMENT_GET_LOG_INTERFACE: c_uint = 27;
pub const RETRO_ENVIRONMENT_GET_CORE_ASSETS_DIRECTORY: c_uint = 30;
pub const RETRO_ENVIRONMENT_GET_SAVE_DIRECTORY: c_uint = 31;
pub const RETRO_ENVIRONMENT_SET_SYSTEM_AV_INFO: c_uint = 32;
pub const RETRO_ENVIRONMENT_SET_CONTROLLER_INFO: c_uint = 35;

// ============================================================================
// Pixel formats
// ============================================================================

pub const RETRO_PIXEL_FORMAT_0RGB1555: c_uint = 0;
pub const RETRO_PIXEL_FORMAT_XRGB8888: c_uint = 1;
pub const RETRO_PIXEL_FORMAT_RGB565: c_uint = 2;
pub const RETRO_PIXEL_FORMAT_UNKNOWN: c_uint = i32::MAX as c_uint;

// ============================================================================
// Input devices
// ============================================================================

pub const RETRO_DEVICE_JOYPAD: c_uint = 1;

pub const RETRO_DEVICE_ID_JOYPAD_B: c_uint = 0;
pub const RETRO_DEVICE_ID_JOYPAD_Y: c_uint = 1;
pub const RETRO_DEVICE_ID_JOYPAD_SELECT: c_uint = 2;
pub const RETRO_DEVICE_ID_JOYPAD_START: c_uint = 3;
pub const RETRO_DEVICE_ID_JOYPAD_UP: c_uint = 4;
pub const RETRO_DEVICE_ID_JOYPAD_DOWN: c_uint = 5;
pub const RETRO_DEVICE_ID_JOYPAD_LEFT: c_uint = 6;
pub const RETRO_DEVICE_ID_JOYPAD_RIGHT: c_uint = 7;
pub const RETRO_DEVICE_ID_JOYPAD_A: c_uint = 8;
pub const RETRO_DEVICE_ID_JOYPAD_X: c_uint = 9;
pub const RETRO_DEVICE_ID_JOYPAD_L: c_uint = 10;
pub const RETRO_DEVICE_ID_JOYPAD_R: c_uint = 11;
pub const RETRO_DEVICE_ID_JOYPAD_L2: c_uint = 12;
pub const RETRO_DEVICE_ID_JOYPAD_R2: c_uint = 13;
pub const RETRO_DEVICE_ID_JOYPAD_L3: c_uint = 14;
pub const RETRO_DEVICE_ID_JOYPAD_R3: c_uint = 15;

// ============================================================================
// Log levels
// ============================================================================

pub const RETRO_LOG_DEBUG: c_uint = 0;
pub const RETRO_LOG_INFO: c_uint = 1;
pub const RETRO_LOG_WARN: c_uint = 2;
pub const RETRO_LOG_ERROR: c_uint = 3;

// ============================================================================
// Structures
// ============================================================================

/// Key/value pair used by `SET_VARIABLES` and `GET_VARIABLE`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RetroVariable {
    pub key: *const c_char,
    pub value: *const c_char,
}

/// One entry of the `SET_INPUT_DESCRIPTORS` array
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RetroInputDescriptor {
    pub port: c_uint,
    pub device: c_uint,
    pub index: c_uint,
    pub id: c_uint,
    pub description: *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RetroControllerDescription {
    pub desc: *const c_char,
    pub id: c_uint,
}

/// One port's entry of the `SET_CONTROLLER_INFO` array
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RetroControllerInfo {
    pub types: *const RetroControllerDescription,
    pub num_types: c_uint,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct RetroGameGeometry {
    pub base_width: c_uint,
    pub base_height: c_uint,
    pub max_width: c_uint,
    pub max_height: c_uint,
    pub aspect_ratio: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct RetroSystemTiming {
    pub fps: f64,
    pub sample_rate: f64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct RetroSystemAvInfo {
    pub geometry: RetroGameGeometry,
    pub timing: RetroSystemTiming,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RetroSystemInfo {
    pub library_name: *const c_char,
    pub library_version: *const c_char,
    pub valid_extensions: *const c_char,
    pub need_fullpath: bool,
    pub block_extract: bool,
}

impl Default for RetroSystemInfo {
    fn default() -> Self {
        Self {
            library_name: std::ptr::null(),
            library_version: std::ptr::null(),
            valid_extensions: std::ptr::null(),
            need_fullpath: false,
            block_extract: false,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RetroGameInfo {
    pub path: *const c_char,
    pub data: *const c_void,
    pub size: usize,
    pub meta: *const c_char,
}

/// Log entry point handed out by `GET_LOG_INTERFACE`, printf-style
pub type RetroLogPrintf = unsafe extern "C" fn(level: c_uint, fmt: *const c_char, ...);

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RetroLogCallback {
    pub log: Option<RetroLogPrintf>,
}

// ============================================================================
// Callback signatures (host side)
// ============================================================================

pub type RetroEnvironmentFn = unsafe extern "C" fn(cmd: c_uint, data: *mut c_void) -> bool;
pub type RetroVideoRefreshFn =
    unsafe extern "C" fn(data: *const c_void, width: c_uint, height: c_uint, pitch: usize);
pub type RetroAudioSampleFn = unsafe extern "C" fn(left: i16, right: i16);
pub type RetroAudioSampleBatchFn = unsafe extern "C" fn(data: *const i16, frames: usize) -> usize;
pub type RetroInputPollFn = unsafe extern "C" fn();
pub type RetroInputStateFn =
    unsafe extern "C" fn(port: c_uint, device: c_uint, index: c_uint, id: c_uint) -> i16;

// ============================================================================
// Entry point signatures (core side)
// ============================================================================

pub type RetroInitFn = unsafe extern "C" fn();
pub type RetroDeinitFn = unsafe extern "C" fn();
pub type RetroApiVersionFn = unsafe extern "C" fn() -> c_uint;
pub type RetroRunFn = unsafe extern "C" fn();
pub type RetroResetFn = unsafe extern "C" fn();
pub type RetroLoadGameFn = unsafe extern "C" fn(game: *const RetroGameInfo) -> bool;
pub type RetroUnloadGameFn = unsafe extern "C" fn();
pub type RetroGetSystemInfoFn = unsafe extern "C" fn(info: *mut RetroSystemInfo);
pub type RetroGetSystemAvInfoFn = unsafe extern "C" fn(info: *mut RetroSystemAvInfo);
pub type RetroSerializeSizeFn = unsafe extern "C" fn() -> usize;
pub type RetroSerializeFn = unsafe extern "C" fn(data: *mut c_void, size: usize) -> bool;
pub type RetroUnserializeFn = unsafe extern "C" fn(data: *const c_void, size: usize) -> bool;

pub type RetroSetEnvironmentFn = unsafe extern "C" fn(cb: RetroEnvironmentFn);
pub type RetroSetVideoRefreshFn = unsafe extern "C" fn(cb: RetroVideoRefreshFn);
pub type RetroSetAudioSampleFn = unsafe extern "C" fn(cb: RetroAudioSampleFn);
pub type RetroSetAudioSampleBatchFn = unsafe extern "C" fn(cb: RetroAudioSampleBatchFn);
pub type RetroSetInputPollFn = unsafe extern "C" fn(cb: RetroInputPollFn);
pub type RetroSetInputStateFn = unsafe extern "C" fn(cb: RetroInputStateFn);
