//! Environment command dispatcher
//!
//! Cores negotiate everything through `retro_environment(cmd, data)`: they
//! declare options, choose a pixel format, describe their controls and ask
//! for directories. Each command reads or writes the session context.
//! Commands the host does not know are answered "not handled" and change
//! nothing.

use crate::context::{ControllerType, CoreContext};
use oxr_ffi::abi::*;
use oxr_input::{ControlId, InputDescriptor};
use oxr_video::PixelFormat;
use std::ffi::{c_char, c_uint, c_void, CStr};
use tracing::{debug, error, info, trace, warn};

/// Copy a C string, `None` for null
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string.
pub(crate) unsafe fn c_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
    }
}

/// Handle one environment command against `ctx`
///
/// # Safety
/// `data` must be null or point to the payload type libretro defines for
/// `cmd`. Terminated arrays must carry their terminator.
pub unsafe fn dispatch(ctx: &mut CoreContext, cmd: c_uint, data: *mut c_void) -> bool {
    if data.is_null() {
        debug!("Environment command {} with null payload", cmd);
        return false;
    }

    match cmd {
        RETRO_ENVIRONMENT_SET_VARIABLES => {
            let mut var = data as *const RetroVariable;
            while !(*var).key.is_null() {
                let key = c_string((*var).key).unwrap_or_default();
                let declaration = c_string((*var).value).unwrap_or_default();
                ctx.settings.register(&key, &declaration);
                var = var.add(1);
            }
            true
        }

        RETRO_ENVIRONMENT_GET_VARIABLE => {
            let var = &mut *(data as *mut RetroVariable);
            let Some(key) = c_string(var.key) else {
                var.value = std::ptr::null();
                return false;
            };
            match ctx.settings.value_ptr(&key) {
                Some(value) => {
                    var.value = value;
                    true
                }
                None => {
                    warn!("Core read undeclared variable {}", key);
                    var.value = std::ptr::null();
                    false
                }
            }
        }

        RETRO_ENVIRONMENT_GET_VARIABLE_UPDATE => {
            *(data as *mut bool) = ctx.settings.take_updated();
            true
        }

        RETRO_ENVIRONMENT_GET_SYSTEM_DIRECTORY => {
            *(data as *mut *const c_char) = ctx.directories.system();
            true
        }

        RETRO_ENVIRONMENT_GET_SAVE_DIRECTORY => {
            *(data as *mut *const c_char) = ctx.directories.save();
            true
        }

        RETRO_ENVIRONMENT_GET_CORE_ASSETS_DIRECTORY => {
            *(data as *mut *const c_char) = ctx.directories.assets();
            true
        }

        RETRO_ENVIRONMENT_SET_PIXEL_FORMAT => {
            let format = PixelFormat::from_raw(*(data as *const c_uint));
            if format.is_supported() {
                info!("Pixel format: {:?}", format);
            } else {
                warn!("Pixel format {:?} is not converted; frames will be dropped", format);
            }
            ctx.pixel_format = format;
            true
        }

        RETRO_ENVIRONMENT_SET_SYSTEM_AV_INFO => {
            let av = &*(data as *const RetroSystemAvInfo);
            ctx.timing.fps = av.timing.fps;
            ctx.timing.sample_rate = av.timing.sample_rate;
            info!(
                "AV info: {:.3} fps, {} Hz, base {}x{}",
                av.timing.fps,
                av.timing.sample_rate,
                av.geometry.base_width,
                av.geometry.base_height
            );
            true
        }

        RETRO_ENVIRONMENT_GET_LOG_INTERFACE => {
            (*(data as *mut RetroLogCallback)).log = Some(oxr_core_log_printf);
            true
        }

        RETRO_ENVIRONMENT_SET_CONTROLLER_INFO => {
            let mut port = data as *const RetroControllerInfo;
            let mut controllers = Vec::new();
            while !(*port).types.is_null() {
                let types = std::slice::from_raw_parts((*port).types, (*port).num_types as usize);
                let port_types: Vec<ControllerType> = types
                    .iter()
                    .map(|t| ControllerType {
                        description: c_string(t.desc).unwrap_or_default(),
                        device: t.id,
                    })
                    .collect();
                for t in &port_types {
                    debug!(
                        "Port {} controller type: {} ({})",
                        controllers.len(),
                        t.description,
                        t.device
                    );
                }
                controllers.push(port_types);
                port = port.add(1);
            }
            ctx.controllers = controllers;
            true
        }

        RETRO_ENVIRONMENT_GET_CAN_DUPE => {
            *(data as *mut bool) = true;
            true
        }

        RETRO_ENVIRONMENT_SET_INPUT_DESCRIPTORS => {
            let mut desc = data as *const RetroInputDescriptor;
            let mut entries = Vec::new();
            while !(*desc).description.is_null() {
                let d = &*desc;
                entries.push(InputDescriptor {
                    port: d.port as usize,
                    control: ControlId::new(d.device, d.id, d.index),
                    description: c_string(d.description).unwrap_or_default(),
                });
                desc = desc.add(1);
            }
            ctx.input.register_descriptors(entries);
            true
        }

        _ => {
            trace!("Unhandled environment command {}", cmd);
            false
        }
    }
}

/// Severity tag for a libretro log level; unknown levels are DEBUG
pub fn log_tag(level: c_uint) -> &'static str {
    match level {
        RETRO_LOG_INFO => "INFO",
        RETRO_LOG_WARN => "WARN",
        RETRO_LOG_ERROR => "ERROR",
        _ => "DEBUG",
    }
}

/// Format a core log line with its severity tag
pub fn format_core_log(level: c_uint, message: &str) -> String {
    format!("[{}] {}", log_tag(level), message.trim_end())
}

extern "C" {
    /// printf-style entry point from `csrc/core_log.c`; formats the line and
    /// passes it to [`oxr_core_log_sink`].
    fn oxr_core_log_printf(level: c_uint, fmt: *const c_char, ...);
}

/// Receives formatted core log lines and routes them into `tracing`
///
/// # Safety
/// `message` must be null or point to a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn oxr_core_log_sink(level: c_uint, message: *const c_char) {
    let Some(message) = c_string(message) else {
        return;
    };
    let line = format_core_log(level, &message);
    match level {
        RETRO_LOG_INFO => info!(target: "core", "{}", line),
        RETRO_LOG_WARN => warn!(target: "core", "{}", line),
        RETRO_LOG_ERROR => error!(target: "core", "{}", line),
        _ => debug!(target: "core", "{}", line),
    }
}
