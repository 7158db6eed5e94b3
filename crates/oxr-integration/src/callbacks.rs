//! Callback trampolines
//!
//! libretro callbacks carry no user pointer, so the functions handed to the
//! core reach the session through one process-wide slot. [`CoreHost`] fills
//! the slot when it binds a core and empties it when the core goes away.
//! Nothing else writes to it.
//!
//! The core calls these synchronously from inside `retro_init`,
//! `retro_load_game` and `retro_run`. The host never holds the session lock
//! across those calls.
//!
//! [`CoreHost`]: crate::host::CoreHost

use crate::context::{CoreContext, SharedContext};
use crate::environment;
use once_cell::sync::Lazy;
use oxr_ffi::CoreSymbols;
use oxr_input::ControlId;
use oxr_video::FrameBuffer;
use parking_lot::Mutex;
use std::ffi::{c_uint, c_void};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Session the callbacks currently act on
static ACTIVE_SESSION: Lazy<Mutex<Option<SharedContext>>> = Lazy::new(|| Mutex::new(None));

/// Route callbacks to `ctx`
pub fn activate(ctx: SharedContext) {
    debug!("Activating core session");
    *ACTIVE_SESSION.lock() = Some(ctx);
}

/// Stop routing callbacks to `ctx`, if it is the active session
pub fn deactivate(ctx: &SharedContext) {
    let mut slot = ACTIVE_SESSION.lock();
    if slot.as_ref().is_some_and(|active| Arc::ptr_eq(active, ctx)) {
        debug!("Deactivating core session");
        *slot = None;
    }
}

/// Whether any session currently receives callbacks
pub fn has_active_session() -> bool {
    ACTIVE_SESSION.lock().is_some()
}

fn with_session<R>(f: impl FnOnce(&mut CoreContext) -> R) -> Option<R> {
    // Clone out of the slot so the slot lock is not held while the session is.
    let session = ACTIVE_SESSION.lock().clone();
    let Some(ctx) = session else {
        warn!("Core callback with no active session");
        return None;
    };
    let mut guard = ctx.lock();
    Some(f(&mut guard))
}

/// Register every available callback with the core
///
/// # Safety
/// `symbols` must come from a module that is still loaded.
pub unsafe fn install(symbols: &CoreSymbols) {
    if let Some(set) = symbols.set_environment {
        set(environment_callback);
    }
    if let Some(set) = symbols.set_video_refresh {
        set(video_refresh_callback);
    }
    if let Some(set) = symbols.set_audio_sample {
        set(audio_sample_callback);
    }
    if let Some(set) = symbols.set_audio_sample_batch {
        set(audio_sample_batch_callback);
    }
    if let Some(set) = symbols.set_input_poll {
        set(input_poll_callback);
    }
    if let Some(set) = symbols.set_input_state {
        set(input_state_callback);
    }
}

pub unsafe extern "C" fn environment_callback(cmd: c_uint, data: *mut c_void) -> bool {
    with_session(|ctx| unsafe { environment::dispatch(ctx, cmd, data) }).unwrap_or(false)
}

pub unsafe extern "C" fn video_refresh_callback(
    data: *const c_void,
    width: c_uint,
    height: c_uint,
    pitch: usize,
) {
    if data.is_null() {
        trace!("Duplicate frame");
        return;
    }

    let (width, height) = (width as usize, height as usize);
    with_session(|ctx| {
        let format = ctx.pixel_format;
        let Some(len) = FrameBuffer::source_len(format, width, height, pitch) else {
            trace!("Dropping {}x{} frame in {:?}", width, height, format);
            return;
        };
        // SAFETY: the core guarantees `height` rows of `pitch` bytes at `data`.
        let source = unsafe { std::slice::from_raw_parts(data as *const u8, len) };
        ctx.frame.update(format, source, width, height, pitch);
    });
}

pub unsafe extern "C" fn audio_sample_callback(left: i16, right: i16) {
    with_session(|ctx| ctx.audio.push_frame(left, right));
}

pub unsafe extern "C" fn audio_sample_batch_callback(data: *const i16, frames: usize) -> usize {
    if data.is_null() {
        return 0;
    }
    // SAFETY: the core passes `frames` interleaved stereo frames.
    let samples = unsafe { std::slice::from_raw_parts(data, frames * oxr_audio::CHANNELS) };
    with_session(|ctx| ctx.audio.push_batch(samples)).unwrap_or(0)
}

pub unsafe extern "C" fn input_poll_callback() {
    trace!("Input poll");
}

pub unsafe extern "C" fn input_state_callback(
    port: c_uint,
    device: c_uint,
    index: c_uint,
    id: c_uint,
) -> i16 {
    let control = ControlId::new(device, id, index);
    with_session(|ctx| ctx.input.get_state(port as usize, control))
        .map(i16::from)
        .unwrap_or(0)
}
