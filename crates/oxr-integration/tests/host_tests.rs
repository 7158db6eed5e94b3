//! End-to-end tests of the core host against an in-process fake core
//!
//! The fake core is a set of `extern "C"` functions exported through a symbol
//! map instead of a shared library. Its state lives in a static, like a real
//! core's globals, so every test holds `SERIAL` for its whole run.

use once_cell::sync::Lazy;
use oxr_core::config::PathConfig;
use oxr_core::HostError;
use oxr_ffi::abi::*;
use oxr_ffi::CoreModule;
use oxr_integration::{callbacks, AvTiming, CoreHost};
use oxr_video::PixelFormat;
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;
use std::ffi::{c_uint, c_void, CStr};
use std::io::Write;
use std::path::{Path, PathBuf};

const WIDTH: usize = 4;
const HEIGHT: usize = 2;
/// Row stride in pixels, wider than the visible row
const STRIDE: usize = 5;

const RED: u16 = 0xF800;
const BLUE: u16 = 0x001F;

static SERIAL: Mutex<()> = parking_lot::const_mutex(());

#[derive(Default)]
struct FakeCore {
    environment: Option<RetroEnvironmentFn>,
    video_refresh: Option<RetroVideoRefreshFn>,
    audio_sample: Option<RetroAudioSampleFn>,
    audio_sample_batch: Option<RetroAudioSampleBatchFn>,
    input_poll: Option<RetroInputPollFn>,
    input_state: Option<RetroInputStateFn>,
    counter: u32,
    init_calls: u32,
    deinit_calls: u32,
    unload_calls: u32,
    game_size: usize,
    game_first_byte: Option<u8>,
    reject_game: bool,
    palette: Option<String>,
    jump_held: bool,
    unserialize_sizes: Vec<usize>,
}

static CORE: Lazy<Mutex<FakeCore>> = Lazy::new(|| Mutex::new(FakeCore::default()));

fn environment(cmd: c_uint, data: *mut c_void) -> bool {
    let env = CORE.lock().environment.expect("environment callback installed");
    unsafe { env(cmd, data) }
}

unsafe extern "C" fn retro_set_environment(cb: RetroEnvironmentFn) {
    CORE.lock().environment = Some(cb);
}

unsafe extern "C" fn retro_set_video_refresh(cb: RetroVideoRefreshFn) {
    CORE.lock().video_refresh = Some(cb);
}

unsafe extern "C" fn retro_set_audio_sample(cb: RetroAudioSampleFn) {
    CORE.lock().audio_sample = Some(cb);
}

unsafe extern "C" fn retro_set_audio_sample_batch(cb: RetroAudioSampleBatchFn) {
    CORE.lock().audio_sample_batch = Some(cb);
}

unsafe extern "C" fn retro_set_input_poll(cb: RetroInputPollFn) {
    CORE.lock().input_poll = Some(cb);
}

unsafe extern "C" fn retro_set_input_state(cb: RetroInputStateFn) {
    CORE.lock().input_state = Some(cb);
}

unsafe extern "C" fn retro_api_version() -> c_uint {
    RETRO_API_VERSION
}

unsafe extern "C" fn retro_init() {
    CORE.lock().init_calls += 1;

    let mut log = RetroLogCallback { log: None };
    if environment(
        RETRO_ENVIRONMENT_GET_LOG_INTERFACE,
        &mut log as *mut RetroLogCallback as *mut c_void,
    ) {
        if let Some(log) = log.log {
            log(RETRO_LOG_INFO, c"fake core starting\n".as_ptr());
        }
    }

    let variables = [
        RetroVariable {
            key: c"fake_palette".as_ptr(),
            value: c"Palette; warm|cool".as_ptr(),
        },
        RetroVariable {
            key: std::ptr::null(),
            value: std::ptr::null(),
        },
    ];
    environment(
        RETRO_ENVIRONMENT_SET_VARIABLES,
        variables.as_ptr() as *mut c_void,
    );

    let mut format = RETRO_PIXEL_FORMAT_RGB565;
    environment(
        RETRO_ENVIRONMENT_SET_PIXEL_FORMAT,
        &mut format as *mut c_uint as *mut c_void,
    );

    let descriptors = [
        RetroInputDescriptor {
            port: 0,
            device: RETRO_DEVICE_JOYPAD,
            index: 0,
            id: RETRO_DEVICE_ID_JOYPAD_A,
            description: c"Jump".as_ptr(),
        },
        RetroInputDescriptor {
            port: 0,
            device: RETRO_DEVICE_JOYPAD,
            index: 0,
            id: RETRO_DEVICE_ID_JOYPAD_B,
            description: c"Run".as_ptr(),
        },
        RetroInputDescriptor {
            port: 0,
            device: 0,
            index: 0,
            id: 0,
            description: std::ptr::null(),
        },
    ];
    environment(
        RETRO_ENVIRONMENT_SET_INPUT_DESCRIPTORS,
        descriptors.as_ptr() as *mut c_void,
    );
}

unsafe extern "C" fn retro_deinit() {
    CORE.lock().deinit_calls += 1;
}

unsafe extern "C" fn retro_get_system_info(info: *mut RetroSystemInfo) {
    *info = RetroSystemInfo {
        library_name: c"FakeCore".as_ptr(),
        library_version: c"1.0".as_ptr(),
        valid_extensions: c"bin|rom".as_ptr(),
        need_fullpath: false,
        block_extract: false,
    };
}

unsafe extern "C" fn retro_get_system_av_info(info: *mut RetroSystemAvInfo) {
    *info = RetroSystemAvInfo {
        geometry: RetroGameGeometry {
            base_width: WIDTH as c_uint,
            base_height: HEIGHT as c_uint,
            max_width: WIDTH as c_uint,
            max_height: HEIGHT as c_uint,
            aspect_ratio: 2.0,
        },
        timing: RetroSystemTiming {
            fps: 60.0,
            sample_rate: 44_100.0,
        },
    };
}

unsafe extern "C" fn retro_load_game(game: *const RetroGameInfo) -> bool {
    let game = &*game;
    let mut core = CORE.lock();
    core.game_size = game.size;
    core.game_first_byte =
        (!game.data.is_null() && game.size > 0).then(|| *(game.data as *const u8));
    !core.reject_game
}

unsafe extern "C" fn retro_unload_game() {
    CORE.lock().unload_calls += 1;
}

unsafe extern "C" fn retro_reset() {
    CORE.lock().counter = 0;
}

unsafe extern "C" fn retro_run() {
    let (poll, input_state, video_refresh, audio_batch, audio_sample) = {
        let mut core = CORE.lock();
        core.counter += 1;
        (
            core.input_poll.expect("input poll installed"),
            core.input_state.expect("input state installed"),
            core.video_refresh.expect("video refresh installed"),
            core.audio_sample_batch.expect("audio batch installed"),
            core.audio_sample.expect("audio sample installed"),
        )
    };

    let mut variable = RetroVariable {
        key: c"fake_palette".as_ptr(),
        value: std::ptr::null(),
    };
    environment(
        RETRO_ENVIRONMENT_GET_VARIABLE,
        &mut variable as *mut RetroVariable as *mut c_void,
    );
    let palette = (!variable.value.is_null())
        .then(|| CStr::from_ptr(variable.value).to_string_lossy().into_owned());

    poll();
    let jump = input_state(0, RETRO_DEVICE_JOYPAD, 0, RETRO_DEVICE_ID_JOYPAD_A) != 0;

    let counter = {
        let mut core = CORE.lock();
        core.palette = palette;
        core.jump_held = jump;
        core.counter
    };

    // Padding columns hold garbage that must never reach the frame.
    let mut frame = [0xFFFFu16; STRIDE * HEIGHT];
    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            frame[y * STRIDE + x] = if jump { RED } else { BLUE };
        }
    }
    frame[0] = counter as u16;
    video_refresh(
        frame.as_ptr() as *const c_void,
        WIDTH as c_uint,
        HEIGHT as c_uint,
        STRIDE * 2,
    );
    // Duplicate frame; must not disturb the last one.
    video_refresh(std::ptr::null(), WIDTH as c_uint, HEIGHT as c_uint, STRIDE * 2);

    let sample = counter as i16;
    let samples = [sample, -sample, sample, -sample];
    audio_batch(samples.as_ptr(), 2);
    audio_sample(1, -1);
}

unsafe extern "C" fn retro_serialize_size() -> usize {
    4
}

unsafe extern "C" fn retro_serialize(data: *mut c_void, size: usize) -> bool {
    if size < 4 {
        return false;
    }
    let bytes = CORE.lock().counter.to_le_bytes();
    std::ptr::copy_nonoverlapping(bytes.as_ptr(), data as *mut u8, 4);
    true
}

unsafe extern "C" fn retro_unserialize(data: *const c_void, size: usize) -> bool {
    CORE.lock().unserialize_sizes.push(size);
    if size != 4 {
        return false;
    }
    let bytes = std::slice::from_raw_parts(data as *const u8, 4);
    CORE.lock().counter = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    true
}

/// In-process stand-in for a shared library
struct FakeModule {
    symbols: HashMap<&'static str, usize>,
    path: PathBuf,
}

impl FakeModule {
    fn new(path: &str) -> Self {
        let symbols = HashMap::from([
            ("retro_init", retro_init as usize),
            ("retro_deinit", retro_deinit as usize),
            ("retro_api_version", retro_api_version as usize),
            ("retro_run", retro_run as usize),
            ("retro_reset", retro_reset as usize),
            ("retro_load_game", retro_load_game as usize),
            ("retro_unload_game", retro_unload_game as usize),
            ("retro_set_environment", retro_set_environment as usize),
            ("retro_set_video_refresh", retro_set_video_refresh as usize),
            ("retro_set_audio_sample", retro_set_audio_sample as usize),
            ("retro_set_audio_sample_batch", retro_set_audio_sample_batch as usize),
            ("retro_set_input_poll", retro_set_input_poll as usize),
            ("retro_set_input_state", retro_set_input_state as usize),
            ("retro_get_system_info", retro_get_system_info as usize),
            ("retro_get_system_av_info", retro_get_system_av_info as usize),
            ("retro_serialize_size", retro_serialize_size as usize),
            ("retro_serialize", retro_serialize as usize),
            ("retro_unserialize", retro_unserialize as usize),
        ]);
        Self {
            symbols,
            path: PathBuf::from(path),
        }
    }

    fn without(mut self, names: &[&str]) -> Self {
        for name in names {
            self.symbols.remove(*name);
        }
        self
    }
}

impl CoreModule for FakeModule {
    fn symbol(&self, name: &str) -> Option<*const c_void> {
        self.symbols.get(name).map(|&address| address as *const c_void)
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

fn setup() -> MutexGuard<'static, ()> {
    let guard = SERIAL.lock();
    *CORE.lock() = FakeCore::default();
    guard
}

fn load(host: &mut CoreHost, module: FakeModule) -> (String, String) {
    unsafe { host.load_module(Box::new(module)) }.unwrap()
}

fn game_file(bytes: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(bytes).unwrap();
    file
}

fn loaded_host(module: FakeModule) -> (CoreHost, tempfile::NamedTempFile) {
    let mut host = CoreHost::new(PathConfig::default());
    load(&mut host, module);
    let game = game_file(&[0x42, 0x00, 0x01]);
    host.load_game(game.path()).unwrap();
    (host, game)
}

fn rgba(r: u8, g: u8, b: u8) -> u32 {
    u32::from_ne_bytes([r, g, b, 0xFF])
}

#[test]
fn test_load_core_negotiates() {
    let _serial = setup();
    let mut host = CoreHost::new(PathConfig::default());

    let (name, version) = load(&mut host, FakeModule::new("/cores/fake_libretro.so"));
    assert_eq!(name, "FakeCore");
    assert_eq!(version, "1.0");
    assert!(host.is_loaded());
    assert!(callbacks::has_active_session());
    assert_eq!(CORE.lock().init_calls, 1);

    let settings = host.settings_descriptor().unwrap();
    assert_eq!(settings.len(), 1);
    assert_eq!(settings[0].key, "fake_palette");
    assert_eq!(settings[0].name, "Palette");
    assert_eq!(settings[0].choices, vec!["warm", "cool"]);

    assert_eq!(host.pixel_format().unwrap(), PixelFormat::Rgb565);
    assert_eq!(host.joypad_labels().unwrap(), vec!["Run", "Jump"]);
    assert_eq!(host.system_info().unwrap().valid_extensions, "bin|rom");
}

#[test]
fn test_load_game_passes_bytes_and_refreshes_timing() {
    let _serial = setup();
    let mut host = CoreHost::new(PathConfig::default());
    load(&mut host, FakeModule::new("/cores/fake_libretro.so"));
    assert_eq!(host.timing().unwrap(), AvTiming::default());

    let game = game_file(&[7, 8, 9]);
    host.load_game(game.path()).unwrap();

    {
        let core = CORE.lock();
        assert_eq!(core.game_size, 3);
        assert_eq!(core.game_first_byte, Some(7));
    }
    assert_eq!(
        host.timing().unwrap(),
        AvTiming {
            fps: 60.0,
            sample_rate: 44_100.0
        }
    );
}

#[test]
fn test_rejected_game() {
    let _serial = setup();
    let mut host = CoreHost::new(PathConfig::default());
    load(&mut host, FakeModule::new("/cores/fake_libretro.so"));
    CORE.lock().reject_game = true;

    let game = game_file(&[1]);
    let result = host.load_game(game.path());
    assert!(matches!(result, Err(HostError::GameLoad { .. })));
    assert!(host.is_loaded());
}

#[test]
fn test_missing_game_file() {
    let _serial = setup();
    let mut host = CoreHost::new(PathConfig::default());
    load(&mut host, FakeModule::new("/cores/fake_libretro.so"));

    let result = host.load_game("/nonexistent/game.bin");
    assert!(matches!(result, Err(HostError::GameLoad { .. })));
}

#[test]
fn test_step_produces_frame_and_audio() {
    let _serial = setup();
    let (mut host, _game) = loaded_host(FakeModule::new("/cores/fake_libretro.so"));

    host.step().unwrap();

    let frame = host.frame().unwrap();
    assert_eq!(frame.width(), WIDTH);
    assert_eq!(frame.height(), HEIGHT);
    assert_eq!(frame.pixels().len(), WIDTH * HEIGHT);
    let blue = rgba(0, 0, 255);
    assert!(frame.pixels()[1..].iter().all(|&px| px == blue));
    assert_eq!(frame.as_bytes().len(), WIDTH * HEIGHT * 4);

    assert_eq!(host.audio().unwrap(), vec![1, -1, 1, -1, 1, -1]);
    assert!(host.audio().unwrap().is_empty());
}

#[test]
fn test_buttons_reach_the_core() {
    let _serial = setup();
    let (mut host, _game) = loaded_host(FakeModule::new("/cores/fake_libretro.so"));

    assert!(host.press_button("Jump").unwrap());
    host.step().unwrap();
    assert!(CORE.lock().jump_held);
    assert_eq!(host.frame().unwrap().pixels()[1], rgba(255, 0, 0));

    assert!(host.release_button("Jump").unwrap());
    host.step().unwrap();
    assert!(!CORE.lock().jump_held);

    assert!(!host.press_button("Weak Kick").unwrap());
}

#[test]
fn test_settings_reach_the_core() {
    let _serial = setup();
    let (mut host, _game) = loaded_host(FakeModule::new("/cores/fake_libretro.so"));

    host.step().unwrap();
    assert_eq!(CORE.lock().palette.as_deref(), Some("warm"));

    host.set_setting("fake_palette", "cool").unwrap();
    host.step().unwrap();
    assert_eq!(CORE.lock().palette.as_deref(), Some("cool"));

    assert!(matches!(
        host.set_setting("fake_speed", "fast"),
        Err(HostError::UnknownSetting(_))
    ));
}

#[test]
fn test_save_restore_round_trip() {
    let _serial = setup();
    let (mut host, _game) = loaded_host(FakeModule::new("/cores/fake_libretro.so"));

    for _ in 0..3 {
        host.step().unwrap();
    }
    host.audio().unwrap();

    let blob = host.save_state().unwrap();
    assert_eq!(blob, 3u32.to_le_bytes());

    let run = |host: &mut CoreHost| {
        let mut output = Vec::new();
        for _ in 0..2 {
            host.step().unwrap();
            output.push((host.frame().unwrap().pixels().to_vec(), host.audio().unwrap()));
        }
        output
    };

    let expected = run(&mut host);
    assert!(host.restore_state(&blob));
    let replayed = run(&mut host);
    assert_eq!(expected, replayed);
}

#[test]
fn test_restore_rejected_by_core() {
    let _serial = setup();
    let (mut host, _game) = loaded_host(FakeModule::new("/cores/fake_libretro.so"));

    assert!(!host.restore_state(&[1, 2]));
    assert!(!host.restore_state(&[]));
    assert_eq!(CORE.lock().unserialize_sizes, vec![2, 0]);
}

#[test]
fn test_reset() {
    let _serial = setup();
    let (mut host, _game) = loaded_host(FakeModule::new("/cores/fake_libretro.so"));

    host.step().unwrap();
    host.step().unwrap();
    host.reset().unwrap();
    assert_eq!(CORE.lock().counter, 0);
}

#[test]
fn test_quirk_overrides_descriptors() {
    let _serial = setup();
    let (mut host, _game) = loaded_host(FakeModule::new("/cores/mame2003_plus_libretro.so"));

    let labels = host.joypad_labels().unwrap();
    assert_eq!(labels.len(), 12);
    assert!(labels.iter().any(|label| label == "Coin"));
    assert!(!labels.iter().any(|label| label == "Jump"));

    assert!(!host.press_button("Jump").unwrap());
    assert!(host.press_button("Weak Kick").unwrap());
    host.step().unwrap();
    assert!(CORE.lock().jump_held);
}

#[test]
fn test_missing_symbols_degrade() {
    let _serial = setup();
    let mut host = CoreHost::new(PathConfig::default());
    let module = FakeModule::new("/cores/fake_libretro.so").without(&[
        "retro_run",
        "retro_serialize_size",
        "retro_reset",
        "retro_deinit",
    ]);
    load(&mut host, module);

    assert!(matches!(host.step(), Err(HostError::MissingSymbol("retro_run"))));
    assert!(matches!(
        host.save_state(),
        Err(HostError::MissingSymbol("retro_serialize_size"))
    ));
    assert!(matches!(host.reset(), Err(HostError::MissingSymbol("retro_reset"))));

    host.close_core();
    assert_eq!(CORE.lock().deinit_calls, 0);
}

#[test]
fn test_close_core_releases_session() {
    let _serial = setup();
    let (mut host, _game) = loaded_host(FakeModule::new("/cores/fake_libretro.so"));

    host.close_core();
    host.close_core();
    assert!(!host.is_loaded());
    assert!(!callbacks::has_active_session());
    {
        let core = CORE.lock();
        assert_eq!(core.unload_calls, 1);
        assert_eq!(core.deinit_calls, 1);
    }
    assert!(matches!(host.frame(), Err(HostError::NoCoreLoaded)));
}

#[test]
fn test_replacing_a_core_tears_down_the_old_one() {
    let _serial = setup();
    let mut host = CoreHost::new(PathConfig::default());
    load(&mut host, FakeModule::new("/cores/first_libretro.so"));
    load(&mut host, FakeModule::new("/cores/second_libretro.so"));

    {
        let core = CORE.lock();
        assert_eq!(core.deinit_calls, 1);
        assert_eq!(core.init_calls, 2);
    }
    assert!(callbacks::has_active_session());
    assert_eq!(host.core_path(), Some(PathBuf::from("/cores/second_libretro.so")));
}

#[test]
fn test_failed_load_drops_previous_core() {
    let _serial = setup();
    let mut host = CoreHost::new(PathConfig::default());
    load(&mut host, FakeModule::new("/cores/fake_libretro.so"));

    let result = unsafe { host.load_core("/nonexistent/other_libretro.so") };
    assert!(matches!(result, Err(HostError::ModuleLoad { .. })));
    assert!(!host.is_loaded());
    assert_eq!(CORE.lock().deinit_calls, 1);
    assert!(!callbacks::has_active_session());
}

#[test]
fn test_callbacks_without_session() {
    let _serial = setup();
    assert!(!callbacks::has_active_session());

    let mut can_dupe = false;
    let handled = unsafe {
        callbacks::environment_callback(
            RETRO_ENVIRONMENT_GET_CAN_DUPE,
            &mut can_dupe as *mut bool as *mut c_void,
        )
    };
    assert!(!handled);
    assert!(!can_dupe);

    let state = unsafe {
        callbacks::input_state_callback(0, RETRO_DEVICE_JOYPAD, 0, RETRO_DEVICE_ID_JOYPAD_A)
    };
    assert_eq!(state, 0);

    let samples = [1i16, 2, 3, 4];
    let taken = unsafe { callbacks::audio_sample_batch_callback(samples.as_ptr(), 2) };
    assert_eq!(taken, 0);
}
