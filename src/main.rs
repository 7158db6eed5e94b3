//! Oxidized-Retro - libretro core host
//!
//! Headless runner: loads a core and a game, steps a number of frames and
//! prints a summary of what the core produced.

use anyhow::{Context, Result};
use clap::Parser;
use oxr_core::{logging, Config};
use oxr_integration::{AvTiming, CoreHost, SettingsEntry, SystemInfo};
use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "oxidized-retro")]
#[command(about = "Run a libretro core headless")]
struct Cli {
    /// Path to the core shared library
    core: PathBuf,
    /// Content to load into the core
    game: PathBuf,
    /// Frames to run; overrides the configured count
    #[arg(long)]
    frames: Option<u64>,
    /// Pace frames to the core's frame rate
    #[arg(long)]
    realtime: bool,
    /// Write the last frame as raw RGBA8888 to this path
    #[arg(long)]
    dump_frame: Option<PathBuf>,
    /// Override a core setting, as KEY=VALUE
    #[arg(long = "set", value_name = "KEY=VALUE")]
    settings: Vec<String>,
}

#[derive(Serialize)]
struct RunSummary {
    core: SystemInfo,
    timing: AvTiming,
    frames: u64,
    width: usize,
    height: usize,
    audio_samples: usize,
    settings: Vec<SettingsEntry>,
    joypad: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load().context("loading configuration")?;
    logging::init(config.debug.log_level);

    tracing::info!("Starting Oxidized-Retro");

    let frames = cli.frames.unwrap_or(config.runner.frames);
    let realtime = cli.realtime || config.runner.realtime;
    let dump_frame = cli.dump_frame.or(config.runner.dump_frame);

    let mut host = CoreHost::new(config.paths);
    // SAFETY: the user chose to run this core.
    let (name, version) = unsafe { host.load_core(&cli.core) }
        .with_context(|| format!("loading core {}", cli.core.display()))?;
    tracing::info!("Core: {} {}", name, version);

    for setting in &cli.settings {
        let (key, value) = setting
            .split_once('=')
            .with_context(|| format!("setting {:?} is not KEY=VALUE", setting))?;
        host.set_setting(key, value)?;
    }

    host.load_game(&cli.game)?;
    let timing = host.timing()?;
    let frame_time = (timing.fps > 0.0).then(|| Duration::from_secs_f64(1.0 / timing.fps));

    let mut audio_samples = 0;
    let started = Instant::now();
    for frame in 0..frames {
        let frame_start = Instant::now();
        host.step()?;
        audio_samples += host.audio()?.len();

        if realtime {
            if let Some(remaining) = frame_time.and_then(|t| t.checked_sub(frame_start.elapsed())) {
                std::thread::sleep(remaining);
            }
        }
        if frame > 0 && frame % 600 == 0 {
            tracing::debug!("Frame {}", frame);
        }
    }
    tracing::info!("Ran {} frames in {:.2?}", frames, started.elapsed());

    let last_frame = host.frame()?;
    if let Some(path) = &dump_frame {
        std::fs::write(path, last_frame.as_bytes())
            .with_context(|| format!("writing frame to {}", path.display()))?;
        tracing::info!(
            "Wrote {}x{} frame to {}",
            last_frame.width(),
            last_frame.height(),
            path.display()
        );
    }

    let summary = RunSummary {
        core: host.system_info()?.clone(),
        timing,
        frames,
        width: last_frame.width(),
        height: last_frame.height(),
        audio_samples,
        settings: host.settings_descriptor()?,
        joypad: host.joypad_labels()?,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);

    host.close_core();
    Ok(())
}
