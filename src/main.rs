//! CHIRP coop sentry: entry point.
//!
//! Hexagonal wiring of the frame pipeline, the coordination engine and the
//! two device controllers.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  DirectoryFrameSource  SnapshotRecorder  LogEventSink          │
//! │  SyntheticFrameSource  JsonConfigFile    SystemClock           │
//! │  keyboard (stdin)      signal (Ctrl+C / SIGTERM)               │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │          CoordinationEngine (pure logic)               │    │
//! │  │  FSM · streaks · suppression · retry                   │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  TurretController · AlarmController  ──▶  GpioBank<SimPin>     │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

use chirp::adapters::config_file::JsonConfigFile;
use chirp::adapters::frame_source::{DirectoryFrameSource, SyntheticFrameSource};
use chirp::adapters::keyboard;
use chirp::adapters::log_sink::LogEventSink;
use chirp::adapters::recorder::SnapshotRecorder;
use chirp::adapters::signal;
use chirp::adapters::time::SystemClock;
use chirp::app::ports::{Clock, ConfigPort, FrameSource};
use chirp::app::runner::{Pipeline, PipelineIo};
use chirp::app::service::CoordinationEngine;
use chirp::config::SystemConfig;
use chirp::detector::{DetectorTuning, MotionDetector};
use chirp::drivers::alarm::AlarmController;
use chirp::drivers::gpio::{GpioBank, SimPin};
use chirp::drivers::turret::TurretController;
use chirp::error::Error;
use chirp::suppression::SuppressionWindow;

/// Synthetic camera resolution when no frame directory is given.
const SYNTHETIC_HEIGHT: usize = 240;
const SYNTHETIC_WIDTH: usize = 320;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Motion-triggered coop sentry: rotating turret, alarm and clip recorder"
)]
struct Args {
    /// JSON configuration file (defaults are used if it does not exist)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory of frames to play back; a simulated camera is used if omitted
    #[arg(short, long)]
    frames: Option<PathBuf>,

    /// Root directory for recorded clips
    #[arg(long, default_value = "recordings")]
    recordings: PathBuf,

    /// Start with recording enabled
    #[arg(long)]
    record: bool,

    /// No keyboard control
    #[arg(long)]
    headless: bool,

    /// Log filter, e.g. `info` or `chirp=debug`
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Stop after this many frames
    #[arg(long)]
    max_frames: Option<u64>,
}

fn load_config(args: &Args) -> Result<SystemConfig> {
    let mut config = match &args.config {
        Some(path) => JsonConfigFile::new(path)
            .load()
            .map_err(Error::from)
            .with_context(|| format!("loading {}", path.display()))?,
        None => SystemConfig::default(),
    };
    config.recording_enabled |= args.record;
    config.headless |= args.headless;
    config.validate().map_err(Error::from)?;
    Ok(config)
}

fn open_camera(args: &Args, clock: &Arc<dyn Clock>) -> Result<Box<dyn FrameSource>> {
    match &args.frames {
        Some(dir) => {
            let source = DirectoryFrameSource::open(dir, Arc::clone(clock))
                .map_err(Error::from)
                .with_context(|| format!("opening frames in {}", dir.display()))?;
            Ok(Box::new(source))
        }
        None => {
            info!("camera: no frame directory given, using simulated camera");
            let source = SyntheticFrameSource::new(SYNTHETIC_HEIGHT, SYNTHETIC_WIDTH, Arc::clone(clock))
                .with_limit(args.max_frames);
            Ok(Box::new(source))
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // ── 1. Logging ────────────────────────────────────────────
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.log_level))
        .init();

    info!("╔══════════════════════════════════════╗");
    info!("║  CHIRP v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Config ─────────────────────────────────────────────
    let config = load_config(&args)?;

    // ── 3. Camera ─────────────────────────────────────────────
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let mut camera = open_camera(&args, &clock)?;

    // ── 4. Devices ────────────────────────────────────────────
    let motor_bank = GpioBank::new()
        .with_pin(config.motor_cw_pin, SimPin::new())
        .with_pin(config.motor_ccw_pin, SimPin::new());
    let alarm_bank = GpioBank::new().with_pin(config.alarm_pin, SimPin::new());

    let window = SuppressionWindow::new();
    let turret = TurretController::new(&config, Box::new(motor_bank), window.clone(), Arc::clone(&clock));
    let alarm = AlarmController::new(&config, Box::new(alarm_bank), Arc::clone(&clock));

    let mut engine = CoordinationEngine::new(&config, turret, alarm, window);
    let mut detector = MotionDetector::new(DetectorTuning::from_config(&config));
    let mut recorder = SnapshotRecorder::new(&args.recordings, config.recording_enabled);
    info!(
        "recorder: clips under {} (recording {})",
        recorder.root().display(),
        if config.recording_enabled { "on" } else { "off" }
    );
    let mut sink = LogEventSink::new();

    // ── 5. Control inputs ─────────────────────────────────────
    let stop = signal::install().context("installing signal handler")?;
    let (_command_tx, commands) = if config.headless {
        info!("headless: keyboard control disabled");
        crossbeam_channel::unbounded()
    } else {
        info!("keys: r = toggle recording, s = restart, q = quit");
        keyboard::spawn_stdin_reader().context("starting keyboard reader")?
    };

    // ── 6. Run ────────────────────────────────────────────────
    let pipeline = Pipeline::new(&config).with_max_frames(args.max_frames);
    let io = PipelineIo {
        source: &mut camera,
        recorder: &mut recorder,
        sink: &mut sink,
        commands: &commands,
        stop: &stop,
    };
    let summary = pipeline.run(&mut engine, &mut detector, io)?;

    let stats = engine.stats();
    info!(
        "done: {} frames, {} processed, {} suppressed, {} alarms, {} faults",
        summary.frames, stats.events_processed, stats.events_suppressed, stats.alarms_raised, stats.faults
    );
    if stats.faults > 0 {
        warn!("run ended with {} hardware faults", stats.faults);
    }
    Ok(())
}
