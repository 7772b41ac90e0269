mod adb;
mod boundary;
mod capture;
mod config;
mod controller;
mod debug;
mod device;
mod frame;
mod gesture;
mod locate;
mod platform;
mod timing;
mod token;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command, value_parser};
use dialoguer::Confirm;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::{Path, PathBuf};
use std::thread;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::adb::Adb;
use crate::capture::{AdbScreencap, FileFrames, FrameSource};
use crate::config::{CalibrationConfig, resolve_config};
use crate::controller::Controller;
use crate::debug::{DebugSink, Marks};
use crate::frame::Frame;
use crate::gesture::AdbGesture;
use crate::locate::detect;
use crate::timing::hold_duration_ms;

const SCREENSHOT_PATH: &str = "screenshots/autojump.png";

fn cli() -> Command {
    Command::new("leap-rs")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Plays the one-finger jump game on an Android device over adb")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .help("Calibration file; skips the per-resolution lookup"),
        )
        .arg(
            Arg::new("config-dir")
                .long("config-dir")
                .value_name("DIR")
                .value_parser(value_parser!(PathBuf))
                .default_value("config")
                .help("Directory holding <W>x<H>.json and default.json"),
        )
        .arg(
            Arg::new("serial")
                .long("serial")
                .short('s')
                .value_name("SERIAL")
                .help("Target device when more than one is attached"),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .action(ArgAction::SetTrue)
                .help("Save raw and annotated screenshots for every frame"),
        )
        .arg(
            Arg::new("debug-dir")
                .long("debug-dir")
                .value_name("DIR")
                .value_parser(value_parser!(PathBuf))
                .default_value("screenshot_backups"),
        )
        .arg(
            Arg::new("yes")
                .long("yes")
                .short('y')
                .action(ArgAction::SetTrue)
                .help("Do not ask for confirmation before starting"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_name("N")
                .value_parser(value_parser!(u64))
                .help("Seed for touch jitter and settle delays (reproducible runs)"),
        )
        .arg(
            Arg::new("max-jumps")
                .long("max-jumps")
                .value_name("N")
                .value_parser(value_parser!(u64))
                .help("Stop after N presses"),
        )
        .arg(
            Arg::new("replay")
                .long("replay")
                .value_name("PNG")
                .value_parser(value_parser!(PathBuf))
                .help("Analyse a saved screenshot and print the result; no device needed"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .action(ArgAction::SetTrue)
                .help("Log scan details (same as RUST_LOG=debug)"),
        )
}

fn init_logging(verbose: bool) -> Result<()> {
    let default = if verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };
    tracing_subscriber::fmt::fmt()
        .with_env_filter(EnvFilter::builder().with_default_directive(default.into()).from_env()?)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_logging(matches.get_flag("verbose"))?;

    let config_path = matches.get_one::<PathBuf>("config");
    let config_dir = matches
        .get_one::<PathBuf>("config-dir")
        .context("--config-dir has a default")?;
    let debug_sink = matches.get_flag("debug").then(|| {
        let dir = matches.get_one::<PathBuf>("debug-dir").cloned().unwrap_or_default();
        DebugSink::new(dir)
    });

    if let Some(png) = matches.get_one::<PathBuf>("replay") {
        return replay(png, config_path.map(PathBuf::as_path), config_dir, debug_sink.as_ref());
    }

    let confirmed = matches.get_flag("yes")
        || Confirm::new()
            .with_prompt(
                "Make sure USB debugging is on, the phone is connected and a round has started. \
                 Start?",
            )
            .default(true)
            .interact()
            .context("Failed to read confirmation")?;
    if !confirmed {
        println!("bye");
        return Ok(());
    }

    println!("leap-rs {} starting...", env!("CARGO_PKG_VERSION"));
    println!("Press Ctrl+C to stop.");

    let adb = Adb::new("adb", matches.get_one::<String>("serial").cloned());
    let device = device::query_device(&adb).context("Failed to query device - is it connected?")?;
    device::log_device_info(&device);

    let (config, source) =
        resolve_config(config_path.map(PathBuf::as_path), config_dir, device.screen_size)?;
    info!(%source, "calibration loaded");

    let capture = AdbScreencap::connect(adb.clone(), SCREENSHOT_PATH)?;
    info!(path = %capture.output().display(), "screenshots");
    let rng = match matches.get_one::<u64>("seed") {
        Some(&seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let mut controller = Controller::new(&config, capture, AdbGesture::new(adb), rng);
    if let Some(sink) = debug_sink {
        info!(dir = %sink.dir().display(), "debug screenshots enabled");
        controller = controller.with_debug(sink);
    }

    let summary = controller.run(matches.get_one::<u64>("max-jumps").copied(), thread::sleep)?;
    info!(jumps = summary.jumps, skipped = summary.skipped, "done");
    Ok(())
}

/// One-shot analysis of a saved screenshot.
fn replay(
    png: &Path,
    config_path: Option<&Path>,
    config_dir: &Path,
    sink: Option<&DebugSink>,
) -> Result<()> {
    let mut source = FileFrames::new(png);
    let frame = source.acquire()?;
    let size = Some((frame.width(), frame.height()));
    let (config, config_source) = resolve_config(config_path, config_dir, size)?;
    info!(source = %config_source, "calibration loaded");

    let marks = report(&frame, &config);
    if let Some(sink) = sink {
        let (raw, annotated) = sink.record(chrono::Local::now().timestamp(), &frame, &marks)?;
        println!("saved {} and {}", raw.display(), annotated.display());
    }
    Ok(())
}

fn report(frame: &Frame, config: &CalibrationConfig) -> Marks {
    match detect(frame, config) {
        Ok(detection) => {
            let duration_ms = hold_duration_ms(detection.token, detection.platform, config);
            println!("scan start row: {}", detection.scan_start_y);
            println!("token:          {}", detection.token);
            println!("platform:       {}", detection.platform);
            println!("press:          {duration_ms} ms");
            Marks::from(&detection)
        }
        Err(failure) => {
            println!("detection failed: {failure}");
            Marks::from(&failure)
        }
    }
}
