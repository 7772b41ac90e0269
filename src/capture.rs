//! Screen capture module
//! Pulls a PNG screenshot off the Android device through `adb` and decodes it into a `Frame`.
//! The screenshot is also written to a fixed local path so the debug sink can back it up.
//! Two transports: `exec-out` streams the PNG over stdout (fast); older devices/adb builds need
//! the screenshot written to /sdcard and pulled. The working one is picked once at startup.

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::adb::Adb;
use crate::frame::Frame;

const DEVICE_SCREENSHOT: &str = "/sdcard/autojump.png";

/// Source of frames for the play loop.
pub trait FrameSource {
    fn acquire(&mut self) -> Result<Frame>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScreencapMethod {
    ExecOut,
    PullFromSdcard,
}

pub struct AdbScreencap {
    adb: Adb,
    method: ScreencapMethod,
    output: PathBuf,
}

impl AdbScreencap {
    pub fn new(adb: Adb, method: ScreencapMethod, output: impl Into<PathBuf>) -> Self {
        Self {
            adb,
            method,
            output: output.into(),
        }
    }

    /// Tries each transport in turn and keeps the first that yields a decodable screenshot.
    pub fn connect(adb: Adb, output: impl Into<PathBuf>) -> Result<Self> {
        let output = output.into();
        for method in [ScreencapMethod::ExecOut, ScreencapMethod::PullFromSdcard] {
            let mut capture = Self::new(adb.clone(), method, output.clone());
            match capture.acquire() {
                Ok(frame) => {
                    info!(
                        ?method,
                        width = frame.width(),
                        height = frame.height(),
                        "screenshot transport ready"
                    );
                    return Ok(capture);
                }
                Err(e) => warn!(?method, "screenshot transport unusable: {e:#}"),
            }
        }
        bail!(
            "No working screenshot method. Check `adb devices` and that USB debugging is authorised"
        )
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    fn pull_png(&self) -> Result<Vec<u8>> {
        match self.method {
            ScreencapMethod::ExecOut => {
                let output = self.adb.run(["exec-out", "screencap", "-p"])?;
                Ok(output.stdout)
            }
            ScreencapMethod::PullFromSdcard => {
                self.adb.shell(&["screencap", "-p", DEVICE_SCREENSHOT])?;
                let local = self.output.to_string_lossy().into_owned();
                self.adb.run(["pull", DEVICE_SCREENSHOT, local.as_str()])?;
                fs::read(&self.output).with_context(|| {
                    format!("Failed to read pulled screenshot: {}", self.output.display())
                })
            }
        }
    }
}

impl FrameSource for AdbScreencap {
    fn acquire(&mut self) -> Result<Frame> {
        let start = Instant::now();

        if let Some(parent) = self.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create screenshot directory: {}", parent.display())
            })?;
        }

        let png = self.pull_png().context("Failed to pull screenshot from device")?;
        if png.is_empty() {
            bail!("Device returned an empty screenshot - is the screen on and unlocked?");
        }
        if self.method == ScreencapMethod::ExecOut {
            fs::write(&self.output, &png).with_context(|| {
                format!("Failed to save screenshot to {}", self.output.display())
            })?;
        }

        let decoded = image::load_from_memory(&png).context("Screenshot is not a decodable image")?;
        let frame = Frame::from_dynamic(decoded);
        if frame.width() == 0 || frame.height() == 0 {
            bail!("Captured empty screenshot ({}x{})", frame.width(), frame.height());
        }

        debug!(latency = ?start.elapsed(), "capture");
        Ok(frame)
    }
}

/// Replays one saved screenshot. Used by `--replay`.
pub struct FileFrames {
    path: PathBuf,
}

impl FileFrames {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FrameSource for FileFrames {
    fn acquire(&mut self) -> Result<Frame> {
        Frame::open(&self.path)
    }
}
