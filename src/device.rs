//! Device diagnostics printed once at startup, and the screen size used to pick a calibration file.

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::adb::Adb;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    pub model: String,
    pub android_version: String,
    pub screen_size: Option<(u32, u32)>,
    pub density: Option<u32>,
}

pub fn query_device(adb: &Adb) -> Result<DeviceInfo> {
    let model = adb.shell(&["getprop", "ro.product.model"]).context("Failed to read device model")?;
    let android_version = adb.shell(&["getprop", "ro.build.version.release"])?;
    let size = adb.shell(&["wm", "size"])?;
    let density = adb.shell(&["wm", "density"])?;

    Ok(DeviceInfo {
        model,
        android_version,
        screen_size: parse_wm_size(&size),
        density: parse_wm_density(&density),
    })
}

pub fn log_device_info(info: &DeviceInfo) {
    info!(
        model = %info.model,
        android = %info.android_version,
        size = ?info.screen_size,
        density = ?info.density,
        "device"
    );
    if info.screen_size.is_none() {
        warn!("could not read screen size; calibration falls back to default.json");
    }
}

/// Parses `wm size` output. An `Override size` line wins over `Physical size`.
pub fn parse_wm_size(output: &str) -> Option<(u32, u32)> {
    last_value(output, &["Override size:", "Physical size:"]).and_then(|value| {
        let (w, h) = value.split_once('x')?;
        Some((w.trim().parse().ok()?, h.trim().parse().ok()?))
    })
}

pub fn parse_wm_density(output: &str) -> Option<u32> {
    last_value(output, &["Override density:", "Physical density:"]).and_then(|v| v.parse().ok())
}

fn last_value<'a>(output: &'a str, prefixes: &[&str]) -> Option<&'a str> {
    prefixes.iter().find_map(|prefix| {
        output
            .lines()
            .filter_map(|line| line.trim().strip_prefix(*prefix))
            .map(str::trim)
            .last()
    })
}
