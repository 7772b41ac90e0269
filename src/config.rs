//! Config module.
//! Device calibration constants (score-bar offset, token geometry, press coefficient, ...).
//! Uses serde for JSON serialization; every field has a default so partial files load.
//! Looks up `<dir>/<W>x<H>.json` for the connected device's resolution, then `<dir>/default.json`,
//! and falls back to built-in defaults when neither exists.
//! Loaded once at startup and only ever handed out by shared reference.

use anyhow::{Context, Result, bail, ensure};
use image::Rgb;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::platform::{NearShortcut, PlatformAnchor, TraceDirection};
use crate::timing::{DistanceMetric, DurationModel};
use crate::token::TokenScan;

/// Closed per-channel ranges recognising the token's base color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorSignature {
    pub red: [u8; 2],
    pub green: [u8; 2],
    pub blue: [u8; 2],
}

impl ColorSignature {
    pub fn matches(&self, pixel: Rgb<u8>) -> bool {
        let [r, g, b] = pixel.0;
        (self.red[0]..=self.red[1]).contains(&r)
            && (self.green[0]..=self.green[1]).contains(&g)
            && (self.blue[0]..=self.blue[1]).contains(&b)
    }

    fn is_well_formed(&self) -> bool {
        self.red[0] <= self.red[1] && self.green[0] <= self.green[1] && self.blue[0] <= self.blue[1]
    }
}

impl Default for ColorSignature {
    fn default() -> Self {
        Self {
            red: [50, 60],
            green: [53, 63],
            blue: [95, 110],
        }
    }
}

/// Where the press lands. Ratios are of the frame size; jitter is +/- pixels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TouchConfig {
    pub anchor_x_ratio: f64,
    pub anchor_y_ratio: f64,
    pub jitter_x: u32,
    pub jitter_y: u32,
}

impl Default for TouchConfig {
    fn default() -> Self {
        Self {
            anchor_x_ratio: 0.5,
            // "Play again" button sits at y=1584 on a 1920-row screen
            anchor_y_ratio: 1584.0 / 1920.0,
            jitter_x: 50,
            jitter_y: 10,
        }
    }
}

/// Fixed touch coordinate from older per-device config files. Only the first point is used.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwipeOverride {
    pub x1: u32,
    pub y1: u32,
    #[serde(default)]
    pub x2: u32,
    #[serde(default)]
    pub y2: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettleConfig {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self { min_ms: 1200, max_ms: 1600 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Rows above this belong to the score bar and are never scanned.
    #[serde(alias = "under_game_score_y")]
    pub score_bar_offset: u32,
    #[serde(alias = "press_coefficient")]
    pub duration_coefficient: f64,
    pub min_press_ms: u64,
    /// Distance from the token's visual base up to its contact point.
    #[serde(alias = "piece_base_height_1_2")]
    pub token_half_height: u32,
    #[serde(alias = "piece_body_width")]
    pub token_body_width: u32,
    pub token_signature: ColorSignature,
    pub color_threshold: u32,
    pub boundary_step: u32,
    pub near_token_threshold: u32,
    pub platform_band: u32,
    pub platform_angle_deg: f64,
    pub edge_gap_tolerance: u32,
    pub token_scan: TokenScan,
    pub trace_direction: TraceDirection,
    pub near_shortcut: NearShortcut,
    pub platform_anchor: PlatformAnchor,
    pub distance_metric: DistanceMetric,
    pub duration_model: DurationModel,
    pub touch: TouchConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swipe: Option<SwipeOverride>,
    pub settle: SettleConfig,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            score_bar_offset: 300,
            duration_coefficient: 1.35,
            min_press_ms: 200,
            token_half_height: 20,
            token_body_width: 80,
            token_signature: ColorSignature::default(),
            color_threshold: 10,
            boundary_step: 20,
            near_token_threshold: 260,
            platform_band: 187,
            platform_angle_deg: 30.0,
            edge_gap_tolerance: 1,
            token_scan: TokenScan::default(),
            trace_direction: TraceDirection::default(),
            near_shortcut: NearShortcut::default(),
            platform_anchor: PlatformAnchor::default(),
            distance_metric: DistanceMetric::default(),
            duration_model: DurationModel::default(),
            touch: TouchConfig::default(),
            swipe: None,
            settle: SettleConfig::default(),
        }
    }
}

impl CalibrationConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.token_signature.is_well_formed(),
            "token_signature has an inverted channel range: {:?}",
            self.token_signature
        );
        ensure!(
            self.duration_coefficient.is_finite() && self.duration_coefficient >= 0.0,
            "duration_coefficient must be a finite non-negative number, got {}",
            self.duration_coefficient
        );
        ensure!(self.boundary_step > 0, "boundary_step must be at least 1");
        ensure!(
            self.settle.min_ms <= self.settle.max_ms,
            "settle.min_ms ({}) exceeds settle.max_ms ({})",
            self.settle.min_ms,
            self.settle.max_ms
        );
        ensure!(
            (0.0..=1.0).contains(&self.touch.anchor_x_ratio)
                && (0.0..=1.0).contains(&self.touch.anchor_y_ratio),
            "touch anchor ratios must lie in [0, 1]"
        );
        if !(0.0..90.0).contains(&self.platform_angle_deg) {
            bail!("platform_angle_deg must lie in [0, 90), got {}", self.platform_angle_deg);
        }
        // level near anchors sit on the token row: zero vertical distance
        if self.distance_metric == DistanceMetric::Vertical
            && self.platform_anchor == PlatformAnchor::Center
            && self.near_shortcut == NearShortcut::Level
        {
            bail!(
                "distance_metric \"vertical\" needs platform_anchor \"top_edge\" \
                 (or near_shortcut \"isometric\")"
            );
        }
        Ok(())
    }
}

/// Where the active configuration came from, for the startup log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "{}", path.display()),
            ConfigSource::Defaults => write!(f, "built-in defaults"),
        }
    }
}

pub fn load_config(path: &Path) -> Result<CalibrationConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: CalibrationConfig = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid calibration in {}", path.display()))?;
    Ok(config)
}

/// Picks the configuration for this run.
/// An explicit path must exist; the per-resolution and default files are optional.
pub fn resolve_config(
    explicit: Option<&Path>,
    config_dir: &Path,
    screen_size: Option<(u32, u32)>,
) -> Result<(CalibrationConfig, ConfigSource)> {
    if let Some(path) = explicit {
        return Ok((load_config(path)?, ConfigSource::File(path.to_path_buf())));
    }

    let mut candidates = Vec::with_capacity(2);
    if let Some((w, h)) = screen_size {
        candidates.push(config_dir.join(format!("{w}x{h}.json")));
    }
    candidates.push(config_dir.join("default.json"));

    for candidate in candidates {
        if candidate.is_file() {
            return Ok((load_config(&candidate)?, ConfigSource::File(candidate)));
        }
    }

    Ok((CalibrationConfig::default(), ConfigSource::Defaults))
}
