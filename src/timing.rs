//! Press timing.
//! Linear distance-to-duration model with a hard floor so every press registers as a hold.
//! No upper bound: overshoot is a calibration problem, handled by the coefficient.

use serde::{Deserialize, Serialize};

use crate::config::CalibrationConfig;
use crate::frame::Point;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    #[default]
    Euclidean,
    /// How far the platform sits above the token; zero when it is level or below.
    Vertical,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationModel {
    /// `distance * coefficient`
    #[default]
    Scale,
    /// `distance + coefficient`
    Offset,
}

pub fn distance(token: Point, platform: Point, metric: DistanceMetric) -> f64 {
    let dx = f64::from(platform.x) - f64::from(token.x);
    let dy = f64::from(platform.y) - f64::from(token.y);
    match metric {
        DistanceMetric::Euclidean => dx.hypot(dy),
        DistanceMetric::Vertical => (-dy).max(0.0),
    }
}

/// Hold time in whole milliseconds (truncated), never below `min_press_ms`.
pub fn press_duration_ms(distance: f64, config: &CalibrationConfig) -> u64 {
    let raw = match config.duration_model {
        DurationModel::Scale => distance * config.duration_coefficient,
        DurationModel::Offset => distance + config.duration_coefficient,
    };
    // `as` saturates on overflow and maps NaN to 0, which the floor then absorbs
    (raw.max(0.0) as u64).max(config.min_press_ms)
}

pub fn hold_duration_ms(token: Point, platform: Point, config: &CalibrationConfig) -> u64 {
    press_duration_ms(distance(token, platform, config.distance_metric), config)
}
