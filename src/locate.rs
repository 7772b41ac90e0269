//! Detection facade - runs boundary, token and platform scans over one frame.
//! A missing token or platform is a `DetectionFailure`: the caller skips the press for this
//! frame instead of jumping with a meaningless distance.

use thiserror::Error;
use tracing::{debug, warn};

use crate::boundary::find_scan_start;
use crate::config::CalibrationConfig;
use crate::frame::{Frame, Point};
use crate::platform::locate_platform;
use crate::token::locate_token;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DetectionFailure {
    #[error("no token-colored pixels below row {scan_start_y}")]
    TokenNotFound { scan_start_y: u32 },
    #[error("no platform edge between row {scan_start_y} and the token at {token}")]
    PlatformNotFound { scan_start_y: u32, token: Point },
}

impl DetectionFailure {
    pub fn scan_start_y(&self) -> u32 {
        match *self {
            DetectionFailure::TokenNotFound { scan_start_y } => scan_start_y,
            DetectionFailure::PlatformNotFound { scan_start_y, .. } => scan_start_y,
        }
    }

    /// The token anchor, if the failure happened after it was found.
    pub fn token(&self) -> Option<Point> {
        match *self {
            DetectionFailure::TokenNotFound { .. } => None,
            DetectionFailure::PlatformNotFound { token, .. } => Some(token),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Detection {
    pub scan_start_y: u32,
    /// No boundary row was found and the scans covered the whole frame.
    pub bounds_degenerate: bool,
    pub token: Point,
    pub platform: Point,
}

/// Main entry point for frame analysis.
pub fn detect(frame: &Frame, config: &CalibrationConfig) -> Result<Detection, DetectionFailure> {
    let (scan_start_y, bounds_degenerate) = match find_scan_start(frame, config) {
        Some(y) => (y, false),
        None => {
            warn!(
                height = frame.height(),
                "no boundary row found, scanning from the top of the frame"
            );
            (0, true)
        }
    };
    debug!(scan_start_y, "boundary");

    let token = locate_token(frame, scan_start_y, config)
        .ok_or(DetectionFailure::TokenNotFound { scan_start_y })?;
    debug!(x = token.x, y = token.y, "token");

    let platform = locate_platform(frame, token, scan_start_y, config)
        .ok_or(DetectionFailure::PlatformNotFound { scan_start_y, token })?;
    debug!(x = platform.x, y = platform.y, "platform");

    debug_assert!(frame.contains(token) && frame.contains(platform));
    Ok(Detection {
        scan_start_y,
        bounds_degenerate,
        token,
        platform,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    pub(crate) const BG: Rgb<u8> = Rgb([200, 210, 225]);

    /// Token base centered on x=300 ending at row 1000; rhombus platform with its vertex at
    /// (650, 700).
    pub(crate) fn game_frame() -> Frame {
        game_frame_with_platform_at(650)
    }

    fn game_frame_with_platform_at(cx: u32) -> Frame {
        let mut img = RgbImage::from_pixel(1080, 1920, BG);
        for y in 900..=1000 {
            for x in 280..=320 {
                img.put_pixel(x, y, Rgb([55, 58, 100]));
            }
        }
        for dx in 0..=100u32 {
            for y in 700 + dx * 6 / 10..=820 - dx * 6 / 10 {
                img.put_pixel(cx + dx, y, Rgb([240, 160, 90]));
                img.put_pixel(cx - dx, y, Rgb([240, 160, 90]));
            }
        }
        Frame::new(img)
    }

    #[test]
    fn test_detects_token_and_platform() {
        let detection = detect(&game_frame(), &CalibrationConfig::default()).unwrap();
        assert_eq!(
            detection,
            Detection {
                // samples at 640..700 step 20; 700 is the first mixed row, backed off one step
                scan_start_y: 680,
                bounds_degenerate: false,
                token: Point::new(300, 980),
                platform: Point::new(650, 760),
            }
        );
    }

    #[test]
    fn test_vertical_metric_on_near_platform_clears_the_floor() {
        use crate::platform::PlatformAnchor;
        use crate::timing::{DistanceMetric, hold_duration_ms};

        let config = CalibrationConfig {
            distance_metric: DistanceMetric::Vertical,
            platform_anchor: PlatformAnchor::TopEdge,
            ..CalibrationConfig::default()
        };
        config.validate().unwrap();

        // vertex 150 px right of the token: inside the near-token threshold
        let detection = detect(&game_frame_with_platform_at(450), &config).unwrap();
        assert_eq!(detection.token, Point::new(300, 980));
        assert_eq!(detection.platform, Point::new(450, 700));
        // 280 px rise * 1.35
        assert_eq!(hold_duration_ms(detection.token, detection.platform, &config), 378);
    }

    #[test]
    fn test_missing_token_is_a_failure() {
        let frame = Frame::new(RgbImage::from_pixel(1080, 1920, BG));
        let err = detect(&frame, &CalibrationConfig::default()).unwrap_err();
        assert_eq!(err, DetectionFailure::TokenNotFound { scan_start_y: 0 });
        assert_eq!(err.token(), None);
    }

    #[test]
    fn test_missing_platform_is_a_failure() {
        let mut img = RgbImage::from_pixel(1080, 1920, BG);
        for y in 900..=1000 {
            for x in 280..=320 {
                img.put_pixel(x, y, Rgb([55, 58, 100]));
            }
        }
        let err = detect(&Frame::new(img), &CalibrationConfig::default()).unwrap_err();
        assert_eq!(
            err,
            DetectionFailure::PlatformNotFound {
                scan_start_y: 880,
                token: Point::new(300, 980),
            }
        );
    }
}
