//! Gesture dispatch.
//! A jump is a held tap: `input swipe x y x y <ms>` with both endpoints equal.
//! The touch point is the "play again" button location so a mistimed press after game over
//! restarts the round; it is jittered per press so taps never land on the same pixel twice.

use anyhow::{Context, Result};
use rand::Rng;
use tracing::debug;

use crate::adb::Adb;
use crate::config::CalibrationConfig;
use crate::frame::Point;

pub trait GestureDispatcher {
    fn press(&mut self, at: Point, duration_ms: u64) -> Result<()>;
}

pub struct AdbGesture {
    adb: Adb,
}

impl AdbGesture {
    pub fn new(adb: Adb) -> Self {
        Self { adb }
    }
}

impl GestureDispatcher for AdbGesture {
    fn press(&mut self, at: Point, duration_ms: u64) -> Result<()> {
        let args = swipe_args(at, duration_ms);
        debug!("adb shell {}", args.join(" "));
        self.adb
            .shell(&args.each_ref().map(String::as_str))
            .context("Device rejected the press gesture")?;
        Ok(())
    }
}

/// `adb shell` arguments for a hold at `at`: a swipe whose start and end are the same point.
pub fn swipe_args(at: Point, duration_ms: u64) -> [String; 7] {
    let (x, y) = (at.x.to_string(), at.y.to_string());
    [
        "input".to_owned(),
        "swipe".to_owned(),
        x.clone(),
        y.clone(),
        x,
        y,
        duration_ms.to_string(),
    ]
}

/// Touch coordinate for a frame of `width x height`, jittered within the configured bounds
/// and kept on screen.
pub fn touch_point<R: Rng>(
    width: u32,
    height: u32,
    config: &CalibrationConfig,
    rng: &mut R,
) -> Point {
    let (base_x, base_y) = match config.swipe {
        Some(swipe) => (i64::from(swipe.x1), i64::from(swipe.y1)),
        None => (
            (f64::from(width) * config.touch.anchor_x_ratio).round() as i64,
            (f64::from(height) * config.touch.anchor_y_ratio).round() as i64,
        ),
    };

    let jitter_x = i64::from(config.touch.jitter_x);
    let jitter_y = i64::from(config.touch.jitter_y);
    let x = base_x + rng.random_range(-jitter_x..=jitter_x);
    let y = base_y + rng.random_range(-jitter_y..=jitter_y);

    Point::new(
        x.clamp(0, i64::from(width.saturating_sub(1))) as u32,
        y.clamp(0, i64::from(height.saturating_sub(1))) as u32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SwipeOverride, TouchConfig};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_swipe_args_hold_in_place() {
        let args = swipe_args(Point::new(540, 1584), 486);
        assert_eq!(args, ["input", "swipe", "540", "1584", "540", "1584", "486"]);
    }

    #[test]
    fn test_touch_point_stays_within_jitter() {
        let config = CalibrationConfig::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let p = touch_point(1080, 1920, &config, &mut rng);
            assert!((490..=590).contains(&p.x), "{p}");
            assert!((1574..=1594).contains(&p.y), "{p}");
        }
    }

    #[test]
    fn test_touch_point_is_reproducible_with_seed() {
        let config = CalibrationConfig::default();
        let a: Vec<_> = {
            let mut rng = StdRng::seed_from_u64(42);
            (0..10).map(|_| touch_point(1080, 1920, &config, &mut rng)).collect()
        };
        let b: Vec<_> = {
            let mut rng = StdRng::seed_from_u64(42);
            (0..10).map(|_| touch_point(1080, 1920, &config, &mut rng)).collect()
        };
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_jitter_and_override() {
        let config = CalibrationConfig {
            touch: TouchConfig {
                jitter_x: 0,
                jitter_y: 0,
                ..TouchConfig::default()
            },
            swipe: Some(SwipeOverride { x1: 320, y1: 410, x2: 320, y2: 410 }),
            ..CalibrationConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(touch_point(1080, 1920, &config, &mut rng), Point::new(320, 410));
    }

    #[test]
    fn test_touch_point_clamped_to_screen() {
        let config = CalibrationConfig {
            touch: TouchConfig {
                anchor_x_ratio: 1.0,
                anchor_y_ratio: 1.0,
                jitter_x: 0,
                jitter_y: 0,
            },
            ..CalibrationConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(touch_point(100, 200, &config, &mut rng), Point::new(99, 199));
    }
}
