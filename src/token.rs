//! Token locator.
//! Finds the player token by its base color. The token narrows toward the top, so the
//! lowest row containing signature pixels is its base; averaging that row's columns gives
//! the horizontal center, and lifting it by the half-height gives the contact point.

use serde::{Deserialize, Serialize};

use crate::config::CalibrationConfig;
use crate::frame::{Frame, Point, ScanWindow};

/// Row order for the token scan. Both pick the same row; bottom-up stops earlier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenScan {
    #[default]
    TopDown,
    BottomUp,
}

/// Columns within `W/8` of either edge hold UI chrome and are skipped by both locators.
pub fn horizontal_margin(frame: &Frame) -> u32 {
    frame.width() / 8
}

pub fn token_window(frame: &Frame, scan_start_y: u32) -> ScanWindow {
    let margin = horizontal_margin(frame);
    ScanWindow::clipped(
        frame,
        scan_start_y,
        frame.height() * 2 / 3,
        margin,
        frame.width().saturating_sub(margin),
    )
}

pub fn locate_token(frame: &Frame, scan_start_y: u32, config: &CalibrationConfig) -> Option<Point> {
    let window = token_window(frame, scan_start_y);
    let centroid = |y: u32| row_centroid(frame, &window, y, config).map(|x| (x, y));

    let (x, base_y) = match config.token_scan {
        TokenScan::TopDown => window.rows().filter_map(centroid).last(),
        TokenScan::BottomUp => window.rows().rev().find_map(centroid),
    }?;

    Some(Point::new(x, base_y.saturating_sub(config.token_half_height)))
}

/// Mean column of the signature pixels in row `y`, if any.
fn row_centroid(
    frame: &Frame,
    window: &ScanWindow,
    y: u32,
    config: &CalibrationConfig,
) -> Option<u32> {
    let (sum, count) = window
        .cols()
        .filter(|&x| config.token_signature.matches(frame.at(x, y)))
        .fold((0u64, 0u64), |(sum, count), x| (sum + u64::from(x), count + 1));

    // the mean of in-window columns always fits back into u32
    (count > 0).then(|| (sum / count) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::ops::RangeInclusive;

    const BG: Rgb<u8> = Rgb([200, 210, 225]);
    const TOKEN: Rgb<u8> = Rgb([55, 58, 100]);

    fn paint(img: &mut RgbImage, xs: RangeInclusive<u32>, ys: RangeInclusive<u32>, color: Rgb<u8>) {
        for y in ys {
            for x in xs.clone() {
                img.put_pixel(x, y, color);
            }
        }
    }

    fn token_frame() -> Frame {
        let mut img = RgbImage::from_pixel(1080, 1920, BG);
        paint(&mut img, 400..=420, 700..=760, TOKEN);
        Frame::new(img)
    }

    #[test]
    fn test_rectangular_token_exact_anchor() {
        let frame = token_frame();
        let config = CalibrationConfig::default();
        // x = mean(400..=420) = 410, y = bottom row 760 - half-height 20
        assert_eq!(locate_token(&frame, 640, &config), Some(Point::new(410, 740)));
    }

    #[test]
    fn test_bottom_up_agrees_with_top_down() {
        let frame = token_frame();
        let config = CalibrationConfig {
            token_scan: TokenScan::BottomUp,
            ..CalibrationConfig::default()
        };
        assert_eq!(locate_token(&frame, 640, &config), Some(Point::new(410, 740)));
    }

    #[test]
    fn test_uses_the_narrowing_base_row() {
        let mut img = RgbImage::from_pixel(1080, 1920, BG);
        // wide head, narrower base offset to the right
        paint(&mut img, 380..=440, 700..=720, TOKEN);
        paint(&mut img, 430..=450, 721..=780, TOKEN);
        let frame = Frame::new(img);
        let config = CalibrationConfig::default();
        assert_eq!(locate_token(&frame, 640, &config), Some(Point::new(440, 760)));
    }

    #[test]
    fn test_no_signature_pixels() {
        let mut img = RgbImage::from_pixel(1080, 1920, BG);
        // close to the signature but outside the blue range
        paint(&mut img, 400..=420, 700..=760, Rgb([55, 58, 120]));
        let frame = Frame::new(img);
        assert_eq!(locate_token(&frame, 640, &CalibrationConfig::default()), None);
    }

    #[test]
    fn test_ignores_matches_outside_window() {
        let mut img = RgbImage::from_pixel(1080, 1920, BG);
        // inside the left margin (W/8 = 135)
        paint(&mut img, 10..=40, 800..=850, TOKEN);
        // below 2H/3 = 1280
        paint(&mut img, 500..=520, 1300..=1350, TOKEN);
        // above the scan start
        paint(&mut img, 500..=520, 600..=630, TOKEN);
        let frame = Frame::new(img);
        assert_eq!(locate_token(&frame, 640, &CalibrationConfig::default()), None);
    }

    #[test]
    fn test_anchor_saturates_at_top() {
        let mut img = RgbImage::from_pixel(400, 300, BG);
        paint(&mut img, 100..=110, 0..=5, TOKEN);
        let frame = Frame::new(img);
        let found = locate_token(&frame, 0, &CalibrationConfig::default());
        assert_eq!(found, Some(Point::new(105, 0)));
    }
}
