//! Frame module.
//! Immutable RGB pixel grid decoded from one device screenshot, plus the small
//! geometry types (Point, ScanWindow) every scanner works with.
//! Pixel lookup is O(1); out-of-bounds access is an error, never a clamp.

use anyhow::{Context, Result};
use image::{DynamicImage, Rgb, RgbImage};
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("pixel ({x}, {y}) is outside the {width}x{height} frame")]
    OutOfBounds { x: u32, y: u32, width: u32, height: u32 },
}

/// A located anchor. Only ever constructed for a real detection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Half-open rectangle `[left, right) x [top, bottom)` bounding one scan pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanWindow {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

impl ScanWindow {
    /// Builds a window and clips it to the frame, so every coordinate it yields is addressable.
    pub fn clipped(frame: &Frame, top: u32, bottom: u32, left: u32, right: u32) -> Self {
        Self {
            top: top.min(frame.height()),
            bottom: bottom.min(frame.height()),
            left: left.min(frame.width()),
            right: right.min(frame.width()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.top >= self.bottom || self.left >= self.right
    }

    pub fn rows(&self) -> std::ops::Range<u32> {
        self.top..self.bottom.max(self.top)
    }

    pub fn cols(&self) -> std::ops::Range<u32> {
        self.left..self.right.max(self.left)
    }
}

pub struct Frame {
    image: RgbImage,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    /// Decodes a screenshot from disk. Alpha is dropped; the device renders opaque frames.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let decoded = image::open(path)
            .with_context(|| format!("Failed to decode screenshot: {}", path.display()))?;
        Ok(Self::from_dynamic(decoded))
    }

    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self::new(image.to_rgb8())
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x < self.width() && point.y < self.height()
    }

    /// Color at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Result<Rgb<u8>, FrameError> {
        self.image
            .get_pixel_checked(x, y)
            .copied()
            .ok_or(FrameError::OutOfBounds {
                x,
                y,
                width: self.width(),
                height: self.height(),
            })
    }

    /// Unchecked variant for scanners iterating inside a clipped `ScanWindow`.
    #[inline]
    pub(crate) fn at(&self, x: u32, y: u32) -> Rgb<u8> {
        *self.image.get_pixel(x, y)
    }
}

/// Perceptual distance: sum of absolute per-channel differences.
#[inline]
pub fn color_distance(a: Rgb<u8>, b: Rgb<u8>) -> u32 {
    a.0.iter()
        .zip(b.0.iter())
        .map(|(&p, &q)| u32::from(p.abs_diff(q)))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_lookup() {
        let mut img = RgbImage::from_pixel(4, 3, Rgb([10, 20, 30]));
        img.put_pixel(3, 2, Rgb([1, 2, 3]));
        let frame = Frame::new(img);
        assert_eq!(frame.pixel(0, 0), Ok(Rgb([10, 20, 30])));
        assert_eq!(frame.pixel(3, 2), Ok(Rgb([1, 2, 3])));
    }

    #[test]
    fn test_pixel_out_of_bounds() {
        let frame = Frame::new(RgbImage::new(4, 3));
        assert_eq!(
            frame.pixel(4, 0),
            Err(FrameError::OutOfBounds { x: 4, y: 0, width: 4, height: 3 })
        );
        assert!(frame.pixel(0, 3).is_err());
    }

    #[test]
    fn test_color_distance() {
        assert_eq!(color_distance(Rgb([0, 0, 0]), Rgb([0, 0, 0])), 0);
        assert_eq!(color_distance(Rgb([10, 200, 5]), Rgb([14, 196, 8])), 11);
        assert_eq!(color_distance(Rgb([255, 0, 255]), Rgb([0, 255, 0])), 765);
    }

    #[test]
    fn test_scan_window_clipped() {
        let frame = Frame::new(RgbImage::new(100, 50));
        let window = ScanWindow::clipped(&frame, 40, 80, 90, 130);
        assert_eq!(window, ScanWindow { top: 40, bottom: 50, left: 90, right: 100 });
        assert!(!window.is_empty());

        let inverted = ScanWindow::clipped(&frame, 30, 10, 0, 100);
        assert!(inverted.is_empty());
        assert_eq!(inverted.rows().count(), 0);
    }
}
