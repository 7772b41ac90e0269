//! Debug sink (enabled with `--debug`).
//! For each frame writes `<ts>.png` (the raw screenshot) and `<ts>_d.png` with the scan start row,
//! both anchors and the jump segment drawn on top. Nothing here is read back by the play loop.

use anyhow::{Context, Result};
use image::Rgb;
use imageproc::drawing::{
    draw_cross_mut, draw_filled_circle_mut, draw_hollow_circle_mut, draw_line_segment_mut,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::frame::{Frame, Point};
use crate::locate::{Detection, DetectionFailure};

const SCAN_LINE: Rgb<u8> = Rgb([255, 0, 0]);
const TOKEN_MARK: Rgb<u8> = Rgb([0, 0, 255]);
const PLATFORM_MARK: Rgb<u8> = Rgb([255, 0, 0]);
const JUMP_LINE: Rgb<u8> = Rgb([0, 0, 0]);

/// Whatever the scanners managed to find in one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Marks {
    pub scan_start_y: Option<u32>,
    pub token: Option<Point>,
    pub platform: Option<Point>,
}

impl From<&Detection> for Marks {
    fn from(d: &Detection) -> Self {
        Self {
            scan_start_y: Some(d.scan_start_y),
            token: Some(d.token),
            platform: Some(d.platform),
        }
    }
}

impl From<&DetectionFailure> for Marks {
    fn from(f: &DetectionFailure) -> Self {
        Self {
            scan_start_y: Some(f.scan_start_y()),
            token: f.token(),
            platform: None,
        }
    }
}

pub struct DebugSink {
    dir: PathBuf,
}

impl DebugSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Saves the raw backup and the annotated copy; returns `(raw, annotated)` paths.
    pub fn record(
        &self,
        timestamp: i64,
        frame: &Frame,
        marks: &Marks,
    ) -> Result<(PathBuf, PathBuf)> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create debug directory: {}", self.dir.display()))?;

        let raw = self.dir.join(format!("{timestamp}.png"));
        frame
            .image()
            .save(&raw)
            .with_context(|| format!("Failed to back up screenshot to {}", raw.display()))?;

        let annotated = self.dir.join(format!("{timestamp}_d.png"));
        annotate(frame, marks).save(&annotated).with_context(|| {
            format!("Failed to save debug screenshot to {}", annotated.display())
        })?;

        debug!(raw = %raw.display(), annotated = %annotated.display(), "debug screenshots saved");
        Ok((raw, annotated))
    }
}

pub fn annotate(frame: &Frame, marks: &Marks) -> image::RgbImage {
    let mut canvas = frame.image().clone();
    let width = canvas.width() as f32;

    if let Some(y) = marks.scan_start_y {
        draw_line_segment_mut(&mut canvas, (0.0, y as f32), (width, y as f32), SCAN_LINE);
    }
    if let (Some(token), Some(platform)) = (marks.token, marks.platform) {
        draw_line_segment_mut(
            &mut canvas,
            (token.x as f32, token.y as f32),
            (platform.x as f32, platform.y as f32),
            JUMP_LINE,
        );
    }
    if let Some(token) = marks.token {
        let (x, y) = (token.x as i32, token.y as i32);
        draw_filled_circle_mut(&mut canvas, (x, y), 6, TOKEN_MARK);
        draw_cross_mut(&mut canvas, TOKEN_MARK, x, y);
    }
    if let Some(platform) = marks.platform {
        let (x, y) = (platform.x as i32, platform.y as i32);
        draw_hollow_circle_mut(&mut canvas, (x, y), 10, PLATFORM_MARK);
        draw_cross_mut(&mut canvas, PLATFORM_MARK, x, y);
    }
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    const BG: Rgb<u8> = Rgb([200, 200, 200]);

    fn frame() -> Frame {
        Frame::new(RgbImage::from_pixel(200, 300, BG))
    }

    #[test]
    fn test_annotate_marks_anchors() {
        let marks = Marks {
            scan_start_y: Some(50),
            token: Some(Point::new(60, 250)),
            platform: Some(Point::new(150, 120)),
        };
        let out = annotate(&frame(), &marks);
        assert_eq!(out.get_pixel(100, 50), &SCAN_LINE);
        assert_eq!(out.get_pixel(60, 250), &TOKEN_MARK);
        assert_eq!(out.get_pixel(150, 120), &PLATFORM_MARK);
        // the source frame is untouched
        assert_eq!(frame().pixel(60, 250), Ok(BG));
    }

    #[test]
    fn test_failure_marks_only_what_was_found() {
        let failure = DetectionFailure::PlatformNotFound {
            scan_start_y: 40,
            token: Point::new(70, 200),
        };
        let marks = Marks::from(&failure);
        assert_eq!(marks.token, Some(Point::new(70, 200)));
        assert_eq!(marks.platform, None);
        let out = annotate(&frame(), &marks);
        assert_eq!(out.get_pixel(70, 200), &TOKEN_MARK);
    }

    #[test]
    fn test_record_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DebugSink::new(dir.path().join("backups"));
        let (raw, annotated) = sink.record(1700000000, &frame(), &Marks::default()).unwrap();
        assert_eq!(raw, dir.path().join("backups/1700000000.png"));
        assert_eq!(annotated, dir.path().join("backups/1700000000_d.png"));
        assert!(raw.is_file() && annotated.is_file());
        let reloaded = image::open(&raw).unwrap().to_rgb8();
        assert_eq!(reloaded.get_pixel(10, 10), &BG);
    }
}
