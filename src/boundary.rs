//! Boundary scanner.
//! The score bar and background artwork fill the top third of the screen; the first
//! non-uniform row below it bounds every later token/platform scan.

use crate::config::CalibrationConfig;
use crate::frame::{Frame, color_distance};

/// Samples rows from `max(H/3, score_bar_offset)` down to `2H/3` every `boundary_step` rows and
/// returns the first row that is not a single flat color, backed off by one step so an edge lying
/// between two sampled rows stays inside the window.
///
/// `None` means the band is uniform; callers fall back to row 0 (slower, still correct).
pub fn find_scan_start(frame: &Frame, config: &CalibrationConfig) -> Option<u32> {
    let (width, height) = (frame.width(), frame.height());
    if width == 0 {
        return None;
    }

    let step = config.boundary_step.max(1);
    let first = (height / 3).max(config.score_bar_offset);
    let last = height * 2 / 3;

    (first..last).step_by(step as usize).find_map(|y| {
        let background = frame.pixel(0, y).ok()?;
        let mixed = (1..width)
            .any(|x| color_distance(frame.at(x, y), background) > config.color_threshold);
        mixed.then(|| y.saturating_sub(step))
    })
}
