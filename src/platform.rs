//! Platform locator.
//! Phase 1 finds the first row, on the far side of the token, where a pixel differs from the one
//! above it: that is the top of the next platform (a point for round tops, a short line for square
//! ones) and the mean of its columns is the platform's center x.
//! Phase 2 resolves the center y. Close to the token the near-field shortcut applies; otherwise the
//! top edge is traced sideways until it reaches the platform's lateral corner.
//! With `PlatformAnchor::TopEdge` phase 2 is skipped and the top row itself is the anchor.

use serde::{Deserialize, Serialize};

use crate::config::CalibrationConfig;
use crate::frame::{Frame, Point, ScanWindow, color_distance};
use crate::token::horizontal_margin;

/// Which way the top edge is traced from the platform's center column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceDirection {
    #[default]
    Right,
    Left,
    AwayFromToken,
}

/// How the center y is chosen when the platform sits within `near_token_threshold` of the token.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NearShortcut {
    /// Level with the token.
    #[default]
    Level,
    /// Projected along the board diagonal at `platform_angle_deg`.
    Isometric,
}

/// Which point of the platform is reported.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformAnchor {
    /// Center of the top face (shortcut or lateral trace).
    #[default]
    Center,
    /// Topmost visible row; pairs with the vertical distance metric.
    TopEdge,
}

pub fn locate_platform(
    frame: &Frame,
    token: Point,
    scan_start_y: u32,
    config: &CalibrationConfig,
) -> Option<Point> {
    let window = platform_window(frame, token, scan_start_y, config);
    let (board_x, top_y) = find_top_edge(frame, &window, config.color_threshold)?;
    if config.platform_anchor == PlatformAnchor::TopEdge {
        return Some(Point::new(board_x, top_y));
    }

    let dx = board_x.abs_diff(token.x);
    if dx < config.near_token_threshold {
        let board_y = match config.near_shortcut {
            NearShortcut::Level => token.y,
            NearShortcut::Isometric => {
                let rise = f64::from(dx) * config.platform_angle_deg.to_radians().tan();
                token.y.saturating_sub(rise.round() as u32)
            }
        };
        return Some(Point::new(board_x, board_y));
    }

    let step = trace_step(config.trace_direction, board_x, token);
    let board_y = trace_lateral_corner(frame, board_x, top_y, step, config);
    Some(Point::new(board_x, board_y))
}

/// Rows from the scan start down to the token; columns strictly on the far side of the token's
/// body.
pub fn platform_window(
    frame: &Frame,
    token: Point,
    scan_start_y: u32,
    config: &CalibrationConfig,
) -> ScanWindow {
    let width = frame.width();
    let margin = horizontal_margin(frame);
    let half_body = config.token_body_width / 2;

    let (left, right) = if token.x < width / 2 {
        ((token.x + half_body + 1).max(margin), width.saturating_sub(margin))
    } else {
        (margin, token.x.saturating_sub(half_body).min(width.saturating_sub(margin)))
    };

    // row 0 has no row above it to compare against
    ScanWindow::clipped(frame, scan_start_y.max(1), token.y, left, right)
}

/// First row with any vertical color change, and the mean column of those changes.
fn find_top_edge(frame: &Frame, window: &ScanWindow, threshold: u32) -> Option<(u32, u32)> {
    if window.is_empty() {
        return None;
    }
    window.rows().find_map(|y| {
        let (sum, count) = window
            .cols()
            .filter(|&x| color_distance(frame.at(x, y), frame.at(x, y - 1)) > threshold)
            .fold((0u64, 0u64), |(sum, count), x| (sum + u64::from(x), count + 1));
        (count > 0).then(|| ((sum / count) as u32, y))
    })
}

fn trace_step(direction: TraceDirection, board_x: u32, token: Point) -> i64 {
    match direction {
        TraceDirection::Right => 1,
        TraceDirection::Left => -1,
        TraceDirection::AwayFromToken if board_x >= token.x => 1,
        TraceDirection::AwayFromToken => -1,
    }
}

/// Walks columns outward from `board_x`. Each column's first non-background row inside the band
/// `[top_y, top_y + platform_band]` replaces the estimate; the walk ends once more than
/// `edge_gap_tolerance` consecutive columns show nothing but background.
fn trace_lateral_corner(
    frame: &Frame,
    board_x: u32,
    top_y: u32,
    step: i64,
    config: &CalibrationConfig,
) -> u32 {
    let band_bottom = top_y.saturating_add(config.platform_band + 1);
    let band = ScanWindow::clipped(frame, top_y, band_bottom, 0, frame.width());

    let mut corner_y = top_y;
    let mut gap = 0;
    let mut x = i64::from(board_x);
    while x >= i64::from(band.left) && x < i64::from(band.right) {
        let column = x as u32;
        let first_diff = band.rows().find(|&y| {
            color_distance(frame.at(column, y), frame.at(0, y)) > config.color_threshold
        });

        match first_diff {
            Some(y) => {
                corner_y = y;
                gap = 0;
            }
            None => {
                gap += 1;
                if gap > config.edge_gap_tolerance {
                    break;
                }
            }
        }
        x += step;
    }
    corner_y
}
