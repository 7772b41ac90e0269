//! Play loop.
//! acquire frame -> locate token -> locate platform -> compute duration -> press -> settle
//! -> repeat.
//! A detection failure skips the press and retries on the next frame; capture or dispatch
//! errors end the loop, since a broken device link will not fix itself.

use anyhow::{Context, Result};
use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

use crate::capture::FrameSource;
use crate::config::CalibrationConfig;
use crate::debug::{DebugSink, Marks};
use crate::frame::Point;
use crate::gesture::{GestureDispatcher, touch_point};
use crate::locate::{Detection, DetectionFailure, detect};
use crate::timing::hold_duration_ms;

/// Result of one pass through the loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cycle {
    Jumped {
        detection: Detection,
        touch: Point,
        duration_ms: u64,
    },
    Skipped(DetectionFailure),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub jumps: u64,
    pub skipped: u64,
}

pub struct Controller<'a, S, G, R> {
    config: &'a CalibrationConfig,
    source: S,
    gesture: G,
    rng: R,
    debug: Option<DebugSink>,
}

impl<'a, S, G, R> Controller<'a, S, G, R>
where
    S: FrameSource,
    G: GestureDispatcher,
    R: Rng,
{
    pub fn new(config: &'a CalibrationConfig, source: S, gesture: G, rng: R) -> Self {
        Self {
            config,
            source,
            gesture,
            rng,
            debug: None,
        }
    }

    pub fn with_debug(mut self, sink: DebugSink) -> Self {
        self.debug = Some(sink);
        self
    }

    /// One full cycle, without the settle delay.
    pub fn step(&mut self) -> Result<Cycle> {
        let frame = self.source.acquire().context("Failed to acquire frame")?;
        let timestamp = chrono::Local::now().timestamp();

        let cycle = match detect(&frame, self.config) {
            Ok(detection) => {
                let duration_ms =
                    hold_duration_ms(detection.token, detection.platform, self.config);
                let touch = touch_point(frame.width(), frame.height(), self.config, &mut self.rng);
                info!(
                    timestamp,
                    token = %detection.token,
                    platform = %detection.platform,
                    duration_ms,
                    "jump"
                );
                self.gesture
                    .press(touch, duration_ms)
                    .context("Failed to dispatch press gesture")?;
                Cycle::Jumped {
                    detection,
                    touch,
                    duration_ms,
                }
            }
            Err(failure) => {
                warn!(timestamp, "skipping frame: {failure}");
                Cycle::Skipped(failure)
            }
        };

        if let Some(sink) = &self.debug {
            let marks = match &cycle {
                Cycle::Jumped { detection, .. } => Marks::from(detection),
                Cycle::Skipped(failure) => Marks::from(failure),
            };
            if let Err(e) = sink.record(timestamp, &frame, &marks) {
                warn!("debug sink: {e:#}");
            }
        }

        Ok(cycle)
    }

    /// Randomised pause that lets the token land before the next capture.
    pub fn settle_delay(&mut self) -> Duration {
        let settle = &self.config.settle;
        Duration::from_millis(self.rng.random_range(settle.min_ms..=settle.max_ms))
    }

    /// Loops until an external failure, or until `max_jumps` presses have been dispatched.
    pub fn run(
        &mut self,
        max_jumps: Option<u64>,
        mut sleep: impl FnMut(Duration),
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        loop {
            match self.step()? {
                Cycle::Jumped { .. } => summary.jumps += 1,
                Cycle::Skipped(_) => summary.skipped += 1,
            }
            if max_jumps.is_some_and(|max| summary.jumps >= max) {
                info!(jumps = summary.jumps, skipped = summary.skipped, "jump limit reached");
                return Ok(summary);
            }
            sleep(self.settle_delay());
        }
    }
}
