//! Frame-differencing motion detector.
//!
//! ```text
//!  frame ─▶ box blur ─▶ |Δ baseline| > threshold ─▶ dilate ─▶ components
//!                                                              │
//!                                        largest area ≥ minimum ─▶ MotionEvent
//! ```
//!
//! The baseline is the previous (blurred) frame, so the detector reacts to
//! change between consecutive frames rather than to a fixed background.  It
//! keeps no other history: streak counting belongs to the coordination
//! engine.

pub mod frame;
pub mod segmentation;

use std::time::Duration;

use log::debug;
use ndarray::Array2;

use crate::config::SystemConfig;
use frame::Frame;
use segmentation::{box_blur, change_mask, connected_components, dilate};

/// Axis-aligned bounding box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    /// True if `other` lies entirely inside this region.
    pub fn covers(&self, other: &Region) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.x + other.width <= self.x + self.width
            && other.y + other.height <= self.y + self.height
    }
}

/// Per-frame detector output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionEvent {
    pub timestamp: Duration,
    /// Bounding box of the largest changed region, if any pixel changed.
    pub region: Option<Region>,
    /// Pixel area of that region (0 when nothing changed).
    pub area: u32,
    pub detected: bool,
}

impl MotionEvent {
    /// An event with nothing detected.
    pub fn quiet(timestamp: Duration) -> Self {
        Self {
            timestamp,
            region: None,
            area: 0,
            detected: false,
        }
    }
}

/// Detector parameters, taken from [`SystemConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectorTuning {
    pub minimum_motion_area: u32,
    pub diff_threshold: u8,
    pub blur_radius: u32,
    pub dilate_iterations: u32,
}

impl DetectorTuning {
    pub fn from_config(config: &SystemConfig) -> Self {
        Self {
            minimum_motion_area: config.minimum_motion_area,
            diff_threshold: config.diff_threshold,
            blur_radius: config.blur_radius,
            dilate_iterations: config.dilate_iterations,
        }
    }
}

pub struct MotionDetector {
    tuning: DetectorTuning,
    baseline: Option<Array2<u8>>,
}

impl MotionDetector {
    pub fn new(tuning: DetectorTuning) -> Self {
        Self {
            tuning,
            baseline: None,
        }
    }

    /// Compare `frame` with the previous one and roll the baseline forward.
    ///
    /// The first frame, and any frame whose size differs from the baseline,
    /// only seeds the baseline and reports no motion.
    pub fn process(&mut self, frame: &Frame) -> MotionEvent {
        let timestamp = frame.captured_at();
        let smoothed = box_blur(&frame.pixels(), self.tuning.blur_radius as usize);

        let event = match self.baseline.take() {
            Some(previous) if previous.dim() == smoothed.dim() => {
                self.compare(&smoothed, &previous, timestamp)
            }
            Some(_) => {
                debug!(
                    "detector: frame size changed to {}x{}, re-baselined",
                    frame.width(),
                    frame.height()
                );
                MotionEvent::quiet(timestamp)
            }
            None => {
                debug!("detector: baseline seeded ({}x{})", frame.width(), frame.height());
                MotionEvent::quiet(timestamp)
            }
        };
        self.baseline = Some(smoothed);
        event
    }

    fn compare(&self, current: &Array2<u8>, previous: &Array2<u8>, timestamp: Duration) -> MotionEvent {
        let mask = change_mask(&current.view(), &previous.view(), self.tuning.diff_threshold);
        let mask = dilate(&mask, self.tuning.dilate_iterations);
        let largest = connected_components(&mask.view())
            .into_iter()
            .max_by_key(|c| c.area);

        let Some(largest) = largest else {
            return MotionEvent::quiet(timestamp);
        };
        MotionEvent {
            timestamp,
            region: Some(Region {
                x: largest.min_col as u32,
                y: largest.min_row as u32,
                width: (largest.max_col - largest.min_col + 1) as u32,
                height: (largest.max_row - largest.min_row + 1) as u32,
            }),
            area: largest.area,
            detected: largest.area >= self.tuning.minimum_motion_area,
        }
    }

    /// Forget the baseline; the next frame seeds a new one.
    pub fn reset(&mut self) {
        self.baseline = None;
    }
}
