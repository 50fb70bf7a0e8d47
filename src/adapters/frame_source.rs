//! Frame source adapters.
//!
//! | Source                  | Frames from                                  |
//! |-------------------------|----------------------------------------------|
//! | [`DirectoryFrameSource`]| sorted image files (png / pgm / jpg) on disk |
//! | [`SyntheticFrameSource`]| generated background with a periodic intruder |
//!
//! Both convert to 8-bit grayscale and stamp each frame with the injected
//! clock at capture time.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};
use ndarray::Array2;

use crate::app::ports::{Clock, FrameSource};
use crate::detector::frame::Frame;
use crate::error::CameraError;

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "pgm", "pnm", "jpg", "jpeg"];

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

// ---------------------------------------------------------------------------
// Directory playback
// ---------------------------------------------------------------------------

pub struct DirectoryFrameSource {
    files: Vec<PathBuf>,
    next: usize,
    clock: Arc<dyn Clock>,
}

impl DirectoryFrameSource {
    /// Open a directory of frames, played back in file-name order.
    pub fn open(dir: impl AsRef<Path>, clock: Arc<dyn Clock>) -> Result<Self, CameraError> {
        let dir = dir.as_ref();
        let entries = fs::read_dir(dir).map_err(|e| {
            warn!("camera: cannot open {}: {}", dir.display(), e);
            CameraError::NotFound
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_image(path))
            .collect();
        if files.is_empty() {
            warn!("camera: no frames in {}", dir.display());
            return Err(CameraError::Empty);
        }
        files.sort();
        info!("camera: {} frames queued from {}", files.len(), dir.display());

        Ok(Self {
            files,
            next: 0,
            clock,
        })
    }
}

impl FrameSource for DirectoryFrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, CameraError> {
        let Some(path) = self.files.get(self.next) else {
            return Ok(None);
        };
        self.next += 1;

        let gray = image::open(path)
            .map_err(|e| {
                warn!("camera: {} unreadable: {}", path.display(), e);
                CameraError::ReadFailed
            })?
            .to_luma8();
        let (width, height) = gray.dimensions();
        let pixels = Array2::from_shape_vec((height as usize, width as usize), gray.into_raw())
            .map_err(|_| CameraError::ReadFailed)?;
        debug!("camera: {} ({}x{})", path.display(), width, height);

        Ok(Some(Frame::new(pixels, self.clock.now())))
    }
}

// ---------------------------------------------------------------------------
// Synthetic scene
// ---------------------------------------------------------------------------

/// Static textured background with a bright square that appears for
/// `intruder_frames` out of every `period` frames and drifts across.
pub struct SyntheticFrameSource {
    height: usize,
    width: usize,
    period: u64,
    intruder_frames: u64,
    intruder_size: usize,
    limit: Option<u64>,
    produced: u64,
    clock: Arc<dyn Clock>,
}

impl SyntheticFrameSource {
    pub fn new(height: usize, width: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            height,
            width,
            period: 400,
            intruder_frames: 120,
            intruder_size: (height.min(width) / 3).max(1),
            limit: None,
            produced: 0,
            clock,
        }
    }

    /// Intruder visible for `visible` of every `period` frames.
    pub fn with_cycle(mut self, period: u64, visible: u64) -> Self {
        self.period = period.max(1);
        self.intruder_frames = visible.min(self.period);
        self
    }

    pub fn with_intruder_size(mut self, size: usize) -> Self {
        self.intruder_size = size.clamp(1, self.height.min(self.width).max(1));
        self
    }

    /// End after `frames` frames instead of running forever.
    pub fn with_limit(mut self, frames: Option<u64>) -> Self {
        self.limit = frames;
        self
    }

    fn intruder_at(&self, index: u64) -> Option<(usize, usize)> {
        let phase = index % self.period;
        if phase < self.period - self.intruder_frames {
            return None;
        }
        let travel = self.width.saturating_sub(self.intruder_size);
        let step = (phase - (self.period - self.intruder_frames)) as usize;
        let col = if travel == 0 { 0 } else { step % (travel + 1) };
        let row = self.height.saturating_sub(self.intruder_size) / 2;
        Some((row, col))
    }
}

impl FrameSource for SyntheticFrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, CameraError> {
        if self.limit.is_some_and(|limit| self.produced >= limit) {
            return Ok(None);
        }
        let intruder = self.intruder_at(self.produced);
        self.produced += 1;

        let size = self.intruder_size;
        let frame = Frame::from_fn(self.height, self.width, self.clock.now(), |r, c| {
            match intruder {
                Some((top, left)) if (top..top + size).contains(&r) && (left..left + size).contains(&c) => {
                    240
                }
                _ => 40 + ((r / 8 + c / 8) % 2) as u8 * 20,
            }
        });
        Ok(Some(frame))
    }
}
