//! Clip recorders.
//!
//! [`SnapshotRecorder`] writes each clip as a directory of numbered PNG
//! frames under the recordings root, named `<unix-seconds>_motion`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use image::{ImageBuffer, Luma};
use log::{debug, info, warn};

use crate::app::ports::{Recorder, RecorderError};
use crate::detector::frame::Frame;

struct Clip {
    dir: PathBuf,
    frames: u32,
}

pub struct SnapshotRecorder {
    root: PathBuf,
    enabled: bool,
    clip: Option<Clip>,
}

impl SnapshotRecorder {
    pub fn new(root: impl Into<PathBuf>, enabled: bool) -> Self {
        Self {
            root: root.into(),
            enabled,
            clip: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of the open clip, if any.
    pub fn clip_dir(&self) -> Option<&Path> {
        self.clip.as_ref().map(|c| c.dir.as_path())
    }

    fn clip_dir_name() -> String {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs();
        format!("{secs}_motion")
    }

    /// First free directory for a new clip.
    fn fresh_clip_dir(&self) -> PathBuf {
        let base = Self::clip_dir_name();
        let mut dir = self.root.join(&base);
        let mut n = 1;
        while dir.exists() {
            dir = self.root.join(format!("{base}_{n}"));
            n += 1;
        }
        dir
    }
}

fn save_gray_png(frame: &Frame, path: &Path) -> Result<(), RecorderError> {
    let (height, width) = frame.dim();
    let pixels = frame.pixels();
    let mut buffer = ImageBuffer::new(width as u32, height as u32);
    for (x, y, pixel) in buffer.enumerate_pixels_mut() {
        *pixel = Luma([pixels[[y as usize, x as usize]]]);
    }
    buffer
        .save(path)
        .map_err(|e| RecorderError::Encode(e.to_string()))
}

impl Recorder for SnapshotRecorder {
    fn start_clip(&mut self, timestamp: Duration) -> Result<(), RecorderError> {
        if !self.enabled {
            return Ok(());
        }
        if self.clip.is_some() {
            self.stop_clip()?;
        }
        let dir = self.fresh_clip_dir();
        fs::create_dir_all(&dir).map_err(|e| RecorderError::Io(e.to_string()))?;
        info!(
            "recorder: clip started at {} ms -> {}",
            timestamp.as_millis(),
            dir.display()
        );
        self.clip = Some(Clip { dir, frames: 0 });
        Ok(())
    }

    fn stop_clip(&mut self) -> Result<(), RecorderError> {
        if let Some(clip) = self.clip.take() {
            info!(
                "recorder: clip closed ({} frames) {}",
                clip.frames,
                clip.dir.display()
            );
        }
        Ok(())
    }

    fn write_frame(&mut self, frame: &Frame) -> Result<(), RecorderError> {
        let Some(clip) = self.clip.as_mut() else {
            return Ok(());
        };
        let path = clip.dir.join(format!("frame_{:06}.png", clip.frames));
        save_gray_png(frame, &path)?;
        clip.frames += 1;
        debug!("recorder: wrote {}", path.display());
        Ok(())
    }

    fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        if !self.enabled && self.clip.is_some() {
            if let Err(e) = self.stop_clip() {
                warn!("recorder: closing clip on disable failed: {}", e);
            }
        }
        self.enabled
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn is_recording(&self) -> bool {
        self.clip.is_some()
    }
}
