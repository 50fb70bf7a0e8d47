//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ CoordinationEngine (domain)
//! ```
//!
//! Driven adapters (camera, recorder, GPIO, event sinks, config storage)
//! implement these traits.  The
//! [`CoordinationEngine`](super::service::CoordinationEngine) owns its two
//! controllers through [`TurretPort`] / [`AlarmPort`] and receives the rest at
//! call sites via generics, so the domain core never touches hardware
//! directly.
//!
//! All port errors are typed; callers must handle every variant explicitly.

use std::time::Duration;

use crate::config::SystemConfig;
use crate::detector::frame::Frame;
use crate::drivers::alarm::AlarmState;
use crate::drivers::turret::TurretState;
use crate::error::{CameraError, HardwareFault, OutputError};

// ───────────────────────────────────────────────────────────────
// Frame source (driven adapter: camera → domain)
// ───────────────────────────────────────────────────────────────

/// Yields frames in capture order.
pub trait FrameSource {
    /// Next frame, or `Ok(None)` once a finite source is exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>, CameraError>;
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn next_frame(&mut self) -> Result<Option<Frame>, CameraError> {
        (**self).next_frame()
    }
}

// ───────────────────────────────────────────────────────────────
// Recorder (driven adapter: domain → clip storage)
// ───────────────────────────────────────────────────────────────

/// Clip persistence.  Fire-and-forget: the engine logs failures and moves on.
pub trait Recorder {
    /// Open a new clip.  A no-op while recording is disabled.
    fn start_clip(&mut self, timestamp: Duration) -> Result<(), RecorderError>;

    /// Close the current clip, if any.
    fn stop_clip(&mut self) -> Result<(), RecorderError>;

    /// Append a frame to the open clip.
    fn write_frame(&mut self, frame: &Frame) -> Result<(), RecorderError>;

    /// Flip the recording-enabled flag and return the new value.
    fn toggle(&mut self) -> bool;

    fn is_enabled(&self) -> bool;

    fn is_recording(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Output port (driven adapter: domain → GPIO)
// ───────────────────────────────────────────────────────────────

/// Physical output level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    High,
    Low,
}

/// Which level means "on" for a given output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    ActiveHigh,
    ActiveLow,
}

impl Polarity {
    pub const fn from_active_high(active_high: bool) -> Self {
        if active_high {
            Self::ActiveHigh
        } else {
            Self::ActiveLow
        }
    }

    /// Level that drives the output to the requested logical state.
    pub const fn level(self, on: bool) -> Level {
        match (self, on) {
            (Self::ActiveHigh, true) | (Self::ActiveLow, false) => Level::High,
            (Self::ActiveHigh, false) | (Self::ActiveLow, true) => Level::Low,
        }
    }
}

/// The single hardware seam for motor and alarm outputs.
pub trait OutputPort {
    fn set_output(&mut self, pin: u8, level: Level) -> Result<(), OutputError>;
}

impl<T: OutputPort + ?Sized> OutputPort for Box<T> {
    fn set_output(&mut self, pin: u8, level: Level) -> Result<(), OutputError> {
        (**self).set_output(pin, level)
    }
}

// ───────────────────────────────────────────────────────────────
// Controller ports (domain → turret / alarm)
// ───────────────────────────────────────────────────────────────

/// Command surface of the rotating turret.
pub trait TurretPort {
    /// Stopped → Active; begins the free-running rotation loop.
    fn start(&mut self) -> Result<(), HardwareFault>;

    /// Active → Paused; angle and direction freeze after any in-flight step.
    fn pause(&mut self) -> Result<(), HardwareFault>;

    /// Paused → Active; rotation continues from the frozen angle.
    fn resume(&mut self) -> Result<(), HardwareFault>;

    /// Any state → Stopped; terminates the rotation loop and neutralises the
    /// motor outputs.
    fn stop(&mut self) -> Result<(), HardwareFault>;

    /// Latched fault, if the rotation loop hit one.
    fn fault(&self) -> Option<HardwareFault>;

    fn clear_fault(&mut self);

    fn snapshot(&self) -> TurretState;
}

/// Command surface of the alarm siren.
pub trait AlarmPort {
    /// Start sounding.  Returns `Ok(false)` when already sounding (no-op).
    fn trigger(&mut self, duration_per_cycle: Duration, cycles: u32)
    -> Result<bool, HardwareFault>;

    /// Silence and release the output.  A no-op when idle.
    fn stop(&mut self) -> Result<(), HardwareFault>;

    fn fault(&self) -> Option<HardwareFault>;

    fn clear_fault(&mut self);

    fn snapshot(&self) -> AlarmState;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic time since an arbitrary epoch.
pub trait Clock: Send + Sync {
    fn now(&self) -> Duration;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration.  Returns [`SystemConfig::default()`] if no stored
    /// config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`Recorder`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderError {
    /// Clip directory or frame file could not be written.
    Io(String),
    /// Frame could not be encoded.
    Encode(String),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl core::fmt::Display for RecorderError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "recorder I/O error: {}", msg),
            Self::Encode(msg) => write!(f, "recorder encode error: {}", msg),
        }
    }
}

impl std::error::Error for RecorderError {}
