//! Unified error types for the CHIRP coordination core.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! pipeline's error handling uniform.  All variants are `Copy` so faults can
//! be latched by the controllers and handed across threads without
//! allocation.

use core::fmt;

use crate::app::ports::ConfigError;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the core funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The camera could not be opened, or failed too many times in a row.
    NoCamera(CameraError),
    /// A turret or alarm output failed.
    Hardware(HardwareFault),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCamera(e) => write!(f, "no camera available: {e}"),
            Self::Hardware(e) => write!(f, "hardware fault: {e}"),
            Self::Config(e) => write!(f, "configuration error: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Camera errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraError {
    /// No frame source exists at startup (device or directory missing).
    NotFound,
    /// The source exists but holds no usable frames.
    Empty,
    /// A single frame could not be read or decoded.
    ReadFailed,
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "camera not found"),
            Self::Empty => write!(f, "camera produced no frames"),
            Self::ReadFailed => write!(f, "frame read failed"),
        }
    }
}

impl std::error::Error for CameraError {}

impl From<CameraError> for Error {
    fn from(e: CameraError) -> Self {
        Self::NoCamera(e)
    }
}

// ---------------------------------------------------------------------------
// Output / hardware faults
// ---------------------------------------------------------------------------

/// Failure reported by an [`OutputPort`](crate::app::ports::OutputPort).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputError {
    /// The pin is not part of the output bank.
    UnknownPin(u8),
    /// Driving the pin failed.
    WriteFailed(u8),
    /// The device's worker thread could not be started.
    WorkerSpawn,
}

impl OutputError {
    pub const fn pin(self) -> Option<u8> {
        match self {
            Self::UnknownPin(pin) | Self::WriteFailed(pin) => Some(pin),
            Self::WorkerSpawn => None,
        }
    }
}

impl fmt::Display for OutputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownPin(pin) => write!(f, "pin {pin} not configured"),
            Self::WriteFailed(pin) => write!(f, "write to pin {pin} failed"),
            Self::WorkerSpawn => write!(f, "worker thread could not be started"),
        }
    }
}

/// The device a hardware fault belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Turret,
    Alarm,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Turret => write!(f, "turret"),
            Self::Alarm => write!(f, "alarm"),
        }
    }
}

/// A collaborator-level output failure.  Once latched by a controller, that
/// controller refuses further commands until its fault is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardwareFault {
    pub device: Device,
    pub error: OutputError,
}

impl HardwareFault {
    pub const fn new(device: Device, error: OutputError) -> Self {
        Self { device, error }
    }
}

impl fmt::Display for HardwareFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.device, self.error)
    }
}

impl std::error::Error for HardwareFault {}

impl From<HardwareFault> for Error {
    fn from(e: HardwareFault) -> Self {
        Self::Hardware(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
