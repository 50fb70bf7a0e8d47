//! Outbound application events.
//!
//! The [`CoordinationEngine`](super::service::CoordinationEngine) and the
//! [`Pipeline`](super::runner::Pipeline) emit these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other side
//! decide what to do with them.

use std::time::Duration;

use crate::drivers::turret::Direction;
use crate::error::HardwareFault;
use crate::fsm::EngineState;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Periodic telemetry snapshot.
    Telemetry(TelemetryData),

    /// The engine transitioned between states.
    StateChanged { from: EngineState, to: EngineState },

    /// A controller reported a hardware fault; commands are suspended.
    FaultDetected(HardwareFault),

    /// Faults were cleared by an external restart.
    FaultCleared,

    /// The engine armed after camera and turret came up.
    Started(EngineState),

    /// Recording was switched on or off.
    RecordingToggled(bool),

    /// A clip was opened at the given frame timestamp.
    ClipStarted(Duration),

    ClipStopped,

    /// Devices released, engine idle.
    Shutdown,
}

/// A point-in-time telemetry snapshot suitable for logging.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryData {
    pub state: EngineState,
    pub turret_angle_deg: f32,
    pub turret_direction: Direction,
    pub turret_rotating: bool,
    pub alarm_sounding: bool,
    pub recording_enabled: bool,
    pub clip_active: bool,
    pub frames_processed: u64,
    pub events_suppressed: u64,
    pub positive_streak: u32,
    pub negative_streak: u32,
}
