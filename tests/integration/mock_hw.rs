//! Mock devices and adapters for integration tests.
//!
//! Every mock records its calls behind an `Arc<Mutex<..>>` so a test can keep
//! a handle after moving the mock into the engine, inject failures mid-run,
//! and assert on the full command history without touching GPIO.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chirp::app::events::AppEvent;
use chirp::app::ports::{AlarmPort, EventSink, FrameSource, Recorder, RecorderError, TurretPort};
use chirp::detector::frame::Frame;
use chirp::drivers::alarm::AlarmState;
use chirp::drivers::turret::{RunState, TurretState};
use chirp::error::{CameraError, Device, HardwareFault, OutputError};

pub const TURRET_FAULT: HardwareFault =
    HardwareFault::new(Device::Turret, OutputError::WriteFailed(1));
pub const ALARM_FAULT: HardwareFault =
    HardwareFault::new(Device::Alarm, OutputError::WriteFailed(16));

// ── Turret ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurretCall {
    Start,
    Pause,
    Resume,
    Stop,
    ClearFault,
}

pub struct TurretScript {
    pub calls: Vec<TurretCall>,
    /// Upcoming failures per command; each failed attempt consumes one.
    pub fail_start: u32,
    pub fail_pause: u32,
    pub fail_resume: u32,
    /// Fault reported by `fault()` as if latched by the rotation loop.
    pub latched: Option<HardwareFault>,
    pub state: TurretState,
}

#[derive(Clone)]
pub struct MockTurret {
    script: Arc<Mutex<TurretScript>>,
}

#[allow(dead_code)]
impl MockTurret {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(TurretScript {
                calls: Vec::new(),
                fail_start: 0,
                fail_pause: 0,
                fail_resume: 0,
                latched: None,
                state: TurretState::home(),
            })),
        }
    }

    pub fn script(&self) -> MutexGuard<'_, TurretScript> {
        self.script.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<TurretCall> {
        self.script().calls.clone()
    }

    pub fn count(&self, call: TurretCall) -> usize {
        self.script().calls.iter().filter(|c| **c == call).count()
    }

    /// Pretend the rotation loop moved the turret.
    pub fn set_position(&self, angle_deg: f32, direction: chirp::drivers::turret::Direction) {
        let mut s = self.script();
        s.state.angle_deg = angle_deg;
        s.state.direction = direction;
    }
}

fn consume(budget: &mut u32) -> bool {
    if *budget > 0 {
        *budget -= 1;
        true
    } else {
        false
    }
}

impl TurretPort for MockTurret {
    fn start(&mut self) -> Result<(), HardwareFault> {
        let mut s = self.script();
        s.calls.push(TurretCall::Start);
        if consume(&mut s.fail_start) {
            return Err(TURRET_FAULT);
        }
        s.state.run = RunState::Active;
        Ok(())
    }

    fn pause(&mut self) -> Result<(), HardwareFault> {
        let mut s = self.script();
        s.calls.push(TurretCall::Pause);
        if consume(&mut s.fail_pause) {
            return Err(TURRET_FAULT);
        }
        s.state.run = RunState::Paused;
        Ok(())
    }

    fn resume(&mut self) -> Result<(), HardwareFault> {
        let mut s = self.script();
        s.calls.push(TurretCall::Resume);
        if consume(&mut s.fail_resume) {
            return Err(TURRET_FAULT);
        }
        s.state.run = RunState::Active;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), HardwareFault> {
        let mut s = self.script();
        s.calls.push(TurretCall::Stop);
        s.state.run = RunState::Stopped;
        Ok(())
    }

    fn fault(&self) -> Option<HardwareFault> {
        self.script().latched
    }

    fn clear_fault(&mut self) {
        let mut s = self.script();
        s.calls.push(TurretCall::ClearFault);
        s.latched = None;
    }

    fn snapshot(&self) -> TurretState {
        self.script().state
    }
}

// ── Alarm ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmCall {
    Trigger { cycles: u32 },
    Stop,
    ClearFault,
}

#[derive(Default)]
pub struct AlarmScript {
    pub calls: Vec<AlarmCall>,
    pub fail_trigger: u32,
    pub fail_stop: u32,
    pub latched: Option<HardwareFault>,
    pub sounding: bool,
}

#[derive(Clone, Default)]
pub struct MockAlarm {
    script: Arc<Mutex<AlarmScript>>,
}

#[allow(dead_code)]
impl MockAlarm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self) -> MutexGuard<'_, AlarmScript> {
        self.script.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<AlarmCall> {
        self.script().calls.clone()
    }

    pub fn triggers(&self) -> usize {
        self.script()
            .calls
            .iter()
            .filter(|c| matches!(c, AlarmCall::Trigger { .. }))
            .count()
    }

    pub fn stops(&self) -> usize {
        self.script().calls.iter().filter(|c| **c == AlarmCall::Stop).count()
    }

    pub fn sounding(&self) -> bool {
        self.script().sounding
    }
}

impl AlarmPort for MockAlarm {
    fn trigger(&mut self, _duration_per_cycle: Duration, cycles: u32) -> Result<bool, HardwareFault> {
        let mut s = self.script();
        s.calls.push(AlarmCall::Trigger { cycles });
        if consume(&mut s.fail_trigger) {
            return Err(ALARM_FAULT);
        }
        if s.sounding {
            return Ok(false);
        }
        s.sounding = true;
        Ok(true)
    }

    fn stop(&mut self) -> Result<(), HardwareFault> {
        let mut s = self.script();
        s.calls.push(AlarmCall::Stop);
        if consume(&mut s.fail_stop) {
            return Err(ALARM_FAULT);
        }
        s.sounding = false;
        Ok(())
    }

    fn fault(&self) -> Option<HardwareFault> {
        self.script().latched
    }

    fn clear_fault(&mut self) {
        let mut s = self.script();
        s.calls.push(AlarmCall::ClearFault);
        s.latched = None;
    }

    fn snapshot(&self) -> AlarmState {
        AlarmState {
            active: self.script().sounding,
            ..AlarmState::default()
        }
    }
}

// ── Recorder ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderCall {
    StartClip,
    StopClip,
    WriteFrame,
}

pub struct MockRecorder {
    pub calls: Vec<RecorderCall>,
    pub enabled: bool,
    pub recording: bool,
    pub fail_start: bool,
}

#[allow(dead_code)]
impl MockRecorder {
    pub fn new(enabled: bool) -> Self {
        Self {
            calls: Vec::new(),
            enabled,
            recording: false,
            fail_start: false,
        }
    }

    pub fn count(&self, call: RecorderCall) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }
}

impl Recorder for MockRecorder {
    fn start_clip(&mut self, _timestamp: Duration) -> Result<(), RecorderError> {
        self.calls.push(RecorderCall::StartClip);
        if self.fail_start {
            return Err(RecorderError::Io("disk full".into()));
        }
        if self.enabled {
            self.recording = true;
        }
        Ok(())
    }

    fn stop_clip(&mut self) -> Result<(), RecorderError> {
        self.calls.push(RecorderCall::StopClip);
        self.recording = false;
        Ok(())
    }

    fn write_frame(&mut self, _frame: &Frame) -> Result<(), RecorderError> {
        self.calls.push(RecorderCall::WriteFrame);
        Ok(())
    }

    fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        if !self.enabled {
            self.recording = false;
        }
        self.enabled
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn is_recording(&self) -> bool {
        self.recording
    }
}

// ── Event sink ────────────────────────────────────────────────

/// Collects every emitted event.
pub struct CollectSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl CollectSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for CollectSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Frame source ──────────────────────────────────────────────

/// Replays a fixed script of frames and read failures, then ends.
pub struct ScriptedSource {
    items: VecDeque<Result<Frame, CameraError>>,
}

#[allow(dead_code)]
impl ScriptedSource {
    pub fn new(items: impl IntoIterator<Item = Result<Frame, CameraError>>) -> Self {
        Self {
            items: items.into_iter().collect(),
        }
    }

    pub fn frames(frames: impl IntoIterator<Item = Frame>) -> Self {
        Self::new(frames.into_iter().map(Ok))
    }
}

impl FrameSource for ScriptedSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, CameraError> {
        match self.items.pop_front() {
            Some(Ok(frame)) => Ok(Some(frame)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }
}

// ── Frame helpers ─────────────────────────────────────────────

pub const FRAME_H: usize = 120;
pub const FRAME_W: usize = 160;

/// Flat background frame at `ms`.
#[allow(dead_code)]
pub fn background(ms: u64) -> Frame {
    Frame::filled(FRAME_H, FRAME_W, 50, Duration::from_millis(ms))
}

/// Background with a bright 60x60 square whose left edge is at `left`.
#[allow(dead_code)]
pub fn intruder(ms: u64, left: usize) -> Frame {
    Frame::from_fn(FRAME_H, FRAME_W, Duration::from_millis(ms), |r, c| {
        if (30..90).contains(&r) && (left..left + 60).contains(&c) {
            220
        } else {
            50
        }
    })
}
