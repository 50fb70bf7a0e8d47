//! Coordination engine: the hexagonal core.
//!
//! [`CoordinationEngine`] owns the FSM, the streak counters and the two
//! device controllers.  It decides whether each motion event is real (not
//! self-induced by the turret's own rotation) and turns FSM directives into
//! pause/resume/trigger/stop commands.  The recorder and event sink are
//! injected at call sites.
//!
//! ```text
//!  MotionEvent ──▶ ┌──────────────────────────┐ ──▶ TurretPort
//!                  │    CoordinationEngine     │ ──▶ AlarmPort
//!  Suppression ──▶ │  FSM · streaks · retry    │ ──▶ Recorder
//!                  └──────────────────────────┘ ──▶ EventSink
//! ```

use std::time::Duration;

use log::{debug, error, info, warn};

use crate::config::SystemConfig;
use crate::detector::MotionEvent;
use crate::error::HardwareFault;
use crate::fsm::context::{Directives, FsmContext, Thresholds};
use crate::fsm::states::build_state_table;
use crate::fsm::{EngineState, Fsm};
use crate::suppression::SuppressionWindow;

use super::events::{AppEvent, TelemetryData};
use super::ports::{AlarmPort, EventSink, Recorder, TurretPort};

/// What the engine did with one motion event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Engine idle (not started, faulted or shut down).
    Ignored,
    /// Inside a post-rotation window; streaks untouched.
    Suppressed,
    /// Counted and fed to the FSM.
    Processed,
}

/// Running counters since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub events_processed: u64,
    pub events_suppressed: u64,
    pub events_ignored: u64,
    pub alarms_raised: u64,
    pub faults: u64,
}

/// Run `op`, and once more if it fails.  Never more than one retry.
fn with_retry<R>(
    what: &str,
    mut op: impl FnMut() -> Result<R, HardwareFault>,
) -> Result<R, HardwareFault> {
    op().or_else(|first| {
        warn!("engine: {} failed ({}), retrying once", what, first);
        op()
    })
}

pub struct CoordinationEngine<T, A> {
    fsm: Fsm,
    ctx: FsmContext,
    /// Directives as last pushed to the devices.
    applied: Directives,
    turret: T,
    alarm: A,
    window: SuppressionWindow,
    alarm_cycle_duration: Duration,
    alarm_cycles: u32,
    clip_active: bool,
    /// Set when a fault forced Idle; only a faulted engine may be restarted.
    faulted: bool,
    last_timestamp: Duration,
    stats: EngineStats,
}

impl<T: TurretPort, A: AlarmPort> CoordinationEngine<T, A> {
    /// Construct the engine in Idle.  `window` must be the same handle the
    /// turret writes to.
    pub fn new(config: &SystemConfig, turret: T, alarm: A, window: SuppressionWindow) -> Self {
        let mut ctx = FsmContext::new(Thresholds::from_config(config));
        let mut fsm = Fsm::new(build_state_table(), EngineState::Idle);
        fsm.start(&mut ctx);

        Self {
            fsm,
            applied: ctx.directives,
            ctx,
            turret,
            alarm,
            window,
            alarm_cycle_duration: config.alarm_cycle_duration(),
            alarm_cycles: config.alarm_cycle_count,
            clip_active: false,
            faulted: false,
            last_timestamp: Duration::ZERO,
            stats: EngineStats::default(),
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Idle → Armed once the camera is confirmed: starts the turret's
    /// rotation loop.  A no-op unless Idle.
    pub fn start(&mut self, sink: &mut impl EventSink) -> Result<(), HardwareFault> {
        if self.state() != EngineState::Idle {
            return Ok(());
        }
        if let Err(fault) = with_retry("turret start", || self.turret.start()) {
            self.enter_fault(fault, sink);
            return Err(fault);
        }
        self.faulted = false;
        self.fsm.force_transition(EngineState::Armed, &mut self.ctx);
        self.applied = self.ctx.directives;
        sink.emit(&AppEvent::Started(self.state()));
        info!("engine: started in {:?}", self.state());
        Ok(())
    }

    /// External restart after a fault: clear latched faults, restart the
    /// turret and return to Armed.  The turret resumes from its frozen
    /// angle.  A no-op unless a fault put the engine in Idle.
    pub fn restart(
        &mut self,
        recorder: &mut impl Recorder,
        sink: &mut impl EventSink,
    ) -> Result<(), HardwareFault> {
        if !self.faulted {
            info!("engine: restart ignored in {:?}, no fault to clear", self.state());
            return Ok(());
        }
        self.turret.clear_fault();
        self.alarm.clear_fault();
        sink.emit(&AppEvent::FaultCleared);

        if let Err(fault) = with_retry("turret start", || self.turret.start()) {
            self.enter_fault(fault, sink);
            return Err(fault);
        }

        self.faulted = false;
        let prev = self.state();
        self.fsm.force_transition(EngineState::Armed, &mut self.ctx);
        if let Err(fault) = self.apply_directives(recorder, sink) {
            self.abort(fault, recorder, sink);
            return Err(fault);
        }
        if prev != EngineState::Armed {
            sink.emit(&AppEvent::StateChanged {
                from: prev,
                to: EngineState::Armed,
            });
        }
        info!("engine: restarted");
        Ok(())
    }

    /// Close any clip, silence the alarm and stop the turret, then go Idle.
    /// Runs every step even if an earlier one fails.
    pub fn shutdown(&mut self, recorder: &mut impl Recorder, sink: &mut impl EventSink) {
        self.close_clip(recorder, sink);
        if let Err(fault) = self.alarm.stop() {
            error!("engine: alarm release failed on shutdown: {}", fault);
        }
        if let Err(fault) = self.turret.stop() {
            error!("engine: turret release failed on shutdown: {}", fault);
        }

        let prev = self.state();
        self.fsm.force_transition(EngineState::Idle, &mut self.ctx);
        self.ctx.directives = Directives::all_clear();
        self.applied = Directives::all_clear();
        if prev != EngineState::Idle {
            sink.emit(&AppEvent::StateChanged {
                from: prev,
                to: EngineState::Idle,
            });
        }
        sink.emit(&AppEvent::Shutdown);
        info!("engine: shut down, devices released");
    }

    // ── Per-event orchestration ───────────────────────────────

    /// Feed one motion event: fault check → suppression → streaks → FSM →
    /// device commands.
    pub fn handle_event(
        &mut self,
        event: &MotionEvent,
        recorder: &mut impl Recorder,
        sink: &mut impl EventSink,
    ) -> Disposition {
        if self.state() == EngineState::Idle {
            self.stats.events_ignored += 1;
            return Disposition::Ignored;
        }

        // 1. Faults latched asynchronously by the controllers' own schedules.
        if let Some(fault) = self.turret.fault().or_else(|| self.alarm.fault()) {
            self.abort(fault, recorder, sink);
            self.stats.events_ignored += 1;
            return Disposition::Ignored;
        }

        // 2. Self-induced motion from the turret's own pan.
        if self.window.is_active(event.timestamp) {
            self.stats.events_suppressed += 1;
            debug!(
                "engine: event at {} ms suppressed (area {})",
                event.timestamp.as_millis(),
                event.area
            );
            return Disposition::Suppressed;
        }

        // 3. Streaks and FSM.
        self.stats.events_processed += 1;
        self.last_timestamp = event.timestamp;
        let prev = self.state();
        self.ctx.streaks.record(event.detected);
        self.fsm.tick(&mut self.ctx);

        let now = self.state();
        if now != prev {
            if now == EngineState::AlarmActive {
                self.stats.alarms_raised += 1;
            }
            sink.emit(&AppEvent::StateChanged {
                from: prev,
                to: now,
            });
        }

        // 4. Push directive changes to the devices.
        if let Err(fault) = self.apply_directives(recorder, sink) {
            self.abort(fault, recorder, sink);
        }
        Disposition::Processed
    }

    /// Reconcile the engine's clip with a recording toggle.  The recorder
    /// has already closed its clip when `enabled` is false.
    pub fn recording_toggled(
        &mut self,
        enabled: bool,
        recorder: &mut impl Recorder,
        sink: &mut impl EventSink,
    ) {
        if enabled {
            if self.state() == EngineState::AlarmActive && !self.clip_active {
                self.open_clip(recorder, sink);
            }
        } else if self.clip_active {
            self.clip_active = false;
            sink.emit(&AppEvent::ClipStopped);
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> EngineState {
        self.fsm.current_state()
    }

    /// True while a recorder clip opened by the engine is still open.
    pub fn clip_active(&self) -> bool {
        self.clip_active
    }

    /// True after a fault until a successful restart or start.
    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn turret(&self) -> &T {
        &self.turret
    }

    pub fn alarm(&self) -> &A {
        &self.alarm
    }

    pub fn suppression(&self) -> &SuppressionWindow {
        &self.window
    }

    pub fn build_telemetry(&self, recording_enabled: bool) -> TelemetryData {
        let turret = self.turret.snapshot();
        TelemetryData {
            state: self.state(),
            turret_angle_deg: turret.angle_deg,
            turret_direction: turret.direction,
            turret_rotating: turret.rotating(),
            alarm_sounding: self.alarm.snapshot().active,
            recording_enabled,
            clip_active: self.clip_active,
            frames_processed: self.stats.events_processed,
            events_suppressed: self.stats.events_suppressed,
            positive_streak: self.ctx.streaks.positive,
            negative_streak: self.ctx.streaks.negative,
        }
    }

    // ── Internal ──────────────────────────────────────────────

    fn enter_fault(&mut self, fault: HardwareFault, sink: &mut impl EventSink) {
        error!("engine: {}; commands suspended until restart", fault);
        self.stats.faults += 1;
        self.faulted = true;
        let prev = self.state();
        self.fsm.force_transition(EngineState::Idle, &mut self.ctx);
        sink.emit(&AppEvent::FaultDetected(fault));
        if prev != EngineState::Idle {
            sink.emit(&AppEvent::StateChanged {
                from: prev,
                to: EngineState::Idle,
            });
        }
    }

    /// Fault during coordination: go Idle and close any open clip.
    fn abort(&mut self, fault: HardwareFault, recorder: &mut impl Recorder, sink: &mut impl EventSink) {
        self.enter_fault(fault, sink);
        self.close_clip(recorder, sink);
    }

    /// Translate directive changes into device commands.  Raising the alarm
    /// holds the turret first; standing down silences the alarm first.
    fn apply_directives(
        &mut self,
        recorder: &mut impl Recorder,
        sink: &mut impl EventSink,
    ) -> Result<(), HardwareFault> {
        let want = self.ctx.directives;
        if want.alarm_sounding {
            self.apply_turret(want)?;
            self.apply_alarm(want)?;
        } else {
            self.apply_alarm(want)?;
            self.apply_turret(want)?;
        }
        self.apply_clip(want, recorder, sink);
        Ok(())
    }

    fn apply_turret(&mut self, want: Directives) -> Result<(), HardwareFault> {
        if want.turret_paused == self.applied.turret_paused {
            return Ok(());
        }
        if want.turret_paused {
            with_retry("turret pause", || self.turret.pause())?;
        } else {
            with_retry("turret resume", || self.turret.resume())?;
        }
        self.applied.turret_paused = want.turret_paused;
        Ok(())
    }

    fn apply_alarm(&mut self, want: Directives) -> Result<(), HardwareFault> {
        if want.alarm_sounding == self.applied.alarm_sounding {
            return Ok(());
        }
        if want.alarm_sounding {
            let (duration, cycles) = (self.alarm_cycle_duration, self.alarm_cycles);
            with_retry("alarm trigger", || self.alarm.trigger(duration, cycles))?;
        } else {
            with_retry("alarm stop", || self.alarm.stop())?;
        }
        self.applied.alarm_sounding = want.alarm_sounding;
        Ok(())
    }

    /// Recorder failures are logged, never propagated.
    fn apply_clip(&mut self, want: Directives, recorder: &mut impl Recorder, sink: &mut impl EventSink) {
        if want.clip_recording == self.applied.clip_recording {
            return;
        }
        if want.clip_recording {
            self.applied.clip_recording = true;
            self.open_clip(recorder, sink);
        } else {
            self.close_clip(recorder, sink);
        }
    }

    fn open_clip(&mut self, recorder: &mut impl Recorder, sink: &mut impl EventSink) {
        if !recorder.is_enabled() {
            debug!("engine: recording disabled, no clip");
            return;
        }
        match recorder.start_clip(self.last_timestamp) {
            Ok(()) => {
                self.clip_active = true;
                sink.emit(&AppEvent::ClipStarted(self.last_timestamp));
            }
            Err(e) => warn!("engine: clip start failed: {}", e),
        }
    }

    fn close_clip(&mut self, recorder: &mut impl Recorder, sink: &mut impl EventSink) {
        self.applied.clip_recording = false;
        if !self.clip_active {
            return;
        }
        self.clip_active = false;
        match recorder.stop_clip() {
            Ok(()) => sink.emit(&AppEvent::ClipStopped),
            Err(e) => warn!("engine: clip stop failed: {}", e),
        }
    }
}
