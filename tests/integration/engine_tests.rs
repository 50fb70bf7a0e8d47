//! Integration tests for the CoordinationEngine → FSM → device commands chain.
//!
//! Motion events are fed directly (no detector) so streak counts are exact.
//! Devices are the recording mocks from `mock_hw`.

use std::time::Duration;

use chirp::app::events::AppEvent;
use chirp::app::ports::Recorder;
use chirp::app::service::{CoordinationEngine, Disposition};
use chirp::config::SystemConfig;
use chirp::detector::MotionEvent;
use chirp::drivers::turret::Direction;
use chirp::error::Device;
use chirp::fsm::EngineState;
use chirp::suppression::SuppressionWindow;

use crate::mock_hw::{
    AlarmCall, CollectSink, MockAlarm, MockRecorder, MockTurret, RecorderCall, TurretCall,
    ALARM_FAULT, TURRET_FAULT,
};

type Engine = CoordinationEngine<MockTurret, MockAlarm>;

struct Rig {
    engine: Engine,
    turret: MockTurret,
    alarm: MockAlarm,
    window: SuppressionWindow,
    recorder: MockRecorder,
    sink: CollectSink,
    clock_ms: u64,
}

impl Rig {
    fn new() -> Self {
        Self::with_config(&SystemConfig::default())
    }

    fn with_config(config: &SystemConfig) -> Self {
        let turret = MockTurret::new();
        let alarm = MockAlarm::new();
        let window = SuppressionWindow::new();
        let engine = CoordinationEngine::new(config, turret.clone(), alarm.clone(), window.clone());
        Self {
            engine,
            turret,
            alarm,
            window,
            recorder: MockRecorder::new(true),
            sink: CollectSink::new(),
            clock_ms: 10_000,
        }
    }

    fn started() -> Self {
        let mut rig = Self::new();
        rig.engine.start(&mut rig.sink).unwrap();
        rig
    }

    /// Feed one event 50 ms after the previous one.
    fn feed(&mut self, detected: bool) -> Disposition {
        self.clock_ms += 50;
        let event = MotionEvent {
            detected,
            area: if detected { 5000 } else { 0 },
            ..MotionEvent::quiet(Duration::from_millis(self.clock_ms))
        };
        self.engine.handle_event(&event, &mut self.recorder, &mut self.sink)
    }

    fn feed_n(&mut self, n: u32, detected: bool) {
        for _ in 0..n {
            self.feed(detected);
        }
    }

    fn faults_reported(&self) -> usize {
        self.sink.count(|e| matches!(e, AppEvent::FaultDetected(_)))
    }
}

// ── Lifecycle ────────────────────────────────────────────────

#[test]
fn events_are_ignored_until_started() {
    let mut rig = Rig::new();
    assert_eq!(rig.engine.state(), EngineState::Idle);
    assert_eq!(rig.feed(true), Disposition::Ignored);
    assert!(rig.turret.calls().is_empty());
    assert_eq!(rig.engine.stats().events_ignored, 1);
}

#[test]
fn start_arms_and_starts_turret_once() {
    let rig = Rig::started();
    assert_eq!(rig.engine.state(), EngineState::Armed);
    assert_eq!(rig.turret.calls(), vec![TurretCall::Start]);
    assert!(rig.sink.events.contains(&AppEvent::Started(EngineState::Armed)));
}

#[test]
fn start_retries_once_then_succeeds() {
    let mut rig = Rig::new();
    rig.turret.script().fail_start = 1;
    rig.engine.start(&mut rig.sink).unwrap();
    assert_eq!(rig.turret.count(TurretCall::Start), 2);
    assert_eq!(rig.engine.state(), EngineState::Armed);
}

#[test]
fn start_failing_twice_stays_idle() {
    let mut rig = Rig::new();
    rig.turret.script().fail_start = 2;
    assert_eq!(rig.engine.start(&mut rig.sink), Err(TURRET_FAULT));
    assert_eq!(rig.turret.count(TurretCall::Start), 2);
    assert_eq!(rig.engine.state(), EngineState::Idle);
    assert_eq!(rig.faults_reported(), 1);
}

// ── Persistence hysteresis ───────────────────────────────────

#[test]
fn alarm_raised_on_exactly_the_persistence_threshold() {
    let mut rig = Rig::started();
    rig.feed_n(49, true);
    assert_eq!(rig.engine.state(), EngineState::Armed);
    assert!(rig.alarm.calls().is_empty());

    rig.feed(true);
    assert_eq!(rig.engine.state(), EngineState::AlarmActive);
    assert_eq!(rig.turret.count(TurretCall::Pause), 1);
    assert_eq!(rig.alarm.triggers(), 1);
    assert_eq!(rig.alarm.calls(), vec![AlarmCall::Trigger { cycles: 1 }]);
    assert_eq!(rig.engine.stats().alarms_raised, 1);
    assert!(rig.sink.events.contains(&AppEvent::StateChanged {
        from: EngineState::Armed,
        to: EngineState::AlarmActive,
    }));
}

#[test]
fn one_short_then_a_negative_resets_the_streak() {
    let mut rig = Rig::started();
    rig.feed_n(49, true);
    rig.feed(false);
    rig.feed_n(49, true);
    assert_eq!(rig.engine.state(), EngineState::Armed);
    assert_eq!(rig.turret.count(TurretCall::Pause), 0);

    rig.feed(true);
    assert_eq!(rig.engine.state(), EngineState::AlarmActive);
}

#[test]
fn continued_motion_does_not_repeat_commands() {
    let mut rig = Rig::started();
    rig.feed_n(200, true);
    assert_eq!(rig.engine.state(), EngineState::AlarmActive);
    assert_eq!(rig.turret.count(TurretCall::Pause), 1);
    assert_eq!(rig.alarm.triggers(), 1);
}

#[test]
fn quiet_period_returns_to_armed_and_resumes_from_frozen_angle() {
    let mut rig = Rig::started();
    rig.turret.set_position(75.0, Direction::Decreasing);
    rig.feed_n(50, true);
    assert_eq!(rig.engine.state(), EngineState::AlarmActive);

    rig.feed_n(59, false);
    assert_eq!(rig.engine.state(), EngineState::AlarmActive);
    rig.feed(false);
    assert_eq!(rig.engine.state(), EngineState::Armed);

    assert_eq!(rig.alarm.stops(), 1);
    assert_eq!(
        rig.turret.calls(),
        vec![TurretCall::Start, TurretCall::Pause, TurretCall::Resume]
    );
    let state = rig.turret.script().state;
    assert_eq!(state.angle_deg, 75.0);
    assert_eq!(state.direction, Direction::Decreasing);
}

#[test]
fn a_single_positive_restarts_the_quiet_count() {
    let mut rig = Rig::started();
    rig.feed_n(50, true);
    rig.feed_n(59, false);
    rig.feed(true);
    rig.feed_n(59, false);
    assert_eq!(rig.engine.state(), EngineState::AlarmActive);
    rig.feed(false);
    assert_eq!(rig.engine.state(), EngineState::Armed);
}

// ── Suppression ──────────────────────────────────────────────

#[test]
fn events_inside_the_window_never_reach_the_alarm_path() {
    let mut rig = Rig::started();
    rig.window
        .open_until(Duration::from_millis(rig.clock_ms + 60 * 50));

    for _ in 0..59 {
        assert_eq!(rig.feed(true), Disposition::Suppressed);
    }
    assert_eq!(rig.engine.stats().events_suppressed, 59);
    assert_eq!(rig.engine.state(), EngineState::Armed);
    assert!(rig.alarm.calls().is_empty());

    // Window expires on the 60th event; counting starts from zero.
    assert_eq!(rig.feed(true), Disposition::Processed);
    rig.feed_n(48, true);
    assert_eq!(rig.engine.state(), EngineState::Armed);
    rig.feed(true);
    assert_eq!(rig.engine.state(), EngineState::AlarmActive);
}

#[test]
fn suppressed_events_leave_streaks_untouched() {
    let mut rig = Rig::started();
    rig.feed_n(30, true);
    rig.window.open_until(Duration::from_millis(rig.clock_ms + 120));
    rig.feed(false);
    rig.feed(false);
    assert_eq!(rig.engine.build_telemetry(true).positive_streak, 30);
}

// ── Faults ───────────────────────────────────────────────────

#[test]
fn pause_failing_once_is_retried() {
    let mut rig = Rig::started();
    rig.turret.script().fail_pause = 1;
    rig.feed_n(50, true);
    assert_eq!(rig.engine.state(), EngineState::AlarmActive);
    assert_eq!(rig.turret.count(TurretCall::Pause), 2);
    assert_eq!(rig.alarm.triggers(), 1);
    assert_eq!(rig.faults_reported(), 0);
}

#[test]
fn pause_failing_twice_goes_idle_without_sounding() {
    let mut rig = Rig::started();
    rig.turret.script().fail_pause = 2;
    rig.feed_n(50, true);

    assert_eq!(rig.engine.state(), EngineState::Idle);
    assert_eq!(rig.turret.count(TurretCall::Pause), 2);
    assert_eq!(rig.alarm.triggers(), 0);
    assert!(rig.sink.events.contains(&AppEvent::FaultDetected(TURRET_FAULT)));

    assert_eq!(rig.feed(true), Disposition::Ignored);
    assert_eq!(rig.turret.count(TurretCall::Pause), 2);
}

#[test]
fn trigger_failing_twice_goes_idle() {
    let mut rig = Rig::started();
    rig.alarm.script().fail_trigger = 2;
    rig.feed_n(50, true);
    assert_eq!(rig.engine.state(), EngineState::Idle);
    assert_eq!(rig.alarm.triggers(), 2);
    assert_eq!(rig.engine.stats().faults, 1);
}

#[test]
fn latched_controller_fault_forces_idle_on_next_event() {
    let mut rig = Rig::started();
    rig.feed_n(10, true);
    rig.alarm.script().latched = Some(ALARM_FAULT);

    assert_eq!(rig.feed(true), Disposition::Ignored);
    assert_eq!(rig.engine.state(), EngineState::Idle);
    match rig.sink.events.iter().find(|e| matches!(e, AppEvent::FaultDetected(_))) {
        Some(AppEvent::FaultDetected(fault)) => assert_eq!(fault.device, Device::Alarm),
        other => panic!("expected a fault event, got {:?}", other),
    }
}

#[test]
fn restart_clears_faults_and_rearms() {
    let mut rig = Rig::started();
    rig.turret.script().fail_pause = 2;
    rig.feed_n(50, true);
    assert_eq!(rig.engine.state(), EngineState::Idle);

    rig.engine.restart(&mut rig.recorder, &mut rig.sink).unwrap();
    assert_eq!(rig.engine.state(), EngineState::Armed);
    assert_eq!(rig.turret.count(TurretCall::ClearFault), 1);
    assert!(rig.alarm.calls().contains(&AlarmCall::ClearFault));
    assert_eq!(rig.turret.count(TurretCall::Start), 2);
    assert!(rig.sink.events.contains(&AppEvent::FaultCleared));

    rig.feed_n(50, true);
    assert_eq!(rig.engine.state(), EngineState::AlarmActive);
}

#[test]
fn restart_before_start_stays_idle() {
    let mut rig = Rig::new();
    rig.engine.restart(&mut rig.recorder, &mut rig.sink).unwrap();
    assert_eq!(rig.engine.state(), EngineState::Idle);
    assert!(rig.turret.calls().is_empty());
    assert!(!rig.sink.events.contains(&AppEvent::FaultCleared));
}

#[test]
fn restart_during_a_healthy_alarm_changes_nothing() {
    let mut rig = Rig::started();
    rig.feed_n(50, true);
    rig.engine.restart(&mut rig.recorder, &mut rig.sink).unwrap();

    assert_eq!(rig.engine.state(), EngineState::AlarmActive);
    assert_eq!(rig.alarm.stops(), 0);
    assert_eq!(rig.turret.count(TurretCall::Resume), 0);
    assert_eq!(rig.turret.count(TurretCall::Start), 1);
    assert!(rig.engine.clip_active());
    assert!(!rig.sink.events.contains(&AppEvent::FaultCleared));
}

#[test]
fn fault_during_an_alarm_closes_the_clip() {
    let mut rig = Rig::started();
    rig.feed_n(50, true);
    assert!(rig.engine.clip_active());

    rig.alarm.script().latched = Some(ALARM_FAULT);
    assert_eq!(rig.feed(true), Disposition::Ignored);
    assert_eq!(rig.engine.state(), EngineState::Idle);
    assert!(rig.engine.is_faulted());
    assert!(!rig.engine.clip_active());
    assert_eq!(rig.recorder.count(RecorderCall::StopClip), 1);

    rig.feed_n(100, false);
    assert_eq!(rig.recorder.count(RecorderCall::StopClip), 1);
    assert!(!rig.engine.build_telemetry(true).clip_active);
}

// ── Recording ────────────────────────────────────────────────

#[test]
fn toggling_off_mid_alarm_releases_the_clip() {
    let mut rig = Rig::started();
    rig.feed_n(50, true);
    assert!(rig.engine.clip_active());

    let enabled = rig.recorder.toggle();
    assert!(!enabled);
    rig.engine.recording_toggled(enabled, &mut rig.recorder, &mut rig.sink);
    assert!(!rig.engine.clip_active());
    assert!(!rig.engine.build_telemetry(enabled).clip_active);
    assert_eq!(rig.sink.count(|e| *e == AppEvent::ClipStopped), 1);

    rig.feed_n(60, false);
    assert_eq!(rig.engine.state(), EngineState::Armed);
    assert_eq!(rig.sink.count(|e| *e == AppEvent::ClipStopped), 1);
    assert_eq!(rig.recorder.count(RecorderCall::StopClip), 0);
}

#[test]
fn toggling_on_mid_alarm_opens_a_clip() {
    let mut rig = Rig::started();
    rig.recorder.enabled = false;
    rig.feed_n(50, true);
    assert_eq!(rig.recorder.count(RecorderCall::StartClip), 0);

    let enabled = rig.recorder.toggle();
    rig.engine.recording_toggled(enabled, &mut rig.recorder, &mut rig.sink);
    assert!(rig.engine.clip_active());
    assert_eq!(rig.recorder.count(RecorderCall::StartClip), 1);

    rig.feed_n(60, false);
    assert!(!rig.engine.clip_active());
    assert_eq!(rig.recorder.count(RecorderCall::StopClip), 1);
}

#[test]
fn toggling_on_while_armed_waits_for_an_alarm() {
    let mut rig = Rig::started();
    rig.recorder.enabled = false;
    let enabled = rig.recorder.toggle();
    rig.engine.recording_toggled(enabled, &mut rig.recorder, &mut rig.sink);
    assert!(!rig.engine.clip_active());
    assert_eq!(rig.recorder.count(RecorderCall::StartClip), 0);

    rig.feed_n(50, true);
    assert_eq!(rig.recorder.count(RecorderCall::StartClip), 1);
}

#[test]
fn clip_follows_alarm_when_recording_enabled() {
    let mut rig = Rig::started();
    rig.feed_n(50, true);
    assert!(rig.engine.clip_active());
    assert_eq!(rig.recorder.count(RecorderCall::StartClip), 1);

    rig.feed_n(60, false);
    assert!(!rig.engine.clip_active());
    assert_eq!(rig.recorder.count(RecorderCall::StopClip), 1);
    assert!(rig.sink.events.contains(&AppEvent::ClipStopped));
}

#[test]
fn no_clip_while_recording_disabled() {
    let mut rig = Rig::started();
    rig.recorder.enabled = false;
    rig.feed_n(50, true);
    assert_eq!(rig.engine.state(), EngineState::AlarmActive);
    assert!(!rig.engine.clip_active());
    assert_eq!(rig.recorder.count(RecorderCall::StartClip), 0);
}

#[test]
fn recorder_failure_does_not_block_the_alarm() {
    let mut rig = Rig::started();
    rig.recorder.fail_start = true;
    rig.feed_n(50, true);
    assert_eq!(rig.engine.state(), EngineState::AlarmActive);
    assert_eq!(rig.alarm.triggers(), 1);
    assert!(!rig.engine.clip_active());
}

// ── Shutdown ─────────────────────────────────────────────────

#[test]
fn shutdown_releases_everything_during_an_alarm() {
    let mut rig = Rig::started();
    rig.feed_n(50, true);
    rig.engine.shutdown(&mut rig.recorder, &mut rig.sink);

    assert_eq!(rig.engine.state(), EngineState::Idle);
    assert!(!rig.engine.clip_active());
    assert_eq!(rig.recorder.count(RecorderCall::StopClip), 1);
    assert_eq!(rig.alarm.calls().last(), Some(&AlarmCall::Stop));
    assert_eq!(rig.turret.calls().last(), Some(&TurretCall::Stop));
    assert!(!rig.alarm.sounding());
    assert_eq!(rig.sink.events.last(), Some(&AppEvent::Shutdown));
}

#[test]
fn shutdown_still_stops_turret_when_alarm_release_fails() {
    let mut rig = Rig::started();
    rig.alarm.script().fail_stop = 1;
    rig.engine.shutdown(&mut rig.recorder, &mut rig.sink);
    assert_eq!(rig.turret.calls().last(), Some(&TurretCall::Stop));
    assert_eq!(rig.engine.state(), EngineState::Idle);
}

#[test]
fn telemetry_reflects_devices_and_streaks() {
    let mut rig = Rig::started();
    rig.turret.set_position(30.0, Direction::Increasing);
    rig.feed_n(5, true);
    let t = rig.engine.build_telemetry(false);
    assert_eq!(t.state, EngineState::Armed);
    assert_eq!(t.turret_angle_deg, 30.0);
    assert!(t.turret_rotating);
    assert!(!t.alarm_sounding);
    assert_eq!(t.positive_streak, 5);
    assert_eq!(t.frames_processed, 5);
}

#[test]
fn custom_thresholds_are_honoured() {
    let config = SystemConfig {
        motion_persistence_frames: 3,
        quiet_period_frames: 2,
        alarm_cycle_count: 4,
        ..SystemConfig::default()
    };
    let mut rig = Rig::with_config(&config);
    rig.engine.start(&mut rig.sink).unwrap();
    rig.feed_n(3, true);
    assert_eq!(rig.engine.state(), EngineState::AlarmActive);
    assert_eq!(rig.alarm.calls(), vec![AlarmCall::Trigger { cycles: 4 }]);
    rig.feed_n(2, false);
    assert_eq!(rig.engine.state(), EngineState::Armed);
}
