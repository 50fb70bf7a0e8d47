//! Shared mutable context threaded through every FSM handler.
//!
//! `FsmContext` is the single struct that state handlers read from and
//! write to: the motion streak counters, the desired device directives, the
//! hysteresis thresholds and timing.  The engine records each motion event
//! into it before a tick and applies the directives after.

use crate::config::SystemConfig;

// ---------------------------------------------------------------------------
// Streak counters (written by the engine before each tick)
// ---------------------------------------------------------------------------

/// Consecutive detected / not-detected frame counts.  Exactly one of the
/// two is non-zero after any recorded event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistenceCounter {
    pub positive: u32,
    pub negative: u32,
}

impl PersistenceCounter {
    pub fn record(&mut self, detected: bool) {
        if detected {
            self.positive = self.positive.saturating_add(1);
            self.negative = 0;
        } else {
            self.positive = 0;
            self.negative = self.negative.saturating_add(1);
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// ---------------------------------------------------------------------------
// Device directives (written by state handlers; applied by the engine)
// ---------------------------------------------------------------------------

/// Desired device condition.  The engine issues a command only when a
/// directive differs from what it last applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Directives {
    pub turret_paused: bool,
    pub alarm_sounding: bool,
    pub clip_recording: bool,
}

impl Directives {
    /// Turret sweeping, alarm silent, no clip.
    pub fn all_clear() -> Self {
        Self::default()
    }

    /// Turret held, alarm sounding, clip open.
    pub fn intruder() -> Self {
        Self {
            turret_paused: true,
            alarm_sounding: true,
            clip_recording: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Hysteresis thresholds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    /// Consecutive positives that raise the alarm.
    pub persistence_frames: u32,
    /// Consecutive negatives that stand it down.
    pub quiet_period_frames: u32,
}

impl Thresholds {
    pub fn from_config(config: &SystemConfig) -> Self {
        Self {
            persistence_frames: config.motion_persistence_frames,
            quiet_period_frames: config.quiet_period_frames,
        }
    }
}

// ---------------------------------------------------------------------------
// FsmContext
// ---------------------------------------------------------------------------

/// The shared context passed to every state handler function.
pub struct FsmContext {
    // -- Timing --
    /// Ticks (processed events) since the current state was entered.
    pub ticks_in_state: u64,

    // -- Inputs --
    pub streaks: PersistenceCounter,

    // -- Outputs --
    pub directives: Directives,

    // -- Configuration --
    pub thresholds: Thresholds,
}

impl FsmContext {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            ticks_in_state: 0,
            streaks: PersistenceCounter::default(),
            directives: Directives::all_clear(),
            thresholds,
        }
    }

    pub fn motion_confirmed(&self) -> bool {
        self.streaks.positive >= self.thresholds.persistence_frames
    }

    pub fn quiet_confirmed(&self) -> bool {
        self.streaks.negative >= self.thresholds.quiet_period_frames
    }
}
