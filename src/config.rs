//! System configuration parameters
//!
//! All tunable parameters for the CHIRP sentry.  Built once at startup
//! (defaults, then an optional JSON file) and handed by value or reference to
//! each component constructor.  Nothing mutates it afterwards.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::pins;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- Turret ---
    /// Angle advanced per rotation step (degrees)
    pub rotation_increment_deg: f32,
    /// Upper sweep limit (degrees); the lower limit is always 0
    pub sweep_limit_deg: f32,
    /// How long the motor output is driven for one step (milliseconds)
    pub rotate_duration_ms: u32,
    /// Interval between rotation steps (milliseconds)
    pub wait_duration_ms: u32,
    /// Reversal count after which the cycle counter is reset (telemetry only)
    pub rotations_before_switch: u32,
    /// Motion suppression window after each completed step (milliseconds)
    pub post_rotation_delay_ms: u32,
    /// Settle time with both motor outputs neutral after a pulse (milliseconds)
    pub motor_settle_ms: u32,

    // --- Detector ---
    /// Minimum changed-region area that counts as motion (pixels)
    pub minimum_motion_area: u32,
    /// Per-pixel absolute difference above which a pixel has changed
    pub diff_threshold: u8,
    /// Box blur radius applied before differencing (0 disables)
    pub blur_radius: u32,
    /// 3x3 dilation passes over the change mask
    pub dilate_iterations: u32,

    // --- Coordination ---
    /// Consecutive positive frames required to raise the alarm
    pub motion_persistence_frames: u32,
    /// Consecutive quiet frames required to stand the alarm down
    pub quiet_period_frames: u32,

    // --- Alarm ---
    /// Duration of one alarm cycle (milliseconds)
    pub alarm_cycle_duration_ms: u32,
    /// Number of alarm cycles per trigger
    pub alarm_cycle_count: u32,
    /// Silent gap between alarm cycles (milliseconds)
    pub alarm_gap_ms: u32,

    // --- Outputs ---
    pub motor_cw_pin: u8,
    pub motor_ccw_pin: u8,
    pub motor_active_high: bool,
    pub alarm_pin: u8,
    pub alarm_active_high: bool,

    // --- Pipeline ---
    /// Frame pacing interval (milliseconds, 0 = as fast as the source yields)
    pub frame_interval_ms: u32,
    /// Consecutive frame read failures tolerated before giving up
    pub max_consecutive_frame_failures: u32,
    /// Frames between telemetry events
    pub telemetry_interval_frames: u32,
    /// Run without keyboard control
    pub headless: bool,
    /// Start with clip recording enabled
    pub recording_enabled: bool,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Turret
            rotation_increment_deg: 15.0,
            sweep_limit_deg: 180.0,
            rotate_duration_ms: 150,
            wait_duration_ms: 3000,
            rotations_before_switch: 8,
            post_rotation_delay_ms: 1000,
            motor_settle_ms: 50,

            // Detector
            minimum_motion_area: 3000,
            diff_threshold: 25,
            blur_radius: 10, // 21x21 window
            dilate_iterations: 2,

            // Coordination
            motion_persistence_frames: 50,
            quiet_period_frames: 60, // ~3 s at 20 fps

            // Alarm
            alarm_cycle_duration_ms: 2000,
            alarm_cycle_count: 1,
            alarm_gap_ms: 1000,

            // Outputs
            motor_cw_pin: pins::MOTOR_CW_GPIO,
            motor_ccw_pin: pins::MOTOR_CCW_GPIO,
            motor_active_high: true,
            alarm_pin: pins::ALARM_GPIO,
            alarm_active_high: true,

            // Pipeline
            frame_interval_ms: 50,
            max_consecutive_frame_failures: 10,
            telemetry_interval_frames: 200,
            headless: false,
            recording_enabled: false,
        }
    }
}

impl SystemConfig {
    /// Range-check every field.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1.0..=360.0).contains(&self.sweep_limit_deg) {
            return Err(ConfigError::ValidationFailed(
                "sweep_limit_deg must be 1.0–360.0",
            ));
        }
        if !(self.rotation_increment_deg > 0.0 && self.rotation_increment_deg <= self.sweep_limit_deg)
        {
            return Err(ConfigError::ValidationFailed(
                "rotation_increment_deg must be > 0 and <= sweep_limit_deg",
            ));
        }
        if !(1..=10_000).contains(&self.rotate_duration_ms) {
            return Err(ConfigError::ValidationFailed(
                "rotate_duration_ms must be 1–10000",
            ));
        }
        if !(1..=3_600_000).contains(&self.wait_duration_ms) {
            return Err(ConfigError::ValidationFailed(
                "wait_duration_ms must be 1–3600000",
            ));
        }
        if self.rotations_before_switch == 0 {
            return Err(ConfigError::ValidationFailed(
                "rotations_before_switch must be >= 1",
            ));
        }
        if self.post_rotation_delay_ms > 60_000 {
            return Err(ConfigError::ValidationFailed(
                "post_rotation_delay_ms must be 0–60000",
            ));
        }
        if self.motor_settle_ms > 5_000 {
            return Err(ConfigError::ValidationFailed(
                "motor_settle_ms must be 0–5000",
            ));
        }
        if self.minimum_motion_area == 0 {
            return Err(ConfigError::ValidationFailed(
                "minimum_motion_area must be >= 1",
            ));
        }
        if self.blur_radius > 64 {
            return Err(ConfigError::ValidationFailed("blur_radius must be 0–64"));
        }
        if self.dilate_iterations > 16 {
            return Err(ConfigError::ValidationFailed(
                "dilate_iterations must be 0–16",
            ));
        }
        if self.motion_persistence_frames == 0 {
            return Err(ConfigError::ValidationFailed(
                "motion_persistence_frames must be >= 1",
            ));
        }
        if self.quiet_period_frames == 0 {
            return Err(ConfigError::ValidationFailed(
                "quiet_period_frames must be >= 1",
            ));
        }
        if !(1..=600_000).contains(&self.alarm_cycle_duration_ms) {
            return Err(ConfigError::ValidationFailed(
                "alarm_cycle_duration_ms must be 1–600000",
            ));
        }
        if !(1..=100).contains(&self.alarm_cycle_count) {
            return Err(ConfigError::ValidationFailed(
                "alarm_cycle_count must be 1–100",
            ));
        }
        if self.alarm_gap_ms > 60_000 {
            return Err(ConfigError::ValidationFailed("alarm_gap_ms must be 0–60000"));
        }
        if self.motor_cw_pin == self.motor_ccw_pin {
            return Err(ConfigError::ValidationFailed(
                "motor_cw_pin and motor_ccw_pin must differ",
            ));
        }
        if self.alarm_pin == self.motor_cw_pin || self.alarm_pin == self.motor_ccw_pin {
            return Err(ConfigError::ValidationFailed(
                "alarm_pin must not share a motor pin",
            ));
        }
        if self.frame_interval_ms > 10_000 {
            return Err(ConfigError::ValidationFailed(
                "frame_interval_ms must be 0–10000",
            ));
        }
        if self.max_consecutive_frame_failures == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_consecutive_frame_failures must be >= 1",
            ));
        }
        if self.telemetry_interval_frames == 0 {
            return Err(ConfigError::ValidationFailed(
                "telemetry_interval_frames must be >= 1",
            ));
        }
        Ok(())
    }

    pub fn rotate_duration(&self) -> Duration {
        Duration::from_millis(u64::from(self.rotate_duration_ms))
    }

    pub fn wait_duration(&self) -> Duration {
        Duration::from_millis(u64::from(self.wait_duration_ms))
    }

    pub fn post_rotation_delay(&self) -> Duration {
        Duration::from_millis(u64::from(self.post_rotation_delay_ms))
    }

    pub fn motor_settle(&self) -> Duration {
        Duration::from_millis(u64::from(self.motor_settle_ms))
    }

    pub fn alarm_cycle_duration(&self) -> Duration {
        Duration::from_millis(u64::from(self.alarm_cycle_duration_ms))
    }

    pub fn alarm_gap(&self) -> Duration {
        Duration::from_millis(u64::from(self.alarm_gap_ms))
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(u64::from(self.frame_interval_ms))
    }
}
