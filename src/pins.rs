//! GPIO pin assignments for the CHIRP turret board.
//!
//! Single source of truth for the factory defaults.  The live values come
//! from [`SystemConfig`](crate::config::SystemConfig) so a board revision can
//! be re-wired without a rebuild.

// ---------------------------------------------------------------------------
// Rotation motor (two-wire direction drive)
// ---------------------------------------------------------------------------

/// Digital output: drives the motor towards increasing angle while active.
pub const MOTOR_CW_GPIO: u8 = 1;
/// Digital output: drives the motor towards decreasing angle while active.
pub const MOTOR_CCW_GPIO: u8 = 7;

// ---------------------------------------------------------------------------
// Alarm
// ---------------------------------------------------------------------------

/// Digital output: piezo siren driver (active HIGH on the reference board).
pub const ALARM_GPIO: u8 = 16;
