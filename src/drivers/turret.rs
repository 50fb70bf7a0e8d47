//! Rotating turret controller.
//!
//! Sweeps the camera between 0° and the configured limit in fixed
//! increments on its own schedule, one step every `wait_duration`.  The
//! coordination path only pauses and resumes it.
//!
//! ```text
//!   Stopped ──start──▶ Active ◀──resume── Paused
//!      ▲                 │  └────pause─────▶ │
//!      └──────stop───────┴───────────────────┘
//!   Active ──[output failure]──▶ Faulted ──clear_fault──▶ Stopped
//! ```
//!
//! A step is planned and committed under the state lock, but the motor
//! pulse itself runs outside it so `pause()` never waits on hardware.
//! Angle and direction change together at commit time; a pause or stop that
//! lands mid-pulse takes effect after the step completes.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use crate::app::ports::{Clock, OutputPort, Polarity, TurretPort};
use crate::config::SystemConfig;
use crate::drivers::task::{WORKER_STACK_KB, spawn_worker};
use crate::error::{Device, HardwareFault, OutputError};
use crate::suppression::SuppressionWindow;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Direction of travel along the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Increasing,
    Decreasing,
}

impl Direction {
    pub const fn flipped(self) -> Self {
        match self {
            Self::Increasing => Self::Decreasing,
            Self::Decreasing => Self::Increasing,
        }
    }
}

/// Lifecycle of the rotation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Stopped,
    Active,
    Paused,
    Faulted,
}

/// Point-in-time view of the turret.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurretState {
    /// Always within `[0, sweep_limit]`.
    pub angle_deg: f32,
    pub direction: Direction,
    pub run: RunState,
    /// Limit reversals since the counter last reached `rotations_before_switch`.
    pub cycles_since_reversal: u32,
    /// Completed steps since construction.
    pub steps_taken: u64,
}

impl TurretState {
    pub fn home() -> Self {
        Self {
            angle_deg: 0.0,
            direction: Direction::Increasing,
            run: RunState::Stopped,
            cycles_since_reversal: 0,
            steps_taken: 0,
        }
    }

    pub fn rotating(&self) -> bool {
        self.run == RunState::Active
    }
}

// ---------------------------------------------------------------------------
// Step planning (pure)
// ---------------------------------------------------------------------------

/// Outcome of one planned rotation step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepPlan {
    pub angle_deg: f32,
    pub direction: Direction,
    /// True when the step reached a limit and reversed direction.
    pub flipped: bool,
}

/// Advance `angle_deg` by `increment` in `direction`, clamped to
/// `[0, limit]`.  Direction flips exactly when the clamped angle sits on the
/// limit it was travelling towards.
pub fn advance(angle_deg: f32, direction: Direction, increment: f32, limit: f32) -> StepPlan {
    let target = match direction {
        Direction::Increasing => angle_deg + increment,
        Direction::Decreasing => angle_deg - increment,
    }
    .clamp(0.0, limit);

    let at_limit = match direction {
        Direction::Increasing => target >= limit,
        Direction::Decreasing => target <= 0.0,
    };

    StepPlan {
        angle_deg: target,
        direction: if at_limit { direction.flipped() } else { direction },
        flipped: at_limit,
    }
}

// ---------------------------------------------------------------------------
// Motor output
// ---------------------------------------------------------------------------

/// Two-wire direction drive: one output per direction, both neutral at rest.
struct MotorDriver {
    port: Box<dyn OutputPort + Send>,
    cw_pin: u8,
    ccw_pin: u8,
    polarity: Polarity,
}

impl MotorDriver {
    /// Drive one pulse towards `direction`, then release both outputs and
    /// let the mechanism settle.
    fn pulse(
        &mut self,
        direction: Direction,
        rotate: Duration,
        settle: Duration,
    ) -> Result<(), OutputError> {
        let (active, idle) = match direction {
            Direction::Increasing => (self.cw_pin, self.ccw_pin),
            Direction::Decreasing => (self.ccw_pin, self.cw_pin),
        };
        let on = self.polarity.level(true);
        let off = self.polarity.level(false);

        let driven = self
            .port
            .set_output(idle, off)
            .and_then(|()| self.port.set_output(active, on));
        if driven.is_ok() {
            thread::sleep(rotate);
        }
        let released = self.release();
        if driven.is_ok() && released.is_ok() {
            thread::sleep(settle);
        }
        driven.and(released)
    }

    /// Both outputs neutral.  Attempts both even if the first fails.
    fn release(&mut self) -> Result<(), OutputError> {
        let off = self.polarity.level(false);
        let cw = self.port.set_output(self.cw_pin, off);
        let ccw = self.port.set_output(self.ccw_pin, off);
        cw.and(ccw)
    }
}

// ---------------------------------------------------------------------------
// Shared state between the controller handle and the rotation loop
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct TurretTiming {
    increment_deg: f32,
    limit_deg: f32,
    rotate: Duration,
    wait: Duration,
    settle: Duration,
    post_rotation_delay: Duration,
    rotations_before_switch: u32,
}

impl TurretTiming {
    fn from_config(config: &SystemConfig) -> Self {
        Self {
            increment_deg: config.rotation_increment_deg,
            limit_deg: config.sweep_limit_deg,
            rotate: config.rotate_duration(),
            wait: config.wait_duration(),
            settle: config.motor_settle(),
            post_rotation_delay: config.post_rotation_delay(),
            rotations_before_switch: config.rotations_before_switch,
        }
    }
}

struct TurretInner {
    state: TurretState,
    in_motion: bool,
    fault: Option<HardwareFault>,
}

struct Shared {
    inner: Mutex<TurretInner>,
    wake: Condvar,
    motor: Mutex<MotorDriver>,
    window: SuppressionWindow,
    clock: Arc<dyn Clock>,
    timing: TurretTiming,
}

impl Shared {
    fn lock_inner(&self) -> MutexGuard<'_, TurretInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release_motor(&self) -> Result<(), OutputError> {
        self.motor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .release()
    }

    /// Block until the next step is due.  Returns `false` once the loop
    /// should exit.  The interval restarts after every resume.
    fn wait_for_next_step(&self) -> bool {
        let mut inner = self.lock_inner();
        let mut deadline = Instant::now() + self.timing.wait;
        loop {
            match inner.state.run {
                RunState::Stopped | RunState::Faulted => return false,
                RunState::Paused => {
                    inner = self.wake.wait(inner).unwrap_or_else(PoisonError::into_inner);
                    deadline = Instant::now() + self.timing.wait;
                }
                RunState::Active => {
                    let now = Instant::now();
                    if now >= deadline {
                        return true;
                    }
                    inner = self
                        .wake
                        .wait_timeout(inner, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0;
                }
            }
        }
    }

    /// One rotation step.  `Ok(None)` when not Active or a step is already
    /// in flight.
    fn step(&self) -> Result<Option<TurretState>, HardwareFault> {
        let t = self.timing;
        let (travel, plan) = {
            let mut inner = self.lock_inner();
            if inner.state.run != RunState::Active || inner.in_motion {
                return Ok(None);
            }
            inner.in_motion = true;
            let travel = inner.state.direction;
            (
                travel,
                advance(inner.state.angle_deg, travel, t.increment_deg, t.limit_deg),
            )
        };

        // Cover the pulse itself; superseded by the post-rotation window below.
        self.window
            .open_until(self.clock.now() + t.rotate + t.settle + t.post_rotation_delay);

        let moved = self
            .motor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pulse(travel, t.rotate, t.settle);

        let mut inner = self.lock_inner();
        inner.in_motion = false;
        match moved {
            Ok(()) => {
                inner.state.angle_deg = plan.angle_deg;
                inner.state.direction = plan.direction;
                inner.state.steps_taken += 1;
                if plan.flipped {
                    inner.state.cycles_since_reversal += 1;
                    if inner.state.cycles_since_reversal >= t.rotations_before_switch {
                        info!(
                            "turret: {} reversals completed, cycle counter reset",
                            inner.state.cycles_since_reversal
                        );
                        inner.state.cycles_since_reversal = 0;
                    }
                }
                let snapshot = inner.state;
                drop(inner);

                self.window
                    .open_until(self.clock.now() + t.post_rotation_delay);
                self.wake.notify_all();
                debug!(
                    "turret: step -> {:.1}° ({:?})",
                    snapshot.angle_deg, snapshot.direction
                );
                Ok(Some(snapshot))
            }
            Err(e) => {
                let fault = HardwareFault::new(Device::Turret, e);
                inner.fault = Some(fault);
                inner.state.run = RunState::Faulted;
                drop(inner);

                self.wake.notify_all();
                error!("turret: step failed, latched {}", fault);
                Err(fault)
            }
        }
    }
}

fn rotation_loop(shared: &Shared) {
    info!("turret: rotation loop running");
    while shared.wait_for_next_step() {
        if shared.step().is_err() {
            break;
        }
    }
    debug!("turret: rotation loop exited");
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Owns the turret state and its rotation loop.  Dropping the controller
/// stops the loop and leaves both motor outputs neutral.
pub struct TurretController {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl TurretController {
    pub fn new(
        config: &SystemConfig,
        motor: Box<dyn OutputPort + Send>,
        window: SuppressionWindow,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let driver = MotorDriver {
            port: motor,
            cw_pin: config.motor_cw_pin,
            ccw_pin: config.motor_ccw_pin,
            polarity: Polarity::from_active_high(config.motor_active_high),
        };
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(TurretInner {
                    state: TurretState::home(),
                    in_motion: false,
                    fault: None,
                }),
                wake: Condvar::new(),
                motor: Mutex::new(driver),
                window,
                clock,
                timing: TurretTiming::from_config(config),
            }),
            worker: None,
        }
    }

    /// Run one rotation step now.  Only acts while Active; returns the
    /// committed state, or `None` when the step was skipped.
    pub fn step_once(&self) -> Result<Option<TurretState>, HardwareFault> {
        self.shared.step()
    }

    /// The window this turret opens after each step.
    pub fn suppression(&self) -> &SuppressionWindow {
        &self.shared.window
    }

    fn join_worker(&mut self) {
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                warn!("turret: rotation loop panicked");
            }
        }
    }
}

impl TurretPort for TurretController {
    fn start(&mut self) -> Result<(), HardwareFault> {
        {
            let mut inner = self.shared.lock_inner();
            if let Some(fault) = inner.fault {
                return Err(fault);
            }
            match inner.state.run {
                RunState::Active | RunState::Paused => return Ok(()),
                RunState::Stopped | RunState::Faulted => inner.state.run = RunState::Active,
            }
        }
        self.join_worker();

        let shared = Arc::clone(&self.shared);
        match spawn_worker("chirp-turret", WORKER_STACK_KB, move || {
            rotation_loop(&shared);
        }) {
            Ok(handle) => {
                self.worker = Some(handle);
                info!("turret: started");
                Ok(())
            }
            Err(e) => {
                error!("turret: rotation loop spawn failed: {}", e);
                self.shared.lock_inner().state.run = RunState::Stopped;
                Err(HardwareFault::new(Device::Turret, OutputError::WorkerSpawn))
            }
        }
    }

    fn pause(&mut self) -> Result<(), HardwareFault> {
        let mut inner = self.shared.lock_inner();
        if let Some(fault) = inner.fault {
            return Err(fault);
        }
        if inner.state.run == RunState::Active {
            inner.state.run = RunState::Paused;
            self.shared.wake.notify_all();
            info!("turret: paused at {:.1}°", inner.state.angle_deg);
        }
        Ok(())
    }

    fn resume(&mut self) -> Result<(), HardwareFault> {
        let mut inner = self.shared.lock_inner();
        if let Some(fault) = inner.fault {
            return Err(fault);
        }
        if inner.state.run == RunState::Paused {
            inner.state.run = RunState::Active;
            self.shared.wake.notify_all();
            info!(
                "turret: resumed at {:.1}° ({:?})",
                inner.state.angle_deg, inner.state.direction
            );
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), HardwareFault> {
        {
            let mut inner = self.shared.lock_inner();
            if inner.state.run != RunState::Faulted {
                inner.state.run = RunState::Stopped;
            }
            self.shared.wake.notify_all();
        }
        self.join_worker();

        // A step_once() from another thread may still be mid-pulse.
        drop(
            self.shared
                .wake
                .wait_while(self.shared.lock_inner(), |inner| inner.in_motion)
                .unwrap_or_else(PoisonError::into_inner),
        );

        self.shared
            .release_motor()
            .map_err(|e| HardwareFault::new(Device::Turret, e))?;
        info!("turret: stopped, outputs neutral");
        Ok(())
    }

    fn fault(&self) -> Option<HardwareFault> {
        self.shared.lock_inner().fault
    }

    fn clear_fault(&mut self) {
        let mut inner = self.shared.lock_inner();
        if let Some(fault) = inner.fault.take() {
            info!("turret: cleared fault ({})", fault);
        }
        if inner.state.run == RunState::Faulted {
            inner.state.run = RunState::Stopped;
        }
    }

    fn snapshot(&self) -> TurretState {
        self.shared.lock_inner().state
    }
}

impl Drop for TurretController {
    fn drop(&mut self) {
        if let Err(fault) = TurretPort::stop(self) {
            warn!("turret: release on drop failed: {}", fault);
        }
    }
}
