//! Alarm siren controller.
//!
//! `trigger()` drives the output synchronously for the first cycle, so a
//! broken output is reported to the caller, then hands the remaining cycle
//! timing to a worker thread.  Every output write happens under the state
//! lock and re-checks the trigger generation, so a `stop()` is final: no
//! stale worker can re-energise the siren afterwards.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use crate::app::ports::{AlarmPort, Clock, OutputPort, Polarity};
use crate::config::SystemConfig;
use crate::drivers::task::{WORKER_STACK_KB, spawn_worker};
use crate::error::{Device, HardwareFault, OutputError};

/// Point-in-time view of the alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AlarmState {
    /// True while Sounding (including the gaps between cycles).
    pub active: bool,
    /// 1-based index of the current cycle; the last cycle run once idle.
    pub cycle_count: u32,
    /// When the current cycle started.
    pub cycle_started_at: Option<Duration>,
}

struct AlarmOutput {
    port: Box<dyn OutputPort + Send>,
    pin: u8,
    polarity: Polarity,
}

impl AlarmOutput {
    fn set(&mut self, on: bool) -> Result<(), OutputError> {
        self.port.set_output(self.pin, self.polarity.level(on))
    }
}

struct AlarmInner {
    state: AlarmState,
    generation: u64,
    output: AlarmOutput,
    fault: Option<HardwareFault>,
}

struct Shared {
    inner: Mutex<AlarmInner>,
    wake: Condvar,
    clock: Arc<dyn Clock>,
    gap: Duration,
}

impl Shared {
    fn lock_inner(&self) -> MutexGuard<'_, AlarmInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep for `period` unless the generation moves on.  Returns the guard
    /// and whether this generation is still current.
    fn wait_current<'a>(
        &self,
        mut inner: MutexGuard<'a, AlarmInner>,
        generation: u64,
        period: Duration,
    ) -> (MutexGuard<'a, AlarmInner>, bool) {
        let deadline = Instant::now() + period;
        loop {
            if inner.generation != generation {
                return (inner, false);
            }
            let now = Instant::now();
            if now >= deadline {
                return (inner, true);
            }
            inner = self
                .wake
                .wait_timeout(inner, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Latch `error`, go idle and try to leave the output released.
    fn fail(&self, inner: &mut AlarmInner, error: OutputError) {
        let fault = HardwareFault::new(Device::Alarm, error);
        inner.fault = Some(fault);
        inner.state.active = false;
        inner.generation += 1;
        if inner.output.set(false).is_err() {
            warn!("alarm: release after fault failed");
        }
        error!("alarm: latched {}", fault);
    }

    /// Remaining schedule after the synchronously started first cycle.
    fn sound_cycles(&self, generation: u64, per_cycle: Duration, cycles: u32) {
        let mut inner = self.lock_inner();
        for cycle in 1..=cycles {
            if cycle > 1 {
                let (guard, current) = self.wait_current(inner, generation, self.gap);
                inner = guard;
                if !current {
                    return;
                }
                if let Err(e) = inner.output.set(true) {
                    self.fail(&mut inner, e);
                    return;
                }
                inner.state.cycle_count = cycle;
                inner.state.cycle_started_at = Some(self.clock.now());
                debug!("alarm: cycle {}/{}", cycle, cycles);
            }

            let (guard, current) = self.wait_current(inner, generation, per_cycle);
            inner = guard;
            if !current {
                return;
            }
            if let Err(e) = inner.output.set(false) {
                self.fail(&mut inner, e);
                return;
            }
        }

        inner.state.active = false;
        inner.generation += 1;
        info!("alarm: {} cycle(s) complete, idle", cycles);
    }
}

/// Owns the alarm output and its cycle schedule.  Dropping the controller
/// silences the alarm.
pub struct AlarmController {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl AlarmController {
    pub fn new(config: &SystemConfig, output: Box<dyn OutputPort + Send>, clock: Arc<dyn Clock>) -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(AlarmInner {
                    state: AlarmState::default(),
                    generation: 0,
                    output: AlarmOutput {
                        port: output,
                        pin: config.alarm_pin,
                        polarity: Polarity::from_active_high(config.alarm_active_high),
                    },
                    fault: None,
                }),
                wake: Condvar::new(),
                clock,
                gap: config.alarm_gap(),
            }),
            worker: None,
        }
    }

    pub fn is_sounding(&self) -> bool {
        self.shared.lock_inner().state.active
    }

    fn join_worker(&mut self) {
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                warn!("alarm: cycle worker panicked");
            }
        }
    }
}

impl AlarmPort for AlarmController {
    fn trigger(&mut self, duration_per_cycle: Duration, cycles: u32) -> Result<bool, HardwareFault> {
        let generation = {
            let mut inner = self.shared.lock_inner();
            if let Some(fault) = inner.fault {
                return Err(fault);
            }
            if inner.state.active {
                debug!("alarm: already sounding, trigger ignored");
                return Ok(false);
            }
            if let Err(e) = inner.output.set(true) {
                self.shared.fail(&mut inner, e);
                return Err(HardwareFault::new(Device::Alarm, e));
            }
            inner.generation += 1;
            inner.state = AlarmState {
                active: true,
                cycle_count: 1,
                cycle_started_at: Some(self.shared.clock.now()),
            };
            inner.generation
        };

        // The previous worker, if any, has already seen its generation end.
        self.join_worker();

        let cycles = cycles.max(1);
        let shared = Arc::clone(&self.shared);
        match spawn_worker("chirp-alarm", WORKER_STACK_KB, move || {
            shared.sound_cycles(generation, duration_per_cycle, cycles);
        }) {
            Ok(handle) => {
                self.worker = Some(handle);
                info!(
                    "alarm: sounding {} cycle(s) of {} ms",
                    cycles,
                    duration_per_cycle.as_millis()
                );
                Ok(true)
            }
            Err(e) => {
                error!("alarm: cycle worker spawn failed: {}", e);
                let mut inner = self.shared.lock_inner();
                self.shared.fail(&mut inner, OutputError::WorkerSpawn);
                Err(HardwareFault::new(Device::Alarm, OutputError::WorkerSpawn))
            }
        }
    }

    fn stop(&mut self) -> Result<(), HardwareFault> {
        let mut inner = self.shared.lock_inner();
        if !inner.state.active {
            return Ok(());
        }
        inner.state.active = false;
        inner.generation += 1;
        self.shared.wake.notify_all();
        if let Err(e) = inner.output.set(false) {
            let fault = HardwareFault::new(Device::Alarm, e);
            inner.fault = Some(fault);
            error!("alarm: release failed, latched {}", fault);
            return Err(fault);
        }
        info!("alarm: stopped");
        Ok(())
    }

    fn fault(&self) -> Option<HardwareFault> {
        self.shared.lock_inner().fault
    }

    fn clear_fault(&mut self) {
        if let Some(fault) = self.shared.lock_inner().fault.take() {
            info!("alarm: cleared fault ({})", fault);
        }
    }

    fn snapshot(&self) -> AlarmState {
        self.shared.lock_inner().state
    }
}

impl Drop for AlarmController {
    fn drop(&mut self) {
        if let Err(fault) = AlarmPort::stop(self) {
            warn!("alarm: release on drop failed: {}", fault);
        }
        self.join_worker();
    }
}
