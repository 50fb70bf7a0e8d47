//! Digital output drivers.
//!
//! [`GpioBank`] adapts any set of `embedded_hal::digital::OutputPin`s to the
//! domain's [`OutputPort`], addressed by the pin numbers used in
//! configuration.  [`SimPin`] is the host-side pin used in simulation and
//! tests: its level is observable from a cloned handle and writes can be made
//! to fail on demand.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use embedded_hal::digital::{self, ErrorKind, ErrorType, OutputPin};
use log::debug;

use crate::app::ports::{Level, OutputPort};
use crate::error::OutputError;

// ---------------------------------------------------------------------------
// GpioBank
// ---------------------------------------------------------------------------

/// A numbered set of output pins.
pub struct GpioBank<P> {
    pins: Vec<(u8, P)>,
}

impl<P: OutputPin> Default for GpioBank<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: OutputPin> GpioBank<P> {
    pub fn new() -> Self {
        Self { pins: Vec::new() }
    }

    /// Register `pin` under `number`.  Re-registering replaces the old pin.
    pub fn with_pin(mut self, number: u8, pin: P) -> Self {
        self.pins.retain(|(n, _)| *n != number);
        self.pins.push((number, pin));
        self
    }
}

impl<P: OutputPin> OutputPort for GpioBank<P> {
    fn set_output(&mut self, pin: u8, level: Level) -> Result<(), OutputError> {
        let (_, out) = self
            .pins
            .iter_mut()
            .find(|(n, _)| *n == pin)
            .ok_or(OutputError::UnknownPin(pin))?;

        let result = match level {
            Level::High => out.set_high(),
            Level::Low => out.set_low(),
        };
        result.map_err(|e| {
            debug!("gpio: pin {} write failed: {:?}", pin, digital::Error::kind(&e));
            OutputError::WriteFailed(pin)
        })
    }
}

// ---------------------------------------------------------------------------
// SimPin
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct SimPinState {
    high: AtomicBool,
    failing: AtomicBool,
    writes: AtomicU32,
}

/// Simulated push-pull output.  Clones observe and control the same pin.
#[derive(Debug, Clone, Default)]
pub struct SimPin {
    state: Arc<SimPinState>,
}

/// Error returned by a [`SimPin`] with fault injection enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimPinError;

impl digital::Error for SimPinError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

impl SimPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_high(&self) -> bool {
        self.state.high.load(Ordering::SeqCst)
    }

    /// Successful writes so far.
    pub fn write_count(&self) -> u32 {
        self.state.writes.load(Ordering::SeqCst)
    }

    /// Make every subsequent write fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.state.failing.store(failing, Ordering::SeqCst);
    }

    fn write(&self, high: bool) -> Result<(), SimPinError> {
        if self.state.failing.load(Ordering::SeqCst) {
            return Err(SimPinError);
        }
        self.state.high.store(high, Ordering::SeqCst);
        self.state.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl ErrorType for SimPin {
    type Error = SimPinError;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true)
    }
}
