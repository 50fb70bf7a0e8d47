//! Post-rotation suppression window.
//!
//! Written by the turret's rotation loop, read by the coordination path on
//! every motion event.  The active flag and the expiry are one value behind
//! one lock, so a reader never sees a half-updated window.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Shared handle to a single suppression window.  Clones share state.
#[derive(Debug, Clone, Default)]
pub struct SuppressionWindow {
    expires_at: Arc<Mutex<Option<Duration>>>,
}

impl SuppressionWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open (or supersede) the window so it expires at `expires_at`.
    pub fn open_until(&self, expires_at: Duration) {
        *self.lock() = Some(expires_at);
    }

    /// True while `now < expires_at`.  An expired window is cleared.
    pub fn is_active(&self, now: Duration) -> bool {
        let mut slot = self.lock();
        match *slot {
            Some(expiry) if now < expiry => true,
            Some(_) => {
                *slot = None;
                false
            }
            None => false,
        }
    }

    /// Expiry of the current window, if one is open.
    pub fn expires_at(&self) -> Option<Duration> {
        *self.lock()
    }

    pub fn clear(&self) {
        *self.lock() = None;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Duration>> {
        self.expires_at.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
